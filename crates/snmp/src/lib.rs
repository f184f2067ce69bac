//! # mibtail-snmp: minimal SNMPv2c GET client
//!
//! The polling engine in `mibtail` only ever needs one protocol operation:
//! "get the current values of these OIDs". This crate provides exactly that
//! over UDP, and nothing more:
//!
//! - **BER codec** for the handful of ASN.1 types an agent returns to a GET
//! - **Object identifiers** parsed from the dotted notation used in catalogs
//! - **GetRequest / Response PDUs** for community-based SNMPv2c
//! - **Session** with a per-attempt timeout and a bounded number of resends
//!
//! SET, GETNEXT/GETBULK walks, traps and SNMPv3 security are out of scope.
//!
//! # Quick Start
//!
//! ```ignore
//! use mibtail_snmp::{Config, Oid, Session};
//!
//! let session = Session::connect(&Config::default()).await?;
//! let sys_uptime: Oid = "1.3.6.1.2.1.1.3.0".parse()?;
//! for vb in session.get(&[sys_uptime]).await? {
//!     println!("{} = {:?}", vb.oid, vb.value);
//! }
//! ```
//!
//! # Timing
//!
//! A single `get` blocks for at most `timeout × (retries + 1)`: every attempt
//! sends the same request id and waits `timeout` for a matching response.

pub mod ber;
pub mod config;
pub mod error;
pub mod oid;
pub mod pdu;
pub mod session;

pub use config::Config;
pub use error::{BerError, SnmpError};
pub use oid::Oid;
pub use pdu::{GetRequest, Response, Value, VarBind};
pub use session::Session;
