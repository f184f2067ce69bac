//! Error types for the SNMP client.
//!
//! `BerError` covers malformed bytes on the wire; `SnmpError` is what session
//! callers see and pattern-match on.
//!
//! **Recoverable per request** (the caller may simply try again next round):
//! - `Timeout`: no matching response after every attempt
//! - `Io`: socket-level failure, e.g. ICMP port unreachable on a connected socket
//! - `ErrorStatus`: the agent answered with a non-zero error-status
//! - `MalformedResponse`: the agent answered, but not with what was asked
//!
//! **Startup errors** (fix the configuration):
//! - `InvalidOid`, `Resolve`, `ConfigError`

use thiserror::Error;

/// Decoding failures of BER-encoded data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BerError {
    /// The buffer ended before the announced TLV was complete.
    #[error("Unexpected end of data at offset {0}")]
    Truncated(usize),

    /// A length octet used a form this decoder does not accept.
    #[error("Unsupported length encoding at offset {0}")]
    BadLength(usize),

    /// A different tag was found where a specific one was required.
    #[error("Expected tag 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    /// An integer did not fit the target type.
    #[error("Integer of {0} bytes does not fit")]
    IntegerOverflow(usize),

    /// An object identifier was empty or had a dangling sub-identifier.
    #[error("Malformed object identifier")]
    BadOid,
}

/// The unified error type returned by [`crate::Session`].
#[derive(Debug, Error)]
pub enum SnmpError {
    /// No response with the matching request id arrived in any attempt.
    #[error("Request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// Socket error while sending or receiving.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The agent reported an error for the request.
    ///
    /// `index` is the 1-based position of the offending varbind, 0 when the
    /// error concerns the whole PDU (e.g. `tooBig`).
    #[error("Agent returned error-status {status} at index {index}")]
    ErrorStatus { status: i64, index: i64 },

    /// The response decoded but does not answer the request.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A textual OID could not be parsed.
    #[error("Invalid OID '{0}'")]
    InvalidOid(String),

    /// The target host name did not resolve to any address.
    #[error("Failed to resolve target '{0}'")]
    Resolve(String),

    /// Transport configuration failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// Bytes on the wire were not valid BER.
    #[error("Decode error: {0}")]
    Decode(#[from] BerError),
}
