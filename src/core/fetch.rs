//! The polling seam: what the scheduler asks of a transport, and the
//! adapter that answers it with an SNMP session.

use thiserror::Error;
use tracing::debug;

use mibtail_snmp::{Oid, Session, SnmpError, Value};

/// Counter width as reported by the protocol type tag.
///
/// Decides the modulus used when a counter is seen going backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWidth {
    Bits32,
    Bits64,
    Other,
}

impl CounterWidth {
    /// Modulus of a fixed-width counter, 0 when the value does not wrap.
    pub fn wrap_modulus(self) -> i128 {
        match self {
            CounterWidth::Bits32 => 1i128 << 32,
            CounterWidth::Bits64 => 1i128 << 64,
            CounterWidth::Other => 0,
        }
    }
}

/// One metric's reading in a successful round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample {
    /// The target has no object at that address.
    Absent,
    /// An unsigned integer with its counter width.
    Numeric { value: u64, width: CounterWidth },
    /// A reading that is numeric but not an unsigned integer: negative
    /// INTEGERs and display strings such as load averages ("0.25").
    Float(f64),
}

impl RawSample {
    pub fn counter32(value: u32) -> Self {
        RawSample::Numeric {
            value: u64::from(value),
            width: CounterWidth::Bits32,
        }
    }

    pub fn counter64(value: u64) -> Self {
        RawSample::Numeric {
            value,
            width: CounterWidth::Bits64,
        }
    }

    pub fn gauge(value: u64) -> Self {
        RawSample::Numeric {
            value,
            width: CounterWidth::Other,
        }
    }
}

/// A round in which no trustworthy values were obtained.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollFailure {
    #[error("no response after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not carry one value per requested address.
    #[error("expected {expected} values, got {got}")]
    PartialResponse { expected: usize, got: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl From<SnmpError> for PollFailure {
    fn from(err: SnmpError) -> Self {
        match err {
            SnmpError::Timeout { attempts } => PollFailure::Timeout { attempts },
            SnmpError::InvalidOid(oid) => PollFailure::InvalidAddress(oid),
            other => PollFailure::Transport(other.to_string()),
        }
    }
}

/// Retrieves current values for an ordered list of addresses.
///
/// Implementations return exactly one sample per address, in order, or a
/// `PollFailure` for the whole round. They own the timeout and retry bound.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, addresses: &[String]) -> Result<Vec<RawSample>, PollFailure>;
}

#[async_trait::async_trait]
impl Fetcher for Session {
    async fn fetch(&self, addresses: &[String]) -> Result<Vec<RawSample>, PollFailure> {
        let oids = addresses
            .iter()
            .map(|address| address.parse::<Oid>())
            .collect::<Result<Vec<_>, _>>()?;

        let varbinds = self.get(&oids).await?;
        Ok(varbinds
            .into_iter()
            .map(|vb| {
                let sample = RawSample::from(&vb.value);
                if sample == RawSample::Absent && !vb.value.is_exception() {
                    debug!("{} = {} is not numeric, shown as absent", vb.oid, vb.value);
                }
                sample
            })
            .collect())
    }
}

impl From<&Value> for RawSample {
    fn from(value: &Value) -> Self {
        match value {
            Value::Counter32(v) => RawSample::counter32(*v),
            Value::Counter64(v) => RawSample::counter64(*v),
            Value::Gauge32(v) | Value::TimeTicks(v) => RawSample::gauge(u64::from(*v)),
            Value::Integer(v) => match u64::try_from(*v) {
                Ok(unsigned) => RawSample::gauge(unsigned),
                Err(_) => RawSample::Float(*v as f64),
            },
            Value::OctetString(bytes) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|text| text.trim().parse::<f64>().ok())
                .filter(|f| f.is_finite())
                .map(RawSample::Float)
                .unwrap_or(RawSample::Absent),
            _ => RawSample::Absent,
        }
    }
}
