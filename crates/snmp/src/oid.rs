//! Object identifiers.

use std::{fmt, str::FromStr};

use crate::error::SnmpError;

/// An ASN.1 object identifier such as `1.3.6.1.2.1.2.2.1.10.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Builds an OID from its arcs, checking the BER constraints on the first two.
    pub fn from_arcs(arcs: Vec<u32>) -> Result<Self, SnmpError> {
        let valid = match arcs.as_slice() {
            [first, second, ..] => {
                *first <= 2 && (*first == 2 || *second < 40) && *second <= u32::MAX - 80
            }
            _ => false,
        };
        if !valid {
            let text = arcs
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(".");
            return Err(SnmpError::InvalidOid(text));
        }
        Ok(Self(arcs))
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for Oid {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        let arcs = body
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SnmpError::InvalidOid(s.to_string()))?;
        Oid::from_arcs(arcs).map_err(|_| SnmpError::InvalidOid(s.to_string()))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}
