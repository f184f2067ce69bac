//! Metric catalog: the ordered list of values to poll and how to show them.
//!
//! A catalog file holds a `miblist` array; each entry names a column
//! (`description`), a display format tag (`disp`) and the address to poll
//! (`oid`). Entry order is column order and never changes while running.
//!
//! ```yaml
//! miblist:
//!   - { description: ge-0/0/0_in, disp: bps, oid: 1.3.6.1.2.1.31.1.1.1.6.1 }
//!   - { description: "|", disp: mark, oid: 1.3.6.1.2.1.1.3.0 }
//!   - { description: cpu_load, disp: gaugef2, oid: 1.3.6.1.4.1.2021.10.1.3.1 }
//! ```

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Errors raised while loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Only `.json`, `.yaml`, `.yml` and `.toml` catalogs are understood.
    #[error("Unknown catalog file type: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

/// How a metric's raw value becomes its column text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisplayFormat {
    /// Fixed separator glyph; the value is ignored.
    Mark,
    /// Absolute value, truncated to an integer.
    Gauge,
    /// Absolute value as a decimal with natural precision.
    GaugeFloat,
    /// Absolute value rounded to the given number of decimal places.
    GaugeFloatFixed(u8),
    /// Raw increase since the previous round.
    Delta,
    /// Octet counter increase as bits per second.
    BitRate,
    /// Increase per second.
    PacketRate,
    /// A tag this version does not know. Kept so the column survives.
    Unknown(String),
}

impl DisplayFormat {
    /// Parses a catalog `disp` tag. Unrecognized tags map to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "mark" => DisplayFormat::Mark,
            "gauge" => DisplayFormat::Gauge,
            "gaugef" => DisplayFormat::GaugeFloat,
            "delta" => DisplayFormat::Delta,
            "bps" => DisplayFormat::BitRate,
            "pps" => DisplayFormat::PacketRate,
            other => other
                .strip_prefix("gaugef")
                .and_then(|digits| digits.parse::<u8>().ok().map(|p| (digits, p)))
                // Only the canonical spelling, so `tag()` echoes it unchanged.
                .filter(|(digits, precision)| {
                    *precision <= 17 && precision.to_string() == *digits
                })
                .map(|(_, precision)| precision)
                .map(DisplayFormat::GaugeFloatFixed)
                .unwrap_or_else(|| DisplayFormat::Unknown(other.to_string())),
        }
    }

    /// The catalog tag for this format, as echoed in the header line.
    pub fn tag(&self) -> String {
        match self {
            DisplayFormat::Mark => "mark".to_string(),
            DisplayFormat::Gauge => "gauge".to_string(),
            DisplayFormat::GaugeFloat => "gaugef".to_string(),
            DisplayFormat::GaugeFloatFixed(precision) => format!("gaugef{}", precision),
            DisplayFormat::Delta => "delta".to_string(),
            DisplayFormat::BitRate => "bps".to_string(),
            DisplayFormat::PacketRate => "pps".to_string(),
            DisplayFormat::Unknown(tag) => tag.clone(),
        }
    }

    /// Delta-family formats need two consecutive reads to produce a number.
    pub fn is_delta_family(&self) -> bool {
        matches!(
            self,
            DisplayFormat::Delta | DisplayFormat::BitRate | DisplayFormat::PacketRate
        )
    }
}

impl From<String> for DisplayFormat {
    fn from(tag: String) -> Self {
        DisplayFormat::from_tag(&tag)
    }
}

impl From<DisplayFormat> for String {
    fn from(format: DisplayFormat) -> Self {
        format.tag()
    }
}

impl fmt::Display for DisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricDescriptor {
    /// Column label. The older catalog format spelled the key `decription`.
    #[serde(rename = "description", alias = "decription")]
    pub label: String,

    #[serde(rename = "disp")]
    pub format: DisplayFormat,

    /// Opaque protocol address, an OID for the SNMP transport.
    #[serde(rename = "oid")]
    #[validate(length(min = 1, message = "Metric address must not be empty"))]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
struct CatalogFile {
    #[validate(
        length(min = 1, message = "The catalog must list at least one metric"),
        nested
    )]
    miblist: Vec<MetricDescriptor>,
}

/// Ordered, immutable set of metrics polled each round.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    metrics: Vec<MetricDescriptor>,
}

impl Catalog {
    pub fn new(metrics: Vec<MetricDescriptor>) -> Self {
        Self { metrics }
    }

    /// Loads a catalog, choosing the parser by file extension.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let display = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: display.clone(),
            source,
        })?;

        let parse_error = |reason: String| CatalogError::Parse {
            path: display.clone(),
            reason,
        };
        let file: CatalogFile = match extension.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            "toml" => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            _ => return Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        };

        file.validate()
            .map_err(|e| CatalogError::Invalid(e.to_string()))?;
        Ok(Self::new(file.miblist))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.metrics.iter()
    }

    pub fn as_slice(&self) -> &[MetricDescriptor] {
        &self.metrics
    }

    /// Addresses in column order, as handed to the fetcher.
    pub fn addresses(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.address.clone()).collect()
    }

    /// Entries whose display format tag is not recognized.
    pub fn unknown_formats(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.metrics
            .iter()
            .filter(|m| matches!(m.format, DisplayFormat::Unknown(_)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn catalog_file(extension: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn tags_parse_to_formats() {
        assert_eq!(DisplayFormat::from_tag("mark"), DisplayFormat::Mark);
        assert_eq!(DisplayFormat::from_tag("gauge"), DisplayFormat::Gauge);
        assert_eq!(DisplayFormat::from_tag("gaugef"), DisplayFormat::GaugeFloat);
        assert_eq!(DisplayFormat::from_tag("gaugef2"), DisplayFormat::GaugeFloatFixed(2));
        assert_eq!(DisplayFormat::from_tag("delta"), DisplayFormat::Delta);
        assert_eq!(DisplayFormat::from_tag("bps"), DisplayFormat::BitRate);
        assert_eq!(DisplayFormat::from_tag("pps"), DisplayFormat::PacketRate);
        assert_eq!(
            DisplayFormat::from_tag("kbps"),
            DisplayFormat::Unknown("kbps".into())
        );
        assert_eq!(
            DisplayFormat::from_tag("gaugefx"),
            DisplayFormat::Unknown("gaugefx".into())
        );
    }

    #[test]
    fn tag_renders_back_to_catalog_spelling() {
        for tag in ["mark", "gauge", "gaugef", "gaugef2", "delta", "bps", "pps", "weird"] {
            assert_eq!(DisplayFormat::from_tag(tag).tag(), tag);
        }
    }

    #[test]
    fn non_canonical_precision_is_unknown() {
        for tag in ["gaugef02", "gaugef+2", "gaugef18", "gaugef 2"] {
            let format = DisplayFormat::from_tag(tag);
            assert_eq!(format, DisplayFormat::Unknown(tag.into()));
            assert_eq!(format.tag(), tag);
        }
        assert_eq!(DisplayFormat::from_tag("gaugef0"), DisplayFormat::GaugeFloatFixed(0));
        assert_eq!(DisplayFormat::from_tag("gaugef17"), DisplayFormat::GaugeFloatFixed(17));
    }

    #[test]
    fn delta_family_membership() {
        assert!(DisplayFormat::BitRate.is_delta_family());
        assert!(!DisplayFormat::Gauge.is_delta_family());
        assert!(!DisplayFormat::Mark.is_delta_family());
    }

    #[test]
    fn loads_json_catalog_in_order() {
        let file = catalog_file(
            ".json",
            r#"{"miblist": [
                {"description": "uptime", "disp": "gauge", "oid": "1.3.6.1.2.1.1.3.0"},
                {"description": "if1_in", "disp": "bps", "oid": "1.3.6.1.2.1.2.2.1.10.1"}
            ]}"#,
        );
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.as_slice()[0].label, "uptime");
        assert_eq!(catalog.as_slice()[1].format, DisplayFormat::BitRate);
        assert_eq!(
            catalog.addresses(),
            vec!["1.3.6.1.2.1.1.3.0", "1.3.6.1.2.1.2.2.1.10.1"]
        );
    }

    #[test]
    fn loads_yaml_catalog_with_unknown_format() {
        let file = catalog_file(
            ".yml",
            "miblist:\n  - description: cpu\n    disp: gaugef2\n    oid: 1.3.6.1.4.1.2021.10.1.3.1\n  - description: odd\n    disp: kbps\n    oid: 1.3.6.1.2.1.1.3.0\n",
        );
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.as_slice()[0].format, DisplayFormat::GaugeFloatFixed(2));
        let unknown: Vec<_> = catalog.unknown_formats().map(|m| m.label.as_str()).collect();
        assert_eq!(unknown, vec!["odd"]);
    }

    #[test]
    fn loads_toml_catalog() {
        let file = catalog_file(
            ".toml",
            "[[miblist]]\ndescription = \"errors\"\ndisp = \"delta\"\noid = \"1.3.6.1.2.1.2.2.1.14.1\"\n",
        );
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.as_slice()[0].format, DisplayFormat::Delta);
    }

    #[test]
    fn accepts_legacy_description_key() {
        let file = catalog_file(
            ".json",
            r#"{"miblist": [{"decription": "legacy", "disp": "pps", "oid": "1.3.6.1.2.1.2.2.1.11.1"}]}"#,
        );
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.as_slice()[0].label, "legacy");
    }

    #[test]
    fn rejects_unknown_extension_and_empty_list() {
        let file = catalog_file(".ini", "miblist=");
        assert!(matches!(
            Catalog::load(file.path()),
            Err(CatalogError::UnsupportedFormat(_))
        ));

        let file = catalog_file(".json", r#"{"miblist": []}"#);
        assert!(matches!(
            Catalog::load(file.path()),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            Catalog::load(Path::new("/nonexistent/mib.json")),
            Err(CatalogError::Read { .. })
        ));
    }
}
