//! Turns one raw reading into one column of text.
//!
//! Gauges print the value itself. Delta-family formats print the increase
//! since the previous round, undoing at most one counter wrap, optionally
//! scaled to a per-second rate. The formatter is pure: the caller owns the
//! state and stores whatever comes back.

use thiserror::Error;

use super::{
    catalog::DisplayFormat,
    fetch::{CounterWidth, RawSample},
    state::CounterState,
};

/// Column text of a `mark` entry.
pub const MARK_GLYPH: &str = "#";
/// Column text when the target has no such object.
pub const ABSENT_PLACEHOLDER: &str = "-";
/// Column text of a delta-family metric without a baseline yet.
pub const NO_BASELINE_PLACEHOLDER: &str = "^";
/// Column text of an entry whose display format is not recognized.
pub const UNKNOWN_FORMAT_PLACEHOLDER: &str = "?";

/// Configuration defects found while formatting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown disp value '{0}'")]
    UnknownDisplayFormat(String),
}

/// Column text plus the state to remember for the next round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    pub state: CounterState,
}

impl Formatted {
    fn new(text: impl Into<String>, state: CounterState) -> Self {
        Self {
            text: text.into(),
            state,
        }
    }
}

/// Formats `sample` for `format`, given the metric's `prior` state and the
/// polling interval used to normalize rates.
///
/// Delta/rate values are rounded to the nearest integer, ties away from zero.
/// An interval of 0 is treated as 1 second.
pub fn format_value(
    format: &DisplayFormat,
    sample: &RawSample,
    prior: CounterState,
    interval_secs: u64,
) -> Result<Formatted, FormatError> {
    match format {
        DisplayFormat::Mark => Ok(Formatted::new(MARK_GLYPH, prior)),
        DisplayFormat::Unknown(tag) => Err(FormatError::UnknownDisplayFormat(tag.clone())),
        DisplayFormat::Gauge => Ok(gauge(sample, |r| r.integer.to_string())),
        DisplayFormat::GaugeFloat => Ok(gauge(sample, |r| natural_float(r.float))),
        DisplayFormat::GaugeFloatFixed(precision) => Ok(gauge(sample, |r| {
            format!("{:.*}", usize::from(*precision), r.float)
        })),
        DisplayFormat::Delta | DisplayFormat::BitRate | DisplayFormat::PacketRate => {
            Ok(delta(format, sample, prior, interval_secs))
        }
    }
}

fn absent() -> Formatted {
    Formatted::new(ABSENT_PLACEHOLDER, CounterState::EMPTY)
}

fn gauge(sample: &RawSample, render: impl FnOnce(&Reading) -> String) -> Formatted {
    match Reading::from_sample(sample) {
        Some(reading) => Formatted::new(render(&reading), CounterState::with_prior(reading.integer)),
        None => absent(),
    }
}

fn delta(
    format: &DisplayFormat,
    sample: &RawSample,
    prior: CounterState,
    interval_secs: u64,
) -> Formatted {
    let Some(reading) = Reading::from_sample(sample) else {
        return absent();
    };
    let seeded = CounterState::with_prior(reading.integer);
    let Some(previous) = prior.prior else {
        return Formatted::new(NO_BASELINE_PLACEHOLDER, seeded);
    };

    let delta = wrapping_delta(previous, reading.integer, reading.width);
    let (multiplier, divisor) = scale(format, interval_secs);
    Formatted::new(
        div_round(delta.saturating_mul(multiplier), divisor).to_string(),
        seeded,
    )
}

/// Distance travelled from `prior` to `current`.
///
/// A decrease is read as exactly one wrap of a counter of the given width.
/// Non-wrapping values (modulus 0) yield a negative delta instead.
pub fn wrapping_delta(prior: i128, current: i128, width: CounterWidth) -> i128 {
    if current >= prior {
        current.saturating_sub(prior)
    } else {
        current.saturating_add(width.wrap_modulus().saturating_sub(prior))
    }
}

fn scale(format: &DisplayFormat, interval_secs: u64) -> (i128, i128) {
    let interval = i128::from(interval_secs.max(1));
    match format {
        DisplayFormat::BitRate => (8, interval),
        DisplayFormat::PacketRate => (1, interval),
        _ => (1, 1),
    }
}

/// Integer division rounding half away from zero. `divisor` must be positive.
fn div_round(numerator: i128, divisor: i128) -> i128 {
    let quotient = numerator / divisor;
    let remainder = numerator % divisor;
    if remainder.abs() * 2 >= divisor {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

/// Float text that always shows a fractional part: `50.0`, `0.25`, `-3.5`.
///
/// Magnitudes from 1e16 up, or below 1e-4, switch to exponent form with a
/// signed two-digit exponent: `1.0e+16`, `2.5e-05`.
fn natural_float(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_finite() && magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return exponent_float(value);
    }

    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

fn exponent_float(value: f64) -> String {
    let text = format!("{:e}", value);
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    let sign = if exponent < 0 { '-' } else { '+' };
    if mantissa.contains('.') {
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        format!("{}.0e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Largest magnitude accepted from a textual reading, the Counter64 range.
const MAX_READING: f64 = u64::MAX as f64;

/// A present sample in the two shapes the formats need.
struct Reading {
    integer: i128,
    float: f64,
    width: CounterWidth,
}

impl Reading {
    fn from_sample(sample: &RawSample) -> Option<Self> {
        match *sample {
            RawSample::Absent => None,
            RawSample::Numeric { value, width } => Some(Self {
                integer: i128::from(value),
                float: value as f64,
                width,
            }),
            RawSample::Float(value) if value.is_finite() && value.abs() <= MAX_READING => {
                Some(Self {
                    integer: value.trunc() as i128,
                    float: value,
                    width: CounterWidth::Other,
                })
            }
            // Beyond any counter width: no meaningful delta or gauge.
            RawSample::Float(_) => None,
        }
    }
}
