/// Metric catalog loading and display format tags.
pub mod catalog;

/// Row rendering and output sinks.
pub mod emitter;

/// Transport seam: raw samples and poll failures.
pub mod fetch;

/// Gauge, delta and rate rendering with counter wraparound handling.
pub mod formatter;

/// Fixed-interval polling loop.
pub mod scheduler;

/// Per-metric counter baselines.
pub mod state;
