//! Output lines: header, data rows and timeout rows.
//!
//! Lines are comma-joined without quoting. A timeout row has only two
//! fields whatever the catalog size; consumers must accept that.

use std::{
    fmt,
    io::{self, Write},
};

use chrono::NaiveDateTime;

use super::catalog::Catalog;

/// Timestamp layout of every row.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Single column written for a round whose poll failed.
pub const TIMEOUT_COLUMN: &str = "timeout";

/// The columns of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowColumns {
    /// One formatted value per catalog entry, in catalog order.
    Values(Vec<String>),
    /// The round failed; no per-metric values.
    Timeout,
}

/// One line of output, written once and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub timestamp: NaiveDateTime,
    pub columns: RowColumns,
}

impl OutputRow {
    pub fn values(timestamp: NaiveDateTime, columns: Vec<String>) -> Self {
        Self {
            timestamp,
            columns: RowColumns::Values(columns),
        }
    }

    pub fn timeout(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            columns: RowColumns::Timeout,
        }
    }

    /// Number of comma-separated fields, timestamp included.
    pub fn field_count(&self) -> usize {
        match &self.columns {
            RowColumns::Values(columns) => columns.len() + 1,
            RowColumns::Timeout => 2,
        }
    }
}

impl fmt::Display for OutputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format(TIMESTAMP_FORMAT))?;
        match &self.columns {
            RowColumns::Values(columns) => {
                for column in columns {
                    write!(f, ",{}", column)?;
                }
                Ok(())
            }
            RowColumns::Timeout => write!(f, ",{}", TIMEOUT_COLUMN),
        }
    }
}

/// `#time,<label>:<tag>,...` naming every column of the data rows.
pub fn header_line(catalog: &Catalog) -> String {
    let mut line = String::from("#time");
    for metric in catalog.iter() {
        line.push(',');
        line.push_str(&metric.label);
        line.push(':');
        line.push_str(&metric.format.tag());
    }
    line
}

/// Destination of complete output lines.
///
/// `write_line` is synchronous: a line is either written whole or not at
/// all with respect to task cancellation.
pub trait RowSink: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Writes each line followed by a newline and flushes immediately, so the
/// output can be tailed or piped without buffering delays.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> RowSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.writer.write_all(buf.as_bytes())?;
        self.writer.flush()
    }
}
