//! Output writers for split and cleaned events.

use crate::events::{JsonEvent, JsonEvents};
use crate::{Error, Result};
use hive_core::hit::{HitSeries, HitSeriesSeries};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Event schema, one entry per (sub-)event.
    Json,
    /// One row per hit.
    Csv,
}

impl OutputFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for anything but `.json` or `.csv`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(Error::InvalidFormat(format!(
                "cannot infer output format of {}; use .json or .csv",
                path.display()
            ))),
        }
    }
}

/// Writer for split and cleaned events.
///
/// CSV rows are streamed; JSON entries are collected and written by
/// [`SubEventWriter::finish`].
pub struct SubEventWriter {
    writer: BufWriter<File>,
    format: OutputFormat,
    pending: JsonEvents,
    rows: usize,
}

impl SubEventWriter {
    /// Creates a writer, choosing the format from the extension.
    ///
    /// # Errors
    /// Returns an error for an unknown extension or if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = OutputFormat::from_path(path)?;
        Self::create_with_format(path, format)
    }

    /// Creates a writer with an explicit format.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create_with_format<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        if format == OutputFormat::Csv {
            writeln!(writer, "event,sub_event,string,module,time,charge,flags")?;
        }
        Ok(Self {
            writer,
            format,
            pending: JsonEvents::default(),
            rows: 0,
        })
    }

    /// The output format.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Hits written so far.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Writes the sub-events of one event.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_split(&mut self, event: u64, sub_events: &HitSeriesSeries) -> Result<()> {
        for (index, hits) in sub_events.iter().enumerate() {
            self.write_series(event, Some(index), hits)?;
        }
        Ok(())
    }

    /// Writes the cleaned hits of one event.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_cleaned(&mut self, event: u64, hits: &HitSeries) -> Result<()> {
        self.write_series(event, None, hits)
    }

    fn write_series(&mut self, event: u64, sub_event: Option<usize>, hits: &HitSeries) -> Result<()> {
        match self.format {
            OutputFormat::Csv => {
                let sub_event = sub_event.map(|s| s.to_string()).unwrap_or_default();
                for hit in hits {
                    let key = hit.sensor();
                    writeln!(
                        self.writer,
                        "{},{},{},{},{},{},{}",
                        event,
                        sub_event,
                        key.string,
                        key.module,
                        hit.time(),
                        hit.charge(),
                        hit.flags()
                    )?;
                }
            }
            OutputFormat::Json => {
                self.pending
                    .events
                    .push(JsonEvent::from_hits(event, sub_event, hits));
            }
        }
        self.rows += hits.len();
        Ok(())
    }

    /// Writes pending JSON and flushes the file.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn finish(mut self) -> Result<()> {
        if self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, &self.pending)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
