// src/data.rs - Row assembly and CSV log
use crate::error::TrackerError;
use crate::landmarks::{Finger, Handedness, HAND_SCALARS};
use crate::tracking::{HandSlots, Presence};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ROW_WIDTH: usize = 2 + 2 * HAND_SCALARS;

/// Column names, in the exact order `OutputRow::fields` emits values.
pub fn header() -> Vec<String> {
    let mut columns = vec!["FrameNumber".to_string(), "HandsPresent".to_string()];
    for side in Handedness::ALL {
        for finger in Finger::ALL {
            for dim in ["X", "Y", "Z"] {
                columns.push(format!("{}{}{}", side, finger.name(), dim));
            }
        }
    }
    columns
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub frame_no: u64,
    pub presence: Presence,
    pub slots: HandSlots,
}

impl OutputRow {
    pub fn assemble(frame_no: u64, presence: Presence, slots: HandSlots) -> Self {
        Self {
            frame_no,
            presence,
            slots,
        }
    }

    /// Sides follow `Handedness::ALL`, same as `header`. Nulls are empty fields.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(ROW_WIDTH);
        fields.push(self.frame_no.to_string());
        fields.push(self.presence.to_string());
        for side in Handedness::ALL {
            match self.slots.get(side) {
                Some(values) => fields.extend(values.iter().map(|v| v.to_string())),
                None => fields.extend(std::iter::repeat(String::new()).take(HAND_SCALARS)),
            }
        }
        fields
    }
}

/// `./output_logs/coords_<date>_<time>.csv`, stamped with the extraction time.
pub fn default_output_path() -> PathBuf {
    let now = Local::now();
    PathBuf::from("output_logs").join(format!(
        "coords_{}_{}.csv",
        now.format("%Y-%m-%d"),
        now.format("%H-%M-%S%.6f")
    ))
}

pub struct CsvSink {
    path: PathBuf,
    writer: Writer<File>,
    width: usize,
    rows_written: u64,
}

impl CsvSink {
    /// Create (truncating) the log and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }

        let file = File::create(&path)
            .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        let columns = header();
        writer.write_record(&columns).map_err(TrackerError::Sink)?;
        writer.flush().map_err(|e| TrackerError::Sink(e.into()))?;

        debug!("Opened CSV log {} ({} columns)", path.display(), columns.len());

        Ok(Self {
            path,
            writer,
            width: columns.len(),
            rows_written: 0,
        })
    }

    pub fn append(&mut self, row: &OutputRow) -> Result<(), TrackerError> {
        let fields = row.fields();
        if fields.len() != self.width {
            return Err(TrackerError::Schema {
                expected: self.width,
                actual: fields.len(),
            });
        }

        self.writer.write_record(&fields)?;
        self.writer.flush().map_err(|e| TrackerError::Sink(e.into()))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
