use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;

use crate::data::index::RecordIndex;

/// Loader for record indexes stored as JSON or gzipped JSON.
///
/// The expected layout is the one the scanner writes:
/// `{ "<StudyInstanceUID>": { "<SeriesInstanceUID>": { "Modality": "MR", ... } } }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexParser;

impl IndexParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an index file (regular or gzipped)
    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> Result<RecordIndex> {
        let path = file_path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open index file {}", path.display()))?;

        // Gzip is recognised by its magic bytes, not by the file name
        let mut reader = BufReader::new(file);
        let mut magic = [0u8; 2];
        let gzipped = reader.read_exact(&mut magic).is_ok() && magic == [0x1f, 0x8b];

        let file = File::open(path)?;
        let index = if gzipped {
            self.parse_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            self.parse_reader(BufReader::new(file))
        }
        .with_context(|| format!("Invalid index file {}", path.display()))?;

        log::info!(
            "Loaded {} series in {} studies from {}",
            index.num_series(),
            index.num_studies(),
            path.display()
        );
        Ok(index)
    }

    /// Parse an index from any reader
    pub fn parse_reader<R: Read>(&self, mut reader: BufReader<R>) -> Result<RecordIndex> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let index: RecordIndex = serde_json::from_str(&content)?;
        self.validate(&index);
        Ok(index)
    }

    /// Warn about series that will behave surprisingly in rules
    pub fn validate(&self, index: &RecordIndex) {
        for (study, series, record) in index.iter_series() {
            if record.ancestor().is_empty() {
                log::warn!(
                    "Study '{}' series '{}' has neither PatientID nor PatientName, patient level grouping will merge it with other anonymous series",
                    study, series
                );
            }
            if record.image_count <= 0 {
                log::debug!("Study '{}' series '{}' reports {} images", study, series, record.image_count);
            }
        }
    }
}
