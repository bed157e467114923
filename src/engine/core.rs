//! Core SelectEngine struct and constructors

use anyhow::Result;
use std::path::Path;

use crate::compiler::QueryParser;
use crate::data::{IndexParser, RecordIndex};

/// Holds a loaded record index and answers select statements against it
#[derive(Debug, Clone, Default)]
pub struct SelectEngine {
    pub(crate) index: RecordIndex,
    pub(crate) parser: QueryParser,
}

impl SelectEngine {
    pub fn new(index: RecordIndex) -> Self {
        Self { index, parser: QueryParser::new() }
    }

    /// Load the index from a JSON or gzipped JSON file
    pub fn from_path<P: AsRef<Path>>(index_path: P) -> Result<Self> {
        let index = IndexParser::new().parse_file(index_path)?;
        Ok(Self::new(index))
    }

    // Accessor methods
    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    pub fn num_series(&self) -> usize {
        self.index.num_series()
    }

    pub fn num_studies(&self) -> usize {
        self.index.num_studies()
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }
}
