//! File-backed [`DocumentLoader`] for `.pptx` decks.

use crate::PptxParser;
use pptscript_core::{DocumentLoader, Element, Error, LoadMode, PresentationFormat, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Loads PPTX files from disk.
#[derive(Debug, Clone, Default)]
pub struct PptxLoader {
    parser: PptxParser,
}

impl PptxLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentLoader for PptxLoader {
    fn load(&self, path: &Path, mode: LoadMode) -> Result<Vec<Element>> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::IoError(e),
        })?;
        let mut reader = BufReader::new(file);

        // Read magic bytes to detect format
        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|e| Error::Extraction(format!("Failed to read file header: {}", e)))?;

        if PresentationFormat::from_magic(&magic).is_none() {
            return Err(Error::Extraction(format!(
                "Unsupported or unrecognized file format: {}",
                path.display()
            )));
        }

        reader.seek(SeekFrom::Start(0))?;
        let elements = self.parser.parse(reader, mode)?;
        log::debug!("Parsed {} elements from {}", elements.len(), path.display());
        Ok(elements)
    }
}
