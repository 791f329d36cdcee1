//! Domain types for representing extracted presentation content.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The format of the source presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        None
    }
}

/// How the document loader splits a presentation into elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadMode {
    /// One element holding the whole deck, without page numbers.
    Single,
    /// One element per text-bearing shape, tagged with its slide number.
    #[default]
    Elements,
    /// One element per slide.
    Paged,
}

impl FromStr for LoadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "elements" => Ok(Self::Elements),
            "paged" => Ok(Self::Paged),
            other => Err(Error::InvalidInput(format!(
                "unknown load mode '{}', expected single, elements or paged",
                other
            ))),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::Elements => "elements",
            Self::Paged => "paged",
        };
        f.write_str(name)
    }
}

/// Rough kind of an extracted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementCategory {
    /// Text from a title placeholder.
    Title,
    /// Body text from any other shape.
    NarrativeText,
    /// Text from table cells.
    Table,
    /// Several shapes merged together (paged and single modes).
    Composite,
}

/// A unit of text reported by the document loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// The text content.
    pub text: String,

    /// 1-based slide number, when the loader knows it.
    pub page_number: Option<u32>,

    /// What kind of shape the text came from.
    pub category: ElementCategory,
}

impl Element {
    /// Create an element tagged with a slide number.
    pub fn on_page(text: impl Into<String>, page_number: u32, category: ElementCategory) -> Self {
        Self {
            text: text.into(),
            page_number: Some(page_number),
            category,
        }
    }

    /// Create an element with no page information.
    pub fn unpaged(text: impl Into<String>, category: ElementCategory) -> Self {
        Self {
            text: text.into(),
            page_number: None,
            category,
        }
    }
}

/// Page-number-indexed accumulation of extracted text.
///
/// Iteration is always in ascending page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContentMap {
    pages: BTreeMap<u32, String>,
}

impl SlideContentMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment to a page, prefixed with a newline.
    pub fn append(&mut self, page_number: u32, text: &str) {
        let entry = self.pages.entry(page_number).or_default();
        entry.push('\n');
        entry.push_str(text);
    }

    /// Text accumulated for a page.
    pub fn get(&self, page_number: u32) -> Option<&str> {
        self.pages.get(&page_number).map(String::as_str)
    }

    /// Number of pages with text.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page has text.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.pages.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl FromIterator<(u32, String)> for SlideContentMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_magic() {
        assert_eq!(
            PresentationFormat::from_magic(b"PK\x03\x04rest"),
            Some(PresentationFormat::Pptx)
        );
        assert_eq!(
            PresentationFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            None
        );
        assert_eq!(PresentationFormat::from_magic(b"PK"), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(PresentationFormat::from_extension("PPTX"), Some(PresentationFormat::Pptx));
        assert_eq!(PresentationFormat::from_extension("ppt"), None);
    }

    #[test]
    fn test_load_mode_parse() {
        assert_eq!("elements".parse::<LoadMode>().unwrap(), LoadMode::Elements);
        assert_eq!(" Paged ".parse::<LoadMode>().unwrap(), LoadMode::Paged);
        assert_eq!(LoadMode::Single.to_string(), "single");
        assert!(matches!("slides".parse::<LoadMode>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_append_accumulates_with_newline_prefix() {
        let mut map = SlideContentMap::new();
        map.append(2, "Title");
        map.append(2, "Body");
        assert_eq!(map.get(2), Some("\nTitle\nBody"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iter_is_ascending() {
        let mut map = SlideContentMap::new();
        map.append(3, "c");
        map.append(1, "a");
        map.append(2, "b");
        let pages: Vec<u32> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }
}
