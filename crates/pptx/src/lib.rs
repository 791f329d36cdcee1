//! PPTX (Office Open XML) document loader.
//!
//! Parses .pptx files, which are ZIP archives containing XML documents, into
//! page-tagged text elements.

pub mod loader;
pub mod parser;

pub use loader::PptxLoader;
pub use parser::PptxParser;
