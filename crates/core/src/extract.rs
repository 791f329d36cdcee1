//! Slide content extraction on top of a pluggable document loader.

use crate::{Element, Error, LoadMode, Result, SlideContentMap};
use std::path::Path;

/// Something that can turn a presentation file into ordered text elements.
pub trait DocumentLoader {
    /// Load every element of the file at `path`, in document order.
    fn load(&self, path: &Path, mode: LoadMode) -> Result<Vec<Element>>;
}

impl<L: DocumentLoader + ?Sized> DocumentLoader for &L {
    fn load(&self, path: &Path, mode: LoadMode) -> Result<Vec<Element>> {
        (**self).load(path, mode)
    }
}

/// Builds a page-indexed text map from whatever the loader reports.
#[derive(Debug, Clone)]
pub struct ContentExtractor<L> {
    loader: L,
    verbose: bool,
}

impl<L: DocumentLoader> ContentExtractor<L> {
    /// Create an extractor over the given loader.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            verbose: false,
        }
    }

    /// Log per-element progress at info level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Extract page-tagged text from the file at `path`.
    ///
    /// Elements without a page number are skipped. Text of elements that share
    /// a page is joined, each fragment prefixed with a newline.
    pub fn extract(&self, path: &Path, mode: LoadMode) -> Result<SlideContentMap> {
        if self.verbose {
            log::info!("Loading file: {}, mode: {}...", path.display(), mode);
        }

        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let elements = match self.loader.load(path, mode) {
            Ok(elements) => elements,
            Err(Error::NotFound(p)) => return Err(Error::NotFound(p)),
            Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_path_buf()));
            }
            Err(Error::Extraction(msg)) => return Err(Error::Extraction(msg)),
            Err(e) => return Err(Error::Extraction(e.to_string())),
        };

        if self.verbose {
            log::info!("Loaded {} elements.", elements.len());
        }

        let total = elements.len();
        let mut pages = SlideContentMap::new();
        for (idx, element) in elements.iter().enumerate() {
            match element.page_number {
                Some(page) if page > 0 => pages.append(page, &element.text),
                _ => {}
            }
            if self.verbose {
                log::debug!(
                    "Processed element {}/{}: Page {}",
                    idx + 1,
                    total,
                    element
                        .page_number
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
            }
        }

        if pages.is_empty() {
            return Err(Error::EmptyResult);
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementCategory;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct StubLoader(Vec<Element>);

    impl DocumentLoader for StubLoader {
        fn load(&self, _path: &Path, _mode: LoadMode) -> Result<Vec<Element>> {
            Ok(self.0.clone())
        }
    }

    struct FailingLoader;

    impl DocumentLoader for FailingLoader {
        fn load(&self, _path: &Path, _mode: LoadMode) -> Result<Vec<Element>> {
            Err(Error::ZipError("invalid Zip archive".to_string()))
        }
    }

    fn existing_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"placeholder").unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let extractor = ContentExtractor::new(StubLoader(Vec::new()));
        let err = extractor
            .extract(Path::new("/definitely/not/here.pptx"), LoadMode::Elements)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_loader_failure_is_extraction_error() {
        let file = existing_file();
        let extractor = ContentExtractor::new(FailingLoader);
        let err = extractor.extract(file.path(), LoadMode::Elements).unwrap_err();
        match err {
            Error::Extraction(msg) => assert!(msg.contains("invalid Zip archive")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_groups_by_page_and_skips_unpaged() {
        let file = existing_file();
        let extractor = ContentExtractor::new(StubLoader(vec![
            Element::on_page("Intro", 1, ElementCategory::Title),
            Element::unpaged("floating", ElementCategory::NarrativeText),
            Element::on_page("Welcome", 1, ElementCategory::NarrativeText),
            Element::on_page("Agenda", 2, ElementCategory::Title),
            Element::on_page("ignored", 0, ElementCategory::NarrativeText),
        ]));

        let pages = extractor.extract(file.path(), LoadMode::Elements).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.get(1), Some("\nIntro\nWelcome"));
        assert_eq!(pages.get(2), Some("\nAgenda"));
    }

    #[test]
    fn test_no_paged_elements_is_empty_result() {
        let file = existing_file();
        let extractor = ContentExtractor::new(StubLoader(vec![Element::unpaged(
            "everything",
            ElementCategory::Composite,
        )]))
        .with_verbose(true);
        let err = extractor.extract(file.path(), LoadMode::Single).unwrap_err();
        assert!(matches!(err, Error::EmptyResult));
    }
}
