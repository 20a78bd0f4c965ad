//! Archive extraction boundary

use crate::filter::{single_file_pattern, DOCUMENT_EXCLUDE, DOCUMENT_INCLUDE};
use crate::Result;
use std::path::{Path, PathBuf};

/// Files to unpack from an ordered set of archives.
///
/// Archives later in `archives` overwrite same-path files from earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub archives: Vec<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub output: PathBuf,
}

impl ExtractRequest {
    pub fn new(archives: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            archives,
            include: Vec::new(),
            exclude: Vec::new(),
            output: output.into(),
        }
    }

    /// Every document the pipeline reads, skipping bulky asset trees
    pub fn documents(archives: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            include: DOCUMENT_INCLUDE.iter().map(|p| p.to_string()).collect(),
            exclude: DOCUMENT_EXCLUDE.iter().map(|p| p.to_string()).collect(),
            ..Self::new(archives, output)
        }
    }

    /// Exactly one relative path
    pub fn single_file(archives: Vec<PathBuf>, relative: &str, output: impl Into<PathBuf>) -> Self {
        Self {
            include: vec![single_file_pattern(relative)],
            ..Self::new(archives, output)
        }
    }
}

/// Unpacks archives into a directory
pub trait ArchiveExtractor {
    /// Check the extractor can run at all, before any work is started
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    fn extract(&self, request: &ExtractRequest) -> Result<()>;

    /// Unpack one relative path in isolation, returning where it landed if
    /// any of the archives contained it.
    fn extract_file(
        &self,
        archives: &[PathBuf],
        relative: &str,
        output: &Path,
    ) -> Result<Option<PathBuf>> {
        if archives.is_empty() {
            return Ok(None);
        }
        self.extract(&ExtractRequest::single_file(
            archives.to_vec(),
            relative,
            output,
        ))?;
        let path = output.join(relative);
        Ok(path.is_file().then_some(path))
    }
}

impl<T: ArchiveExtractor + ?Sized> ArchiveExtractor for Box<T> {
    fn preflight(&self) -> Result<()> {
        (**self).preflight()
    }

    fn extract(&self, request: &ExtractRequest) -> Result<()> {
        (**self).extract(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        requests: RefCell<Vec<ExtractRequest>>,
    }

    impl ArchiveExtractor for Recorder {
        fn extract(&self, request: &ExtractRequest) -> Result<()> {
            self.requests.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    #[test]
    fn test_extract_file_builds_anchored_request() {
        let recorder = Recorder::default();
        let found = recorder
            .extract_file(
                &[PathBuf::from("/g/01.cat")],
                "libraries/wares.xml",
                Path::new("/tmp/nowhere-x4"),
            )
            .unwrap();

        assert_eq!(found, None);
        let requests = recorder.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].include, vec![r"^libraries/wares\.xml$".to_string()]);
        assert!(requests[0].exclude.is_empty());
    }

    #[test]
    fn test_extract_file_without_archives_skips_extractor() {
        let recorder = Recorder::default();
        let found = recorder
            .extract_file(&[], "index/macros.xml", Path::new("/tmp"))
            .unwrap();
        assert_eq!(found, None);
        assert!(recorder.requests.borrow().is_empty());
    }

    #[test]
    fn test_documents_request_uses_default_filters() {
        let request = ExtractRequest::documents(vec![PathBuf::from("01.cat")], "out");
        assert_eq!(request.include.len(), DOCUMENT_INCLUDE.len());
        assert_eq!(request.exclude.len(), DOCUMENT_EXCLUDE.len());
        assert_eq!(request.output, PathBuf::from("out"));
    }
}
