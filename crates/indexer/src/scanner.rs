use crate::error::{IndexerError, Result};
use crate::extract::TextExtractor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds manual documents directly inside the manuals folder.
pub struct DocumentScanner {
    root: PathBuf,
}

impl DocumentScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Files the extractor supports, sorted by file name. Subfolders are not visited.
    pub fn scan(&self, extractor: &dyn TextExtractor) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(IndexerError::InvalidPath(self.root.display().to_string()));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if !extractor.supports(entry.path()) {
                        log::debug!("Skipping unsupported document {}", entry.path().display());
                        continue;
                    }
                    documents.push(entry.into_path());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        log::info!(
            "Found {} documents in {}",
            documents.len(),
            self.root.display()
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PlainTextExtractor;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn lists_supported_files_sorted_without_recursing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("scan.pdf"), "pdf").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let found = DocumentScanner::new(dir.path())
            .scan(&PlainTextExtractor)
            .unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn missing_folder_is_invalid_path() {
        let dir = TempDir::new().unwrap();
        let result = DocumentScanner::new(dir.path().join("nope")).scan(&PlainTextExtractor);
        assert!(matches!(result, Err(IndexerError::InvalidPath(_))));
    }
}
