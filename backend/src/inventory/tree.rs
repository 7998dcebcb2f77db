//! # Directory Tree
//!
//! Enumerates products and their candidate documents. Every immediate
//! subdirectory of the scan root is one product; its whole nested tree is
//! searched for PDF files. Files lying directly in the root belong to no
//! product and are ignored.
//!
//! Enumeration is sorted by file name at every level so that "first
//! encountered" is stable between runs over the same tree. Only a root that
//! cannot be read aborts the scan; unreadable entries further down are logged
//! and skipped.

use super::error::ScanError;
use log::warn;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// One product folder directly under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDir {
    pub name: String,
    pub path: PathBuf,
    pub created_at: SystemTime,
}

/// A PDF found somewhere below a product folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub modified_at: SystemTime,
}

/// File-system access used by the scan driver.
///
/// Implementations must be safe to call from several worker threads at once.
pub trait DirectoryTree: Send + Sync {
    /// Lists the products under `root`, sorted by name.
    fn products(&self, root: &Path) -> Result<Vec<ProductDir>, ScanError>;

    /// Lists the PDF files of one product in enumeration order.
    fn files(&self, product: &ProductDir) -> Vec<FileEntry>;
}

/// Only PDF documents are candidates.
pub fn is_pdf(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".pdf")
}

/// [`DirectoryTree`] over the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectoryTree;

impl FsDirectoryTree {
    fn check_root(root: &Path) -> Result<(), ScanError> {
        let display = root.display().to_string();
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::RootNotDirectory(display)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ScanError::RootNotFound(display)),
            Err(source) => Err(ScanError::RootUnreadable {
                path: display,
                source,
            }),
        }
    }

    fn created_at(entry: &DirEntry) -> SystemTime {
        let created = entry
            .metadata()
            .map_err(io::Error::from)
            .and_then(|meta| meta.created().or_else(|_| meta.modified()));
        match created {
            Ok(time) => time,
            Err(e) => {
                warn!(
                    "No timestamp for product folder {}: {}",
                    entry.path().display(),
                    e
                );
                SystemTime::UNIX_EPOCH
            }
        }
    }
}

impl DirectoryTree for FsDirectoryTree {
    fn products(&self, root: &Path) -> Result<Vec<ProductDir>, ScanError> {
        Self::check_root(root)?;

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut products = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(ScanError::RootUnreadable {
                        path: root.display().to_string(),
                        source: io::Error::from(e),
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            products.push(ProductDir {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_path_buf(),
                created_at: Self::created_at(&entry),
            });
        }
        Ok(products)
    }

    fn files(&self, product: &ProductDir) -> Vec<FileEntry> {
        let walker = WalkDir::new(&product.path)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", product.name, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_pdf(&file_name) {
                continue;
            }
            let modified = entry
                .metadata()
                .map_err(io::Error::from)
                .and_then(|meta| meta.modified());
            match modified {
                Ok(modified_at) => files.push(FileEntry {
                    file_name,
                    path: entry.path().to_path_buf(),
                    modified_at,
                }),
                Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(b"%PDF-1.4").unwrap();
    }

    #[test]
    fn products_are_immediate_subdirectories_sorted_by_name() {
        let root = TempDir::new().unwrap();
        create_test_file(root.path(), "zeta/ISO.pdf");
        create_test_file(root.path(), "alpha/GMP.pdf");
        create_test_file(root.path(), "alpha/nested/deeper/MSDS.pdf");
        create_test_file(root.path(), "loose_in_root.pdf");

        let products = FsDirectoryTree.products(root.path()).unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn files_include_nested_pdfs_only() {
        let root = TempDir::new().unwrap();
        create_test_file(root.path(), "alpha/GMP.pdf");
        create_test_file(root.path(), "alpha/notes.txt");
        create_test_file(root.path(), "alpha/scans/ISO_2023.PDF");
        create_test_file(root.path(), "alpha/scans/old/MSDS.Pdf");

        let products = FsDirectoryTree.products(root.path()).unwrap();
        let files = FsDirectoryTree.files(&products[0]);
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["GMP.pdf", "ISO_2023.PDF", "MSDS.Pdf"]);
    }

    #[test]
    fn empty_product_has_no_files() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("empty")).unwrap();

        let products = FsDirectoryTree.products(root.path()).unwrap();
        assert_eq!(products.len(), 1);
        assert!(FsDirectoryTree.files(&products[0]).is_empty());
    }

    #[test]
    fn missing_root_is_fatal() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("not-there");
        assert!(matches!(
            FsDirectoryTree.products(&missing),
            Err(ScanError::RootNotFound(_))
        ));
    }

    #[test]
    fn file_root_is_fatal() {
        let root = TempDir::new().unwrap();
        create_test_file(root.path(), "ISO.pdf");
        assert!(matches!(
            FsDirectoryTree.products(&root.path().join("ISO.pdf")),
            Err(ScanError::RootNotDirectory(_))
        ));
    }

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf("a.pdf"));
        assert!(is_pdf("a.PDF"));
        assert!(!is_pdf("a.pdf.bak"));
        assert!(!is_pdf("pdf"));
    }
}
