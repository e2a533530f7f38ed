//! Document loading for the GTM index.
//!
//! Walks the articles directory, keeps files matching the include globs,
//! and turns each into a [`Document`] identified by its file name. PDFs
//! go through `pdf-extract`; everything else is read as UTF-8 text. A file
//! that cannot be read is skipped with a warning; it never aborts the scan.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use memchat_core::models::Document;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

/// A candidate file found under the articles directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name, used as the chunk source id.
    pub source_id: String,
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub modified: i64,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed for {path}: {message}")]
    Pdf { path: String, message: String },
}

/// List files under `root` matching `include_globs`, sorted by path.
///
/// A missing root is not an error: there is simply nothing to index.
pub fn scan_articles(root: &Path, include_globs: &[String]) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        tracing::warn!("articles directory {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !include_set.is_match(relative) {
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let modified = metadata
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        files.push(SourceFile {
            path: path.to_path_buf(),
            source_id: entry.file_name().to_string_lossy().to_string(),
            size: metadata.len(),
            modified,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

pub fn load_document(file: &SourceFile) -> std::result::Result<Document, LoadError> {
    let display = file.path.display().to_string();
    let bytes = std::fs::read(&file.path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;

    let is_pdf = file
        .path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let text = if is_pdf {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| LoadError::Pdf {
            path: display,
            message: e.to_string(),
        })?
    } else {
        String::from_utf8(bytes).map_err(|e| LoadError::Io {
            path: display,
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?
    };

    Ok(Document::new(file.source_id.clone(), text))
}

/// Load every file, returning the documents and `(source_id, reason)` for
/// each file that was skipped.
pub fn load_documents(files: &[SourceFile]) -> (Vec<Document>, Vec<(String, String)>) {
    let mut docs = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for file in files {
        match load_document(file) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::warn!(error = %e, "skipping document");
                skipped.push((file.source_id.clone(), e.to_string()));
            }
        }
    }
    (docs, skipped)
}

/// Digest of the file listing plus `settings`; changes whenever a file is
/// added, removed, resized or touched, or the settings differ.
pub fn fingerprint(files: &[SourceFile], settings: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(settings.as_bytes());
    for file in files {
        hasher.update(b"\0");
        hasher.update(file.path.to_string_lossy().as_bytes());
        hasher.update(file.size.to_le_bytes());
        hasher.update(file.modified.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn globs() -> Vec<String> {
        vec!["**/*.pdf".into(), "**/*.txt".into(), "**/*.md".into()]
    }

    #[test]
    fn missing_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let files = scan_articles(&tmp.path().join("nope"), &globs()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn scans_matching_files_by_file_name() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("nested").join("b.md"), "beta").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();

        let files = scan_articles(root, &globs()).unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.md"]);

        let (docs, skipped) = load_documents(&files);
        assert!(skipped.is_empty());
        assert_eq!(docs[1], Document::new("b.md", "beta"));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("good.txt"), "fine").unwrap();
        fs::write(root.join("broken.pdf"), b"not really a pdf").unwrap();
        fs::write(root.join("latin1.txt"), [0xff, 0xfe, 0x41]).unwrap();

        let files = scan_articles(root, &globs()).unwrap();
        let (docs, skipped) = load_documents(&files);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "good.txt");
        let skipped_ids: Vec<&str> = skipped.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(skipped_ids, vec!["broken.pdf", "latin1.txt"]);
    }

    #[test]
    fn fingerprint_tracks_listing_and_settings() {
        let file = SourceFile {
            path: PathBuf::from("/m/a.txt"),
            source_id: "a.txt".into(),
            size: 10,
            modified: 100,
        };
        let base = fingerprint(&[file.clone()], "model=x");
        assert_eq!(base, fingerprint(&[file.clone()], "model=x"));
        assert_ne!(base, fingerprint(&[file.clone()], "model=y"));

        let touched = SourceFile {
            modified: 101,
            ..file.clone()
        };
        assert_ne!(base, fingerprint(&[touched], "model=x"));
        assert_ne!(base, fingerprint(&[], "model=x"));
    }
}
