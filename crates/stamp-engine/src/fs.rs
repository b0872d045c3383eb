//! # Filesystem Collaborators
//!
//! Discovery of governed documents, safe loading, and write-back.
//!
//! Loading never fails with an error: every problem (missing path,
//! directory, binary content, invalid UTF-8) is returned as a message in
//! [`LoadedDocument::errors`] so the classifier can record it as a fatal
//! finding for that document alone.

use std::path::{Path, PathBuf};

use stamp_policy::PolicyConfig;

use crate::collaborators::{DocumentLoader, DocumentWriter, LoadedDocument};
use crate::error::EngineError;

/// Reads documents from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, path: &Path) -> LoadedDocument {
        let shown = path.display();
        if !path.exists() {
            return LoadedDocument::failed(format!("File not found: {shown}"));
        }
        if path.is_dir() {
            return LoadedDocument::failed(format!("Path is a directory, not a file: {shown}"));
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => return LoadedDocument::failed(format!("Error reading file: {shown} ({e})")),
        };
        if bytes.contains(&0) {
            return LoadedDocument::failed(format!("Binary file detected and rejected: {shown}"));
        }
        let Ok(text) = String::from_utf8(bytes) else {
            return LoadedDocument::failed(format!("File is not UTF-8 encoded: {shown}"));
        };

        LoadedDocument::ok(normalize_newlines(&text))
    }
}

/// `\r\n` and lone `\r` become `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Writes documents to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl DocumentWriter for FsWriter {
    fn write(&self, path: &Path, content: &str, output_dir: Option<&Path>) -> Result<PathBuf, EngineError> {
        let target = match output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
                let name = path
                    .file_name()
                    .ok_or_else(|| EngineError::io(path, std::io::ErrorKind::InvalidInput.into()))?;
                dir.join(name)
            }
            None => path.to_path_buf(),
        };
        std::fs::write(&target, content).map_err(|e| EngineError::io(&target, e))?;
        tracing::debug!(path = %target.display(), bytes = content.len(), "wrote document");
        Ok(target)
    }
}

/// Expand `roots` into a sorted, de-duplicated list of governed documents.
///
/// A root that is a file is taken as given, whatever its suffix.
/// Directories are walked recursively; subdirectories named in
/// `config.excluded_dirs` are skipped and only files with a governed suffix
/// are kept.
///
/// # Errors
///
/// `EngineError::MissingRoot` if a root does not exist, `EngineError::Io`
/// if a directory cannot be listed.
pub fn discover(roots: &[PathBuf], config: &PolicyConfig) -> Result<Vec<PathBuf>, EngineError> {
    let mut found = Vec::new();
    for root in roots {
        if root.is_file() {
            found.push(root.clone());
        } else if root.is_dir() {
            walk(root, config, &mut found)?;
        } else {
            return Err(EngineError::MissingRoot(root.display().to_string()));
        }
    }
    found.sort();
    found.dedup();
    tracing::debug!(roots = roots.len(), documents = found.len(), "discovered documents");
    Ok(found)
}

fn walk(dir: &Path, config: &PolicyConfig, found: &mut Vec<PathBuf>) -> Result<(), EngineError> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| EngineError::io(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::io(&current, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_dir() {
                if !config.is_excluded_dir(&name) {
                    pending.push(path);
                }
            } else if config.is_governed(&name) {
                found.push(path);
            }
        }
    }
    Ok(())
}
