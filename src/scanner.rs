// src/scanner.rs
use crate::error::SeederError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One collection directory found under the input root: the derived
/// collection name plus its eligible files in lexicographic order.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Walks the root path and returns one spec per direct sub-directory that
/// contains at least one eligible file. Files directly under the root are
/// ignored. Sub-directories are returned ordered by directory name, so a
/// numeric prefix (`1-users`, `2-posts`) orders the import.
pub fn scan_collections(
    root: &Path,
    extensions: &[String],
) -> Result<Vec<CollectionSpec>, SeederError> {
    if !root.is_dir() {
        return Err(SeederError::InvalidPath(root.to_path_buf()));
    }

    let entries =
        fs::read_dir(root).map_err(|_| SeederError::InvalidPath(root.to_path_buf()))?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| !file_name(path).starts_with('.'))
        .collect();
    dirs.sort();

    let mut collections = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let dir_name = file_name(&dir);
        let name = collection_name(&dir_name).to_string();
        let files = list_eligible_files(&dir, extensions)?;
        if files.is_empty() {
            debug!("skipping '{}': no eligible files", dir_name);
            continue;
        }
        debug!("collection '{}': {} file(s)", name, files.len());
        collections.push(CollectionSpec { name, dir, files });
    }

    Ok(collections)
}

fn list_eligible_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, SeederError> {
    let entries = fs::read_dir(dir).map_err(|_| SeederError::InvalidPath(dir.to_path_buf()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Strips a numeric ordering prefix from a directory name: `1-users`,
/// `02_posts`, `3.tags` and `4 comments` all map to the bare collection name.
/// A name that is only digits is kept as-is.
fn collection_name(dir_name: &str) -> &str {
    let digits = dir_name.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return dir_name;
    }
    let rest = &dir_name[digits..];
    let mut chars = rest.chars();
    match chars.next() {
        Some('-') | Some('_') | Some('.') | Some(' ') => {
            let stripped = chars.as_str();
            if stripped.is_empty() {
                dir_name
            } else {
                stripped
            }
        }
        _ => dir_name,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
