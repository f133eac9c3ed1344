//! File cache and include path resolution

use std::fs::File;
use std::io::{Error, Read};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use hashbrown::HashMap;

use crate::error::*;

/// An immutable source file. The cache hands these out behind `Rc` so that
/// tokenizer state and emitted tokens can outlive a cache lookup.
#[derive(Debug)]
pub struct SourceFile {
    /// Path the file was loaded from (empty for virtual files)
    pub path: PathBuf,
    /// Interned display name used in source positions
    pub name: Rc<str>,
    pub contents: Vec<u8>,
}

impl SourceFile {
    /// Creates a file that exists only in memory, for command-line macro
    /// definitions, token pasting and tests.
    pub fn virtual_file(name: &str, contents: Vec<u8>) -> Rc<SourceFile> {
        Rc::new(SourceFile {
            path: PathBuf::new(),
            name: Rc::from(name),
            contents,
        })
    }
}

/// Opaque reference into the file cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle(usize);

/// Owns the contents of every file touched during preprocessing, keyed by
/// absolute path. Files are loaded on first reference and stay loaded until
/// the end of the run.
#[derive(Debug, Default)]
pub struct FileCache {
    files: Vec<Rc<SourceFile>>,
    by_path: HashMap<PathBuf, FileHandle>,
}

impl FileCache {
    pub fn new() -> FileCache {
        FileCache {
            files: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<FileHandle, Error> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if let Some(&handle) = self.by_path.get(&key) {
            return Ok(handle);
        }

        let mut contents = Vec::new();
        File::open(path)
            .prepend_error(format!("Failed to open \"{}\":", path.display()))?
            .read_to_end(&mut contents)
            .prepend_error(format!("Failed to read \"{}\":", path.display()))?;

        if contents.starts_with(&[0xef, 0xbb, 0xbf]) {
            contents.drain(..3);
        }

        let handle = FileHandle(self.files.len());
        self.files.push(Rc::new(SourceFile {
            name: Rc::from(key.to_string_lossy().as_ref()),
            path: key.clone(),
            contents,
        }));
        self.by_path.insert(key, handle);

        Ok(handle)
    }

    pub fn file(&self, handle: FileHandle) -> Rc<SourceFile> {
        self.files[handle.0].clone()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn canonicalize(path: PathBuf) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            },
            Component::CurDir => {},
            _ => {
                result.push(component);
            }
        }
    }
    result
}

/// Resolves an include path. Quote-form includes are first tried relative to
/// the including file, then against the search list; angle-form includes
/// only consult the search list.
pub fn resolve_include(name: &str, quoted: bool, current: Option<&Path>, search_paths: &[PathBuf]) -> Option<PathBuf> {
    if quoted {
        if let Some(origin) = current {
            if let Some(dir) = origin.parent() {
                let candidate = canonicalize(dir.join(name));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    for dir in search_paths {
        let candidate = canonicalize(dir.join(name));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}
