//! File naming shared by the stores

use std::path::{Path, PathBuf};
use warden_core::persistence::{PersistenceError, PersistenceResult};

const ESCAPE: u8 = b'%';

/// `~/.warden/<leaf>`
pub(crate) fn default_dir(leaf: &str) -> PersistenceResult<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or(PersistenceError::PathUnavailable)?
        .join(".warden")
        .join(leaf))
}

/// Map a resource id onto a safe, reversible file stem
///
/// Ids are caller supplied. Every byte outside `[A-Za-z0-9._-]` becomes
/// `%XX`, so distinct ids never share a file.
pub(crate) fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            stem.push(char::from(byte));
        } else {
            stem.push(char::from(ESCAPE));
            stem.push_str(&hex::encode_upper([byte]));
        }
    }
    stem
}

/// Inverse of [`file_stem`]; `None` for names the stores did not write
pub(crate) fn id_from_stem(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let mut rest = stem.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == ESCAPE {
            let code = tail.get(..2)?;
            bytes.extend(hex::decode(code).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(first);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}

pub(crate) fn record_path(dir: &Path, id: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", file_stem(id), extension))
}
