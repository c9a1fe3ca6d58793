//! Atomic write-then-rename persistence.
//!
//! `save` never leaves a half-written file observable under the target
//! path: the serialized document is written to a sibling temporary file
//! first, then renamed into place. A rename across filesystems (e.g. the
//! target directory is a different mount than the temp file landed on)
//! falls back to a chunked stream copy. Every failure path unlinks the
//! temp file before returning.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PersistError;
use crate::serializer::serialize;
use crate::value::Value;

const COPY_CHUNK_SIZE: usize = 4096;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Serialize `value` and atomically replace the file at `path` with it.
pub fn save(path: &Path, value: &Value) -> Result<(), PersistError> {
    let _span = tracing::trace_span!("persist::save", path = %path.display()).entered();

    let body = serialize(value)?;
    let temp_path = temp_sibling_path(path);

    if let Err(source) = write_new_file(&temp_path, body.as_bytes()) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(PersistError::WriteTemp {
            path: temp_path,
            source,
        });
    }

    match std::fs::rename(&temp_path, path) {
        Ok(()) => {
            tracing::trace!("persist::save: renamed temp file into place");
            Ok(())
        }
        Err(rename_err) if is_cross_device(&rename_err) => {
            tracing::trace!("persist::save: rename failed cross-device, falling back to copy");
            let result = copy_then_unlink(&temp_path, path);
            if result.is_err() {
                let _ = std::fs::remove_file(&temp_path);
            }
            result
        }
        Err(source) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(PersistError::Rename {
                from: temp_path,
                to: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Load and parse the document at `path`.
///
/// A file that cannot be read at all (missing, permission denied, ...) and a
/// file that reads but fails to parse are both reported as
/// [`PersistError::Read`], but the underlying message distinguishes them —
/// see [`crate::parser::parse_file`]. Callers that want a missing file to
/// mean "start from an empty config" (`set`, `import`) handle that at the
/// call site rather than here.
pub fn load(path: &Path) -> Result<Value, PersistError> {
    crate::parser::parse_file(path)
        .map(|outcome| outcome.value)
        .map_err(|e| PersistError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })
}

fn temp_sibling_path(target: &Path) -> PathBuf {
    let pid = std::process::id();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jct".to_string());
    let temp_name = format!(".{file_name}.{pid}.{seq}.tmp");
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(temp_name),
        _ => PathBuf::from(temp_name),
    }
}

fn write_new_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Detect a cross-device rename failure without a `libc` dependency: check
/// the well-known `EXDEV` errno on Unix-like targets, falling back to a
/// substring match on the OS error message for anything else.
fn is_cross_device(err: &std::io::Error) -> bool {
    const EXDEV: i32 = 18;
    err.raw_os_error() == Some(EXDEV) || err.to_string().to_lowercase().contains("cross-device")
}

fn copy_then_unlink(from: &Path, to: &Path) -> Result<(), PersistError> {
    let mut src = std::fs::File::open(from).map_err(|source| PersistError::CopyFallback {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    let mut dest = std::fs::File::create(to).map_err(|source| PersistError::CopyFallback {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;

    let mut buf = [0u8; COPY_CHUNK_SIZE];
    loop {
        let n = src.read(&mut buf).map_err(|source| PersistError::CopyFallback {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        dest.write_all(&buf[..n]).map_err(|source| PersistError::CopyFallback {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;
    }
    dest.sync_all().map_err(|source| PersistError::CopyFallback {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;

    std::fs::remove_file(from).map_err(|source| PersistError::CopyFallback {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use tempfile::tempdir;

    fn v(src: &str) -> Value {
        parse(src.as_bytes()).unwrap().value
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let value = v(r#"{"a":1,"b":[true,null]}"#);
        save(&path, &value).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        save(&path, &v("{}")).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn save_replaces_existing_file_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        save(&path, &v(r#"{"old":1}"#)).unwrap();
        save(&path, &v(r#"{"new":2}"#)).unwrap();
        assert_eq!(load(&path).unwrap(), v(r#"{"new":2}"#));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_existing_empty_file_is_empty_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(load(&path).unwrap(), Value::Object(vec![]));
    }
}
