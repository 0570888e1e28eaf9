//! # Snapshot codec
//!
//! A length-prefixed, binary-safe text snapshot of every string entry
//! in a [`ShardManager`]. Supersedes `original_source/src/saved.cpp`'s
//! simple `key\nvalue\n` format (which cannot round-trip values
//! containing embedded newlines); this format instead prefixes every
//! field with its ASCII-decimal byte length.
//!
//! List entries and TTLs are not written in this version — they are
//! silently skipped on save rather than erroring or flattening a list
//! to a string.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use lunarkv_common::{HkvError, HkvResult};

use crate::shard::ShardManager;

const HEADER: &[u8] = b"LUNAR_CACHE_V1\n";

/// Writes every string entry currently in `manager` to `path`.
///
/// List entries are skipped; the written header lets [`load`] reject
/// files from an incompatible format up front.
pub fn save(manager: &ShardManager, path: &Path) -> HkvResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(HEADER)?;

    for key in manager.keys() {
        let Some(value) = manager.get(&key)? else {
            continue;
        };
        write_record(&mut writer, &key, &value)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_record(writer: &mut impl Write, key: &[u8], value: &[u8]) -> io::Result<()> {
    writer.write_all(key.len().to_string().as_bytes())?;
    writer.write_all(b"\n")?;
    writer.write_all(key)?;
    writer.write_all(b"\n")?;
    writer.write_all(value.len().to_string().as_bytes())?;
    writer.write_all(b"\n")?;
    writer.write_all(value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Loads a snapshot file, `set`-ing every (key, value) pair it contains
/// into `manager` with no TTL. The engine is left holding whatever was
/// loaded before a failure if the file is truncated mid-record.
pub fn load(manager: &ShardManager, path: &Path) -> HkvResult<usize> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut header = Vec::with_capacity(HEADER.len());
    (&mut reader)
        .take(HEADER.len() as u64)
        .read_to_end(&mut header)?;
    if header != HEADER {
        return Err(HkvError::BadFormat("missing LUNAR_CACHE_V1 header".into()));
    }

    let mut loaded = 0;
    loop {
        let key = match read_length_prefixed(&mut reader, true)? {
            Some(bytes) => bytes,
            None => break, // clean EOF at a record boundary
        };
        let value = read_length_prefixed(&mut reader, false)?
            .ok_or(HkvError::Truncated)?;

        manager.set(key, value, 0)?;
        loaded += 1;
    }

    Ok(loaded)
}

/// Reads one `<len-ascii>\n<bytes>\n` field.
///
/// Returns `Ok(None)` only when `at_record_boundary` is true and the
/// stream is at a clean EOF (no partial length line read at all).
fn read_length_prefixed(reader: &mut impl BufRead, at_record_boundary: bool) -> HkvResult<Option<Vec<u8>>> {
    let mut len_line = Vec::new();
    let bytes_read = reader.read_until(b'\n', &mut len_line)?;

    if bytes_read == 0 {
        return if at_record_boundary {
            Ok(None)
        } else {
            Err(HkvError::Truncated)
        };
    }
    if len_line.last() != Some(&b'\n') {
        return Err(HkvError::Truncated);
    }
    len_line.pop();

    let len_str = std::str::from_utf8(&len_line)
        .map_err(|_| HkvError::BadFormat("non-ascii length field".into()))?;
    let len: usize = len_str
        .parse()
        .map_err(|_| HkvError::BadFormat(format!("invalid length field {len_str:?}")))?;

    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).map_err(|_| HkvError::Truncated)?;

    let mut newline = [0u8; 1];
    reader.read_exact(&mut newline).map_err(|_| HkvError::Truncated)?;
    if newline[0] != b'\n' {
        return Err(HkvError::Truncated);
    }

    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> std::path::PathBuf {
        temp_dir().join(format!("lunarkv-snapshot-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn round_trips_string_entries() {
        let manager = ShardManager::new(2, 1000).unwrap();
        manager.set(b"foo".to_vec(), b"bar".to_vec(), 0).unwrap();
        manager.set(b"baz".to_vec(), b"qux\nwith\nnewlines".to_vec(), 0).unwrap();

        let path = temp_path("roundtrip");
        save(&manager, &path).unwrap();

        let restored = ShardManager::new(2, 1000).unwrap();
        let count = load(&restored, &path).unwrap();
        assert_eq!(count, 2);
        assert_eq!(restored.get(b"foo").unwrap().unwrap(), b"bar".to_vec());
        assert_eq!(
            restored.get(b"baz").unwrap().unwrap(),
            b"qux\nwith\nnewlines".to_vec()
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_bad_header() {
        let path = temp_path("bad-header");
        std::fs::write(&path, b"NOT_A_SNAPSHOT\n").unwrap();

        let manager = ShardManager::new(1, 100).unwrap();
        assert!(matches!(load(&manager, &path), Err(HkvError::BadFormat(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_truncated_record() {
        let path = temp_path("truncated");
        let mut contents = Vec::new();
        contents.extend_from_slice(HEADER);
        contents.extend_from_slice(b"3\nfoo\n5\nshort");
        std::fs::write(&path, &contents).unwrap();

        let manager = ShardManager::new(1, 100).unwrap();
        assert!(matches!(load(&manager, &path), Err(HkvError::Truncated)));

        let _ = std::fs::remove_file(&path);
    }
}
