//! # Line protocol encode/decode
//!
//! Purpose: encode whitespace-tokenized commands and read `\n`-framed
//! response lines for the plain-text line protocol, mirroring
//! `lunarkv_server::dispatcher`'s request/response shape.
//!
//! ## Design Principles
//! 1. **Binary-safe lines**: a line is any byte sequence without an
//!    embedded `\n`; the trailing `\n` is stripped, never the content.
//! 2. **Buffer reuse**: caller provides the line buffer across calls.
//! 3. **Fail fast**: a read returning zero bytes is treated as EOF.

use std::io::BufRead;

use crate::client::{ClientError, ClientResult};

/// Placeholder the server sends for a missing value.
pub const NIL: &[u8] = b"(nil)";
/// Placeholder the server sends for an empty key/element set.
pub const EMPTY_LIST: &[u8] = b"(empty list)";

/// Encodes a command as space-joined tokens terminated by `\n`.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            out.push(b' ');
        }
        out.extend_from_slice(arg);
    }
    out.push(b'\n');
}

/// Reads one line into `buf`, stripping the trailing `\n` (and a `\r`
/// if present, for servers reachable over a CRLF-normalizing proxy).
pub fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(ClientError::Protocol);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(())
}

/// True when `line` is a `ERR <message>` response; returns the message.
pub fn as_error(line: &[u8]) -> Option<&[u8]> {
    line.strip_prefix(b"ERR ").or_else(|| line.strip_prefix(b"ERR"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encodes_tokens_space_joined() {
        let mut buf = Vec::new();
        encode_command(&[b"SET", b"k", b"v"], &mut buf);
        assert_eq!(&buf, b"SET k v\n");
    }

    #[test]
    fn reads_one_line_at_a_time() {
        let mut reader = Cursor::new(b"OK\nvalue\n".to_vec());
        let mut buf = Vec::new();
        read_line(&mut reader, &mut buf).unwrap();
        assert_eq!(buf, b"OK");
        read_line(&mut reader, &mut buf).unwrap();
        assert_eq!(buf, b"value");
    }

    #[test]
    fn detects_error_lines() {
        assert_eq!(as_error(b"ERR bad arity"), Some(&b"bad arity"[..]));
        assert_eq!(as_error(b"OK"), None);
    }
}
