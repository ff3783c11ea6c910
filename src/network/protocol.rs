//! Line protocol
//!
//! One command per line, fields separated by single spaces:
//!
//! ```text
//! VERB key [value]\n
//! ```
//!
//! Replies are a single line: `Ok`, the value, `<VERB> Not found`, or an
//! error message.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Verb, key and value
pub const MAX_FIELDS: usize = 3;

/// Split a command line into at most [`MAX_FIELDS`] fields.
///
/// The trailing `\n` (or `\r\n`) is dropped. The value is everything after
/// the second space, so it may itself contain spaces.
pub fn tokenize(line: &[u8]) -> Vec<&[u8]> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return Vec::new();
    }
    line.splitn(MAX_FIELDS, |&b| b == b' ').collect()
}

/// Result of reading one line
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, newline stripped by [`tokenize`]
    Line(Vec<u8>),
    /// The line exceeded the limit and was discarded up to its newline
    TooLong,
    /// Peer closed the connection
    Eof,
}

/// Read one newline-terminated line of at most `max_len` bytes.
///
/// A final unterminated line before EOF is returned as a line.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut overflow = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match (overflow, line.is_empty()) {
                (true, _) => Frame::TooLong,
                (false, true) => Frame::Eof,
                (false, false) => Frame::Line(line),
            });
        }

        let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..=i], true),
            None => (available, false),
        };
        let consumed = chunk.len();
        if !overflow {
            if line.len() + consumed > max_len {
                overflow = true;
                line.clear();
            } else {
                line.extend_from_slice(chunk);
            }
        }
        reader.consume(consumed);

        if done {
            return Ok(if overflow {
                Frame::TooLong
            } else {
                Frame::Line(line)
            });
        }
    }
}

/// Write a reply line
pub async fn write_reply<W>(writer: &mut W, reply: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(reply).await?;
    writer.flush().await
}
