use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Debug)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Chunks(err) => Display::fmt(err, f),
            Error::InvalidPayload => f.write_str("invalid event stream payload"),
        }
    }
}

/// Reads the `data` of server-sent events from a chunk stream.
///
/// Only the subset chat-completion servers use is supported: `data` fields
/// (joined by `\n` when an event has several), comment lines, and other
/// fields which are skipped. Both `\n` and `\r\n` line endings are accepted.
pub struct Sse {
    buf: String,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            chunks,
            exhausted: false,
        }
    }

    /// Returns the data of the next event, or `None` at the end of stream.
    ///
    /// A trailing event without its blank line is dropped.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(data) = self.take_event()? {
                return Ok(Some(data));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => {
                    let s = str::from_utf8(&bytes)
                        .map_err(|_| Error::InvalidPayload)?;
                    self.buf.push_str(&s.replace("\r\n", "\n"));
                }
                None => self.exhausted = true,
            }
        }
    }

    fn take_event(&mut self) -> Result<Option<String>, Error> {
        // Events without data (only comments, say) are skipped here rather
        // than surfaced as empty strings.
        while let Some(end) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..end + 2).collect();
            let mut data: Option<String> = None;
            for line in block.lines().filter(|l| !l.is_empty()) {
                if line.starts_with(':') {
                    continue;
                }
                let Some((field, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                if field != "data" {
                    trace!("skipping sse field: {field}");
                    continue;
                }
                let value = value.strip_prefix(' ').unwrap_or(value);
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }
            if data.is_some() {
                return Ok(data);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_of(chunks: &[&'static [u8]]) -> Sse {
        Sse::new(Chunks::from_vec_deque(
            chunks.iter().map(|c| Bytes::from_static(*c)).collect(),
        ))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_of(&[b"data: {\"a\":1}\n\n", b"data: [DONE]\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "[DONE]");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        let mut sse = sse_of(&[b"data:", b" hello\r\n", b"\r\n", b"data:bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let mut sse = sse_of(&[
            b": keep-alive\n\n",
            b"event: message\nid: 7\ndata: first\ndata: second\n\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "first\nsecond");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let mut sse = sse_of(&[b"xxxxxx\n\n"]);
        assert!(matches!(
            sse.next_event().await,
            Err(Error::InvalidPayload)
        ));

        // Incomplete events at the end of the stream are dropped.
        let mut sse = sse_of(&[b"data: hello\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_of(&[&[0xff, 0xfe, b'\n', b'\n']]);
        assert!(matches!(
            sse.next_event().await,
            Err(Error::InvalidPayload)
        ));
    }
}
