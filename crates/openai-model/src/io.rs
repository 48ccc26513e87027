mod sse;

#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

pub use sse::Sse;

/// Failure while reading the body of a streaming response.
#[derive(Debug)]
pub struct ChunksError(String);

impl Display for ChunksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read response body: {}", self.0)
    }
}

/// A source of body chunks: a live HTTP response, or canned bytes.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Buffered(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_vec_deque(chunks: VecDeque<Bytes>) -> Self {
        Chunks::Buffered(chunks)
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, ChunksError> {
        match self {
            Chunks::Response(response) => response
                .chunk()
                .await
                .map_err(|err| ChunksError(err.to_string())),
            #[cfg(test)]
            Chunks::Buffered(chunks) => Ok(chunks.pop_front()),
        }
    }
}
