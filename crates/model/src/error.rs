use std::fmt::{self, Display};

/// The kind of error a model provider reports.
///
/// Kinds are coarse on purpose: the graph only needs to know whether a
/// failed call is worth another attempt and what to tell the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The API key is missing or was rejected.
    Unauthorized,
    /// The provider could not be reached, or failed on its side.
    Network,
    /// The provider answered with something that could not be decoded.
    MalformedResponse,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns `true` if a request failing with this kind may succeed when
    /// sent again unchanged.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::RateLimitExceeded | ErrorKind::Network)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Moderated => "content moderated",
            ErrorKind::RateLimitExceeded => "rate limit exceeded",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Network => "network failure",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::Other => "other error",
        };
        f.write_str(s)
    }
}
