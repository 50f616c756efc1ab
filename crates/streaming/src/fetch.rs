use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by fetchers.
///
/// Not `Send`: browser fetches hold JS handles and run on the page's only thread.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response.
    Transport(String),
    /// The server answered with a non-success status.
    Status { code: u16 },
    /// The response body could not be read as text.
    Body(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "request failed: {msg}"),
            FetchError::Status { code } => write!(f, "HTTP {code}"),
            FetchError::Body(msg) => write!(f, "unreadable response body: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Retrieves the text of a dataset.
pub trait DatasetFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>>;
}

impl<T: DatasetFetcher + ?Sized> DatasetFetcher for &T {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        (**self).fetch(url)
    }
}
