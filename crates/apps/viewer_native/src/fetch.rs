use std::io::ErrorKind;

use reqwest::Client;
use streaming::{BoxFuture, DatasetFetcher, FetchError};

/// Fetches `http(s)://` URLs over the network and everything else from disk.
pub struct SourceFetcher {
    http: Client,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

async fn fetch_http(client: &Client, url: &str) -> Result<String, FetchError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            code: resp.status().as_u16(),
        });
    }
    resp.text()
        .await
        .map_err(|e| FetchError::Body(e.to_string()))
}

/// Missing files read as 404 so they are reported like a missing URL.
async fn fetch_file(path: &str) -> Result<String, FetchError> {
    tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => FetchError::Status { code: 404 },
        ErrorKind::InvalidData => FetchError::Body(e.to_string()),
        _ => FetchError::Transport(e.to_string()),
    })
}

impl DatasetFetcher for SourceFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        if is_remote(url) {
            Box::pin(fetch_http(&self.http, url))
        } else {
            Box::pin(fetch_file(url.strip_prefix("file://").unwrap_or(url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn reads_local_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("points.geojson");
        std::fs::write(&path, "{}").expect("write");

        let fetcher = SourceFetcher::new();
        let body = fetcher.fetch(path.to_str().expect("utf8 path")).await;
        assert_eq!(body, Ok("{}".to_string()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_file_is_a_404() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope.geojson");

        let fetcher = SourceFetcher::new();
        let err = fetcher
            .fetch(path.to_str().expect("utf8 path"))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Status { code: 404 });
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://example.org/a.geojson"));
        assert!(!is_remote("data/points.geojson"));
        assert!(!is_remote("file:///srv/a.geojson"));
    }
}
