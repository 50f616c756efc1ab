use gloo_net::http::Request;
use streaming::{BoxFuture, DatasetFetcher, FetchError};

/// Fetches datasets with the browser's `fetch`, relative to the page URL.
pub struct GlooFetcher;

impl DatasetFetcher for GlooFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let resp = Request::get(url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            if !resp.ok() {
                return Err(FetchError::Status {
                    code: resp.status(),
                });
            }
            resp.text()
                .await
                .map_err(|e| FetchError::Body(e.to_string()))
        })
    }
}
