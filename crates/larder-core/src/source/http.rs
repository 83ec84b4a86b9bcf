//! Blocking facade over the async HTTP client.
//!
//! Requests run on a private current-thread runtime and race the caller's
//! cancellation token, so a cancelled run never waits on the network.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{FetchError, ensure_not_cancelled};

const USER_AGENT: &str = concat!("larder/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, runtime })
    }

    /// GET a URL and return the body as text.
    pub fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchError> {
        debug!(url, "GET");
        self.run(cancel, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| transport(url, e))?;
            let response = check_status(url, response)?;
            response.text().await.map_err(|e| transport(url, e))
        })
    }

    /// POST a JSON body and decode a JSON response.
    pub fn post_json<B, R>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<R, FetchError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(url, "POST");
        self.run(cancel, async {
            let mut request = self.client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let response = request.send().await.map_err(|e| transport(url, e))?;
            let response = check_status(url, response)?;
            response
                .json::<R>()
                .await
                .map_err(|e| FetchError::InvalidResponse {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
        })
    }

    fn run<T, F>(&self, cancel: &CancellationToken, request: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        ensure_not_cancelled(cancel)?;
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                result = request => result,
            }
        })
    }
}

fn transport(url: &str, source: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        source,
    }
}

fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}
