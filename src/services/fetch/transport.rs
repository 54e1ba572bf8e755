//! Byte transports used by the fetcher.
//!
//! [`AssetTransport`] is the seam between the fetch pipeline and the network.
//! Production code uses [`ReqwestTransport`]; tests plug in in-memory bodies.

use super::FetchError;
use std::future::Future;
use std::time::Duration;

/// Default User-Agent string. GitHub release downloads reject empty agents.
pub const DEFAULT_USER_AGENT: &str = concat!("efiforge/", env!("CARGO_PKG_VERSION"));

/// An open transfer yielding the response body in chunks.
pub trait TransferBody: Send {
    /// Length declared by the server, if any.
    fn content_length(&self) -> Option<u64>;

    /// Next chunk of the body, `None` once the body is exhausted.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, FetchError>> + Send;
}

pub trait AssetTransport: Send + Sync + 'static {
    type Body: TransferBody;

    /// Start a transfer. Non-success status codes fail here with
    /// [`FetchError::Server`].
    fn open(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Body, FetchError>> + Send;
}

/// HTTP(S) transport backed by reqwest with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

pub struct ReqwestBody {
    response: reqwest::Response,
    timeout: Duration,
}

fn classify(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if let Some(status) = err.status() {
        FetchError::Server {
            status: status.as_u16(),
        }
    } else {
        FetchError::Network(err.to_string())
    }
}

impl AssetTransport for ReqwestTransport {
    type Body = ReqwestBody;

    async fn open(&self, url: &str, timeout: Duration) -> Result<ReqwestBody, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
            });
        }

        Ok(ReqwestBody { response, timeout })
    }
}

impl TransferBody for ReqwestBody {
    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError> {
        let timeout = self.timeout;
        self.response
            .chunk()
            .await
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .map_err(|e| classify(e, timeout))
    }
}
