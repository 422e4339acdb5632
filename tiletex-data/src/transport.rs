//! Blocking HTTP transport for Overpass requests.
//!
//! [`Transport`] is synchronous so the pipeline stays embeddable in plain
//! threads. [`ReqwestTransport`] bridges to async `reqwest` by blocking on a
//! runtime it owns, or on the caller's multi-threaded runtime when there is
//! one.

use std::io::{self, Write};
use std::pin::pin;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = "tiletex/0.1";

/// Transport-level failures. Every variant is treated as transient by the
/// fetcher, which moves on to the next endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting or reading took longer than allowed.
    #[error("request to {url} timed out")]
    Timeout {
        /// Request URL.
        url: String,
    },
    /// The server answered with an error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The request failed below HTTP or the body could not be written.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

/// Issues a GET request and streams the response body into a sink.
pub trait Transport {
    /// Fetch `url`, writing the body to `sink`. Returns the bytes written.
    fn fetch(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).fetch(url, sink)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).fetch(url, sink)
    }
}

/// Failure to construct a [`ReqwestTransport`].
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// The HTTP client rejected its configuration.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The Tokio runtime could not start.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Timeouts and identity for [`ReqwestTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Limit on establishing a connection.
    pub connect_timeout: Duration,
    /// Limit on the gap between body reads.
    pub read_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(60),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`Transport`] over `reqwest`.
///
/// Called outside any Tokio runtime, or inside a `current_thread` one, it
/// blocks on its own runtime. Inside a multi-threaded runtime it uses
/// [`tokio::task::block_in_place`] on the caller's handle.
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl ReqwestTransport {
    /// Build a transport with the given timeouts and user agent.
    pub fn new(config: TransportConfig) -> Result<Self, TransportBuildError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(TransportBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn download(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.config.user_agent.as_str())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(&err, url))?;
        let mut body = pin!(response.bytes_stream());
        let mut written = 0_u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|err| convert_reqwest_error(&err, url))?
        {
            sink.write_all(&chunk)
                .map_err(|source| TransportError::Network {
                    url: url.to_string(),
                    source,
                })?;
            written += chunk.len() as u64;
        }
        sink.flush().map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;
        Ok(written)
    }
}

impl Transport for ReqwestTransport {
    fn fetch(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let future = self.download(url, sink);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

fn convert_reqwest_error(error: &reqwest::Error, url: &Url) -> TransportError {
    let url = url.to_string();
    if error.is_timeout() {
        return TransportError::Timeout { url };
    }
    if let Some(status) = error.status() {
        return TransportError::Http {
            url,
            status: status.as_u16(),
            message: error.to_string(),
        };
    }
    let kind = if error.is_connect() {
        io::ErrorKind::ConnectionRefused
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url,
        source: io::Error::new(kind, error.to_string()),
    }
}
