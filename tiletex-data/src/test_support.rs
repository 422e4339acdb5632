//! Scripted transport for exercising the fetcher without a network.

use std::cell::RefCell;
use std::io::{self, Write};

use url::Url;

use crate::transport::{Transport, TransportError};

/// How [`StubTransport`] answers requests to one endpoint.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// Serve the body in full.
    Body(Vec<u8>),
    /// Fail with [`TransportError::Timeout`].
    Timeout,
    /// Fail with an HTTP status.
    Status(u16),
    /// Write the bytes, then fail as if the connection dropped.
    Truncated(Vec<u8>),
}

/// [`Transport`] that replies according to URL prefixes and records every
/// request it sees. Unscripted URLs fail with a refused connection.
#[derive(Debug, Default)]
pub struct StubTransport {
    replies: Vec<(String, StubReply)>,
    calls: RefCell<Vec<Url>>,
}

impl StubTransport {
    /// Transport with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer URLs starting with `prefix` with `reply`.
    #[must_use]
    pub fn reply(mut self, prefix: impl Into<String>, reply: StubReply) -> Self {
        self.replies.push((prefix.into(), reply));
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Url> {
        self.calls.borrow().clone()
    }
}

impl Transport for StubTransport {
    fn fetch(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.calls.borrow_mut().push(url.clone());
        let network = |kind: io::ErrorKind, message: &str| TransportError::Network {
            url: url.to_string(),
            source: io::Error::new(kind, message.to_owned()),
        };
        let reply = self
            .replies
            .iter()
            .find(|(prefix, _)| url.as_str().starts_with(prefix.as_str()))
            .map(|(_, reply)| reply);
        match reply {
            Some(StubReply::Body(body)) => {
                sink.write_all(body)
                    .map_err(|err| network(err.kind(), "sink rejected body"))?;
                Ok(body.len() as u64)
            }
            Some(StubReply::Timeout) => Err(TransportError::Timeout {
                url: url.to_string(),
            }),
            Some(StubReply::Status(status)) => Err(TransportError::Http {
                url: url.to_string(),
                status: *status,
                message: format!("stub status {status}"),
            }),
            Some(StubReply::Truncated(partial)) => {
                sink.write_all(partial)
                    .map_err(|err| network(err.kind(), "sink rejected body"))?;
                Err(network(io::ErrorKind::UnexpectedEof, "connection closed mid-body"))
            }
            None => Err(network(io::ErrorKind::ConnectionRefused, "no stub reply")),
        }
    }
}
