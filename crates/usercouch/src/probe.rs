//! HTTP liveness probing.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::PROCESS_TARGET;
use crate::env::Env;

const ROOT_PATH: &str = "/";

/// Upper bound on a single probe round trip.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by a liveness probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// The request could not be built.
    #[error("{method} {path} failed: {source}")]
    Request {
        /// Request method.
        method: &'static str,
        /// Request path.
        path: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with an error status.
    #[error("{status} {reason}: {method} {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
        /// Request method.
        method: &'static str,
        /// Request path.
        path: String,
    },
    /// The response body was not JSON.
    #[error("invalid response body for {method} {path}: {source}")]
    Decode {
        /// Request method.
        method: &'static str,
        /// Request path.
        path: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

/// Asks a session whether it is serving requests.
pub trait LivenessProbe: Send + Sync {
    /// Fetches the welcome document at the root of `env.url`.
    ///
    /// Returns `Ok(None)` when nothing answers: the connection is refused,
    /// times out, or is dropped without a response.
    fn welcome(&self, env: &Env) -> Result<Option<Value>, ProbeError>;
}

impl<T> LivenessProbe for Arc<T>
where
    T: LivenessProbe + ?Sized,
{
    fn welcome(&self, env: &Env) -> Result<Option<Value>, ProbeError> {
        (**self).welcome(env)
    }
}

impl<T> LivenessProbe for Box<T>
where
    T: LivenessProbe + ?Sized,
{
    fn welcome(&self, env: &Env) -> Result<Option<Value>, ProbeError> {
        (**self).welcome(env)
    }
}

/// Probe backed by a pooled, keep-alive HTTP client.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Builds a probe with [`DEFAULT_PROBE_TIMEOUT`].
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    /// Builds a probe whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProbeError::Client)?;
        Ok(Self { client })
    }

    fn send(&self, env: &Env) -> Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .get(env.url.as_str())
            .header(ACCEPT, "application/json");
        if let Some(basic) = &env.basic {
            request = request.header(AUTHORIZATION, basic.header_value());
        }
        request.send()
    }
}

impl LivenessProbe for HttpProbe {
    fn welcome(&self, env: &Env) -> Result<Option<Value>, ProbeError> {
        let Some(response) = self.send_with_retry(env)? else {
            return Ok(None);
        };
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_owned(),
                method: "GET",
                path: String::from(ROOT_PATH),
            });
        }
        response
            .json::<Value>()
            .map(Some)
            .map_err(|source| ProbeError::Decode {
                method: "GET",
                path: String::from(ROOT_PATH),
                source,
            })
    }
}

impl HttpProbe {
    /// Sends the request, retrying once when the connection broke mid-way.
    ///
    /// Returns `Ok(None)` when the server refuses, times out, or keeps
    /// hanging up; only a request that cannot be built is an error.
    fn send_with_retry(&self, env: &Env) -> Result<Option<Response>, ProbeError> {
        let error = match self.send(env) {
            Ok(response) => return Ok(Some(response)),
            Err(error) => error,
        };
        if error.is_builder() {
            return Err(request_error(error));
        }
        if is_unreachable(&error) {
            return Ok(None);
        }
        debug!(
            target: PROCESS_TARGET,
            url = %env.url,
            error = %error,
            "probe request broken; retrying once"
        );
        match self.send(env) {
            Ok(response) => Ok(Some(response)),
            Err(error) if error.is_builder() => Err(request_error(error)),
            Err(error) => {
                debug!(
                    target: PROCESS_TARGET,
                    url = %env.url,
                    error = %error,
                    "server not answering"
                );
                Ok(None)
            }
        }
    }
}

fn request_error(source: reqwest::Error) -> ProbeError {
    ProbeError::Request {
        method: "GET",
        path: String::from(ROOT_PATH),
        source,
    }
}

fn is_unreachable(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
