//! Client environment describing how to reach a running session.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use usercouch_config::BindAddress;

use crate::options::SessionConfig;
use crate::random::OAuthTokens;

/// URL scheme for a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Builds the client URL for a server bound to `bind` on `port`.
///
/// Clients always connect over loopback, so wildcard binds map to
/// `127.0.0.1` or `[::1]`. The port is always written, even when it is the
/// scheme's default, and the URL ends with `/`.
pub fn build_url(scheme: Scheme, bind: BindAddress, port: u16) -> Result<String, url::ParseError> {
    let host = if bind.is_ipv6() {
        "[::1]"
    } else {
        "127.0.0.1"
    };
    let text = format!("{}://{host}:{port}/", scheme.as_str());
    Url::parse(&text)?;
    Ok(text)
}

/// Basic credentials for the session admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Admin user name.
    pub username: String,
    /// Clear-text admin password.
    pub password: String,
}

impl BasicAuth {
    /// `Authorization` header value for these credentials.
    #[must_use]
    pub fn header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

/// Everything a client needs to talk to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    /// HTTP port.
    pub port: u16,
    /// Base URL with an explicit port and a trailing slash.
    pub url: String,
    /// Admin credentials, absent in `open` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicAuth>,
    /// OAuth tokens, present in `oauth` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthTokens>,
    /// The same environment addressed over HTTPS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_env_ssl: Option<Box<Env>>,
}

impl Env {
    /// Builds the environment for `session` listening on the given ports.
    pub fn build(
        session: &SessionConfig,
        port: u16,
        ssl_port: Option<u16>,
    ) -> Result<Self, url::ParseError> {
        let mut env = Self {
            port,
            url: build_url(Scheme::Http, session.bind_address, port)?,
            basic: session.credentials.as_ref().map(|credentials| BasicAuth {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            }),
            oauth: session.oauth.clone(),
            x_env_ssl: None,
        };
        if let Some(ssl_port) = ssl_port {
            let mut ssl = env.clone();
            ssl.port = ssl_port;
            ssl.url = build_url(Scheme::Https, session.bind_address, ssl_port)?;
            env.x_env_ssl = Some(Box::new(ssl));
        }
        Ok(env)
    }

    /// Serialises the environment as a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
