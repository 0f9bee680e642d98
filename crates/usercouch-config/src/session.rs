//! Vocabulary types shared by the session writer and the binary.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Authentication template applied to a session.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthMode {
    /// No authentication; any local client is an admin.
    Open,
    /// HTTP Basic authentication against a single admin account.
    #[default]
    Basic,
    /// Basic authentication plus OAuth 1.0a tokens for the same account.
    Oauth,
}

impl AuthMode {
    /// Returns true when the session carries admin credentials.
    #[must_use]
    pub fn requires_credentials(self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Listening address for the supervised server.
///
/// Only the loopback and wildcard addresses of each family are accepted.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
pub enum BindAddress {
    /// `127.0.0.1`: accept local IPv4 connections only.
    #[default]
    #[serde(rename = "127.0.0.1")]
    #[strum(serialize = "127.0.0.1")]
    Loopback,
    /// `0.0.0.0`: accept IPv4 connections from anywhere.
    #[serde(rename = "0.0.0.0")]
    #[strum(serialize = "0.0.0.0")]
    Any,
    /// `::1`: accept local IPv6 connections only.
    #[serde(rename = "::1")]
    #[strum(serialize = "::1")]
    LoopbackV6,
    /// `::`: accept IPv6 connections from anywhere.
    #[serde(rename = "::")]
    #[strum(serialize = "::")]
    AnyV6,
}

impl BindAddress {
    /// Address the server binds to.
    #[must_use]
    pub fn ip(self) -> IpAddr {
        match self {
            Self::Loopback => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Self::Any => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Self::LoopbackV6 => IpAddr::V6(Ipv6Addr::LOCALHOST),
            Self::AnyV6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// Address a local client uses to reach a server bound here.
    #[must_use]
    pub fn client_ip(self) -> IpAddr {
        if self.is_ipv6() {
            IpAddr::V6(Ipv6Addr::LOCALHOST)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }

    /// Returns true for the IPv6 variants.
    #[must_use]
    pub fn is_ipv6(self) -> bool {
        matches!(self, Self::LoopbackV6 | Self::AnyV6)
    }
}

/// Compression CouchDB applies to database and view files.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
pub enum FileCompression {
    /// Store files uncompressed.
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    Uncompressed,
    /// zlib level 1.
    #[serde(rename = "deflate_1")]
    #[strum(serialize = "deflate_1")]
    Deflate1,
    /// zlib level 2.
    #[serde(rename = "deflate_2")]
    #[strum(serialize = "deflate_2")]
    Deflate2,
    /// zlib level 3.
    #[serde(rename = "deflate_3")]
    #[strum(serialize = "deflate_3")]
    Deflate3,
    /// zlib level 4.
    #[serde(rename = "deflate_4")]
    #[strum(serialize = "deflate_4")]
    Deflate4,
    /// zlib level 5.
    #[serde(rename = "deflate_5")]
    #[strum(serialize = "deflate_5")]
    Deflate5,
    /// zlib level 6.
    #[serde(rename = "deflate_6")]
    #[strum(serialize = "deflate_6")]
    Deflate6,
    /// zlib level 7.
    #[serde(rename = "deflate_7")]
    #[strum(serialize = "deflate_7")]
    Deflate7,
    /// zlib level 8.
    #[serde(rename = "deflate_8")]
    #[strum(serialize = "deflate_8")]
    Deflate8,
    /// zlib level 9.
    #[serde(rename = "deflate_9")]
    #[strum(serialize = "deflate_9")]
    Deflate9,
    /// Google Snappy.
    #[default]
    #[serde(rename = "snappy")]
    #[strum(serialize = "snappy")]
    Snappy,
}

/// Level written into the server's `[log]` section.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CouchLogLevel {
    /// Everything, including request traces.
    Debug,
    /// Informational messages.
    Info,
    /// Normal but significant events.
    #[default]
    Notice,
    /// Recoverable problems.
    Warning,
    /// Errors only.
    Error,
}

/// Supported output formats for the binary's own logs.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing session vocabulary from text.
pub type SessionParseError = strum::ParseError;
