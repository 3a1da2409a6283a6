pub mod http;
pub mod rtsp;

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;

pub use http::HttpBasicProber;
pub use rtsp::RtspDescribeProber;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_USER_AGENT: &str = concat!("rtspbuster/", env!("CARGO_PKG_VERSION"));

/// Host and port of the device under test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, with IPv6 literals bracketed so the result can be embedded in a URI.
    pub fn authority(&self) -> String {
        let host = self.host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// What a single authentication attempt produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Accepted,
    Rejected { status: u16 },
    Transport { message: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Accepted)
    }
}

pub trait CredentialProber: Send + Sync {
    fn attempt<'a>(
        &'a self,
        target: &'a Target,
        credential: &'a Credential,
    ) -> BoxFuture<'a, AttemptOutcome>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeErrorKind {
    Timeout,
    ConnectionRefused,
    Other { message: String },
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeErrorKind::Timeout => f.write_str("timeout"),
            ProbeErrorKind::ConnectionRefused => f.write_str("connection refused"),
            ProbeErrorKind::Other { message } => f.write_str(message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    pub ok: bool,
    pub raw_response: String,
    pub error: Option<ProbeErrorKind>,
}

impl ProbeResult {
    pub fn response(raw_response: String) -> Self {
        Self {
            ok: !raw_response.is_empty(),
            raw_response,
            error: None,
        }
    }

    pub fn failed(kind: ProbeErrorKind) -> Self {
        Self {
            ok: false,
            raw_response: String::new(),
            error: Some(kind),
        }
    }
}

pub trait HandshakeProber: Send + Sync {
    fn probe<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, ProbeResult>;
}
