use std::io;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{HandshakeProber, ProbeErrorKind, ProbeResult, Target};

const MAX_RESPONSE_BYTES: usize = 4096;

pub fn describe_request(target: &Target, user_agent: &str) -> String {
    format!(
        "DESCRIBE rtsp://{} RTSP/1.0\r\nCSeq: 1\r\nUser-Agent: {}\r\n\r\n",
        target.authority(),
        user_agent
    )
}

/// Sends a single RTSP `DESCRIBE` over a fresh TCP connection and reads one reply chunk.
///
/// The socket lives only for the duration of [`HandshakeProber::probe`]; it is
/// shut down and dropped on every return path.
#[derive(Clone, Debug)]
pub struct RtspDescribeProber {
    timeout: Duration,
    user_agent: String,
}

impl RtspDescribeProber {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
        }
    }

    async fn exchange(&self, target: &Target) -> Result<String, ProbeErrorKind> {
        let host = target.host.trim().trim_start_matches('[').trim_end_matches(']');
        tracing::debug!(device = %target, "connecting for DESCRIBE");
        let mut stream = timeout(self.timeout, TcpStream::connect((host, target.port)))
            .await
            .map_err(|_| ProbeErrorKind::Timeout)?
            .map_err(classify_io_error)?;

        let result = self.describe(&mut stream, target).await;
        let _ = stream.shutdown().await;
        result
    }

    async fn describe(
        &self,
        stream: &mut TcpStream,
        target: &Target,
    ) -> Result<String, ProbeErrorKind> {
        let request = describe_request(target, &self.user_agent);
        timeout(self.timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| ProbeErrorKind::Timeout)?
            .map_err(classify_io_error)?;

        let mut buf = vec![0u8; MAX_RESPONSE_BYTES];
        let n = timeout(self.timeout, stream.read(&mut buf))
            .await
            .map_err(|_| ProbeErrorKind::Timeout)?
            .map_err(classify_io_error)?;
        Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
    }
}

fn classify_io_error(e: io::Error) -> ProbeErrorKind {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => ProbeErrorKind::ConnectionRefused,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProbeErrorKind::Timeout,
        _ => ProbeErrorKind::Other {
            message: e.to_string(),
        },
    }
}

impl HandshakeProber for RtspDescribeProber {
    fn probe<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, ProbeResult> {
        async move {
            match self.exchange(target).await {
                Ok(raw) => ProbeResult::response(raw),
                Err(kind) => ProbeResult::failed(kind),
            }
        }
        .boxed()
    }
}
