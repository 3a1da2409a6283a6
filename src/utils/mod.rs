use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Error)]
pub enum WordlistError {
    #[error("wordlist not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read wordlist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads newline-delimited wordlists.
pub trait LineSource: Send + Sync {
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool>;

    fn read_lines<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<String>, WordlistError>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FileLineSource;

impl FileLineSource {
    async fn load(path: &Path) -> Result<Vec<String>, WordlistError> {
        let handle = File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WordlistError::NotFound {
                path: path.to_path_buf(),
            },
            _ => WordlistError::Read {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        // invalid UTF-8 is replaced, not fatal
        let mut lines = BufReader::new(handle).split(b'\n');
        let mut out = Vec::new();
        while let Some(raw) = lines.next_segment().await.map_err(|e| WordlistError::Read {
            path: path.to_path_buf(),
            source: e,
        })? {
            out.push(decode_line(&raw));
        }
        Ok(trim_lines(out))
    }
}

impl LineSource for FileLineSource {
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        async move { tokio::fs::metadata(path).await.is_ok() }.boxed()
    }

    fn read_lines<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<String>, WordlistError>> {
        Self::load(path).boxed()
    }
}

fn decode_line(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(line) => line.to_string(),
        Err(_) => {
            let line = String::from_utf8_lossy(raw).into_owned();
            tracing::warn!(line = %line, "wordlist line is not valid UTF-8, invalid bytes replaced");
            line
        }
    }
}

// blank lines stay: an empty password is still a candidate
pub fn trim_lines(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().map(|l| l.trim().to_string()).collect()
}

pub fn parse_delay_seconds(value: f64) -> Result<Duration, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!(
            "invalid delay {value}, expected a non-negative number of seconds"
        ));
    }
    Duration::try_from_secs_f64(value).map_err(|e| format!("invalid delay {value}: {e}"))
}
