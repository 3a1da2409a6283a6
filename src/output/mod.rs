use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::prober::{Credential, Target};

pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

/// Where the result of one run lands. The timestamp is taken once, when the run starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPath {
    pub directory: PathBuf,
    pub file_name: String,
    pub timestamp: DateTime<Local>,
}

impl OutputPath {
    pub fn new(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            timestamp,
        }
    }

    pub fn stamp(&self) -> String {
        self.timestamp.format(RECORD_TIMESTAMP_FORMAT).to_string()
    }

    // `/` and `:` from the stamp would split or break the file name
    pub fn resolve(&self, format: OutputFormat) -> PathBuf {
        let stamp = self.stamp().replace(['/', ':'], "-");
        self.directory.join(format!(
            "{}({}).{}",
            self.file_name,
            stamp,
            format.extension()
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub username: String,
    pub password: String,
    pub timestamp: String,
    pub target: Target,
}

impl ResultRecord {
    pub fn new(credential: &Credential, target: &Target, output: &OutputPath) -> Self {
        Self {
            username: credential.username.clone(),
            password: credential.password.clone(),
            timestamp: output.stamp(),
            target: target.clone(),
        }
    }

    pub fn success_line(&self) -> String {
        format!(
            "[+] Success! Username: {}, Password: {}",
            self.username, self.password
        )
    }

    pub fn render(&self, format: OutputFormat) -> std::io::Result<Vec<u8>> {
        match format {
            OutputFormat::Text => Ok(render_text(self)),
            OutputFormat::Json => render_json(self),
        }
    }
}

pub fn render_text(record: &ResultRecord) -> Vec<u8> {
    let mut out = record.success_line();
    out.push('\n');
    out.into_bytes()
}

pub fn render_json(record: &ResultRecord) -> std::io::Result<Vec<u8>> {
    to_json_bytes(record)
}

fn to_json_bytes<T: Serialize>(value: &T) -> std::io::Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(value)?;
    out.push(b'\n');
    Ok(out)
}

/// Persists the single result record of a run.
pub trait ResultSink: Send + Sync {
    fn write_record<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> BoxFuture<'a, std::io::Result<()>>;

    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FileSink;

impl FileSink {
    async fn write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut outfile = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        outfile.write_all(contents).await?;
        outfile.flush().await
    }
}

impl ResultSink for FileSink {
    fn write_record<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> BoxFuture<'a, std::io::Result<()>> {
        Self::write(path, contents).boxed()
    }

    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        async move { tokio::fs::metadata(path).await.is_ok() }.boxed()
    }
}
