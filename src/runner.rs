use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;

use crate::bruteforcer::{BruteForcer, BruteSettings, RunOutcome};
use crate::connection::{self, ConnectionReport};
use crate::output::{FileSink, OutputFormat};
use crate::prober::{self, HttpBasicProber, RtspDescribeProber, Target};
use crate::utils::FileLineSource;

#[derive(Clone, Debug)]
pub struct Options {
    pub target_ip: String,
    pub target_port: u16,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub delay: Duration,
    pub skip_final_delay: bool,
    pub user: Option<String>,
    pub user_wordlist: Option<String>,
    pub password_wordlist: Option<String>,
    pub out_file_path: Option<String>,
    pub file_name: Option<String>,
    pub output_format: OutputFormat,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target_ip: String::new(),
            target_port: 554,
            timeout_seconds: prober::DEFAULT_TIMEOUT.as_secs(),
            user_agent: prober::DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            delay: Duration::from_secs(2),
            skip_final_delay: false,
            user: None,
            user_wordlist: None,
            password_wordlist: None,
            out_file_path: None,
            file_name: None,
            output_format: OutputFormat::Text,
        }
    }
}

impl Options {
    /// True when any of the brute force inputs was given.
    pub fn wants_brute_force(&self) -> bool {
        self.password_wordlist.is_some() || self.out_file_path.is_some() || self.file_name.is_some()
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no target provided (target_ip is empty)")]
    NoTarget,

    #[error("invalid port {value}, expected 1-65535")]
    InvalidPort { value: u16 },

    #[error("invalid timeout {value}, expected a positive number of seconds")]
    InvalidTimeout { value: u64 },

    #[error("brute force requires {name}")]
    MissingBruteForceOption { name: &'static str },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.target_ip.trim().is_empty() {
            return Err(RunnerError::NoTarget);
        }
        if options.target_port == 0 {
            return Err(RunnerError::InvalidPort {
                value: options.target_port,
            });
        }
        if options.timeout_seconds == 0 {
            return Err(RunnerError::InvalidTimeout {
                value: options.timeout_seconds,
            });
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn target(&self) -> Target {
        Target::new(self.options.target_ip.trim(), self.options.target_port)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.options.timeout_seconds)
    }

    pub fn brute_settings(&self) -> Result<BruteSettings, RunnerError> {
        let opts = &self.options;
        let password_wordlist = opts
            .password_wordlist
            .clone()
            .ok_or(RunnerError::MissingBruteForceOption {
                name: "password_wordlist",
            })?;
        let out_dir = opts
            .out_file_path
            .clone()
            .ok_or(RunnerError::MissingBruteForceOption {
                name: "out_file_path",
            })?;
        let file_name = opts
            .file_name
            .clone()
            .ok_or(RunnerError::MissingBruteForceOption { name: "file_name" })?;

        Ok(BruteSettings {
            target: self.target(),
            delay: opts.delay,
            skip_final_delay: opts.skip_final_delay,
            user: opts.user.clone(),
            user_wordlist: opts.user_wordlist.as_ref().map(PathBuf::from),
            password_wordlist: PathBuf::from(password_wordlist),
            out_dir: PathBuf::from(out_dir),
            file_name,
            output_format: opts.output_format,
        })
    }

    /// Runs the credential trials until success, exhaustion, abort, or `shutdown` resolves.
    pub async fn brute_force<F>(&self, pb: ProgressBar, shutdown: F) -> Result<RunOutcome, RunnerError>
    where
        F: Future<Output = ()>,
    {
        let settings = self.brute_settings()?;
        let prober = HttpBasicProber::new(
            self.timeout(),
            &self.options.user_agent,
            self.options.proxy.as_deref(),
        )
        .map_err(|source| RunnerError::HttpClientBuild { source })?;

        let lines = FileLineSource;
        let sink = FileSink;
        let engine = BruteForcer::new(settings, &prober, &lines, &sink).with_progress(pb);
        Ok(engine.run(shutdown).await)
    }

    pub async fn connection_test(&self) -> ConnectionReport {
        let prober = RtspDescribeProber::new(self.timeout(), self.options.user_agent.clone());
        connection::run_connection_test(&prober, &self.target()).await
    }
}
