use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use indicatif::ProgressBar;
use itertools::iproduct;
use thiserror::Error;

use crate::output::{OutputFormat, OutputPath, ResultRecord, ResultSink};
use crate::prober::{AttemptOutcome, Credential, CredentialProber, Target};
use crate::utils::{LineSource, WordlistError};

/// Which usernames are tried: one fixed name, or every line of a username list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialMode {
    SingleUser {
        username: String,
        password_list: PathBuf,
    },
    UserList {
        username_list: PathBuf,
        password_list: PathBuf,
    },
}

impl CredentialMode {
    pub fn resolve(
        user: Option<&str>,
        user_wordlist: Option<&Path>,
        password_list: &Path,
    ) -> Result<Self, AbortReason> {
        match (user, user_wordlist) {
            (Some(_), Some(_)) => Err(AbortReason::InvalidConfig(
                "use either user or user wordlist, not both".to_string(),
            )),
            (None, None) => Err(AbortReason::InvalidConfig(
                "either user or user wordlist must be provided".to_string(),
            )),
            (Some(username), None) => Ok(Self::SingleUser {
                username: username.to_string(),
                password_list: password_list.to_path_buf(),
            }),
            (None, Some(list)) => Ok(Self::UserList {
                username_list: list.to_path_buf(),
                password_list: password_list.to_path_buf(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum AbortReason {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Password wordlist file not found: {}", .0.display())]
    PasswordListNotFound(PathBuf),

    #[error("User wordlist file not found: {}", .0.display())]
    UserListNotFound(PathBuf),

    #[error(transparent)]
    WordlistRead(#[from] WordlistError),
}

#[derive(Debug)]
pub enum RunOutcome {
    Succeeded {
        record: ResultRecord,
        attempts: usize,
        // None when the sink failed to write the record
        saved: Option<PathBuf>,
    },
    Exhausted {
        attempts: usize,
    },
    Interrupted {
        attempts: usize,
        result_file: Option<PathBuf>,
    },
    Aborted(AbortReason),
}

#[derive(Clone, Debug)]
pub struct BruteSettings {
    pub target: Target,
    pub delay: Duration,
    pub skip_final_delay: bool,
    pub user: Option<String>,
    pub user_wordlist: Option<PathBuf>,
    pub password_wordlist: PathBuf,
    pub out_dir: PathBuf,
    pub file_name: String,
    pub output_format: OutputFormat,
}

/// Sequential credential trial engine.
///
/// Candidates are tried strictly in order, outer loop over usernames and inner
/// loop over passwords, with `delay` between attempts. The first accepted
/// candidate is written through the [`ResultSink`] and ends the run.
pub struct BruteForcer<'a> {
    settings: BruteSettings,
    prober: &'a dyn CredentialProber,
    lines: &'a dyn LineSource,
    sink: &'a dyn ResultSink,
    pb: ProgressBar,
}

impl<'a> BruteForcer<'a> {
    pub fn new(
        settings: BruteSettings,
        prober: &'a dyn CredentialProber,
        lines: &'a dyn LineSource,
        sink: &'a dyn ResultSink,
    ) -> Self {
        Self {
            settings,
            prober,
            lines,
            sink,
            pb: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn settings(&self) -> &BruteSettings {
        &self.settings
    }

    pub async fn run<F>(&self, shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        let output = OutputPath::new(
            &self.settings.out_dir,
            self.settings.file_name.clone(),
            Local::now(),
        );
        self.run_with_output(output, shutdown).await
    }

    pub async fn run_with_output<F>(&self, output: OutputPath, shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        let mode = match CredentialMode::resolve(
            self.settings.user.as_deref(),
            self.settings.user_wordlist.as_deref(),
            &self.settings.password_wordlist,
        ) {
            Ok(mode) => mode,
            Err(reason) => return RunOutcome::Aborted(reason),
        };

        let (usernames, passwords) = match self.load_candidates(&mode).await {
            Ok(lists) => lists,
            Err(reason) => return RunOutcome::Aborted(reason),
        };

        let result_path = output.resolve(self.settings.output_format);
        tracing::info!(
            device = %self.settings.target,
            usernames = usernames.len(),
            passwords = passwords.len(),
            output = %result_path.display(),
            "starting credential trials"
        );

        let total = usernames.len() * passwords.len();
        self.pb.set_length(total as u64);

        tokio::pin!(shutdown);
        let mut attempts = 0usize;
        for (username, password) in iproduct!(usernames.iter(), passwords.iter()) {
            let candidate = Credential::new(username.as_str(), password.as_str());
            self.report_trying(&candidate);

            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => return self.interrupted(attempts, &result_path).await,
                outcome = self.prober.attempt(&self.settings.target, &candidate) => outcome,
            };
            attempts += 1;
            self.pb.inc(1);

            if outcome.is_success() {
                let record = ResultRecord::new(&candidate, &self.settings.target, &output);
                let saved = self.persist(&record, &result_path).await;
                return RunOutcome::Succeeded {
                    record,
                    attempts,
                    saved,
                };
            }
            self.report_failure(&candidate, &outcome);

            if attempts == total && self.settings.skip_final_delay {
                break;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => return self.interrupted(attempts, &result_path).await,
                _ = tokio::time::sleep(self.settings.delay) => {}
            }
        }

        tracing::info!(attempts, "candidates exhausted");
        RunOutcome::Exhausted { attempts }
    }

    async fn load_candidates(
        &self,
        mode: &CredentialMode,
    ) -> Result<(Vec<String>, Vec<String>), AbortReason> {
        match mode {
            CredentialMode::SingleUser {
                username,
                password_list,
            } => {
                if !self.lines.exists(password_list).await {
                    return Err(AbortReason::PasswordListNotFound(password_list.clone()));
                }
                let passwords = self.lines.read_lines(password_list).await?;
                Ok((vec![username.clone()], passwords))
            }
            CredentialMode::UserList {
                username_list,
                password_list,
            } => {
                if !self.lines.exists(username_list).await {
                    return Err(AbortReason::UserListNotFound(username_list.clone()));
                }
                if !self.lines.exists(password_list).await {
                    return Err(AbortReason::PasswordListNotFound(password_list.clone()));
                }
                let usernames = self.lines.read_lines(username_list).await?;
                let passwords = self.lines.read_lines(password_list).await?;
                Ok((usernames, passwords))
            }
        }
    }

    async fn persist(&self, record: &ResultRecord, path: &Path) -> Option<PathBuf> {
        self.say(format!(
            "{} Success! {}: {}, {}: {}",
            "[+]".bold().green(),
            "Username".blue(),
            record.username,
            "Password".magenta(),
            record.password
        ));
        let written = match record.render(self.settings.output_format) {
            Ok(contents) => self.sink.write_record(path, &contents).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => {
                tracing::info!(path = %path.display(), "result written");
                self.say(format!("File written at: {}\n", path.display()));
                Some(path.to_path_buf())
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to write result");
                self.say(format!(
                    "{} ERROR: failed to write result to {}: {}",
                    "[-]".bold().red(),
                    path.display(),
                    e
                ));
                None
            }
        }
    }

    async fn interrupted(&self, attempts: usize, path: &Path) -> RunOutcome {
        tracing::warn!(attempts, "interrupted");
        let result_file = if self.sink.exists(path).await {
            Some(path.to_path_buf())
        } else {
            None
        };
        RunOutcome::Interrupted {
            attempts,
            result_file,
        }
    }

    // a hidden bar swallows println, so fall back to stdout
    fn say(&self, line: String) {
        if self.pb.is_hidden() {
            println!("{line}");
        } else {
            self.pb.println(line);
        }
    }

    fn report_trying(&self, candidate: &Credential) {
        tracing::debug!(username = %candidate.username, "trying candidate");
        self.say(format!(
            "{} Trying: {}: {}, {}: {}",
            "[*]".yellow(),
            "Username".blue(),
            candidate.username,
            "Password".magenta(),
            candidate.password
        ));
    }

    fn report_failure(&self, candidate: &Credential, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Rejected { status } => {
                self.say(format!(
                    "{} Failed: {}: {}, {}: {} (HTTP {})",
                    "[-]".red(),
                    "Username".blue(),
                    candidate.username,
                    "Password".magenta(),
                    candidate.password,
                    status
                ));
            }
            AttemptOutcome::Transport { message } => {
                tracing::warn!(username = %candidate.username, error = %message, "transport error");
                self.say(format!(
                    "{} ERROR: {}: {}, {}: {}\n{} Error message: {}",
                    "[-]".red(),
                    "Username".blue(),
                    candidate.username,
                    "Password".blue(),
                    candidate.password,
                    "[-]".red(),
                    message
                ));
            }
            AttemptOutcome::Accepted => {}
        }
    }
}
