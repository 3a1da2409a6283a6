use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, TimeZone};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Notify;

use crate::bruteforcer::{AbortReason, BruteForcer, BruteSettings, RunOutcome};
use crate::output::{FileSink, OutputFormat, OutputPath, ResultSink};
use crate::prober::{AttemptOutcome, Credential, CredentialProber, Target};
use crate::utils::{FileLineSource, LineSource, WordlistError};

struct ScriptedProber {
    outcomes: HashMap<(String, String), AttemptOutcome>,
    calls: Mutex<Vec<Credential>>,
    notify_after: Option<(usize, Arc<Notify>)>,
}

impl ScriptedProber {
    fn accepting(pairs: &[(&str, &str)]) -> Self {
        let outcomes = pairs
            .iter()
            .map(|(u, p)| ((u.to_string(), p.to_string()), AttemptOutcome::Accepted))
            .collect();
        Self {
            outcomes,
            calls: Mutex::new(Vec::new()),
            notify_after: None,
        }
    }

    fn with(mut self, user: &str, pass: &str, outcome: AttemptOutcome) -> Self {
        self.outcomes
            .insert((user.to_string(), pass.to_string()), outcome);
        self
    }

    fn interrupt_after(mut self, calls: usize, notify: Arc<Notify>) -> Self {
        self.notify_after = Some((calls, notify));
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.username.clone(), c.password.clone()))
            .collect()
    }
}

impl CredentialProber for ScriptedProber {
    fn attempt<'a>(
        &'a self,
        _target: &'a Target,
        credential: &'a Credential,
    ) -> BoxFuture<'a, AttemptOutcome> {
        // recorded when polled, like a real request
        async move {
            let count = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(credential.clone());
                calls.len()
            };
            if let Some((after, notify)) = self.notify_after.as_ref() {
                if count == *after {
                    notify.notify_one();
                }
            }
            self.outcomes
                .get(&(credential.username.clone(), credential.password.clone()))
                .cloned()
                .unwrap_or(AttemptOutcome::Rejected { status: 401 })
        }
        .boxed()
    }
}

#[derive(Default)]
struct MemoryLines {
    files: HashMap<PathBuf, Vec<String>>,
    reads: AtomicUsize,
}

impl MemoryLines {
    fn with(mut self, path: &str, lines: &[&str]) -> Self {
        self.files.insert(
            PathBuf::from(path),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }
}

impl LineSource for MemoryLines {
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        futures::future::ready(self.files.contains_key(path)).boxed()
    }

    fn read_lines<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<String>, WordlistError>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let result = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| WordlistError::NotFound {
                path: path.to_path_buf(),
            });
        futures::future::ready(result).boxed()
    }
}

#[derive(Default)]
struct MemorySink {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail: bool,
}

impl MemorySink {
    fn written(&self) -> Vec<(PathBuf, String)> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(p, c)| (p.clone(), String::from_utf8_lossy(c).into_owned()))
            .collect()
    }
}

impl ResultSink for MemorySink {
    fn write_record<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> BoxFuture<'a, std::io::Result<()>> {
        let result = if self.fail {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            ))
        } else {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), contents.to_vec());
            Ok(())
        };
        futures::future::ready(result).boxed()
    }

    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        futures::future::ready(self.files.lock().unwrap().contains_key(path)).boxed()
    }
}

fn single_user(user: &str) -> BruteSettings {
    BruteSettings {
        target: Target::new("10.0.0.5", 80),
        delay: Duration::ZERO,
        skip_final_delay: false,
        user: Some(user.to_string()),
        user_wordlist: None,
        password_wordlist: PathBuf::from("passwords.txt"),
        out_dir: PathBuf::from("out"),
        file_name: "camera".to_string(),
        output_format: OutputFormat::Text,
    }
}

fn user_list() -> BruteSettings {
    BruteSettings {
        user: None,
        user_wordlist: Some(PathBuf::from("users.txt")),
        ..single_user("unused")
    }
}

fn fixed_output() -> OutputPath {
    let ts = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    OutputPath::new("out", "camera", ts)
}

fn never() -> std::future::Pending<()> {
    std::future::pending()
}

#[tokio::test]
async fn single_user_stops_at_first_accepted_password() {
    let prober = ScriptedProber::accepting(&[("admin", "admin")]);
    let lines = MemoryLines::default().with("passwords.txt", &["1234", "admin", "letmein"]);
    let sink = MemorySink::default();

    let engine = BruteForcer::new(single_user("admin"), &prober, &lines, &sink);
    let outcome = engine.run(never()).await;

    match outcome {
        RunOutcome::Succeeded {
            record,
            attempts,
            saved,
        } => {
            assert_eq!(record.username, "admin");
            assert_eq!(record.password, "admin");
            assert_eq!(attempts, 2);
            assert!(saved.is_some());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        prober.calls(),
        vec![
            ("admin".to_string(), "1234".to_string()),
            ("admin".to_string(), "admin".to_string()),
        ]
    );
    let written = sink.written();
    assert_eq!(written.len(), 1);
    assert!(written[0]
        .1
        .contains("Success! Username: admin, Password: admin"));
}

#[tokio::test]
async fn user_list_enumerates_usernames_outer_passwords_inner() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default()
        .with("users.txt", &["root", "admin"])
        .with("passwords.txt", &["1", "2", "3"]);
    let sink = MemorySink::default();

    let engine = BruteForcer::new(user_list(), &prober, &lines, &sink);
    let outcome = engine.run(never()).await;

    assert!(matches!(outcome, RunOutcome::Exhausted { attempts: 6 }));
    let expected: Vec<(String, String)> = [
        ("root", "1"),
        ("root", "2"),
        ("root", "3"),
        ("admin", "1"),
        ("admin", "2"),
        ("admin", "3"),
    ]
    .iter()
    .map(|(u, p)| (u.to_string(), p.to_string()))
    .collect();
    assert_eq!(prober.calls(), expected);
    assert!(sink.written().is_empty());
    // each list is loaded once, the password list is not re-read per username
    assert_eq!(lines.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn first_match_wins_when_several_credentials_are_valid() {
    let prober = ScriptedProber::accepting(&[("admin", "2"), ("admin", "3"), ("guest", "1")]);
    let lines = MemoryLines::default()
        .with("users.txt", &["root", "admin", "guest"])
        .with("passwords.txt", &["1", "2", "3"]);
    let sink = MemorySink::default();

    let engine = BruteForcer::new(user_list(), &prober, &lines, &sink);
    match engine.run(never()).await {
        RunOutcome::Succeeded {
            record, attempts, ..
        } => {
            assert_eq!((record.username.as_str(), record.password.as_str()), ("admin", "2"));
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn both_user_modes_abort_without_io() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default()
        .with("users.txt", &["root"])
        .with("passwords.txt", &["1"]);
    let sink = MemorySink::default();
    let settings = BruteSettings {
        user_wordlist: Some(PathBuf::from("users.txt")),
        ..single_user("admin")
    };

    let outcome = BruteForcer::new(settings, &prober, &lines, &sink)
        .run(never())
        .await;
    assert!(matches!(
        outcome,
        RunOutcome::Aborted(AbortReason::InvalidConfig(_))
    ));
    assert!(prober.calls().is_empty());
    assert_eq!(lines.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn neither_user_mode_aborts() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default().with("passwords.txt", &["1"]);
    let sink = MemorySink::default();
    let settings = BruteSettings {
        user: None,
        ..single_user("admin")
    };

    let outcome = BruteForcer::new(settings, &prober, &lines, &sink)
        .run(never())
        .await;
    assert!(matches!(
        outcome,
        RunOutcome::Aborted(AbortReason::InvalidConfig(_))
    ));
    assert!(prober.calls().is_empty());
}

#[tokio::test]
async fn missing_password_list_aborts_before_probing() {
    let prober = ScriptedProber::accepting(&[("admin", "admin")]);
    let lines = MemoryLines::default();
    let sink = MemorySink::default();

    let outcome = BruteForcer::new(single_user("admin"), &prober, &lines, &sink)
        .run(never())
        .await;
    match outcome {
        RunOutcome::Aborted(AbortReason::PasswordListNotFound(path)) => {
            assert_eq!(path, PathBuf::from("passwords.txt"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(prober.calls().is_empty());
}

#[tokio::test]
async fn missing_user_list_aborts_before_probing() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default().with("passwords.txt", &["1"]);
    let sink = MemorySink::default();

    let outcome = BruteForcer::new(user_list(), &prober, &lines, &sink)
        .run(never())
        .await;
    assert!(matches!(
        outcome,
        RunOutcome::Aborted(AbortReason::UserListNotFound(_))
    ));
    assert!(prober.calls().is_empty());
}

#[tokio::test]
async fn exhausted_runs_are_repeatable_and_write_nothing() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default().with("passwords.txt", &["1234", "letmein"]);
    let sink = MemorySink::default();
    let engine = BruteForcer::new(single_user("admin"), &prober, &lines, &sink);

    for _ in 0..2 {
        assert!(matches!(
            engine.run(never()).await,
            RunOutcome::Exhausted { attempts: 2 }
        ));
    }
    assert!(sink.written().is_empty());
}

#[tokio::test]
async fn transport_errors_do_not_stop_the_run() {
    let prober = ScriptedProber::accepting(&[("admin", "admin")]).with(
        "admin",
        "1234",
        AttemptOutcome::Transport {
            message: "connection refused".to_string(),
        },
    );
    let lines = MemoryLines::default().with("passwords.txt", &["1234", "admin"]);
    let sink = MemorySink::default();

    let outcome = BruteForcer::new(single_user("admin"), &prober, &lines, &sink)
        .run(never())
        .await;
    assert!(matches!(outcome, RunOutcome::Succeeded { attempts: 2, .. }));
}

#[tokio::test]
async fn interrupt_before_success_writes_nothing() {
    let notify = Arc::new(Notify::new());
    let prober = ScriptedProber::accepting(&[("admin", "letmein")]).interrupt_after(2, notify.clone());
    let lines = MemoryLines::default().with("passwords.txt", &["1234", "admin", "letmein"]);
    let sink = MemorySink::default();

    let shutdown = async move { notify.notified().await };
    let outcome = BruteForcer::new(single_user("admin"), &prober, &lines, &sink)
        .run(shutdown)
        .await;

    match outcome {
        RunOutcome::Interrupted {
            attempts,
            result_file,
        } => {
            assert_eq!(attempts, 2);
            assert!(result_file.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(prober.calls().len(), 2);
    assert!(sink.written().is_empty());
}

// never answers; signals once the request is in flight
struct StalledProber {
    started: Arc<Notify>,
    calls: AtomicUsize,
}

impl CredentialProber for StalledProber {
    fn attempt<'a>(
        &'a self,
        _target: &'a Target,
        _credential: &'a Credential,
    ) -> BoxFuture<'a, AttemptOutcome> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            std::future::pending::<AttemptOutcome>().await
        }
        .boxed()
    }
}

#[tokio::test]
async fn interrupt_cancels_an_in_flight_attempt() {
    let started = Arc::new(Notify::new());
    let prober = StalledProber {
        started: started.clone(),
        calls: AtomicUsize::new(0),
    };
    let lines = MemoryLines::default().with("passwords.txt", &["1234", "admin"]);
    let sink = MemorySink::default();

    let shutdown = async move { started.notified().await };
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        BruteForcer::new(single_user("admin"), &prober, &lines, &sink).run(shutdown),
    )
    .await
    .expect("run did not stop on interrupt");

    match outcome {
        RunOutcome::Interrupted {
            attempts,
            result_file,
        } => {
            assert_eq!(attempts, 0);
            assert!(result_file.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    assert!(sink.written().is_empty());
}

#[tokio::test]
async fn interrupt_reports_an_already_written_result() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default().with("passwords.txt", &["1234"]);
    let sink = MemorySink::default();
    let output = fixed_output();
    let existing = output.resolve(OutputFormat::Text);
    sink.write_record(&existing, b"previous").await.unwrap();

    let outcome = BruteForcer::new(single_user("admin"), &prober, &lines, &sink)
        .run_with_output(output, std::future::ready(()))
        .await;
    match outcome {
        RunOutcome::Interrupted {
            attempts,
            result_file,
        } => {
            assert_eq!(attempts, 0);
            assert_eq!(result_file, Some(existing));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(prober.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delay_follows_every_failed_attempt() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default().with("passwords.txt", &["1", "2", "3"]);
    let sink = MemorySink::default();
    let settings = BruteSettings {
        delay: Duration::from_secs(2),
        ..single_user("admin")
    };

    let start = tokio::time::Instant::now();
    let outcome = BruteForcer::new(settings, &prober, &lines, &sink)
        .run(never())
        .await;
    assert!(matches!(outcome, RunOutcome::Exhausted { attempts: 3 }));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn skip_final_delay_drops_the_last_wait() {
    let prober = ScriptedProber::accepting(&[]);
    let lines = MemoryLines::default().with("passwords.txt", &["1", "2", "3"]);
    let sink = MemorySink::default();
    let settings = BruteSettings {
        delay: Duration::from_secs(2),
        skip_final_delay: true,
        ..single_user("admin")
    };

    let start = tokio::time::Instant::now();
    BruteForcer::new(settings, &prober, &lines, &sink)
        .run(never())
        .await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn no_delay_after_success() {
    let prober = ScriptedProber::accepting(&[("admin", "admin")]);
    let lines = MemoryLines::default().with("passwords.txt", &["admin", "1234"]);
    let sink = MemorySink::default();
    let settings = BruteSettings {
        delay: Duration::from_secs(10),
        ..single_user("admin")
    };

    let start = tokio::time::Instant::now();
    let outcome = BruteForcer::new(settings, &prober, &lines, &sink)
        .run(never())
        .await;
    assert!(matches!(outcome, RunOutcome::Succeeded { attempts: 1, .. }));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn sink_failure_still_reports_the_credential() {
    let prober = ScriptedProber::accepting(&[("admin", "admin")]);
    let lines = MemoryLines::default().with("passwords.txt", &["admin"]);
    let sink = MemorySink {
        fail: true,
        ..MemorySink::default()
    };

    match BruteForcer::new(single_user("admin"), &prober, &lines, &sink)
        .run(never())
        .await
    {
        RunOutcome::Succeeded { record, saved, .. } => {
            assert_eq!(record.password, "admin");
            assert!(saved.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn file_backed_run_writes_the_timestamped_result() {
    let dir = std::env::temp_dir().join(format!("rtspbuster-run-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let passwords = dir.join("passwords.txt");
    tokio::fs::write(&passwords, "1234\nadmin\nletmein\n").await.unwrap();

    let settings = BruteSettings {
        password_wordlist: passwords.clone(),
        out_dir: dir.join("results"),
        ..single_user("admin")
    };
    let output = OutputPath::new(
        dir.join("results"),
        "camera",
        Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    );
    let prober = ScriptedProber::accepting(&[("admin", "admin")]);
    let lines = FileLineSource;
    let sink = FileSink;

    let outcome = BruteForcer::new(settings, &prober, &lines, &sink)
        .run_with_output(output, never())
        .await;
    let saved = match outcome {
        RunOutcome::Succeeded { saved, .. } => saved.unwrap(),
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(
        saved,
        dir.join("results").join("camera(2024-01-02 03-04-05).txt")
    );
    let contents = tokio::fs::read_to_string(&saved).await.unwrap();
    assert_eq!(contents, "[+] Success! Username: admin, Password: admin\n");

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn wordlist_with_invalid_utf8_still_runs() {
    let dir = std::env::temp_dir().join(format!("rtspbuster-latin1-run-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let passwords = dir.join("passwords.txt");
    tokio::fs::write(&passwords, b"1234\npa\xe9ss\nadmin\nletmein\n")
        .await
        .unwrap();

    let settings = BruteSettings {
        password_wordlist: passwords,
        ..single_user("admin")
    };
    let prober = ScriptedProber::accepting(&[("admin", "admin")]);
    let sink = MemorySink::default();

    let outcome = BruteForcer::new(settings, &prober, &FileLineSource, &sink)
        .run_with_output(fixed_output(), never())
        .await;
    tokio::fs::remove_dir_all(&dir).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Succeeded { attempts: 3, .. }));
    assert_eq!(
        prober.calls(),
        vec![
            ("admin".to_string(), "1234".to_string()),
            ("admin".to_string(), "pa\u{FFFD}ss".to_string()),
            ("admin".to_string(), "admin".to_string()),
        ]
    );
}
