use std::process::ExitCode;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::time::Instant;

use crate::bruteforcer::RunOutcome;
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::output::OutputFormat;
use crate::runner::{Options, Runner};

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_opt_value<'a>(v: Option<&'a str>, default: &'a str) -> &'a str {
    match v {
        Some(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    connection_test: bool,
    brute_force: bool,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let target_ip = args
        .target_ip
        .or(cfg.target_ip)
        .filter(|ip| !ip.trim().is_empty());
    let target_port = args.target_port.or(cfg.target_port);
    let (target_ip, target_port) = match (target_ip, target_port) {
        (Some(ip), Some(port)) => (ip, port),
        _ => return Err("--target-ip and --target-port are required (see --help)".to_string()),
    };
    if target_port == 0 {
        return Err("invalid target port 0, expected 1-65535".to_string());
    }

    let delay_secs = args.delay.or(cfg.delay).unwrap_or(2.0);
    let delay = crate::utils::parse_delay_seconds(delay_secs)?;
    let skip_final_delay = args.skip_final_delay || cfg.skip_final_delay.unwrap_or(false);
    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(5);
    if timeout_seconds == 0 {
        return Err("invalid timeout 0, expected a positive number of seconds".to_string());
    }

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let output_format_raw = args.output_format.or(cfg.output_format);
    let output_format = match output_format_raw.as_deref() {
        Some(raw) => OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text or json"))?,
        None => OutputFormat::Text,
    };

    let user = args.user.or(cfg.user);
    let user_wordlist = args
        .user_wordlist
        .or(cfg.user_wordlist)
        .map(|p| config::expand_tilde_string(&p));
    let password_wordlist = args
        .password_wordlist
        .or(cfg.password_wordlist)
        .map(|p| config::expand_tilde_string(&p));
    let out_file_path = args
        .out_file_path
        .or(cfg.out_file_path)
        .map(|p| config::expand_tilde_string(&p));
    let file_name = args.file_name.or(cfg.file_name);

    let options = Options {
        target_ip,
        target_port,
        timeout_seconds,
        user_agent: args
            .user_agent
            .or(cfg.user_agent)
            .unwrap_or_else(|| crate::prober::DEFAULT_USER_AGENT.to_string()),
        proxy: args.proxy.or(cfg.proxy),
        delay,
        skip_final_delay,
        user,
        user_wordlist,
        password_wordlist,
        out_file_path,
        file_name,
        output_format,
    };

    let brute_force = options.wants_brute_force();
    if brute_force {
        if options.password_wordlist.is_none()
            || options.out_file_path.is_none()
            || options.file_name.is_none()
        {
            return Err(
                "brute force requires --password-wordlist, --out-file-path and --file-name"
                    .to_string(),
            );
        }
        match (options.user.is_some(), options.user_wordlist.is_some()) {
            (true, true) => {
                return Err("Use either --user or --user-wordlist, not both.".to_string())
            }
            (false, false) => {
                return Err("Either --user or --user-wordlist must be provided.".to_string())
            }
            _ => {}
        }
    }

    let connection_test = args.connection_test;
    if !connection_test && !brute_force {
        return Err(
            "nothing to do: pass --connection-test and/or the brute force options (see --help)"
                .to_string(),
        );
    }

    Ok(RunConfig {
        options,
        connection_test,
        brute_force,
        no_color,
        verbose: args.verbose,
    })
}

fn report_outcome(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Succeeded { saved, attempts, .. } => {
            println!("Operation terminated after {attempts} attempt(s).");
            if saved.is_some() {
                ExitCode::SUCCESS
            } else {
                println!("{} The result could not be saved.", "[-]".red());
                ExitCode::FAILURE
            }
        }
        RunOutcome::Exhausted { attempts } => {
            println!(
                "{} No valid credentials found after {attempts} attempt(s).",
                "[-]".red()
            );
            ExitCode::SUCCESS
        }
        RunOutcome::Interrupted {
            attempts,
            result_file,
        } => {
            println!(
                "{}",
                format!("\n[!] User interrupted the script after {attempts} attempt(s). Exiting gracefully...")
                    .yellow()
            );
            match result_file {
                Some(path) => println!(
                    "{}",
                    format!("[+] Successfully wrote results to: {}", path.display()).green()
                ),
                None => println!("{} No result file was written.", "[!]".yellow()),
            }
            ExitCode::SUCCESS
        }
        RunOutcome::Aborted(reason) => {
            println!("{}", format!("[-] ERROR: {reason}").red());
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for ctrl-c, interruption disabled");
        std::future::pending::<()>().await;
    }
}

async fn run_async(run: RunConfig) -> Result<ExitCode, String> {
    let runner = Runner::new(run.options).map_err(|e| e.to_string())?;
    let opts = runner.options();

    println!();
    format_kv_line("Target", &runner.target().to_string());
    format_kv_line("Timeout", &format!("{}s", opts.timeout_seconds));
    format_kv_line("User-Agent", &opts.user_agent);
    if run.brute_force {
        format_kv_line("Delay", &format!("{}s", opts.delay.as_secs_f64()));
        format_kv_line("User", format_opt_value(opts.user.as_deref(), "-"));
        format_kv_line("Userlist", format_opt_value(opts.user_wordlist.as_deref(), "-"));
        format_kv_line("Passlist", format_opt_value(opts.password_wordlist.as_deref(), "-"));
        format_kv_line("Output", format_opt_value(opts.out_file_path.as_deref(), "-"));
        format_kv_line("Proxy", format_opt_value(opts.proxy.as_deref(), "none"));
    }
    println!();

    let mut code = ExitCode::SUCCESS;

    if run.connection_test {
        println!("  \n           ~~~~~~~ Connection test ~~~~~~~\n");
        runner.connection_test().await;
        println!();
    }

    if run.brute_force {
        println!("  \n           ~~~~~~~ Credential trials ~~~~~~~\n");
        let pb = ProgressBar::new(0);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(200));
        pb.set_style(
            ProgressStyle::with_template(
                ":: Progress: [{pos}/{len}] :: Duration: [{elapsed_precise}] :: {msg}",
            )
            .map_err(|e| format!("failed to build progress bar style: {e}"))?
            .progress_chars(r#"#>-"#),
        );

        let now = Instant::now();
        let outcome = runner
            .brute_force(pb.clone(), shutdown_signal())
            .await
            .map_err(|e| e.to_string())?;
        pb.finish_and_clear();

        code = report_outcome(&outcome);
        println!(":: Completed :: run took {}s ::", now.elapsed().as_secs());
    }

    Ok(code)
}

pub fn run_cli() -> Result<ExitCode, String> {
    if std::env::args_os().len() <= 1 {
        let mut cmd = CliArgs::command();
        print!("{}", cmd.render_long_help());
        println!();
        return Ok(ExitCode::SUCCESS);
    }

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                let mut cmd = CliArgs::command();
                print!("{}", cmd.render_long_help());
                return Ok(ExitCode::SUCCESS);
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(ExitCode::SUCCESS);
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path))?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    if run.no_color {
        colored::control::set_override(false);
    }
    crate::logging::initialize_logging(run.verbose, run.no_color)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
