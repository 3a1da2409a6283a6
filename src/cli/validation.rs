use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(delay) = args.delay {
        crate::utils::parse_delay_seconds(delay)
            .map_err(|e| format!("invalid --delay '{delay}': {e}"))?;
    }
    if args.target_port == Some(0) {
        return Err("invalid --target-port, expected 1-65535".to_string());
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected a positive number of seconds".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    if args.user.is_some() && args.user_wordlist.is_some() {
        return Err("use either --user or --user-wordlist, not both".to_string());
    }
    Ok(())
}
