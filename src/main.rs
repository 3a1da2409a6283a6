use std::process::ExitCode;

use colored::Colorize;

fn main() -> ExitCode {
    match rtspbuster::app::run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "[-] ERROR:".red(), e);
            ExitCode::FAILURE
        }
    }
}
