use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rtspbuster",
    version,
    about = "credential and connectivity auditing tool for RTSP/HTTP cameras",
    long_about = "rtspbuster tests username/password pairs against the HTTP interface of a camera you are authorized to audit, and can send a one-shot RTSP DESCRIBE to check reachability.\n\nExamples:\n  rtspbuster -t 10.0.0.5 -p 554 --connection-test\n  rtspbuster -t 10.0.0.5 -p 80 -u admin --pl passwords.txt -o ./out --fn camera\n  rtspbuster -t 10.0.0.5 -p 80 --ul users.txt --pl passwords.txt -o ./out --fn camera -d 0.5\n\nTip: Use --config to persist settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 't',
        long = "target-ip",
        value_name = "HOST",
        help_heading = "Target",
        help = "Target IP or hostname of the device."
    )]
    pub target_ip: Option<String>,

    #[arg(
        short = 'p',
        long = "target-port",
        value_name = "PORT",
        help_heading = "Target",
        help = "Target port of the device."
    )]
    pub target_port: Option<u16>,

    #[arg(
        short = 'c',
        long = "connection-test",
        help_heading = "Target",
        help = "Send a single RTSP DESCRIBE request and print the reply."
    )]
    pub connection_test: bool,

    #[arg(
        short = 'd',
        long = "delay",
        value_name = "SECONDS",
        allow_negative_numbers = true,
        help_heading = "Bruteforce",
        help = "Delay between attempts in seconds (default 2)."
    )]
    pub delay: Option<f64>,

    #[arg(
        long = "skip-final-delay",
        help_heading = "Bruteforce",
        help = "Do not wait after the last candidate."
    )]
    pub skip_final_delay: bool,

    #[arg(
        short = 'u',
        long = "user",
        value_name = "USER",
        help_heading = "Credentials",
        help = "Single username to test."
    )]
    pub user: Option<String>,

    #[arg(
        short = 'U',
        long = "ul",
        visible_alias = "user-wordlist",
        value_name = "FILE",
        help_heading = "Credentials",
        help = "Username wordlist (one per line)."
    )]
    pub user_wordlist: Option<String>,

    #[arg(
        short = 'P',
        long = "pl",
        visible_alias = "password-wordlist",
        value_name = "FILE",
        help_heading = "Credentials",
        help = "Password wordlist (one per line)."
    )]
    pub password_wordlist: Option<String>,

    #[arg(
        short = 'o',
        long = "out-file-path",
        value_name = "DIR",
        help_heading = "Output",
        help = "Directory the result file is written to."
    )]
    pub out_file_path: Option<String>,

    #[arg(
        short = 'f',
        long = "fn",
        visible_alias = "file-name",
        value_name = "NAME",
        help_heading = "Output",
        help = "Base name of the result file."
    )]
    pub file_name: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Result file format (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds (default 5)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'A',
        long = "ua",
        visible_alias = "user-agent",
        value_name = "AGENT",
        help_heading = "HTTP",
        help = "User-Agent sent by both probes."
    )]
    pub user_agent: Option<String>,

    #[arg(
        short = 'x',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL for credential requests (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to a YAML config file."
    )]
    pub config: Option<String>,
}
