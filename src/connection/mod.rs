use colored::Colorize;

use crate::prober::{HandshakeProber, ProbeErrorKind, Target};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionReport {
    Response(String),
    NoResponse,
    Failed(ProbeErrorKind),
}

impl ConnectionReport {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ConnectionReport::Response(_))
    }
}

// one DESCRIBE exchange, printed as it goes
pub async fn run_connection_test(
    prober: &dyn HandshakeProber,
    target: &Target,
) -> ConnectionReport {
    println!("{} Connecting to {}...", "[*]".yellow(), target);
    println!("{} Sending DESCRIBE request...", "[*]".yellow());

    let result = prober.probe(target).await;
    let report = match result.error {
        Some(kind) => ConnectionReport::Failed(kind),
        None if result.ok => ConnectionReport::Response(result.raw_response),
        None => ConnectionReport::NoResponse,
    };
    tracing::info!(device = %target, reachable = report.is_reachable(), "connection test finished");

    match &report {
        ConnectionReport::Response(raw) => {
            println!("{} Response:\n", "[!]".yellow());
            println!("{}", raw.green());
        }
        ConnectionReport::NoResponse => {
            println!("{} No response received from the server.", "[-]".red());
        }
        ConnectionReport::Failed(ProbeErrorKind::Timeout) => {
            println!(
                "{} Connection timed out. The server did not respond.",
                "[-]".red()
            );
        }
        ConnectionReport::Failed(ProbeErrorKind::ConnectionRefused) => {
            println!(
                "{} Connection refused. The server may be down or the port is closed.",
                "[-]".red()
            );
        }
        ConnectionReport::Failed(ProbeErrorKind::Other { message }) => {
            println!("{} An unexpected ERROR occurred: {}", "[-]".red(), message);
        }
    }
    report
}
