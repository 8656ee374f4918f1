/// Subcommands of the `connect-service` binary
use std::io;

use crate::config::validation::ValidationReport;
use crate::config::RawEnv;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (no subcommand)
    Serve,
    /// Print the environment report and exit non-zero when it fails
    ValidateEnv,
    /// Probe the local `/api/health` for container healthchecks
    Healthcheck,
}

impl Command {
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut args = args.into_iter();
        let _bin = args.next();
        match args.next().as_deref() {
            None | Some("serve") => Ok(Command::Serve),
            Some("validate-env") => Ok(Command::ValidateEnv),
            Some("healthcheck") => Ok(Command::Healthcheck),
            Some(other) => Err(format!(
                "unknown command '{}'; expected serve, validate-env or healthcheck",
                other
            )),
        }
    }
}

/// Print the validation report; returns whether every required entry passed.
pub fn validate_env(raw: &RawEnv) -> bool {
    let report = ValidationReport::from_raw(raw);
    println!("{}", report.render());
    report.passed()
}

pub async fn healthcheck(raw: &RawEnv) -> io::Result<()> {
    let port = raw
        .port
        .as_deref()
        .and_then(|p| p.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let url = format!("http://127.0.0.1:{}/api/health", port);

    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            eprintln!("healthcheck HTTP status: {}", resp.status());
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
        }
        Err(e) => {
            eprintln!("healthcheck HTTP error: {}", e);
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
        }
    }
}
