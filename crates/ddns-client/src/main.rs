// # ddns-client - Dynamic DNS update client
//
// Keeps one domain current by calling a ddnsd server's direct update
// endpoint (`POST /`) once every two minutes. Point
// `DDNS_UPDATE_ENDPOINT_A` at an address of the server reachable over IPv4
// and `DDNS_UPDATE_ENDPOINT_AAAA` at one reachable over IPv6; the server
// writes whichever address it sees the request come from.
//
// ## Configuration
//
// - `DDNS_DOMAIN`: Domain to update (required)
// - `DDNS_SECRET`: Shared secret for the domain (required)
// - `DDNS_UPDATE_ENDPOINT_A`: Update URL reached over IPv4 (optional)
// - `DDNS_UPDATE_ENDPOINT_AAAA`: Update URL reached over IPv6 (optional)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// At least one endpoint must be set. Every variable can also be passed as a
// flag (`--domain`, `--secret`, `--endpoint-a`, `--endpoint-aaaa`,
// `--log-level`).
//
// ## Example
//
// ```bash
// export DDNS_DOMAIN=home.example.com
// export DDNS_SECRET=s3cret
// export DDNS_UPDATE_ENDPOINT_A=https://ddns4.example.com/
// export DDNS_UPDATE_ENDPOINT_AAAA=https://ddns6.example.com/
//
// ddns-client --once
// ```

mod updater;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ddns_core::DomainUpdateRequest;
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::updater::{Endpoint, Updater};

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Time between update rounds
const UPDATE_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Keep a domain's A/AAAA records current through a ddnsd server
#[derive(Parser)]
#[command(name = "ddns-client", version, about)]
struct Cli {
    /// Only perform one update round, then exit, rather than running as a service
    #[arg(long)]
    once: bool,

    /// Domain to update
    #[arg(long, env = "DDNS_DOMAIN")]
    domain: Option<String>,

    /// Shared secret for the domain
    #[arg(long, env = "DDNS_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Update endpoint reached over IPv4
    #[arg(long, env = "DDNS_UPDATE_ENDPOINT_A")]
    endpoint_a: Option<String>,

    /// Update endpoint reached over IPv6
    #[arg(long, env = "DDNS_UPDATE_ENDPOINT_AAAA")]
    endpoint_aaaa: Option<String>,

    /// Log level
    #[arg(long, env = "DDNS_LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

impl Cli {
    /// Build the updater, treating empty values as unset
    fn updater(&self) -> Result<Updater> {
        let set = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        let domain = set(&self.domain).context("environment variable 'DDNS_DOMAIN' is missing")?;
        let secret = set(&self.secret).context("environment variable 'DDNS_SECRET' is missing")?;

        let endpoints: Vec<Endpoint> = [
            ("A", set(&self.endpoint_a)),
            ("AAAA", set(&self.endpoint_aaaa)),
        ]
        .into_iter()
        .filter_map(|(record_type, url)| url.map(|url| Endpoint::new(record_type, url)))
        .collect();

        if endpoints.is_empty() {
            bail!(
                "at least one of the environment variables DDNS_UPDATE_ENDPOINT_A and \
                DDNS_UPDATE_ENDPOINT_AAAA must be set"
            );
        }

        Updater::new(DomainUpdateRequest { domain, secret }, endpoints)
    }
}

fn main() -> ExitCode {
    // --help and --version exit here
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let updater = match cli.updater() {
        Ok(updater) => updater,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = rt.block_on(async {
        if cli.once {
            updater.run_round().await
        } else {
            run_service(&updater).await
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run a round now and then every [`UPDATE_INTERVAL`] until a shutdown signal
///
/// A failed round is logged and the next one runs on schedule.
async fn run_service(updater: &Updater) -> Result<()> {
    let shutdown = shutdown_signal()?;
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(UPDATE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Updating '{}' every {}s",
        updater.domain(),
        UPDATE_INTERVAL.as_secs()
    );

    loop {
        tokio::select! {
            name = &mut shutdown => {
                info!("Received shutdown signal: {}", name);
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = updater.run_round().await {
                    error!("{:#}", e);
                }
            }
        }
    }
}

/// Install handlers for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm: Signal =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint: Signal =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                "CTRL-C handler error"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ddns-client").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_both_endpoints() {
        let cli = parse(&[
            "--domain",
            "home.example.com",
            "--secret",
            "s3cret",
            "--endpoint-a",
            "http://192.0.2.1:7001/",
            "--endpoint-aaaa",
            "http://[2001:db8::1]:7001/",
            "--once",
        ]);
        assert!(cli.once);

        let debug_str = format!("{:?}", cli.updater().unwrap());
        assert!(debug_str.contains("192.0.2.1"));
        assert!(debug_str.contains("2001:db8::1"));
        assert!(!debug_str.contains("s3cret"));
    }

    #[test]
    fn test_endpoint_required() {
        let cli = parse(&[
            "--domain",
            "home.example.com",
            "--secret",
            "s3cret",
            "--endpoint-a",
            "",
        ]);
        let err = cli.updater().unwrap_err();
        assert!(err.to_string().contains("DDNS_UPDATE_ENDPOINT_A"));
    }

    #[test]
    fn test_domain_and_secret_required() {
        let cli = parse(&["--secret", "s3cret", "--endpoint-a", "http://192.0.2.1/"]);
        assert!(cli.updater().unwrap_err().to_string().contains("DDNS_DOMAIN"));

        let cli = parse(&["--domain", "a.example.com", "--endpoint-a", "http://192.0.2.1/"]);
        assert!(cli.updater().unwrap_err().to_string().contains("DDNS_SECRET"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&[]).log_level, Level::INFO);
        assert_eq!(parse(&["--log-level", "debug"]).log_level, Level::DEBUG);
        assert!(Cli::try_parse_from(["ddns-client", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["ddns-client", "--version"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }
}
