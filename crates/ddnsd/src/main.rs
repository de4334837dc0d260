// # ddnsd - Dynamic DNS update server
//
// This daemon is a thin integration layer:
// 1. Reading configuration from environment variables
// 2. Verifying the DigitalOcean API key
// 3. Loading the domains file
// 4. Serving the update endpoints until SIGTERM/SIGINT
// 5. Reloading the domains file on SIGHUP
//
// All update logic lives in ddns-core.
//
// ## Configuration
//
// - `DO_API_KEY`: DigitalOcean personal access token (required)
// - `DOMAINS_CONFIG_PATH`: Path to the domains JSON file (required)
// - `PORT`: Listen port (default 7001)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
// - `DO_API_BASE`: Override the DigitalOcean API root (optional)
//
// ## Example
//
// ```bash
// export DO_API_KEY=dop_v1_...
// export DOMAINS_CONFIG_PATH=/etc/ddns/domains.json
// export PORT=7001
//
// ddnsd
// ```

mod server;

use anyhow::{Context, Result};
use ddns_core::{DomainRegistry, UpdateCache, UpdateEngine};
use ddns_provider_digitalocean::DigitalOceanProvider;
use std::env;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Listen port when `PORT` is unset
const DEFAULT_PORT: u16 = 7001;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Clone)]
struct Config {
    api_key: String,
    api_base: Option<String>,
    domains_config_path: PathBuf,
    port: u16,
    port_defaulted: bool,
    log_level: String,
}

// The API key stays out of Debug output
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("domains_config_path", &self.domains_config_path)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    ///
    /// Empty values are treated as unset.
    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let api_key = var("DO_API_KEY").context("environment variable 'DO_API_KEY' is missing")?;
        let domains_config_path = var("DOMAINS_CONFIG_PATH")
            .context("environment variable 'DOMAINS_CONFIG_PATH' is missing")?;

        let (port, port_defaulted) = match var("PORT") {
            Some(port) => (
                port.parse::<u16>()
                    .with_context(|| format!("PORT '{}' is not a valid port number", port))?,
                false,
            ),
            None => (DEFAULT_PORT, true),
        };

        Ok(Self {
            api_key,
            api_base: var("DO_API_BASE"),
            domains_config_path: PathBuf::from(domains_config_path),
            port,
            port_defaulted,
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be between 1 and 65535");
        }

        if let Some(ref base) = self.api_base
            && !base.starts_with("https://")
            && !base.starts_with("http://")
        {
            anyhow::bail!("DO_API_BASE must use HTTP or HTTPS scheme. Got: {}", base);
        }

        if !self.domains_config_path.is_file() {
            anyhow::bail!(
                "DOMAINS_CONFIG_PATH does not point to a file: {}",
                self.domains_config_path.display()
            );
        }

        self.log_level()?;
        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    if config.port_defaulted {
        warn!(
            "environment variable 'PORT' is missing; defaulting to {}",
            DEFAULT_PORT
        );
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let started = match start(&config).await {
            Ok(started) => started,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(&config, started).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    })
    .into()
}

/// Everything built during startup
struct Started {
    engine: Arc<UpdateEngine>,
    registry: Arc<DomainRegistry>,
    listener: TcpListener,
}

/// Build the provider, load domains and bind the listener
async fn start(config: &Config) -> Result<Started> {
    let mut provider = DigitalOceanProvider::new(config.api_key.clone())
        .context("failed to initialize DigitalOcean API client")?;
    if let Some(ref base) = config.api_base {
        info!("Using DigitalOcean API at {}", base);
        provider = provider.with_base_url(base.clone());
    }
    provider
        .verify()
        .await
        .context("failed to initialize DigitalOcean API client")?;
    info!("DigitalOcean API key verified");

    let registry = Arc::new(
        DomainRegistry::from_file(&config.domains_config_path).with_context(|| {
            format!(
                "couldn't load config file '{}'",
                config.domains_config_path.display()
            )
        })?,
    );
    info!(
        "Configuration loaded: {} domain(s)",
        registry.snapshot().len()
    );

    let engine = Arc::new(UpdateEngine::new(
        Arc::new(provider),
        UpdateCache::new(),
        registry.clone(),
    ));

    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            // Hosts without IPv6 still get a listener
            warn!("Failed to bind {}: {}; falling back to IPv4", addr, e);
            TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port)))
                .await
                .with_context(|| format!("failed to bind port {}", config.port))?
        }
    };

    Ok(Started {
        engine,
        registry,
        listener,
    })
}

/// Run the daemon
async fn run_daemon(config: &Config, started: Started) -> Result<()> {
    let Started {
        engine,
        registry,
        listener,
    } = started;

    let shutdown = shutdown_signal()?;
    spawn_reload_task(registry, config.domains_config_path.clone())?;

    info!("server is listening on port {}", config.port);
    server::serve(listener, engine, async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
        info!("Shutting down daemon");
    })
    .await
    .context("HTTP server failed")?;

    info!("Daemon stopped");
    Ok(())
}

/// Reload the domains file on every SIGHUP
///
/// A failed reload keeps the previous configuration in place.
#[cfg(unix)]
fn spawn_reload_task(registry: Arc<DomainRegistry>, path: PathBuf) -> Result<()> {
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    tokio::spawn(async move {
        while sighup.recv().await.is_some() {
            info!("Received SIGHUP, reloading {}", path.display());
            match registry.reload_from_file(&path) {
                Ok(count) => info!("Configuration reloaded: {} domain(s)", count),
                Err(e) => error!("Reload failed, keeping previous configuration: {}", e),
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn spawn_reload_task(_registry: Arc<DomainRegistry>, _path: PathBuf) -> Result<()> {
    warn!("Configuration reload is only available on Unix");
    Ok(())
}

/// Install handlers for shutdown signals (SIGTERM, SIGINT)
///
/// Handlers are installed before returning, so a failure surfaces at
/// startup. The returned future resolves with the name of the signal.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm: Signal = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint: Signal = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback implementation for non-Unix platforms.
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
