mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bsrv_core::{BrowserManager, BrowserManagerConfig, SessionLogger, memory_driver::MemoryDriver};
use bsrv_security::{Authenticator, DomainPolicy, RateLimiter, RateLimiterConfig, SecurityConfig, SecurityManager};
use bsrv_server::{ServerConfig, ServerState};
use clap::Parser;
use config::Config;
use tracing::warn;

/// Browser automation command server.
#[derive(Debug, Parser)]
#[command(name = "bsrv", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "fatal error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    for flag in config.security_degrading_flags() {
        warn!(flag, "security-degrading configuration flag enabled");
    }

    let logger = Arc::new(
        SessionLogger::open(
            &config.logging.session_log_path,
            config.logging.max_log_file_size_mb * 1024 * 1024,
            config.logging.backup_count,
        )
        .context("failed to open session log")?,
    );

    // `PageDriver` is consumed from an external browser-driver collaborator
    // (any CDP/WebDriver-backed implementation of the trait in
    // bsrv_core::driver). This binary ships the in-memory reference driver
    // until a concrete production driver is wired in; see DESIGN.md.
    let driver = Arc::new(MemoryDriver::new());
    let manager_config = BrowserManagerConfig {
        headless: config.browser.headless,
        no_sandbox: config.browser.no_sandbox,
        disable_dev_shm: config.browser.disable_dev_shm,
        disable_web_security: config.browser.disable_web_security,
        slow_mo_ms: config.browser.slow_mo_ms,
        viewport_width: config.browser.viewport_width,
        viewport_height: config.browser.viewport_height,
        user_agent: config.browser.user_agent.clone(),
        ignore_https_errors: config.browser.ignore_https_errors,
        default_timeout_ms: config.browser.timeout_ms,
        session_timeout_seconds: config.browser.session_timeout_seconds,
    };
    let manager = BrowserManager::new(driver, manager_config, logger.clone());
    manager.initialize().await.context("failed to initialize browser manager")?;

    let security_config = SecurityConfig {
        enable_input_sanitization: config.security.enable_input_sanitization,
        max_selector_length: config.security.max_selector_length,
        max_text_input_length: config.security.max_text_input_length,
        max_url_length: config.security.max_url_length,
        allow_custom_js: config.security.allow_custom_js,
    };
    let domain_policy = DomainPolicy::new(
        config.security.allowed_domains.clone().unwrap_or_default(),
        config.security.blocked_domains.clone().unwrap_or_default(),
    );
    let security = SecurityManager::new(security_config, domain_policy);

    let rate_limiter = RateLimiter::new(RateLimiterConfig::per_minute(
        config.server.rate_limit_requests_per_minute as usize,
    ));
    let authenticator = Authenticator::new(config.server.enable_auth, config.server.api_key.clone().unwrap_or_default());

    let state = Arc::new(ServerState::new(
        manager,
        security,
        rate_limiter,
        authenticator,
        logger,
        config.server.max_concurrent_connections,
    ));

    bsrv_server::run(
        ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            cleanup_interval_seconds: config.browser.cleanup_interval_seconds,
        },
        state,
    )
    .await
    .context("command server error")
}
