use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use service_doctor::application::config::AppConfig;
use service_doctor::application::services::alert_tracker::AlertTracker;
use service_doctor::application::services::scanner::Scanner;
use service_doctor::domain::ports::clock::{Clock, SystemClock};
use service_doctor::domain::value_objects::RetentionPolicy;
use service_doctor::domain::value_objects::policy::hours_to_delta;
use service_doctor::infrastructure::os::systemd_probe::SystemdProbe;
use service_doctor::infrastructure::registry::{build_channels, build_stores};
use service_doctor::presentation::cli::app::{Cli, Commands};
use service_doctor::presentation::cli::commands::cleanup::run_cleanup;
use service_doctor::presentation::cli::commands::daemon::{
    Schedule, run_daemon, spawn_shutdown_listener,
};
use service_doctor::presentation::cli::commands::failures::run_failures;
use service_doctor::presentation::cli::commands::init::run_init;
use service_doctor::presentation::cli::commands::scan::run_scan;

fn print_banner(services: &[String]) {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  SERVICE DOCTOR".bold().cyan());
    println!("  watching: {}", services.join(", "));
    println!("{}", "━".repeat(40).cyan());
}

/// Console layer always; a daily-rolling, non-ANSI file layer when `log_file` is set.
fn setup_tracing(verbose: bool, log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = match log_file {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(path).as_ref());
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), PathBuf::from);
            let prefix = path.file_name().map_or_else(
                || "service-doctor.log".into(),
                |n| n.to_string_lossy().into_owned(),
            );
            std::fs::create_dir_all(&dir).context("Failed to create log directory")?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(prefix)
                .max_log_files(14)
                .build(&dir)
                .context("Failed to open log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Returns the config and whether a default file was just written.
fn load_config(path: &Path, explicit: bool) -> anyhow::Result<(AppConfig, bool)> {
    let (mut config, created) = if explicit {
        (AppConfig::load_from(path)?, false)
    } else {
        AppConfig::load_or_create_reporting(path)?
    };
    config.apply_env_overrides(|name| std::env::var(name).ok());
    Ok((config, created))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_path()?,
    };

    if let Some(Commands::Init) = cli.command {
        run_init(&config_path)?;
        return Ok(());
    }

    let (config, created) = load_config(&config_path, cli.config.is_some())?;
    setup_tracing(cli.verbose, config.general.log_file.as_deref())?;
    if created {
        tracing::warn!(
            "Wrote default configuration to {}; add units to general.services",
            config_path.display()
        );
    }

    // Manual DI: main.rs is the only place that knows concrete types
    let clock = SystemClock;

    match cli.command {
        Some(Commands::Daemon) | None => {
            config.validate()?;
            let stores = build_stores(&config.stores);
            let channels = build_channels(&config.channels);
            let probe = SystemdProbe::new(config.probe.user_mode, config.probe_timeout());
            let mut scanner = Scanner::new(
                config.general.services.clone(),
                &probe,
                &stores,
                &channels,
                &clock,
                AlertTracker::new(config.alert_policy()?),
            );
            let cancel = CancellationToken::new();
            spawn_shutdown_listener(cancel.clone());

            print_banner(&config.general.services);
            run_daemon(
                &mut scanner,
                &stores,
                config.retention_policy()?,
                &clock,
                Schedule {
                    scan_interval: config.scan_interval(),
                    cleanup_interval: config.cleanup_interval(),
                },
                cancel,
            )
            .await?;
            println!("\nService doctor stopped.");
        }
        Some(Commands::Scan { json }) => {
            config.validate()?;
            let stores = build_stores(&config.stores);
            let channels = build_channels(&config.channels);
            let probe = SystemdProbe::new(config.probe.user_mode, config.probe_timeout());
            let mut scanner = Scanner::new(
                config.general.services.clone(),
                &probe,
                &stores,
                &channels,
                &clock,
                AlertTracker::new(config.alert_policy()?),
            );
            let cancel = CancellationToken::new();
            spawn_shutdown_listener(cancel.clone());
            run_scan(&mut scanner, &cancel, json).await?;
        }
        Some(Commands::Cleanup { hours }) => {
            let policy = match hours {
                Some(h) => RetentionPolicy::from_hours(h)?,
                None => config.retention_policy()?,
            };
            let stores = build_stores(&config.stores);
            run_cleanup(&stores, policy, clock.now()).await;
        }
        Some(Commands::Failures {
            service,
            hours,
            json,
        }) => {
            let lookback = match hours {
                Some(h) => hours_to_delta(h, "--hours")?,
                None => config.alert_policy()?.window(),
            };
            let stores = build_stores(&config.stores);
            tracing::debug!("Event stores: {:?}", stores.names());
            run_failures(&stores, &service, lookback, clock.now(), json).await?;
        }
        // Handled before the config is loaded.
        Some(Commands::Init) => {}
    }

    Ok(())
}
