mod cli;
mod error_fmt;
#[cfg(unix)]
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::Result;
use pad_core::error::PadError;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: color-eyre not installed: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "padctl failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            cycles,
            tick_ms,
            threshold,
            stats,
            rt,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Release)) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }
            let opts = run::RunOpts {
                cycles,
                tick_ms,
                threshold,
                stats,
                rt,
            };
            run::run(&cfg, &opts, &shutdown, cli.json)
        }
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
    }
}

fn load_config(path: &Path) -> Result<pad_config::Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eyre::Report::new(PadError::Config(format!("read {}: {e}", path.display())))
    })?;
    let cfg = pad_config::load_toml(&text).map_err(|e| {
        eyre::Report::new(PadError::Config(format!("parse {}: {e}", path.display())))
    })?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(PadError::Config(e.to_string())))?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &pad_config::Logging) -> Result<()> {
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| eyre::Report::new(PadError::Config(format!("--log-level {level}: {e}"))))?;
    let console = fmt::layer().with_writer(std::io::stderr);
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![if json {
        console.json().with_filter(console_filter).boxed()
    } else {
        console.with_target(false).with_filter(console_filter).boxed()
    }];

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "pad.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = logging.level.as_deref().unwrap_or("info");
        let file_filter = EnvFilter::try_new(file_level).map_err(|e| {
            eyre::Report::new(PadError::Config(format!("logging.level {file_level}: {e}")))
        })?;
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("logging init failed: {e}"))
}
