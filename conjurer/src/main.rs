//! Conjurer - Entry Point
//!
//! Runs the post-deployment phase of a spell: readiness, then the spell's
//! configuration steps, printing the collected step results at the end.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use conjurer::app::controller::Controller;
use conjurer::app::options::AppOptions;
use conjurer::app::run::run;
use conjurer::app::session::Session;
use conjurer::logs::{init_logging, LogLevel, LogOptions};
use conjurer::placement::bundle::load_bundle;
use conjurer::placement::engine::PlacementEngine;
use conjurer::process::runner::TokioProcessRunner;
use conjurer::storage::layout::{SpellLayout, StorageLayout};
use conjurer::storage::settings::Settings;
use conjurer::utils::{error_line, info_line, version_info, warning_line};

use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", error_line(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();
    let mut inputs: Vec<(String, String, String)> = Vec::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            if clean_key == "input" {
                inputs.push(parse_input(value)?);
            } else {
                cli_args.insert(clean_key.to_string(), value.to_string());
            }
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(ExitCode::SUCCESS);
    }

    let spell_dir = cli_args
        .get("spell-dir")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: conjurer --spell-dir=<path> [--spell=<name>] [--input=<step>:<KEY>=<value>]"))?;
    let spell = cli_args
        .get("spell")
        .cloned()
        .or_else(|| spell_dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .ok_or_else(|| anyhow!("unable to derive a spell name from {}", spell_dir.display()))?;

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    layout.setup().await.context("unable to create storage directories")?;

    // Retrieve the settings file
    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        settings_file
            .read_json::<Settings>()
            .await
            .context("unable to read settings file")?
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_level = match cli_args.get("log-level") {
        Some(level) => level.parse::<LogLevel>().map_err(|e| anyhow!(e))?,
        None => settings.log_level.clone(),
    };
    let log_options = LogOptions {
        log_level,
        json_format: settings.json_logs,
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("{}", warning_line(&format!("Failed to initialize logging: {e}")));
            None
        }
    };

    let session = Session::new(spell, SpellLayout::new(&spell_dir))
        .load_metadata()
        .await?;
    println!("{}", info_line(&format!("Conjuring {}", session.display_name())));

    report_placements(&session).await;

    let options = AppOptions::from_settings(&settings);
    info!("Running conjurer with options: {:?}", options);

    let mut controller = Controller::new(options.clone(), session, Arc::new(TokioProcessRunner::new()));
    for (step, key, value) in inputs {
        controller = controller.with_input(step, key, value);
    }

    match run(options, controller, await_shutdown_signal()).await {
        Ok(session) => {
            let results = session.results().cloned().unwrap_or_default();
            for (title, payload) in results.iter() {
                println!("{}", info_line(&format!("{}: {}", title, payload)));
            }
            println!("{}", info_line(session.status()));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", error_line(&e.to_string()));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `<step title>:<KEY>=<value>`
fn parse_input(value: &str) -> anyhow::Result<(String, String, String)> {
    let (step, assignment) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid --input '{}', expected <step>:<KEY>=<value>", value))?;
    let (key, val) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid --input '{}', expected <step>:<KEY>=<value>", value))?;
    Ok((step.to_string(), key.to_string(), val.to_string()))
}

/// Log the placements a spell's bundle asks for
async fn report_placements(session: &Session) {
    let bundle_file = session.layout().bundle_file();
    if !bundle_file.exists().await {
        return;
    }

    let mut engine = PlacementEngine::new();
    let seeded = match load_bundle(&bundle_file).await {
        Ok(bundle) => bundle.seed(&mut engine),
        Err(e) => Err(e),
    };
    if let Err(e) = seeded {
        warn!("Unable to read bundle placements: {}", e);
        return;
    }

    for app in engine.applications() {
        let directives = engine.placement_directives(&app.name);
        if !directives.is_empty() {
            info!("{} placed at {}", app.name, directives.join(", "));
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    warn!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
