use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use arenabot::cli::{Cli, Command};
use arenabot::clock::SystemSleeper;
use arenabot::config::BotConfig;
use arenabot::executor::RequestExecutor;
use arenabot::gateway::ArenaGateway;
use arenabot::roster;
use arenabot::scheduler::CycleScheduler;
use arenabot::transport::HttpTransport;

fn push_kv(output: &mut String, key: &str, value: impl std::fmt::Display) {
    output.push_str(&format!("  {key:<24} {value}\n"));
}

fn config_source_label(config_path: Option<&std::path::Path>) -> String {
    config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults; no .arenabot/config.toml found)".to_string())
}

fn render_config_human(config: &BotConfig, config_path: Option<&std::path::Path>) -> String {
    let mut output = String::new();

    output.push_str("Service\n");
    push_kv(&mut output, "base_url", &config.base_url);
    push_kv(&mut output, "request_timeout_secs", config.request_timeout_secs);
    push_kv(&mut output, "max_retries", config.max_retries);
    output.push('\n');

    output.push_str("Battles\n");
    push_kv(&mut output, "rounds", config.rounds);
    push_kv(&mut output, "mode", config.mode_label());
    push_kv(&mut output, "poll_interval_secs", config.poll_interval_secs);
    push_kv(&mut output, "max_battle_wait_secs", config.max_battle_wait_secs);
    output.push('\n');

    output.push_str("Scheduling\n");
    push_kv(&mut output, "roster_file", &config.roster_file);
    push_kv(&mut output, "cycle_interval_secs", config.cycle_interval_secs);
    push_kv(
        &mut output,
        "account_delay_secs",
        format!("{}..{}", config.account_delay_secs[0], config.account_delay_secs[1]),
    );
    push_kv(&mut output, "error_cooldown_secs", config.error_cooldown_secs);
    output.push('\n');

    output.push_str("Source Path\n");
    push_kv(&mut output, "path", config_source_label(config_path));

    output
}

fn render_config_json(config: &BotConfig, config_path: Option<&std::path::Path>) -> Result<String> {
    let payload = serde_json::json!({
        "service": {
            "base_url": &config.base_url,
            "request_timeout_secs": config.request_timeout_secs,
            "max_retries": config.max_retries
        },
        "battles": {
            "rounds": config.rounds,
            "mode": config.mode_label(),
            "poll_interval_secs": config.poll_interval_secs,
            "max_battle_wait_secs": config.max_battle_wait_secs
        },
        "scheduling": {
            "roster_file": &config.roster_file,
            "cycle_interval_secs": config.cycle_interval_secs,
            "account_delay_secs": config.account_delay_secs,
            "error_cooldown_secs": config.error_cooldown_secs
        },
        "source_path": config_source_label(config_path)
    });

    serde_json::to_string_pretty(&payload).context("failed to serialize config to JSON")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_config_command = matches!(&cli.command, Command::Config { .. });

    let filter = match cli.verbose {
        0 if is_config_command => "arenabot=warn",
        0 => "arenabot=info",
        1 => "arenabot=debug",
        _ => "arenabot=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let (config, config_path) = BotConfig::load(&cwd)?;

    if !is_config_command || cli.verbose > 0 {
        match config_path {
            Some(ref p) => info!("loaded config from {}", p.display()),
            None => info!("no .arenabot/config.toml found, using defaults"),
        }
    }

    match cli.command {
        Command::Run { roster, once } => {
            let roster_path = roster.unwrap_or_else(|| PathBuf::from(&config.roster_file));
            let accounts = roster::load(&roster_path)?;
            info!(
                accounts = accounts.len(),
                roster = %roster_path.display(),
                "roster loaded"
            );

            let stop = Arc::new(AtomicBool::new(false));
            let stop_handler = Arc::clone(&stop);
            ctrlc::set_handler(move || {
                stop_handler.store(true, Ordering::Relaxed);
            })
            .context("failed to install ctrl-c handler")?;

            let transport = HttpTransport::new(&config.base_url, config.request_timeout());
            let sleeper = Arc::new(SystemSleeper);
            let executor = RequestExecutor::new(
                transport,
                config.max_retries,
                config.request_timeout(),
                sleeper.clone(),
            );
            let gateway = ArenaGateway::new(executor, config.rounds, config.challenge_mode);
            let scheduler =
                CycleScheduler::new(gateway, config, roster_path, sleeper, stop);

            let valid = scheduler.validate(accounts)?;
            scheduler.run(valid, once)?;
        }
        Command::Config { json } => {
            if json {
                println!("{}", render_config_json(&config, config_path.as_deref())?);
            } else {
                print!("{}", render_config_human(&config, config_path.as_deref()));
            }
        }
    }

    Ok(())
}
