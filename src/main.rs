use clap::Parser;
use log::{error, info, warn};
use tokio::sync::watch;

use crossfade_player::audio::{CpalPlayerFactory, DeviceManager};
use crossfade_player::cli::{CliApp, StatusDisplay};
use crossfade_player::config::ConfigManager;
use crossfade_player::crossfade::PlaybackSession;
use crossfade_player::error::{AudioError, ErrorSeverity, PlayerError};
use crossfade_player::logging::AudioLogger;

#[tokio::main]
async fn main() {
    // Keep the status line readable unless asked otherwise
    if std::env::var("CROSSFADE_PLAYER_LOG_LEVEL").is_err() {
        std::env::set_var("CROSSFADE_PLAYER_LOG_LEVEL", "warn");
    }
    if let Err(e) = AudioLogger::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = CliApp::parse();

    if let Err(e) = run(cli).await {
        match e.severity() {
            ErrorSeverity::Info => info!("{}", e),
            ErrorSeverity::Warning => warn!("{}", e),
            ErrorSeverity::Error | ErrorSeverity::Critical => error!("{}", e),
        }
        StatusDisplay::display_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: CliApp) -> Result<(), PlayerError> {
    if cli.list_devices {
        return list_devices();
    }

    let (track_a, track_b) = cli.tracks()?;
    let status_interval = cli.status_interval()?;

    let mut config_manager = match ConfigManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            warn!("Using default settings: {}", e.user_message());
            None
        }
    };

    let mut config = config_manager
        .as_ref()
        .map(|manager| manager.get_config().clone())
        .unwrap_or_default();
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.save_config {
        match config_manager.as_mut() {
            Some(manager) => {
                let saved = config.clone();
                manager.update_config(|stored| *stored = saved)?;
                println!("Settings saved to {}", manager.config_path().display());
            }
            None => eprintln!("Warning: No configuration directory, settings not saved"),
        }
    }

    let factory = CpalPlayerFactory::new(config.preferred_device.clone());
    let mut session = PlaybackSession::new(factory, config)?;
    session.start(track_a, track_b).await?;
    println!("Crossfading between '{}' and '{}'. Press Ctrl-C to stop.", track_a, track_b);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })
    .map_err(|e| AudioError::InitializationFailed(format!("Failed to install Ctrl-C handler: {}", e)))?;

    let mut ticker = tokio::time::interval(status_interval);
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => match session.status().await {
                Some(status) => StatusDisplay::display_status_line(&status),
                None => break,
            },
        }
    }

    println!();
    if let Some(status) = session.status().await {
        StatusDisplay::display_full_status(&status);
    }
    println!("Stopping...");
    session.stop().await;

    let stats = session.logger().get_event_statistics();
    info!(
        "Session finished: {} crossfades, {} decode errors, {} volume errors",
        stats.crossfades, stats.decode_errors, stats.volume_errors
    );
    Ok(())
}

fn list_devices() -> Result<(), PlayerError> {
    let manager = DeviceManager::new();
    let devices = manager.list_devices()?;
    if devices.is_empty() {
        println!("No audio devices found");
        return Ok(());
    }

    let default_device = manager.default_device_name();
    println!("Available audio devices:");
    for device in devices {
        let marker = if Some(&device) == default_device.as_ref() { "*" } else { " " };
        println!("{} {}", marker, device);
    }
    Ok(())
}
