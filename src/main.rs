use log::{error, info};

use sensor_monitor::{
    ConnectionConfig, ConnectionState, ConnectionWorker, MetricStats, WorkerEvent,
};

/// Render one metric's statistics the way the monitoring display shows them,
/// with dashes while no values have been retained yet.
fn format_stats(stats: &Option<MetricStats>) -> String {
    match stats {
        Some(s) => format!("mean={:.2} max={:.2} min={:.2}", s.mean, s.max, s.min),
        None => "mean=- max=- min=-".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match ConnectionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Starting sensor monitor for {}:{} topic {}",
        config.host(),
        config.port(),
        config.topic()
    );

    let mut worker = ConnectionWorker::new();
    worker.configure(config)?;
    let mut events = worker.start()?;

    // Drain worker events until the session ends or the user interrupts
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(WorkerEvent::Status { state, message }) => {
                    info!("Status: {}", message);
                    if state == ConnectionState::Disconnected {
                        break;
                    }
                }
                Some(WorkerEvent::Data { sample, stats }) => {
                    info!("Sample at {}:", sample.timestamp);
                    info!(
                        "  Temperature: {} ({})",
                        sample.temperature.display,
                        format_stats(&stats.temperature)
                    );
                    info!(
                        "  Pressure:    {} ({})",
                        sample.pressure.display,
                        format_stats(&stats.pressure)
                    );
                    info!(
                        "  Humidity:    {} ({})",
                        sample.humidity.display,
                        format_stats(&stats.humidity)
                    );
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Program terminated by user. Exiting gracefully.");
                worker.stop().await?;
                break;
            }
        }
    }

    Ok(())
}
