use anyhow::Result;
use gridwatch::config::Config;
use gridwatch::logging::{get_logger, init_logging};
use gridwatch::service::EnergyDataService;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    let logger = get_logger("main");
    logger.info(&format!(
        "Gridwatch {} starting up",
        env!("APP_VERSION")
    ));

    let service = Arc::new(
        EnergyDataService::from_config(&config)
            .map_err(|e| anyhow::anyhow!("Failed to create service: {}", e))?,
    );
    service.connect().await;

    let probe = if config.network.probe_enabled {
        Some(service.monitor().spawn_probe(
            config.network.probe_host.clone(),
            Duration::from_secs(config.network.probe_interval_secs),
            Duration::from_millis(config.network.probe_timeout_ms),
        ))
    } else {
        None
    };

    #[cfg(feature = "web")]
    let web_task = {
        let web_service = service.clone();
        let host = config.web.host.clone();
        let port = config.web.port;
        let logger = logger.clone();
        tokio::spawn(async move {
            if let Err(e) = gridwatch::web::serve(web_service, &host, port).await {
                logger.error(&format!("Web server error: {}", e));
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    logger.info("Shutdown signal received");

    service.disconnect();
    if let Some(probe) = probe {
        probe.abort();
    }
    #[cfg(feature = "web")]
    web_task.abort();

    logger.info("Shutdown complete");
    Ok(())
}
