mod batch;
mod bootstrap;

use anyhow::{bail, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use webmon_core::settings::{Command, Settings};
use webmon_runtime::WebMonitoringDataSource;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("webmon v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        base_url = %settings.base_url,
        timeout_secs = settings.timeout_secs,
        "client settings"
    );

    // Ctrl+C cancels every request issued under this token.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received; cancelling in-flight requests");
            signal_token.cancel();
        }
    });

    let source = WebMonitoringDataSource::from_config(&settings.client_config())?;

    match &settings.command {
        Command::Query(args) => {
            let queries = batch::build_queries(args, Utc::now())?;
            let response = source
                .query_data(settings.token(), &queries, &cancel)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Health => {
            let result = source.check_health(settings.token(), &cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_ok() {
                bail!("health check failed: {}", result.message);
            }
        }

        Command::Resource { path } => {
            let response = source
                .call_resource(settings.token(), path, &cancel)
                .await?;
            if response.status != 200 {
                bail!("resource '{}' returned status {}", path, response.status);
            }
            println!("{}", String::from_utf8_lossy(&response.body));
        }
    }

    Ok(())
}
