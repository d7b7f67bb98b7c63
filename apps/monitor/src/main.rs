mod config;
mod main_lib;
mod poller;

use config::Config;
use main_lib::{build_service, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before tracing, so RUST_LOG and XW_LOG_FORMAT from .env apply.
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env();
    let service = build_service(&config);

    if config.once {
        let batch = poller::poll_once(&service, config.history_period).await;
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        poller::run(service.clone(), config.history_period, config.poll_interval).await;
    }

    service.dispose();
    Ok(())
}
