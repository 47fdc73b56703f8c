// najot-bot/src/main.rs

use najot_bot::{config::Config, run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing first so `.env` loading is logged.
    telemetry::init_tracing();

    let cfg = Config::from_env()?;

    run_server(cfg).await
}
