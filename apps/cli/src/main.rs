mod config;
mod main_lib;
mod render;

use config::Config;
use main_lib::{build_services, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let services = build_services(&config)?;
    run(&config, &services).await
}
