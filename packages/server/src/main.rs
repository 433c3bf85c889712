#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::io;

use battlejong_server::ServerConfig;

#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = battlejong_logging::init() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let args = std::env::args().collect::<Vec<_>>();

    let config = ServerConfig::from_env(&args).map_err(|e| {
        log::error!("Invalid configuration: {e}");
        io::Error::other(e)
    })?;

    log::debug!("Configuration: {config:?}");

    battlejong_server::run(config).await
}
