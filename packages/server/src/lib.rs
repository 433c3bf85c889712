#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! BattleJong relay server.
//!
//! Two listeners: the game websocket on the ws port, and the client's static assets on the
//! http port. One [`ws::server::WsServer`] loop owns the game for the life of the process.

use std::io;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, http, middleware, web};
use tokio::try_join;

pub mod api;
pub mod config;
pub mod ws;

pub use config::ServerConfig;

use crate::ws::server::WsServer;

fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET"])
        .allowed_headers(vec![http::header::ACCEPT, http::header::CONTENT_TYPE])
        .max_age(3600)
}

/// Binds both listeners and serves until they are stopped (e.g. by ctrl-c).
///
/// # Errors
///
/// * If a listener fails to bind
/// * If a listener or the ws server loop fails while running
#[allow(clippy::future_not_send)]
pub async fn run(config: ServerConfig) -> io::Result<()> {
    let ServerConfig {
        bind_addr,
        ws_port,
        http_port,
        static_dir,
        actix_workers,
        game,
    } = config;

    log::info!(
        "Starting BattleJong server ws={bind_addr}:{ws_port} wildcard_policy={:?} tie_break={}",
        game.wildcard_policy,
        game.tie_break.as_ref()
    );

    let (ws_server, ws_server_handle) = WsServer::new(game);
    let ws_server = tokio::spawn(ws_server.run());

    let ws_app = {
        let ws_server_handle = web::Data::new(ws_server_handle.clone());
        move || {
            App::new()
                .wrap(cors())
                .app_data(ws_server_handle.clone())
                .service(api::health_endpoint)
                .service(api::websocket)
        }
    };

    let mut ws_http_server = HttpServer::new(ws_app);

    if let Some(workers) = actix_workers {
        log::debug!("Running with {workers} Actix workers");
        ws_http_server = ws_http_server.workers(workers);
    }

    let ws_http_server = ws_http_server.bind((bind_addr.as_str(), ws_port))?.run();

    let static_http_server = match static_dir {
        Some(static_dir) => {
            log::info!(
                "Serving {} on {bind_addr}:{http_port}",
                static_dir.display()
            );

            let mut http_server = HttpServer::new(move || {
                App::new()
                    .wrap(middleware::Compress::default())
                    .service(api::health_endpoint)
                    .service(Files::new("/", static_dir.clone()).index_file("index.html"))
            });

            if let Some(workers) = actix_workers {
                http_server = http_server.workers(workers);
            }

            Some(http_server.bind((bind_addr.as_str(), http_port))?.run())
        }
        None => {
            log::info!("Static file listener disabled");
            None
        }
    };

    if let Err(err) = try_join!(
        async move {
            let resp = ws_http_server.await;

            log::debug!("Shutting down ws server...");
            ws_server_handle.shutdown();

            resp
        },
        async move {
            if let Some(http_server) = static_http_server {
                http_server.await?;
                log::debug!("Static file listener closed");
            }
            Ok::<_, io::Error>(())
        },
        async move {
            let resp = ws_server.await.map_err(io::Error::other)?;
            log::debug!("Ws server connection closed");
            resp
        },
    ) {
        log::error!("Error on shutdown: {err:?}");
        return Err(err);
    }

    log::debug!("Server shut down");

    Ok(())
}
