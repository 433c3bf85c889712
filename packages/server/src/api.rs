use actix_web::{
    HttpRequest, HttpResponse, Result, get, route,
    web::{self, Json},
};
use serde_json::{Value, json};

use crate::ws::{handler, server::WsServerHandle};

#[route("/health", method = "GET")]
pub async fn health_endpoint() -> Result<Json<Value>> {
    log::info!("Healthy");
    Ok(Json(json!({"healthy": true})))
}

/// Upgrades the bare listener root to a game websocket.
#[get("/")]
pub async fn websocket(
    req: HttpRequest,
    stream: web::Payload,
    ws_server: web::Data<WsServerHandle>,
) -> Result<HttpResponse> {
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    // spawn websocket handler (and don't await it) so that the response is returned immediately
    actix_web::rt::spawn(handler::handle_ws(
        ws_server.get_ref().clone(),
        session,
        msg_stream,
    ));

    Ok(response)
}
