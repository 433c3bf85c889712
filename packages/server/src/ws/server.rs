//! The websocket command loop.
//!
//! [`WsServer`] owns every open connection and the [`Game`]. Socket tasks talk to it through a
//! [`WsServerHandle`], and it applies their [`Command`]s strictly one at a time, so the game
//! state never needs a lock.

use std::{collections::BTreeMap, io};

use async_trait::async_trait;
use battlejong_logging::debug_or_trace;
use battlejong_session::PlayerId;
use battlejong_ws::{
    Game, GameConfig, WebsocketConnectError, WebsocketContext, WebsocketMessageError,
    WebsocketSendError, WebsocketSender,
};
use strum_macros::AsRefStr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::ws::{ConnId, Msg};

/// A command received by the [`WsServer`].
#[derive(Debug, AsRefStr)]
pub enum Command {
    /// Registers a new websocket connection and a player for it.
    Connect {
        conn_tx: mpsc::UnboundedSender<Msg>,
        res_tx: oneshot::Sender<Result<ConnId, WebsocketConnectError>>,
    },

    /// Forgets a websocket connection.
    Disconnect { conn: ConnId },

    /// Processes a text frame received from a connection.
    Message {
        msg: Msg,
        conn: ConnId,
        res_tx: oneshot::Sender<()>,
    },
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone)]
struct Connection {
    /// Set once the player is registered.
    player_id: Option<PlayerId>,
    sender: mpsc::UnboundedSender<Msg>,
}

/// Outgoing side of every open socket.
#[derive(Debug, Default)]
pub struct Connections {
    connections: BTreeMap<ConnId, Connection>,
}

impl Connections {
    fn insert(&mut self, id: ConnId, sender: mpsc::UnboundedSender<Msg>) {
        self.connections.insert(
            id,
            Connection {
                player_id: None,
                sender,
            },
        );
    }

    fn remove(&mut self, id: ConnId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[async_trait]
impl WebsocketSender for Connections {
    async fn send(&self, connection_id: &str, data: &str) -> Result<(), WebsocketSendError> {
        let connection = connection_id
            .parse::<ConnId>()
            .ok()
            .and_then(|id| self.connections.get(&id))
            .ok_or_else(|| WebsocketSendError::NoConnection(connection_id.to_string()))?;

        // errors if client disconnected abruptly and hasn't been timed-out yet
        if connection.sender.send(data.to_string()).is_err() {
            log::debug!("send: connection {connection_id} is already closed");
        }

        Ok(())
    }

    async fn send_all(&self, data: &str) -> Result<(), WebsocketSendError> {
        debug_or_trace!(
            (
                "Broadcasting message to {} connections",
                self.connections.len()
            ),
            (
                "Broadcasting message to {} connections: {data}",
                self.connections.len()
            )
        );

        for (id, connection) in &self.connections {
            if connection.sender.send(data.to_string()).is_err() {
                log::debug!("send_all: connection {id} is already closed");
            }
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Rejected(#[from] WebsocketConnectError),
    #[error("Ws server is not running")]
    ServerStopped,
}

/// Single owner of the game and the open connections.
///
/// Call and spawn [`run`](Self::run) to start processing commands.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct WsServer {
    connections: Connections,
    game: Game,
    next_conn_id: ConnId,
    cmd_rx: flume::Receiver<Command>,
    token: CancellationToken,
}

impl WsServer {
    #[must_use]
    pub fn new(config: GameConfig) -> (Self, WsServerHandle) {
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let token = CancellationToken::new();
        let handle = WsServerHandle {
            cmd_tx,
            token: token.clone(),
        };

        (
            Self {
                connections: Connections::default(),
                game: Game::new(config),
                next_conn_id: 1,
                cmd_rx,
                token,
            },
            handle,
        )
    }

    async fn connect(
        &mut self,
        conn_tx: mpsc::UnboundedSender<Msg>,
    ) -> Result<ConnId, WebsocketConnectError> {
        let id = self.next_conn_id;
        self.next_conn_id += 1;

        self.connections.insert(id, conn_tx);
        log::debug!("Connection {id} opened ({} open)", self.connections.len());

        let context = WebsocketContext {
            connection_id: id.to_string(),
        };

        match battlejong_ws::connect(&mut self.game, &self.connections, &context).await {
            Ok(player_id) => {
                if let Some(connection) = self.connections.connections.get_mut(&id) {
                    connection.player_id = Some(player_id);
                }
                Ok(id)
            }
            Err(e) => {
                self.connections.remove(id);
                Err(e)
            }
        }
    }

    /// Forgets the connection. The player stays registered and keeps counting towards the game.
    fn disconnect(&mut self, conn: ConnId) {
        match self.connections.remove(conn) {
            Some(Connection {
                player_id: Some(player_id),
                ..
            }) => {
                log::info!(
                    "Connection {conn} for player {player_id} closed ({} open)",
                    self.connections.len()
                );
            }
            Some(_) => log::debug!("Connection {conn} closed before registering"),
            None => log::debug!("Connection {conn} was not open"),
        }
    }

    async fn on_message(&mut self, conn: ConnId, msg: &str) -> Result<(), WebsocketMessageError> {
        let context = WebsocketContext {
            connection_id: conn.to_string(),
        };

        battlejong_ws::process_message(&mut self.game, &self.connections, &context, msg).await
    }

    async fn process_command(&mut self, cmd: Command) {
        let cmd_str = cmd.to_string();

        debug_or_trace!(
            ("process_command: cmd={cmd_str}"),
            ("process_command: cmd={cmd:?}")
        );

        match cmd {
            Command::Connect { conn_tx, res_tx } => {
                let response = self.connect(conn_tx).await;

                if let Err(e) = &response {
                    log::error!("Failed to connect: {e}");
                }

                if let Err(Ok(conn)) = res_tx.send(response) {
                    log::debug!("Connection {conn} went away while connecting");
                    self.disconnect(conn);
                }
            }

            Command::Disconnect { conn } => {
                self.disconnect(conn);
            }

            Command::Message { msg, conn, res_tx } => {
                match self.on_message(conn, &msg).await {
                    Ok(()) => {}
                    Err(
                        e @ (WebsocketMessageError::InvalidMessage(_)
                        | WebsocketMessageError::Registry(_)),
                    ) => {
                        log::warn!("Rejected message from {conn} {msg:?}: {e}");
                    }
                    Err(e @ WebsocketMessageError::WebsocketSend(_)) => {
                        log::error!("Failed to process message from {conn} {msg:?}: {e:?}");
                    }
                }
                let _ = res_tx.send(());
            }
        }

        log::trace!("process_command: Finished processing cmd {cmd_str}");
    }

    /// Processes commands in the order they arrive until cancelled or every handle is dropped.
    ///
    /// # Errors
    ///
    /// * If the command loop fails
    pub async fn run(mut self) -> io::Result<()> {
        let token = self.token.clone();
        let cmd_rx = self.cmd_rx.clone();

        while let Ok(Ok(cmd)) = tokio::select!(
            () = token.cancelled() => {
                log::debug!("WsServer was cancelled");
                Err(io::Error::new(io::ErrorKind::Interrupted, "Cancelled"))
            }
            cmd = cmd_rx.recv_async() => { Ok(cmd) }
        ) {
            log::trace!("Received WsServer command {cmd}");
            self.process_command(cmd).await;
        }

        log::debug!("Stopped WsServer");

        Ok(())
    }
}

/// Handle and command sender for ws server.
///
/// Reduces boilerplate of setting up response channels in websocket handlers.
#[derive(Debug, Clone)]
pub struct WsServerHandle {
    cmd_tx: flume::Sender<Command>,
    token: CancellationToken,
}

impl WsServerHandle {
    /// Register client message sender and obtain connection ID.
    ///
    /// # Errors
    ///
    /// * If the game rejected the player
    /// * If the ws server is no longer running
    pub async fn connect(&self, conn_tx: mpsc::UnboundedSender<Msg>) -> Result<ConnId, ConnectError> {
        log::trace!("Sending Connect command");
        let (res_tx, res_rx) = oneshot::channel();

        self.cmd_tx
            .send_async(Command::Connect { conn_tx, res_tx })
            .await
            .map_err(|_| ConnectError::ServerStopped)?;

        res_rx
            .await
            .map_err(|_| ConnectError::ServerStopped)?
            .map_err(ConnectError::from)
    }

    /// Hands a text frame to the game and waits until it has been applied.
    pub async fn send_message(&self, conn: ConnId, msg: impl Into<String> + Send) {
        log::trace!("Sending Message command");
        let (res_tx, res_rx) = oneshot::channel();

        if let Err(e) = self
            .cmd_tx
            .send_async(Command::Message {
                msg: msg.into(),
                conn,
                res_tx,
            })
            .await
        {
            log::error!("Failed to send command: {e:?}");
            return;
        }

        if let Err(e) = res_rx.await {
            log::error!("Failed to recv response from ws server: {e:?}");
        }
    }

    pub async fn disconnect(&self, conn: ConnId) {
        log::trace!("Sending Disconnect command");

        if let Err(e) = self.cmd_tx.send_async(Command::Disconnect { conn }).await {
            log::error!("Failed to send command: {e:?}");
        }
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}
