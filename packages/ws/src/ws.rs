//! Game flow driven by websocket connections and messages.
//!
//! Nothing in here knows about sockets. Output goes through a [`WebsocketSender`], and the
//! [`Game`] is owned by whoever calls in, one event at a time.

use core::fmt;

use async_trait::async_trait;
use battlejong_board::{WildcardPolicy, shuffle};
use battlejong_logging::debug_or_trace;
use battlejong_session::{
    DEFAULT_CAPACITY, PLAYERS_PER_GAME, PlayerId, RegistryError, SessionRegistry, TieBreak,
};
use thiserror::Error;

use crate::models::{InboundMessage, OutboundMessage, ParseMessageError};

/// Errors that can occur when sending websocket messages.
#[derive(Debug, Error)]
pub enum WebsocketSendError {
    #[error("Connection {0} not found")]
    NoConnection(String),
    #[error("Unknown: {0}")]
    Unknown(String),
}

/// Trait for sending messages via websocket.
#[async_trait]
pub trait WebsocketSender: Send + Sync {
    /// Sends a message to a specific connection.
    ///
    /// # Errors
    ///
    /// * If the websocket message fails to send
    async fn send(&self, connection_id: &str, data: &str) -> Result<(), WebsocketSendError>;

    /// Sends a message to all connections.
    ///
    /// # Errors
    ///
    /// * If the websocket message fails to send
    async fn send_all(&self, data: &str) -> Result<(), WebsocketSendError>;
}

impl fmt::Debug for dyn WebsocketSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{WebsocketSender}}")
    }
}

/// Context for a websocket connection.
#[derive(Clone, Default, Debug)]
pub struct WebsocketContext {
    pub connection_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub capacity: usize,
    pub wildcard_policy: WildcardPolicy,
    pub tie_break: TieBreak,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            wildcard_policy: WildcardPolicy::default(),
            tie_break: TieBreak::default(),
        }
    }
}

/// All server-side game state: the player registry and the outcome once decided.
#[derive(Debug)]
pub struct Game {
    registry: SessionRegistry,
    config: GameConfig,
    winner: Option<PlayerId>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl Game {
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self::with_registry(SessionRegistry::new(config.capacity), config)
    }

    #[must_use]
    pub const fn with_registry(registry: SessionRegistry, config: GameConfig) -> Self {
        Self {
            registry,
            config,
            winner: None,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }
}

/// Errors that can occur when connecting a player.
#[derive(Debug, Error)]
pub enum WebsocketConnectError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    WebsocketSend(#[from] WebsocketSendError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Errors that can occur when processing a websocket message.
#[derive(Debug, Error)]
pub enum WebsocketMessageError {
    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] ParseMessageError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    WebsocketSend(#[from] WebsocketSendError),
}

/// Registers a player for a new connection and tells it its id. When this makes exactly two
/// players, deals a board and broadcasts the start of the game to everyone.
///
/// # Errors
///
/// * If the registry is full
/// * If the board fails to serialize
/// * If a websocket message fails to send
pub async fn connect(
    game: &mut Game,
    sender: &impl WebsocketSender,
    context: &WebsocketContext,
) -> Result<PlayerId, WebsocketConnectError> {
    let player_id = game.registry.register()?;

    log::info!(
        "Player {player_id} connected on {} ({} registered)",
        context.connection_id,
        game.registry.len()
    );

    sender
        .send(
            &context.connection_id,
            &OutboundMessage::Connected {
                player_id: player_id.clone(),
            }
            .to_string(),
        )
        .await?;

    if game.registry.len() == PLAYERS_PER_GAME {
        start_game(game, sender).await?;
    }

    Ok(player_id)
}

async fn start_game(game: &Game, sender: &impl WebsocketSender) -> Result<(), WebsocketConnectError> {
    let board = shuffle(game.config.wildcard_policy);
    let message = OutboundMessage::start(&board)?.to_string();

    debug_or_trace!(
        ("Starting game wildcards={}", board.wildcard_count()),
        ("Starting game wildcards={} message={message}", board.wildcard_count())
    );

    sender.send_all(&message).await?;

    Ok(())
}

/// Parses and applies one inbound text message.
///
/// # Errors
///
/// * If the message is malformed
/// * If the message references an unknown player
/// * If a websocket message fails to send
pub async fn process_message(
    game: &mut Game,
    sender: &impl WebsocketSender,
    context: &WebsocketContext,
    payload: &str,
) -> Result<(), WebsocketMessageError> {
    let message = payload.trim().parse::<InboundMessage>()?;

    message_received(game, sender, message, context).await
}

/// Routes a parsed message to its handler.
///
/// # Errors
///
/// * If the message references an unknown player
/// * If a websocket message fails to send
pub async fn message_received(
    game: &mut Game,
    sender: &impl WebsocketSender,
    message: InboundMessage,
    context: &WebsocketContext,
) -> Result<(), WebsocketMessageError> {
    log::debug!(
        "Received message from {}: {message:?}",
        context.connection_id
    );

    match message {
        InboundMessage::Match { player_id, points } => {
            let score = game.registry.record_match(&player_id, points)?;

            sender
                .send_all(&OutboundMessage::Update { player_id, score }.to_string())
                .await?;
        }
        InboundMessage::Done { player_id } => {
            if !game.registry.record_done(&player_id)? {
                log::debug!("Player {player_id} already reported done");
                return Ok(());
            }

            log::info!(
                "Player {player_id} is done ({}/{PLAYERS_PER_GAME})",
                game.registry.count_done()
            );

            if game.registry.count_done() == PLAYERS_PER_GAME {
                finish_game(game, sender).await?;
            }
        }
        InboundMessage::Unknown { command } => {
            log::debug!(
                "Ignoring unknown command '{command}' from {}",
                context.connection_id
            );
        }
    }

    Ok(())
}

async fn finish_game(
    game: &mut Game,
    sender: &impl WebsocketSender,
) -> Result<(), WebsocketMessageError> {
    if let Some(winner) = &game.winner {
        log::warn!("Game already won by {winner}");
        return Ok(());
    }

    let Some(winner) = game.registry.winner(game.config.tie_break).cloned() else {
        log::warn!("Both players done but no pair registered");
        return Ok(());
    };

    log::info!("Game over, winner {winner}");

    game.winner = Some(winner.clone());

    sender
        .send_all(&OutboundMessage::GameOver { winner }.to_string())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Mutex};

    use battlejong_board::{FIRST_TILE_TYPE, LAST_TILE_TYPE, layout};
    use pretty_assertions::assert_eq;

    use super::*;

    /// Records what every connection would have received.
    #[derive(Default)]
    struct TestSender {
        inboxes: Mutex<BTreeMap<String, Vec<String>>>,
    }

    impl TestSender {
        fn open(&self, connection_id: &str) -> WebsocketContext {
            self.inboxes
                .lock()
                .unwrap()
                .insert(connection_id.to_string(), vec![]);
            WebsocketContext {
                connection_id: connection_id.to_string(),
            }
        }

        fn inbox(&self, connection_id: &str) -> Vec<String> {
            self.inboxes.lock().unwrap()[connection_id].clone()
        }

        fn last(&self, connection_id: &str) -> Option<String> {
            self.inbox(connection_id).last().cloned()
        }
    }

    #[async_trait]
    impl WebsocketSender for TestSender {
        async fn send(&self, connection_id: &str, data: &str) -> Result<(), WebsocketSendError> {
            self.inboxes
                .lock()
                .unwrap()
                .get_mut(connection_id)
                .ok_or_else(|| WebsocketSendError::NoConnection(connection_id.to_string()))?
                .push(data.to_string());
            Ok(())
        }

        async fn send_all(&self, data: &str) -> Result<(), WebsocketSendError> {
            for inbox in self.inboxes.lock().unwrap().values_mut() {
                inbox.push(data.to_string());
            }
            Ok(())
        }
    }

    async fn connected_pair(game: &mut Game, sender: &TestSender) -> (PlayerId, PlayerId) {
        let a = sender.open("a");
        let b = sender.open("b");
        let pid_a = connect(game, sender, &a).await.unwrap();
        let pid_b = connect(game, sender, &b).await.unwrap();
        (pid_a, pid_b)
    }

    async fn send(game: &mut Game, sender: &TestSender, conn: &str, text: &str) {
        let context = WebsocketContext {
            connection_id: conn.to_string(),
        };
        process_message(game, sender, &context, text).await.unwrap();
    }

    fn count_starts(inbox: &[String]) -> usize {
        inbox.iter().filter(|x| x.starts_with("start_")).count()
    }

    #[test_log::test(tokio::test)]
    async fn first_connection_only_gets_its_id() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let a = sender.open("a");

        let pid = connect(&mut game, &sender, &a).await.unwrap();

        assert_eq!(sender.inbox("a"), vec![format!("connected_{pid}")]);
    }

    #[test_log::test(tokio::test)]
    async fn second_connection_starts_the_game_for_everyone() {
        let mut game = Game::default();
        let sender = TestSender::default();

        let (pid_a, pid_b) = connected_pair(&mut game, &sender).await;

        let inbox_a = sender.inbox("a");
        let inbox_b = sender.inbox("b");

        assert_eq!(inbox_a[0], format!("connected_{pid_a}"));
        assert_eq!(inbox_b[0], format!("connected_{pid_b}"));
        assert_eq!(count_starts(&inbox_a), 1);
        assert_eq!(count_starts(&inbox_b), 1);
        assert_eq!(inbox_a.last(), inbox_b.last());

        let board = inbox_a
            .last()
            .unwrap()
            .parse::<OutboundMessage>()
            .unwrap()
            .board()
            .unwrap();

        for (l, r, c, value) in board.tiles() {
            if layout::is_slot(l, r, c) {
                assert!((FIRST_TILE_TYPE..=LAST_TILE_TYPE).contains(&value));
            } else {
                assert_eq!(value, 0);
            }
        }
    }

    #[test_log::test(tokio::test)]
    async fn third_connection_does_not_restart_the_game() {
        let mut game = Game::default();
        let sender = TestSender::default();
        connected_pair(&mut game, &sender).await;

        let c = sender.open("c");
        let pid_c = connect(&mut game, &sender, &c).await.unwrap();

        assert_eq!(sender.inbox("c"), vec![format!("connected_{pid_c}")]);
        assert_eq!(count_starts(&sender.inbox("a")), 1);
    }

    #[test_log::test(tokio::test)]
    async fn connect_fails_when_registry_is_full() {
        let mut game = Game::new(GameConfig {
            capacity: 1,
            ..GameConfig::default()
        });
        let sender = TestSender::default();
        let a = sender.open("a");
        let b = sender.open("b");

        connect(&mut game, &sender, &a).await.unwrap();
        let result = connect(&mut game, &sender, &b).await;

        assert!(matches!(
            result,
            Err(WebsocketConnectError::Registry(RegistryError::Full { capacity: 1 }))
        ));
        assert_eq!(sender.inbox("b"), Vec::<String>::new());
    }

    #[test_log::test(tokio::test)]
    async fn matches_accumulate_and_broadcast_in_order() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, _) = connected_pair(&mut game, &sender).await;

        send(&mut game, &sender, "a", &format!("match_{pid_a}_5")).await;
        send(&mut game, &sender, "a", &format!("match_{pid_a}_3")).await;

        for conn in ["a", "b"] {
            let inbox = sender.inbox(conn);
            assert_eq!(
                inbox[inbox.len() - 2..].to_vec(),
                vec![format!("update_{pid_a}_5"), format!("update_{pid_a}_8")]
            );
        }
        assert_eq!(game.registry().player(&pid_a).unwrap().score, 8);
    }

    #[test_log::test(tokio::test)]
    async fn higher_score_wins() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, pid_b) = connected_pair(&mut game, &sender).await;

        send(&mut game, &sender, "a", &format!("match_{pid_a}_10")).await;
        send(&mut game, &sender, "b", &format!("match_{pid_b}_7")).await;
        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;
        send(&mut game, &sender, "b", &format!("done_{pid_b}")).await;

        assert_eq!(sender.last("a"), Some(format!("gameOver_{pid_a}")));
        assert_eq!(sender.last("b"), Some(format!("gameOver_{pid_a}")));
        assert_eq!(game.winner(), Some(&pid_a));
    }

    #[test_log::test(tokio::test)]
    async fn tie_goes_to_the_second_player() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, pid_b) = connected_pair(&mut game, &sender).await;

        send(&mut game, &sender, "a", &format!("match_{pid_a}_7")).await;
        send(&mut game, &sender, "b", &format!("match_{pid_b}_7")).await;
        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;
        send(&mut game, &sender, "b", &format!("done_{pid_b}")).await;

        assert_eq!(sender.last("a"), Some(format!("gameOver_{pid_b}")));
    }

    #[test_log::test(tokio::test)]
    async fn tie_break_can_favor_the_first_player() {
        let mut game = Game::new(GameConfig {
            tie_break: TieBreak::FirstPlayer,
            ..GameConfig::default()
        });
        let sender = TestSender::default();
        let (pid_a, pid_b) = connected_pair(&mut game, &sender).await;

        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;
        send(&mut game, &sender, "b", &format!("done_{pid_b}")).await;

        assert_eq!(sender.last("b"), Some(format!("gameOver_{pid_a}")));
    }

    #[test_log::test(tokio::test)]
    async fn repeated_done_does_not_end_the_game() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, _) = connected_pair(&mut game, &sender).await;
        let before = sender.inbox("a").len();

        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;
        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;

        assert_eq!(game.registry().count_done(), 1);
        assert_eq!(sender.inbox("a").len(), before);
        assert_eq!(game.winner(), None);
    }

    #[test_log::test(tokio::test)]
    async fn game_over_is_broadcast_once() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, pid_b) = connected_pair(&mut game, &sender).await;
        let c = sender.open("c");
        let pid_c = connect(&mut game, &sender, &c).await.unwrap();

        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;
        send(&mut game, &sender, "b", &format!("done_{pid_b}")).await;
        send(&mut game, &sender, "c", &format!("done_{pid_c}")).await;

        let game_overs = sender
            .inbox("c")
            .iter()
            .filter(|x| x.starts_with("gameOver_"))
            .count();
        assert_eq!(game_overs, 1);
    }

    #[test_log::test(tokio::test)]
    async fn unknown_player_is_a_recoverable_error() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, _) = connected_pair(&mut game, &sender).await;
        let context = WebsocketContext {
            connection_id: "a".into(),
        };
        let before = sender.inbox("a").len();

        let result = process_message(&mut game, &sender, &context, "done_pid0").await;

        assert!(matches!(
            result,
            Err(WebsocketMessageError::Registry(RegistryError::NotFound(id))) if id.as_str() == "pid0"
        ));
        assert_eq!(sender.inbox("a").len(), before);

        send(&mut game, &sender, "a", &format!("match_{pid_a}_2")).await;

        assert_eq!(sender.last("b"), Some(format!("update_{pid_a}_2")));
    }

    #[test_log::test(tokio::test)]
    async fn malformed_message_changes_nothing() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let (pid_a, _) = connected_pair(&mut game, &sender).await;
        let context = WebsocketContext {
            connection_id: "a".into(),
        };
        let before = sender.inbox("a").len();

        let result =
            process_message(&mut game, &sender, &context, &format!("match_{pid_a}_lots")).await;

        assert!(matches!(
            result,
            Err(WebsocketMessageError::InvalidMessage(
                ParseMessageError::InvalidPoints { .. }
            ))
        ));
        assert_eq!(sender.inbox("a").len(), before);
        assert_eq!(game.registry().player(&pid_a).unwrap().score, 0);
    }

    #[test_log::test(tokio::test)]
    async fn unknown_command_is_ignored() {
        let mut game = Game::default();
        let sender = TestSender::default();
        connected_pair(&mut game, &sender).await;
        let before = sender.inbox("a").len();

        send(&mut game, &sender, "a", "hint_pid1").await;

        assert_eq!(sender.inbox("a").len(), before);
    }

    #[test_log::test(tokio::test)]
    async fn full_game_between_two_clients() {
        let mut game = Game::default();
        let sender = TestSender::default();
        let a = sender.open("a");
        let pid_a = connect(&mut game, &sender, &a).await.unwrap();
        assert_eq!(sender.inbox("a"), vec![format!("connected_{pid_a}")]);

        let b = sender.open("b");
        let pid_b = connect(&mut game, &sender, &b).await.unwrap();
        assert_eq!(sender.inbox("b")[0], format!("connected_{pid_b}"));

        let start_a = sender.last("a").unwrap();
        let start_b = sender.last("b").unwrap();
        assert!(start_a.starts_with("start_"));
        assert_eq!(start_a, start_b);

        send(&mut game, &sender, "a", &format!("match_{pid_a}_10")).await;
        assert_eq!(sender.last("a"), Some(format!("update_{pid_a}_10")));
        assert_eq!(sender.last("b"), Some(format!("update_{pid_a}_10")));

        send(&mut game, &sender, "a", &format!("done_{pid_a}")).await;
        send(&mut game, &sender, "b", &format!("match_{pid_b}_15")).await;
        send(&mut game, &sender, "b", &format!("done_{pid_b}")).await;

        let expected = vec![
            format!("connected_{pid_a}"),
            start_a.clone(),
            format!("update_{pid_a}_10"),
            format!("update_{pid_b}_15"),
            format!("gameOver_{pid_b}"),
        ];
        assert_eq!(sender.inbox("a"), expected);
        assert_eq!(sender.last("b"), Some(format!("gameOver_{pid_b}")));
    }
}
