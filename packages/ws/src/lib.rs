#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! BattleJong websocket protocol and game flow.
//!
//! Messages are short underscore-delimited text frames such as `match_pid1700000000000_10`.
//! This crate parses and renders them and applies them to a [`Game`], without knowing
//! anything about the transport.
//!
//! # Main Components
//!
//! * [`WebsocketSender`] - Trait for sending messages to websocket connections
//! * [`WebsocketContext`] - Context information for a websocket connection
//! * [`connect`] - Registers a player for a new connection
//! * [`process_message`] - Processes incoming websocket messages
//! * [`models`] - Inbound and outbound message types
//!
//! # Example
//!
//! ```rust,no_run
//! # use battlejong_ws::{Game, WebsocketSender, WebsocketContext, WebsocketSendError, connect};
//! # struct MockSender;
//! # #[async_trait::async_trait]
//! # impl WebsocketSender for MockSender {
//! #     async fn send(&self, _: &str, _: &str) -> Result<(), WebsocketSendError> { Ok(()) }
//! #     async fn send_all(&self, _: &str) -> Result<(), WebsocketSendError> { Ok(()) }
//! # }
//! # async fn example() {
//! let sender = MockSender;
//! let mut game = Game::default();
//! let context = WebsocketContext {
//!     connection_id: "1".to_string(),
//! };
//! let player_id = connect(&mut game, &sender, &context).await;
//! # }
//! ```

mod ws;

pub use ws::*;

pub mod models;
