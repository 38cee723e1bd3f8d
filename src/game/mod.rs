//! Duel simulation modules

pub mod aim;
pub mod combat;
pub mod constants;
pub mod r#match;
pub mod runner;
pub mod trajectory;

pub use runner::{MatchHandle, MatchRegistry};

use crate::ws::protocol::{ClientMsg, ServerMsg};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Input received from a presentation connection
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub connection_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
    /// Replies meant for the sending connection only
    pub reply_tx: mpsc::Sender<ServerMsg>,
}
