//! WebSocket protocol message definitions
//! These are the wire types between the duel server and the presentation client

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::aim::AimVector;
use crate::game::combat::ShotOutcome;
use crate::game::r#match::{MatchPhase, PlayerId};
use crate::game::trajectory::{ImpactPoint, LaunchParameters, Point};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Pointer pressed, start aiming
    BeginDrag,

    /// Pointer moved while aiming
    UpdateDrag {
        pointer_x: f32,
        pointer_y: f32,
    },

    /// Pointer released, commits the current aim
    EndDrag,

    /// Commit the current aim without a drag (keyboard trigger)
    CommitShot,

    /// Nudge the active player horizontally
    MovePlayer {
        delta: f32,
    },

    /// Start over after game over
    RestartMatch,

    /// Ask for a full state message
    RequestState,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        match_id: Uuid,
        server_time: u64,
    },

    /// Full match state
    State {
        match_id: Uuid,
        snapshot: MatchSnapshot,
    },

    /// Presentation events produced since the last message
    Events {
        events: Vec<GameEvent>,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player state as seen by the presentation client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub health: u32,
    pub max_health: u32,
    pub x: f32,
    pub y: f32,
    pub min_x: f32,
    pub max_x: f32,
}

/// Whole-match state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    /// None once the match is over
    pub active_player: Option<PlayerId>,
    pub players: Vec<PlayerSnapshot>,
    pub aim: Option<AimVector>,
    pub winner: Option<PlayerId>,
}

/// Semantic events for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    AimUpdated {
        player_id: PlayerId,
        power_percent: f32,
        angle_degrees: f32,
    },

    /// Ordered sample points of the aim preview
    TrajectoryPreview {
        player_id: PlayerId,
        points: Vec<Point>,
    },

    TrajectoryCleared,

    PlayerMoved {
        player_id: PlayerId,
        x: f32,
    },

    /// Shot accepted, verification pending
    ShotCommitted {
        shot_id: u64,
        player_id: PlayerId,
        launch: LaunchParameters,
        impact: ImpactPoint,
    },

    /// Animation frame
    ProjectileMoved {
        shot_id: u64,
        x: f32,
        y: f32,
    },

    ShotOutcome {
        shot_id: u64,
        outcome: ShotOutcome,
    },

    HealthChanged {
        player_id: PlayerId,
        health: u32,
        max_health: u32,
    },

    TurnChanged {
        player_id: PlayerId,
    },

    GameOver {
        winner_id: PlayerId,
    },

    MatchRestarted,
}
