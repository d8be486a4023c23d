use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::{ArenaConfig, Edge};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "join_success")]
    JoinSuccess(JoinSuccessMsg),
    #[serde(rename = "join_failure")]
    JoinFailure(JoinFailureMsg),
    /// Sent to player 1, who may choose to play against bots
    #[serde(rename = "host")]
    Host,
    #[serde(rename = "game_start")]
    GameStart,
    #[serde(rename = "state")]
    State(StateMsg),
    #[serde(rename = "game_over")]
    GameOver(GameOverMsg),
    /// The room was torn down; clients go back to the lobby view
    #[serde(rename = "restart")]
    Restart,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub arena: ArenaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct JoinSuccessMsg {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "snake_case")]
pub enum JoinFailureReason {
    Full,
    AlreadyInRoom,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct JoinFailureMsg {
    pub reason: JoinFailureReason,
}

/// Canonical per-tick snapshot of one room.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StateMsg {
    pub ball: BallWire,
    pub walls: Vec<WallWire>,
    pub players: Vec<PlayerWire>,
    /// Seconds left in the match
    pub time_remaining: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct GameOverMsg {
    pub winners: Vec<PlayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BallWire {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WallWire {
    pub edge: Edge,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Gap along the wall, in arena coordinates on the wall's long axis
    pub gap_start: f64,
    pub gap_end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PaddleWire {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    pub player_no: u8,
    pub score: u32,
    pub color: u32,
    #[serde(default)]
    pub is_bot: bool,
    pub paddle: PaddleWire,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "join_session")]
    JoinSession(JoinSessionMsg),
    #[serde(rename = "new_player")]
    NewPlayer,
    /// Cursor position in arena coordinates
    #[serde(rename = "player_move")]
    PlayerMove { x: f64, y: f64 },
    #[serde(rename = "physics_step")]
    PhysicsStep {
        /// Client frame time hint, in milliseconds
        #[serde(default)]
        elapsed: f64,
    },
    #[serde(rename = "request_bots")]
    RequestBots,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionMsg {
    pub session_id: String,
}
