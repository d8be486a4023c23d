use quadpong_shared::config::{ArenaConfig, Edge};
use quadpong_shared::protocol::PlayerWire;

use crate::geometry::Goal;
use crate::paddle::Paddle;

/// Server-assigned id of one WebSocket connection.
pub type ConnectionId = u32;

/// Who controls a player's paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Human(ConnectionId),
    Bot,
}

/// Paddle colors by player number (left, right, top, bottom).
const PALETTE: [u32; 4] = [0xe74c3c, 0x3498db, 0x2ecc71, 0xf1c40f];

pub fn color_for_player(player_no: u8) -> u32 {
    PALETTE[(player_no.clamp(1, 4) - 1) as usize]
}

/// A seat in a room: one edge, its paddle, its goal and a running score.
#[derive(Debug, Clone)]
pub struct Player {
    pub player_no: u8,
    pub occupant: Occupant,
    pub paddle: Paddle,
    pub goal: Goal,
    pub score: u32,
}

impl Player {
    pub fn new(edge: Edge, occupant: Occupant, goal: Goal, arena: &ArenaConfig) -> Self {
        let player_no = edge.player_no();
        Self {
            player_no,
            occupant,
            paddle: Paddle::new(edge, color_for_player(player_no), arena),
            goal,
            score: 0,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.occupant == Occupant::Bot
    }

    pub fn incr_score(&mut self) {
        self.score += 1;
    }

    pub fn to_wire(&self) -> PlayerWire {
        PlayerWire {
            player_no: self.player_no,
            score: self.score,
            color: self.paddle.color,
            is_bot: self.is_bot(),
            paddle: self.paddle.to_wire(),
        }
    }
}
