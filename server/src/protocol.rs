pub use quadpong_shared::protocol::*;

use quadpong_shared::config::ArenaConfig;

use crate::player::ConnectionId;
use crate::room::Room;

pub fn welcome_msg(self_id: ConnectionId, arena: ArenaConfig) -> WelcomeMsg {
    WelcomeMsg {
        protocol_version: PROTOCOL_VERSION,
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        self_id,
        arena,
    }
}

/// Every player sharing the top score. Ties are all reported.
pub fn game_over_msg(room: &Room) -> GameOverMsg {
    GameOverMsg {
        winners: room.winners().into_iter().map(|p| p.to_wire()).collect(),
    }
}

/// Serialize for a text frame. Serialization of these types cannot fail in
/// practice; if it ever does the message is dropped and logged.
pub fn encode(msg: &ServerMsg) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to encode server message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;

    #[test]
    fn welcome_carries_protocol_version_and_arena() {
        let msg = welcome_msg(7, ArenaConfig::default());
        assert_eq!(msg.protocol_version, PROTOCOL_VERSION);
        assert_eq!(msg.self_id, 7);
        assert_eq!(msg.arena.size, 600.0);
        let json = encode(&ServerMsg::Welcome(msg)).unwrap();
        assert!(json.contains("\"type\":\"welcome\""));
        assert!(json.contains("\"selfId\":7"));
    }

    #[test]
    fn game_over_lists_tied_winners() {
        let mut room = Room::new("r", RoomConfig::default(), 1);
        room.join(1).unwrap();
        room.join(2).unwrap();
        let msg = game_over_msg(&room);
        assert_eq!(msg.winners.len(), 2);
    }
}
