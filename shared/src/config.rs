/// One side of the square arena. Player numbers map onto edges in join order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, ts_rs::TS,
)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    /// Edges in player-number order (player 1 guards `Left`).
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];

    pub fn from_player_no(player_no: u8) -> Option<Edge> {
        match player_no {
            1 => Some(Edge::Left),
            2 => Some(Edge::Right),
            3 => Some(Edge::Top),
            4 => Some(Edge::Bottom),
            _ => None,
        }
    }

    pub fn player_no(self) -> u8 {
        match self {
            Edge::Left => 1,
            Edge::Right => 2,
            Edge::Top => 3,
            Edge::Bottom => 4,
        }
    }

    /// Left and right edges run along Y; their paddles stand upright.
    pub fn is_vertical(self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }
}

/// Arena geometry shared by server and client
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ArenaConfig {
    /// Side length of the square arena
    pub size: f64,
    pub wall_thickness: f64,
    /// Length of the goal opening on every edge
    pub goal_span: f64,
    /// How far the scoring region reaches past the edge
    pub goal_depth: f64,
    pub paddle_length: f64,
    pub paddle_thickness: f64,
    pub ball_size: f64,
    pub ball_speed_x: f64,
    pub ball_speed_y: f64,
    /// Bot paddle displacement per tick
    pub bot_speed: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: 600.0,
            wall_thickness: 20.0,
            goal_span: 300.0,
            goal_depth: 60.0,
            paddle_length: 80.0,
            paddle_thickness: 10.0,
            ball_size: 10.0,
            ball_speed_x: 4.0,
            ball_speed_y: 4.0,
            bot_speed: 2.0,
        }
    }
}

impl ArenaConfig {
    /// Distance from an arena corner to the start of the goal gap.
    pub fn wall_offset(&self) -> f64 {
        (self.size - self.goal_span) / 2.0
    }

    /// Top-left coordinate that centers the ball in the arena.
    pub fn ball_start(&self) -> f64 {
        (self.size - self.ball_size) / 2.0
    }

    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("size", self.size),
            ("wall_thickness", self.wall_thickness),
            ("goal_span", self.goal_span),
            ("goal_depth", self.goal_depth),
            ("paddle_length", self.paddle_length),
            ("paddle_thickness", self.paddle_thickness),
            ("ball_size", self.ball_size),
            ("bot_speed", self.bot_speed),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be finite and > 0", name));
            }
        }
        if !self.ball_speed_x.is_finite() || !self.ball_speed_y.is_finite() {
            return Err("ball speed must be finite".to_string());
        }
        if self.goal_span + 2.0 * self.wall_thickness > self.size {
            return Err("goal_span plus both walls must fit inside size".to_string());
        }
        if self.paddle_length > self.goal_span {
            return Err("paddle_length must be <= goal_span".to_string());
        }
        if self.ball_size >= self.goal_span || self.ball_size >= self.goal_depth {
            return Err("ball_size must be smaller than goal_span and goal_depth".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arena_config_is_valid() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wall_offset(), 150.0);
        assert_eq!(config.ball_start(), 295.0);
    }

    #[test]
    fn goal_wider_than_arena_invalid() {
        let config = ArenaConfig {
            goal_span: 590.0,
            ..ArenaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn paddle_longer_than_goal_invalid() {
        let config = ArenaConfig {
            paddle_length: 400.0,
            ..ArenaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_dimension_invalid() {
        let config = ArenaConfig {
            wall_thickness: f64::NAN,
            ..ArenaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn edges_round_trip_player_numbers() {
        for edge in Edge::ALL {
            assert_eq!(Edge::from_player_no(edge.player_no()), Some(edge));
        }
        assert_eq!(Edge::from_player_no(0), None);
        assert_eq!(Edge::from_player_no(5), None);
        assert!(Edge::Left.is_vertical());
        assert!(!Edge::Top.is_vertical());
    }
}
