//! Paddles and the controller that drives bot paddles.

use std::str::FromStr;

use quadpong_shared::config::{ArenaConfig, Edge};
use quadpong_shared::protocol::PaddleWire;

use crate::geometry::Rect;

/// A paddle guarding one edge. Moves along a single axis only.
#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub player_no: u8,
    pub color: u32,
    edge: Edge,
    length: f64,
    /// Goal span on the movement axis
    min: f64,
    max: f64,
    /// Per-tick displacement when the paddle is driven by a bot
    pub sweep_velocity: f64,
}

impl Paddle {
    /// Place a paddle against its wall, centered in the goal gap.
    pub fn new(edge: Edge, color: u32, arena: &ArenaConfig) -> Self {
        let min = arena.wall_offset();
        let max = min + arena.goal_span;
        let along = min + (arena.goal_span - arena.paddle_length) / 2.0;
        let near = arena.wall_thickness;
        let far = arena.size - arena.wall_thickness - arena.paddle_thickness;
        let (x, y, width, height) = match edge {
            Edge::Left => (near, along, arena.paddle_thickness, arena.paddle_length),
            Edge::Right => (far, along, arena.paddle_thickness, arena.paddle_length),
            Edge::Top => (along, near, arena.paddle_length, arena.paddle_thickness),
            Edge::Bottom => (along, far, arena.paddle_length, arena.paddle_thickness),
        };
        Self {
            x,
            y,
            width,
            height,
            player_no: edge.player_no(),
            color,
            edge,
            length: arena.paddle_length,
            min,
            max,
            sweep_velocity: arena.bot_speed,
        }
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// Upright paddles (players 1 and 2) move along Y.
    pub fn is_vertical(&self) -> bool {
        self.edge.is_vertical()
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Coordinate of the top-left corner on the movement axis.
    pub fn axis_position(&self) -> f64 {
        if self.is_vertical() {
            self.y
        } else {
            self.x
        }
    }

    /// Inclusive range of valid axis positions.
    pub fn axis_range(&self) -> (f64, f64) {
        (self.min, self.max - self.length)
    }

    /// Move to `target` on the movement axis, clamped to the goal span.
    /// Returns true if the target had to be clamped.
    pub fn move_to(&mut self, target: f64) -> bool {
        if !target.is_finite() {
            return false;
        }
        let (lo, hi) = self.axis_range();
        let (pos, clamped) = if target < lo {
            (lo, true)
        } else if target > hi {
            (hi, true)
        } else {
            (target, false)
        };
        if self.is_vertical() {
            self.y = pos;
        } else {
            self.x = pos;
        }
        clamped
    }

    /// Follow a cursor: only the coordinate on this paddle's axis matters.
    pub fn follow_cursor(&mut self, x: f64, y: f64) {
        let target = if self.is_vertical() { y } else { x };
        self.move_to(target);
    }

    /// Shift by `displacement`. Returns true when a boundary was reached.
    pub fn sweep_by(&mut self, displacement: f64) -> bool {
        self.move_to(self.axis_position() + displacement)
    }

    pub fn to_wire(&self) -> PaddleWire {
        PaddleWire {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// How bot paddles share sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Each bot paddle reverses on its own boundary hits
    #[default]
    Independent,
    /// One direction for every bot paddle in the room, flipped when any of
    /// them reaches a boundary
    Shared,
}

impl FromStr for SweepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "independent" => Ok(SweepMode::Independent),
            "shared" => Ok(SweepMode::Shared),
            other => Err(format!("unknown sweep mode '{}'", other)),
        }
    }
}

/// Drives autonomous paddles back and forth across their goal span.
#[derive(Debug, Clone)]
pub struct BotController {
    mode: SweepMode,
    shared_velocity: f64,
}

impl BotController {
    pub fn new(mode: SweepMode, speed: f64) -> Self {
        Self {
            mode,
            shared_velocity: speed,
        }
    }

    /// Advance every given paddle by one tick.
    pub fn sweep<'a>(&mut self, paddles: impl IntoIterator<Item = &'a mut Paddle>) {
        match self.mode {
            SweepMode::Independent => {
                for paddle in paddles {
                    if paddle.sweep_by(paddle.sweep_velocity) {
                        paddle.sweep_velocity = -paddle.sweep_velocity;
                    }
                }
            }
            SweepMode::Shared => {
                let mut reversed = false;
                for paddle in paddles {
                    reversed |= paddle.sweep_by(self.shared_velocity);
                }
                if reversed {
                    self.shared_velocity = -self.shared_velocity;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ArenaConfig {
        ArenaConfig::default()
    }

    #[test]
    fn paddles_start_centered_against_their_wall() {
        let config = arena();
        let left = Paddle::new(Edge::Left, 0, &config);
        assert_eq!((left.x, left.y), (20.0, 260.0));
        assert_eq!((left.width, left.height), (10.0, 80.0));

        let bottom = Paddle::new(Edge::Bottom, 0, &config);
        assert_eq!((bottom.x, bottom.y), (260.0, 570.0));
        assert_eq!((bottom.width, bottom.height), (80.0, 10.0));
        assert_eq!(bottom.player_no, 4);
    }

    #[test]
    fn move_to_clamps_to_goal_span() {
        let mut paddle = Paddle::new(Edge::Right, 0, &arena());
        assert!(paddle.move_to(-100.0));
        assert_eq!(paddle.y, 150.0);
        assert!(paddle.move_to(1000.0));
        assert_eq!(paddle.y, 370.0);
        assert!(!paddle.move_to(200.0));
        assert_eq!(paddle.y, 200.0);
        // Exactly on the boundary is not a clamp
        assert!(!paddle.move_to(370.0));
    }

    #[test]
    fn any_move_stays_within_range() {
        for edge in Edge::ALL {
            let mut paddle = Paddle::new(edge, 0, &arena());
            let (lo, hi) = paddle.axis_range();
            for target in [-1e9, -1.0, 0.0, 149.9, 151.0, 369.0, 371.0, 599.0, 1e9] {
                paddle.move_to(target);
                let pos = paddle.axis_position();
                assert!(pos >= lo && pos <= hi, "{:?} at {}", edge, pos);
            }
        }
    }

    #[test]
    fn non_finite_target_is_ignored() {
        let mut paddle = Paddle::new(Edge::Top, 0, &arena());
        let before = paddle.x;
        assert!(!paddle.move_to(f64::NAN));
        assert_eq!(paddle.x, before);
    }

    #[test]
    fn follow_cursor_uses_paddle_axis() {
        let mut left = Paddle::new(Edge::Left, 0, &arena());
        left.follow_cursor(500.0, 200.0);
        assert_eq!((left.x, left.y), (20.0, 200.0));

        let mut top = Paddle::new(Edge::Top, 0, &arena());
        top.follow_cursor(300.0, 500.0);
        assert_eq!((top.x, top.y), (300.0, 20.0));
    }

    #[test]
    fn independent_sweep_reverses_at_boundaries() {
        let mut controller = BotController::new(SweepMode::Independent, 2.0);
        let mut paddle = Paddle::new(Edge::Left, 0, &arena());
        paddle.move_to(369.0);

        controller.sweep([&mut paddle]);
        assert_eq!(paddle.y, 370.0);
        assert_eq!(paddle.sweep_velocity, -2.0);

        controller.sweep([&mut paddle]);
        assert_eq!(paddle.y, 368.0);
    }

    #[test]
    fn independent_sweep_covers_span_back_and_forth() {
        let mut controller = BotController::new(SweepMode::Independent, 2.0);
        let mut paddle = Paddle::new(Edge::Top, 0, &arena());
        let (lo, hi) = paddle.axis_range();
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..400 {
            controller.sweep([&mut paddle]);
            seen_lo |= paddle.x == lo;
            seen_hi |= paddle.x == hi;
        }
        assert!(seen_lo && seen_hi);
    }

    #[test]
    fn shared_sweep_flips_every_paddle_together() {
        let config = arena();
        let mut controller = BotController::new(SweepMode::Shared, 2.0);
        let mut near_edge = Paddle::new(Edge::Left, 0, &config);
        let mut centered = Paddle::new(Edge::Top, 0, &config);
        near_edge.move_to(369.0);

        controller.sweep([&mut near_edge, &mut centered]);
        assert_eq!(near_edge.y, 370.0);
        assert_eq!(centered.x, 262.0);

        // The centered paddle turns around too, without touching a boundary
        controller.sweep([&mut near_edge, &mut centered]);
        assert_eq!(near_edge.y, 368.0);
        assert_eq!(centered.x, 260.0);
    }

    #[test]
    fn sweep_mode_parses() {
        assert_eq!("shared".parse::<SweepMode>(), Ok(SweepMode::Shared));
        assert_eq!(
            "independent".parse::<SweepMode>(),
            Ok(SweepMode::Independent)
        );
        assert!("sideways".parse::<SweepMode>().is_err());
    }
}
