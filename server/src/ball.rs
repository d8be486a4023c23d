//! The shared ball: motion, collision queries and the bookkeeping flags that
//! keep a single contact from being counted more than once.

use std::f64::consts::FRAC_PI_4;
use std::str::FromStr;

use quadpong_shared::config::{ArenaConfig, Edge};
use quadpong_shared::protocol::BallWire;
use rand::Rng;

use crate::geometry::{Goal, Rect, Wall, WallContact};
use crate::paddle::Paddle;

/// Ball color before any paddle has touched it.
pub const DEFAULT_BALL_COLOR: u32 = 0xffffff;

/// Largest random deflection applied by `CornerPolicy::Randomized` (radians).
pub const MAX_CORNER_DEFLECTION: f64 = FRAC_PI_4;

/// How the ball leaves a goal post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerPolicy {
    /// Invert both velocity components
    #[default]
    Deterministic,
    /// Invert both components, then rotate by a random angle of at most
    /// `MAX_CORNER_DEFLECTION`. Speed is preserved.
    Randomized,
}

impl FromStr for CornerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deterministic" => Ok(CornerPolicy::Deterministic),
            "randomized" => Ok(CornerPolicy::Randomized),
            other => Err(format!("unknown corner policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub color: u32,
    /// Last paddle to touch the ball; credited if it crosses a goal
    pub player_no_of_paddle_collided_with: Option<u8>,
    /// Set on first paddle contact, cleared once that paddle is left behind
    pub currently_collided_with_paddle: bool,
    /// Set on the first goal detection; only `reset` clears it
    pub already_past_goal: bool,
    pub collides_at_corner: bool,
    start: f64,
    default_vx: f64,
    default_vy: f64,
}

impl Ball {
    pub fn new(arena: &ArenaConfig) -> Self {
        let start = arena.ball_start();
        Self {
            x: start,
            y: start,
            vx: arena.ball_speed_x,
            vy: arena.ball_speed_y,
            size: arena.ball_size,
            color: DEFAULT_BALL_COLOR,
            player_no_of_paddle_collided_with: None,
            currently_collided_with_paddle: false,
            already_past_goal: false,
            collides_at_corner: false,
            start,
            default_vx: arena.ball_speed_x,
            default_vy: arena.ball_speed_y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    /// Back to the center with default velocity, no flags and no attribution.
    pub fn reset(&mut self) {
        self.x = self.start;
        self.y = self.start;
        self.vx = self.default_vx;
        self.vy = self.default_vy;
        self.color = DEFAULT_BALL_COLOR;
        self.player_no_of_paddle_collided_with = None;
        self.currently_collided_with_paddle = false;
        self.already_past_goal = false;
        self.collides_at_corner = false;
    }

    /// Test against one wall, recording whether the contact is at a post.
    pub fn collides_with_wall(&mut self, wall: &Wall) -> bool {
        match wall.contact(&self.rect()) {
            Some(contact) => {
                self.collides_at_corner = contact == WallContact::Corner;
                true
            }
            None => false,
        }
    }

    pub fn bounce_off_corner(&mut self, policy: CornerPolicy, rng: &mut impl Rng) {
        self.vx = -self.vx;
        self.vy = -self.vy;
        if policy == CornerPolicy::Randomized {
            let angle = rng.gen_range(-MAX_CORNER_DEFLECTION..=MAX_CORNER_DEFLECTION);
            let (sin, cos) = angle.sin_cos();
            let (vx, vy) = (self.vx, self.vy);
            self.vx = vx * cos - vy * sin;
            self.vy = vx * sin + vy * cos;
        }
        self.collides_at_corner = false;
    }

    /// Reflect off the flat face of a wall. The component normal to the wall
    /// is pointed back into the arena, so a ball already heading away keeps
    /// its velocity.
    pub fn bounce_off_face(&mut self, edge: Edge) {
        match edge {
            Edge::Left => self.vx = self.vx.abs(),
            Edge::Right => self.vx = -self.vx.abs(),
            Edge::Top => self.vy = self.vy.abs(),
            Edge::Bottom => self.vy = -self.vy.abs(),
        }
    }

    pub fn collides_with_paddle(&self, paddle: &Paddle) -> bool {
        self.rect().overlaps(&paddle.rect())
    }

    /// First contact with a paddle: reflect, take its color and remember who
    /// hit it.
    pub fn change_direction_on_collision_with(&mut self, paddle: &Paddle) {
        if paddle.is_vertical() {
            self.vx = -self.vx;
        } else {
            self.vy = -self.vy;
        }
        self.touch_paddle(paddle);
    }

    /// Record a paddle contact without reflecting.
    pub fn touch_paddle(&mut self, paddle: &Paddle) {
        self.currently_collided_with_paddle = true;
        self.player_no_of_paddle_collided_with = Some(paddle.player_no);
        self.color = paddle.color;
    }

    /// Whether the ball is entirely inside a goal region.
    pub fn out_of_bounds(&self, goal: &Goal) -> bool {
        goal.contains(&self.rect())
    }

    pub fn integrate(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
    }

    pub fn to_wire(&self) -> BallWire {
        BallWire {
            x: self.x,
            y: self.y,
            vx: self.vx,
            vy: self.vy,
            size: self.size,
            color: self.color,
        }
    }
}
