//! One match: arena, ball, up to four players and the countdown.

use std::fmt;

use quadpong_shared::config::Edge;
use quadpong_shared::protocol::StateMsg;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ball::Ball;
use crate::config::RoomConfig;
use crate::geometry::Arena;
use crate::paddle::BotController;
use crate::player::{ConnectionId, Occupant, Player};

pub const MAX_PLAYERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    RoomFull,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::RoomFull => write!(f, "room already has {} players", MAX_PLAYERS),
        }
    }
}

impl std::error::Error for JoinError {}

pub struct Room {
    pub id: String,
    pub arena: Arena,
    pub ball: Ball,
    /// Join order; player numbers follow it
    players: Vec<Player>,
    game_active: bool,
    remaining_ticks: u32,
    config: RoomConfig,
    bots: BotController,
    rng: ChaCha8Rng,
}

impl Room {
    pub fn new(id: impl Into<String>, config: RoomConfig, rng_seed: u64) -> Self {
        Self {
            id: id.into(),
            arena: Arena::new(&config.arena),
            ball: Ball::new(&config.arena),
            players: Vec::with_capacity(MAX_PLAYERS),
            game_active: false,
            remaining_ticks: config.match_ticks,
            bots: BotController::new(config.sweep_mode, config.arena.bot_speed),
            config,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn is_active(&self) -> bool {
        self.game_active
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// Seconds left in the match.
    pub fn time_remaining(&self) -> f64 {
        self.remaining_ticks as f64 / self.config.tick_rate_hz as f64
    }

    pub fn player_by_connection(&self, id: ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.occupant == Occupant::Human(id))
    }

    pub fn player_by_number(&self, player_no: u8) -> Option<&Player> {
        self.players.iter().find(|p| p.player_no == player_no)
    }

    fn seat(&mut self, occupant: Occupant) -> Result<u8, JoinError> {
        let player_no = (self.players.len() + 1) as u8;
        let edge = Edge::from_player_no(player_no).ok_or(JoinError::RoomFull)?;
        let goal = self.arena.goal(edge);
        self.players
            .push(Player::new(edge, occupant, goal, &self.config.arena));
        Ok(player_no)
    }

    /// Seat a human connection. Returns its player number; a connection that
    /// already has a seat keeps it.
    pub fn join(&mut self, id: ConnectionId) -> Result<u8, JoinError> {
        if let Some(existing) = self.player_by_connection(id) {
            return Ok(existing.player_no);
        }
        self.seat(Occupant::Human(id))
    }

    /// Seat bots until the room holds `up_to` players (at most four).
    /// Returns how many were added.
    pub fn fill_with_bots(&mut self, up_to: usize) -> usize {
        let target = up_to.min(MAX_PLAYERS);
        let mut added = 0;
        while self.players.len() < target {
            if self.seat(Occupant::Bot).is_err() {
                break;
            }
            added += 1;
        }
        added
    }

    pub fn start_game(&mut self) {
        self.game_active = true;
        self.remaining_ticks = self.config.match_ticks;
        tracing::info!(
            "Room {} started with {} players",
            self.id,
            self.players.len()
        );
    }

    /// Ends play. Scores are kept so winners can still be computed.
    pub fn stop_game(&mut self) {
        self.game_active = false;
    }

    /// Count down one tick. Returns true once the match clock has run out.
    pub fn update_time(&mut self) -> bool {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }

    /// Every player sharing the top score.
    pub fn winners(&self) -> Vec<&Player> {
        let Some(best) = self.players.iter().map(|p| p.score).max() else {
            return Vec::new();
        };
        self.players.iter().filter(|p| p.score == best).collect()
    }

    /// Move the paddle owned by `id` toward a cursor position. Returns false
    /// if the connection has no seat here.
    pub fn move_player(&mut self, id: ConnectionId, x: f64, y: f64) -> bool {
        match self
            .players
            .iter_mut()
            .find(|p| p.occupant == Occupant::Human(id))
        {
            Some(player) => {
                player.paddle.follow_cursor(x, y);
                true
            }
            None => false,
        }
    }

    pub fn sweep_bots(&mut self) {
        self.bots.sweep(
            self.players
                .iter_mut()
                .filter(|p| p.is_bot())
                .map(|p| &mut p.paddle),
        );
    }

    /// One ball step: walls, then paddles, then goals, then integration.
    pub fn advance_physics_step(&mut self) {
        let hit_corner = self.resolve_walls();
        self.resolve_paddles(hit_corner);
        self.resolve_goals();
        self.ball.integrate();
    }

    /// Returns true if the ball bounced off a goal post.
    fn resolve_walls(&mut self) -> bool {
        for wall in &self.arena.walls {
            if self.ball.collides_with_wall(wall) {
                if self.ball.collides_at_corner {
                    self.ball
                        .bounce_off_corner(self.config.corner_policy, &mut self.rng);
                    return true;
                }
                self.ball.bounce_off_face(wall.edge);
                return false;
            }
        }
        false
    }

    fn resolve_paddles(&mut self, hit_corner: bool) {
        let ball = &mut self.ball;
        for player in &self.players {
            let paddle = &player.paddle;
            if ball.collides_with_paddle(paddle) {
                if !ball.currently_collided_with_paddle {
                    // A second reflection would undo the post bounce
                    if hit_corner {
                        ball.touch_paddle(paddle);
                    } else {
                        ball.change_direction_on_collision_with(paddle);
                    }
                }
                break;
            } else if ball.player_no_of_paddle_collided_with == Some(paddle.player_no) {
                ball.currently_collided_with_paddle = false;
            }
        }
    }

    fn resolve_goals(&mut self) {
        let mut scorer = None;
        let mut in_goal = false;
        for player in &self.players {
            if !self.ball.out_of_bounds(&player.goal) {
                continue;
            }
            in_goal = true;
            if self.ball.already_past_goal {
                self.ball.reset();
            } else {
                scorer = self.ball.player_no_of_paddle_collided_with.take();
                self.ball.already_past_goal = true;
            }
        }

        if let Some(player_no) = scorer {
            if let Some(player) = self.players.iter_mut().find(|p| p.player_no == player_no) {
                player.incr_score();
                tracing::debug!(
                    "Room {}: player {} scored ({})",
                    self.id,
                    player_no,
                    player.score
                );
            }
        }

        // Left through a gap nobody guards
        if !in_goal && !self.ball.rect().overlaps(&self.arena.bounds) {
            self.ball.reset();
        }
    }

    /// Immutable snapshot for broadcasting.
    pub fn snapshot(&self) -> StateMsg {
        StateMsg {
            ball: self.ball.to_wire(),
            walls: self.arena.walls.iter().map(|w| w.to_wire()).collect(),
            players: self.players.iter().map(Player::to_wire).collect(),
            time_remaining: self.time_remaining(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::CornerPolicy;
    use crate::paddle::SweepMode;

    fn test_room() -> Room {
        Room::new("test", RoomConfig::default(), 7)
    }

    fn full_room() -> Room {
        let mut room = test_room();
        for id in 1..=4 {
            room.join(id).unwrap();
        }
        room
    }

    #[test]
    fn players_are_numbered_in_join_order() {
        let mut room = test_room();
        assert_eq!(room.join(10), Ok(1));
        assert_eq!(room.join(20), Ok(2));
        assert_eq!(room.join(30), Ok(3));
        assert_eq!(room.join(40), Ok(4));
        let numbers: Vec<u8> = room.players().iter().map(|p| p.player_no).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(room.player_by_connection(30).unwrap().paddle.edge(), Edge::Top);
    }

    #[test]
    fn fifth_join_is_rejected() {
        let mut room = full_room();
        assert_eq!(room.join(99), Err(JoinError::RoomFull));
        assert_eq!(room.player_count(), 4);
    }

    #[test]
    fn rejoining_keeps_the_same_seat() {
        let mut room = test_room();
        room.join(5).unwrap();
        room.join(6).unwrap();
        assert_eq!(room.join(5), Ok(1));
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn bots_fill_remaining_seats() {
        let mut room = test_room();
        room.join(1).unwrap();
        assert_eq!(room.fill_with_bots(MAX_PLAYERS), 3);
        assert!(room.is_full());
        assert_eq!(room.players().iter().filter(|p| p.is_bot()).count(), 3);
        assert_eq!(room.fill_with_bots(10), 0);
    }

    #[test]
    fn match_expires_after_duration_in_ticks() {
        let mut room = test_room();
        room.start_game();
        assert!((room.time_remaining() - 180.0).abs() < 1e-9);
        for _ in 0..10_799 {
            assert!(!room.update_time());
        }
        assert!(room.update_time());
        assert_eq!(room.time_remaining(), 0.0);
    }

    #[test]
    fn stop_keeps_scores() {
        let mut room = full_room();
        room.players[2].score = 3;
        room.start_game();
        room.stop_game();
        assert!(!room.is_active());
        assert_eq!(room.players()[2].score, 3);
    }

    #[test]
    fn winners_include_every_tie() {
        let mut room = full_room();
        assert_eq!(room.winners().len(), 4);
        room.players[1].score = 2;
        room.players[3].score = 2;
        let winners: Vec<u8> = room.winners().iter().map(|p| p.player_no).collect();
        assert_eq!(winners, vec![2, 4]);
        assert!(test_room().winners().is_empty());
    }

    #[test]
    fn move_player_ignores_unknown_connection() {
        let mut room = full_room();
        assert!(room.move_player(1, 0.0, 1000.0));
        assert_eq!(room.players()[0].paddle.y, 370.0);
        assert!(!room.move_player(77, 0.0, 0.0));
    }

    #[test]
    fn corner_collision_inverts_both_components() {
        let mut room = test_room();
        // Bottom wall, straddling the gap end at x = 450
        room.ball.x = 445.0;
        room.ball.y = 571.0;
        assert_eq!((room.ball.vx, room.ball.vy), (4.0, 4.0));
        room.advance_physics_step();
        assert_eq!((room.ball.vx, room.ball.vy), (-4.0, -4.0));
        assert!(!room.ball.collides_at_corner);
        assert_eq!((room.ball.x, room.ball.y), (441.0, 567.0));
    }

    #[test]
    fn ball_from_center_rebounds_off_first_wall() {
        let mut room = test_room();
        let mut steps = 0;
        while room.ball.vx > 0.0 && room.ball.vy > 0.0 && steps < 500 {
            room.advance_physics_step();
            steps += 1;
        }
        // Heading for the bottom-right corner, the right wall is hit first
        assert_eq!((room.ball.vx, room.ball.vy), (-4.0, 4.0));
        for _ in 0..5 {
            room.advance_physics_step();
        }
        assert_eq!((room.ball.vx, room.ball.vy), (-4.0, -4.0));
    }

    #[test]
    fn paddle_contact_reflects_once_per_overlap() {
        let mut room = full_room();
        let paddle_y = room.players()[0].paddle.y;
        room.ball.x = 22.0;
        room.ball.y = paddle_y + 20.0;
        room.ball.vx = 4.0;
        room.ball.vy = 0.0;

        room.advance_physics_step();
        assert_eq!(room.ball.vx, -4.0);
        assert!(room.ball.currently_collided_with_paddle);
        assert_eq!(room.ball.player_no_of_paddle_collided_with, Some(1));
        assert_eq!(room.ball.color, room.players()[0].paddle.color);

        // Still overlapping: no second inversion
        room.advance_physics_step();
        assert_eq!(room.ball.vx, -4.0);
    }

    #[test]
    fn sustained_overlap_inverts_exactly_once() {
        let mut room = full_room();
        let paddle_y = room.players()[0].paddle.y;
        room.ball.x = 25.0;
        room.ball.y = paddle_y + 20.0;
        room.ball.vx = 0.5;
        room.ball.vy = 0.0;

        let mut inversions = 0;
        let mut last_sign = room.ball.vx.signum();
        for _ in 0..10 {
            room.advance_physics_step();
            if room.ball.vx.signum() != last_sign {
                inversions += 1;
                last_sign = room.ball.vx.signum();
            }
        }
        assert_eq!(inversions, 1);
    }

    #[test]
    fn leaving_the_paddle_rearms_contact() {
        let mut room = full_room();
        let paddle_y = room.players()[0].paddle.y;
        room.ball.x = 25.0;
        room.ball.y = paddle_y + 20.0;
        room.ball.vx = 4.0;
        room.ball.vy = 0.0;

        room.advance_physics_step();
        assert!(room.ball.currently_collided_with_paddle);
        // Overlap lasts until the ball's right edge clears x = 20
        for _ in 0..4 {
            room.advance_physics_step();
        }
        assert!(!room.ball.currently_collided_with_paddle);
        assert_eq!(room.ball.player_no_of_paddle_collided_with, Some(1));
    }

    #[test]
    fn post_bounce_is_not_undone_by_paddle_in_same_step() {
        let mut room = full_room();
        // Paddle 1 at the bottom of its span, touching the lower left post
        assert!(room.move_player(1, 0.0, 1000.0));
        room.ball.x = 17.51;
        room.ball.y = 448.41;
        room.ball.vx = -4.0;
        room.ball.vy = 4.0;

        room.advance_physics_step();
        assert_eq!((room.ball.vx, room.ball.vy), (4.0, -4.0));
        assert!(room.ball.currently_collided_with_paddle);
        assert_eq!(room.ball.player_no_of_paddle_collided_with, Some(1));
        assert_eq!(room.ball.color, room.players()[0].paddle.color);

        for _ in 0..5 {
            room.advance_physics_step();
            assert_eq!(room.ball.vx, 4.0);
        }
        // Clear of the wall strip and the paddle, contact rearmed
        assert!(room.ball.x > 30.0);
        assert!(!room.ball.currently_collided_with_paddle);
    }

    #[test]
    fn goal_scores_once_then_resets_ball() {
        let mut room = full_room();
        // Player 3 touched it last; it is now wholly inside the left goal
        room.ball.player_no_of_paddle_collided_with = Some(3);
        room.ball.x = -30.0;
        room.ball.y = 300.0;
        room.ball.vx = -1.0;
        room.ball.vy = 0.0;

        room.advance_physics_step();
        assert_eq!(room.player_by_number(3).unwrap().score, 1);
        assert!(room.ball.already_past_goal);
        assert_eq!(room.ball.player_no_of_paddle_collided_with, None);

        room.advance_physics_step();
        assert_eq!(room.player_by_number(3).unwrap().score, 1);
        // Reset, then integrated once from the center
        assert!(!room.ball.already_past_goal);
        assert_eq!((room.ball.x, room.ball.y), (299.0, 299.0));
        let total: u32 = room.players().iter().map(|p| p.score).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn goal_without_attribution_scores_nobody() {
        let mut room = full_room();
        room.ball.x = 300.0;
        room.ball.y = -30.0;
        room.ball.vx = 0.0;
        room.ball.vy = -1.0;
        room.advance_physics_step();
        assert!(room.ball.already_past_goal);
        assert!(room.players().iter().all(|p| p.score == 0));
    }

    #[test]
    fn stray_ball_through_unguarded_gap_is_reset() {
        let mut room = test_room();
        room.join(1).unwrap();
        // Nobody guards the bottom edge
        room.ball.x = 300.0;
        room.ball.y = 601.0;
        room.ball.vx = 0.0;
        room.ball.vy = 4.0;
        room.advance_physics_step();
        assert_eq!((room.ball.x, room.ball.y), (299.0, 299.0));
        assert_eq!((room.ball.vx, room.ball.vy), (4.0, 4.0));
    }

    #[test]
    fn ball_stays_in_bounds_over_long_play() {
        let mut room = test_room();
        room.fill_with_bots(MAX_PLAYERS);
        room.start_game();
        let size = room.config.arena.size;
        let depth = room.config.arena.goal_depth;
        for _ in 0..20_000 {
            room.sweep_bots();
            room.advance_physics_step();
            let b = &room.ball;
            assert!(b.x > -depth - b.size && b.x < size + depth, "x = {}", b.x);
            assert!(b.y > -depth - b.size && b.y < size + depth, "y = {}", b.y);
        }
    }

    #[test]
    fn randomized_corner_policy_keeps_speed() {
        let config = RoomConfig {
            corner_policy: CornerPolicy::Randomized,
            ..RoomConfig::default()
        };
        let mut room = Room::new("random", config, 3);
        room.ball.x = 445.0;
        room.ball.y = 571.0;
        room.advance_physics_step();
        let speed = room.ball.vx.hypot(room.ball.vy);
        assert!((speed - 32f64.sqrt()).abs() < 1e-9);
        assert!(room.ball.vy < 0.0);
    }

    #[test]
    fn sweep_moves_only_bot_paddles() {
        let config = RoomConfig {
            sweep_mode: SweepMode::Independent,
            ..RoomConfig::default()
        };
        let mut room = Room::new("bots", config, 1);
        room.join(1).unwrap();
        room.fill_with_bots(MAX_PLAYERS);
        let human_before = room.players()[0].paddle.clone();
        let bot_before = room.players()[1].paddle.axis_position();
        room.sweep_bots();
        assert_eq!(room.players()[0].paddle, human_before);
        assert_eq!(room.players()[1].paddle.axis_position(), bot_before + 2.0);
    }

    #[test]
    fn snapshot_reflects_room() {
        let mut room = test_room();
        room.join(1).unwrap();
        room.fill_with_bots(MAX_PLAYERS);
        let snapshot = room.snapshot();
        assert_eq!(snapshot.walls.len(), 4);
        assert_eq!(snapshot.players.len(), 4);
        assert!(!snapshot.players[0].is_bot);
        assert!(snapshot.players[3].is_bot);
        assert!((snapshot.time_remaining - 180.0).abs() < 1e-9);
        assert_eq!(snapshot.ball.x, room.ball.x);
    }
}
