//! Arena geometry: axis-aligned rectangles, the four gapped walls and the
//! scoring regions behind each gap.

use quadpong_shared::config::{ArenaConfig, Edge};
use quadpong_shared::protocol::WallWire;

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether `other` lies entirely inside `self` (edges inclusive).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }
}

/// How a ball touches a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallContact {
    /// Flat face of a solid segment
    Face,
    /// The post at the end of a segment, next to the goal gap
    Corner,
}

/// A strip along one arena edge, solid everywhere except the goal gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub edge: Edge,
    pub rect: Rect,
    /// Gap bounds along the wall's long axis
    pub gap_start: f64,
    pub gap_end: f64,
}

impl Wall {
    pub fn new(edge: Edge, arena: &ArenaConfig) -> Self {
        let t = arena.wall_thickness;
        let s = arena.size;
        let rect = match edge {
            Edge::Left => Rect::new(0.0, 0.0, t, s),
            Edge::Right => Rect::new(s - t, 0.0, t, s),
            Edge::Top => Rect::new(0.0, 0.0, s, t),
            Edge::Bottom => Rect::new(0.0, s - t, s, t),
        };
        let gap_start = arena.wall_offset();
        Self {
            edge,
            rect,
            gap_start,
            gap_end: gap_start + arena.goal_span,
        }
    }

    /// Extent of `r` along this wall's long axis.
    fn span_of(&self, r: &Rect) -> (f64, f64) {
        if self.edge.is_vertical() {
            (r.y, r.bottom())
        } else {
            (r.x, r.right())
        }
    }

    /// The two solid segments flanking the gap, each paired with the
    /// coordinate of its gap-facing end.
    fn segments(&self) -> [(Rect, f64); 2] {
        let r = self.rect;
        if self.edge.is_vertical() {
            [
                (Rect::new(r.x, r.y, r.width, self.gap_start - r.y), self.gap_start),
                (
                    Rect::new(r.x, self.gap_end, r.width, r.bottom() - self.gap_end),
                    self.gap_end,
                ),
            ]
        } else {
            [
                (Rect::new(r.x, r.y, self.gap_start - r.x, r.height), self.gap_start),
                (
                    Rect::new(self.gap_end, r.y, r.right() - self.gap_end, r.height),
                    self.gap_end,
                ),
            ]
        }
    }

    /// Classify the contact between `ball` and this wall, if any.
    pub fn contact(&self, ball: &Rect) -> Option<WallContact> {
        let (lo, hi) = self.span_of(ball);
        for (segment, gap_end) in self.segments() {
            if segment.overlaps(ball) {
                return Some(if lo < gap_end && gap_end < hi {
                    WallContact::Corner
                } else {
                    WallContact::Face
                });
            }
        }
        None
    }

    pub fn to_wire(&self) -> WallWire {
        WallWire {
            edge: self.edge,
            x: self.rect.x,
            y: self.rect.y,
            width: self.rect.width,
            height: self.rect.height,
            gap_start: self.gap_start,
            gap_end: self.gap_end,
        }
    }
}

/// Scoring region beyond the gap on one edge. The ball never bounces off it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    pub edge: Edge,
    pub rect: Rect,
}

impl Goal {
    pub fn new(edge: Edge, arena: &ArenaConfig) -> Self {
        let o = arena.wall_offset();
        let d = arena.goal_depth;
        let span = arena.goal_span;
        let rect = match edge {
            Edge::Left => Rect::new(-d, o, d, span),
            Edge::Right => Rect::new(arena.size, o, d, span),
            Edge::Top => Rect::new(o, -d, span, d),
            Edge::Bottom => Rect::new(o, arena.size, span, d),
        };
        Self { edge, rect }
    }

    pub fn contains(&self, ball: &Rect) -> bool {
        self.rect.contains(ball)
    }
}

/// Static layout of one room. Built once when the room is created.
#[derive(Debug, Clone)]
pub struct Arena {
    pub bounds: Rect,
    /// Indexed by `player_no - 1`
    pub walls: [Wall; 4],
    pub goals: [Goal; 4],
}

impl Arena {
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, config.size, config.size),
            walls: Edge::ALL.map(|edge| Wall::new(edge, config)),
            goals: Edge::ALL.map(|edge| Goal::new(edge, config)),
        }
    }

    pub fn goal(&self, edge: Edge) -> Goal {
        self.goals[(edge.player_no() - 1) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ArenaConfig {
        ArenaConfig::default()
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        let c = Rect::new(9.5, 9.5, 10.0, 10.0);
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn contains_is_inclusive() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(outer.contains(&Rect::new(40.0, 40.0, 10.0, 10.0)));
        assert!(!outer.contains(&Rect::new(95.0, 40.0, 10.0, 10.0)));
    }

    #[test]
    fn ball_inside_gap_does_not_touch_wall() {
        let wall = Wall::new(Edge::Top, &arena());
        // Squarely inside the top gap, level with the wall strip
        let ball = Rect::new(290.0, 5.0, 10.0, 10.0);
        assert_eq!(wall.contact(&ball), None);
    }

    #[test]
    fn ball_against_flat_segment_is_face_contact() {
        let wall = Wall::new(Edge::Top, &arena());
        let ball = Rect::new(60.0, 18.0, 10.0, 10.0);
        assert_eq!(wall.contact(&ball), Some(WallContact::Face));

        let wall = Wall::new(Edge::Right, &arena());
        let ball = Rect::new(582.0, 500.0, 10.0, 10.0);
        assert_eq!(wall.contact(&ball), Some(WallContact::Face));
    }

    #[test]
    fn ball_straddling_gap_end_is_corner_contact() {
        let wall = Wall::new(Edge::Top, &arena());
        let ball = Rect::new(145.0, 15.0, 10.0, 10.0);
        assert_eq!(wall.contact(&ball), Some(WallContact::Corner));

        let wall = Wall::new(Edge::Left, &arena());
        let ball = Rect::new(15.0, 445.0, 10.0, 10.0);
        assert_eq!(wall.contact(&ball), Some(WallContact::Corner));
    }

    #[test]
    fn goals_sit_beyond_each_edge() {
        let config = arena();
        let left = Goal::new(Edge::Left, &config);
        assert!(left.contains(&Rect::new(-20.0, 200.0, 10.0, 10.0)));
        assert!(!left.contains(&Rect::new(-5.0, 200.0, 10.0, 10.0)));

        let bottom = Goal::new(Edge::Bottom, &config);
        assert!(bottom.contains(&Rect::new(300.0, 605.0, 10.0, 10.0)));
        // Outside the gap span
        assert!(!bottom.contains(&Rect::new(100.0, 605.0, 10.0, 10.0)));
    }

    #[test]
    fn arena_indexes_by_player_number() {
        let arena = Arena::new(&arena());
        for edge in Edge::ALL {
            let idx = (edge.player_no() - 1) as usize;
            assert_eq!(arena.walls[idx].edge, edge);
            assert_eq!(arena.goal(edge).edge, edge);
        }
    }
}
