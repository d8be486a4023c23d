use std::str::FromStr;

use quadpong_shared::config::ArenaConfig;

use crate::ball::CornerPolicy;
use crate::paddle::SweepMode;

/// Who advances the ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhysicsDriver {
    /// One step per `physics_step` message from any member
    #[default]
    Client,
    /// One step per room tick while the match is running; client
    /// `physics_step` messages are ignored
    Server,
}

impl FromStr for PhysicsDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(PhysicsDriver::Client),
            "server" => Ok(PhysicsDriver::Server),
            other => Err(format!("unknown physics driver '{}'", other)),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    pub match_duration_secs: u32,
    pub corner_policy: CornerPolicy,
    pub sweep_mode: SweepMode,
    pub physics_driver: PhysicsDriver,
    pub rng_seed: u64,
    pub max_connections: usize,
    /// Inbound text frames larger than this close the connection
    pub max_message_bytes: usize,
    pub arena: ArenaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            tick_rate_hz: 60,
            match_duration_secs: 180,
            corner_policy: CornerPolicy::Deterministic,
            sweep_mode: SweepMode::Independent,
            physics_driver: PhysicsDriver::Client,
            rng_seed: 42,
            max_connections: 1024,
            max_message_bytes: 1024,
            arena: ArenaConfig::default(),
        }
    }
}

/// Per-room settings derived from `ServerConfig`.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    pub arena: ArenaConfig,
    pub tick_rate_hz: u32,
    pub match_ticks: u32,
    pub corner_policy: CornerPolicy,
    pub sweep_mode: SweepMode,
}

impl Default for RoomConfig {
    fn default() -> Self {
        ServerConfig::default().room_config()
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, String> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value '{}'", name, raw)),
        None => Ok(None),
    }
}

impl ServerConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(port) = parse_var::<u16>(&lookup, "PORT")? {
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(hz) = parse_var(&lookup, "QUADPONG_TICK_HZ")? {
            config.tick_rate_hz = hz;
        }
        if let Some(secs) = parse_var(&lookup, "QUADPONG_MATCH_SECONDS")? {
            config.match_duration_secs = secs;
        }
        if let Some(raw) = lookup("QUADPONG_CORNER_POLICY") {
            config.corner_policy = raw.trim().parse()?;
        }
        if let Some(raw) = lookup("QUADPONG_BOT_SWEEP") {
            config.sweep_mode = raw.trim().parse()?;
        }
        if let Some(raw) = lookup("QUADPONG_PHYSICS") {
            config.physics_driver = raw.trim().parse()?;
        }
        if let Some(seed) = parse_var(&lookup, "QUADPONG_RNG_SEED")? {
            config.rng_seed = seed;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err("tick_rate_hz must be in 1..=1000".to_string());
        }
        if self.match_duration_secs == 0 {
            return Err("match_duration_secs must be > 0".to_string());
        }
        if self
            .match_duration_secs
            .checked_mul(self.tick_rate_hz)
            .is_none()
        {
            return Err("match duration in ticks overflows".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.max_message_bytes < 64 {
            return Err("max_message_bytes must be >= 64".to_string());
        }
        self.arena.validate()
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            arena: self.arena,
            tick_rate_hz: self.tick_rate_hz,
            match_ticks: self.match_duration_secs.saturating_mul(self.tick_rate_hz),
            corner_policy: self.corner_policy,
            sweep_mode: self.sweep_mode,
        }
    }
}
