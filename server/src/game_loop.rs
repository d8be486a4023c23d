use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::player::ConnectionId;
use crate::protocol::{ClientMsg, ServerMsg, WelcomeMsg};
use crate::registry::{RoomRegistry, ScheduleHandle, TickScheduler};

/// Commands into the game loop, from connections and room tickers
pub enum GameCommand {
    Connect {
        outbox: mpsc::Sender<ServerMsg>,
        response: oneshot::Sender<(ConnectionId, WelcomeMsg)>,
    },
    Client {
        id: ConnectionId,
        msg: ClientMsg,
    },
    Disconnect {
        id: ConnectionId,
    },
    Tick {
        room_id: String,
        schedule_id: u64,
    },
}

/// One tokio interval task per room, posting `Tick` into the loop.
///
/// The task holds only a weak sender so a forgotten ticker cannot keep the
/// loop alive.
pub struct IntervalScheduler {
    ticks: mpsc::WeakSender<GameCommand>,
    period: Duration,
}

impl IntervalScheduler {
    pub fn new(ticks: mpsc::WeakSender<GameCommand>, tick_rate_hz: u32) -> Self {
        Self {
            ticks,
            period: Duration::from_secs_f64(1.0 / tick_rate_hz.max(1) as f64),
        }
    }
}

pub struct TickerHandle(JoinHandle<()>);

impl ScheduleHandle for TickerHandle {
    fn cancel(self) {
        self.0.abort();
    }
}

impl TickScheduler for IntervalScheduler {
    type Handle = TickerHandle;

    fn schedule(&mut self, room_id: &str, schedule_id: u64) -> TickerHandle {
        let ticks = self.ticks.clone();
        let period = self.period;
        let room_id = room_id.to_string();
        TickerHandle(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(tx) = ticks.upgrade() else {
                    break;
                };
                let cmd = GameCommand::Tick {
                    room_id: room_id.clone(),
                    schedule_id,
                };
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
        }))
    }
}

/// Run the main game loop. Owns every room and connection.
///
/// `ticks` is a weak handle to the same channel `cmd_rx` reads from; the loop
/// ends once every strong sender is gone.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    ticks: mpsc::WeakSender<GameCommand>,
    config: ServerConfig,
) {
    let scheduler = IntervalScheduler::new(ticks, config.tick_rate_hz);
    let mut registry = RoomRegistry::new(scheduler, config);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            GameCommand::Connect { outbox, response } => {
                let id = registry.connect(outbox);
                let welcome = registry.welcome(id);
                if response.send((id, welcome)).is_err() {
                    // Connection gave up before the welcome
                    registry.disconnect(id);
                }
            }
            GameCommand::Client { id, msg } => registry.handle_client_msg(id, msg),
            GameCommand::Disconnect { id } => registry.disconnect(id),
            GameCommand::Tick {
                room_id,
                schedule_id,
            } => registry.on_tick(&room_id, schedule_id),
        }
    }

    registry.shutdown();
    tracing::info!("Game loop ended");
}
