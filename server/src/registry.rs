//! Live rooms, which connection sits in which room, and the per-room tick
//! schedules.
//!
//! Everything here runs on the game loop task, one command at a time. Ticker
//! tasks never touch a room directly; they only post `Tick` commands, and the
//! registry owns the handle that stops them.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::{PhysicsDriver, ServerConfig};
use crate::player::ConnectionId;
use crate::protocol::{
    game_over_msg, welcome_msg, ClientMsg, JoinFailureMsg, JoinFailureReason, JoinSuccessMsg,
    ServerMsg, WelcomeMsg,
};
use crate::room::{JoinError, Room, MAX_PLAYERS};

/// Outbound queue depth per connection. Snapshots beyond this are dropped.
pub const OUTBOX_CAPACITY: usize = 64;

/// Longest accepted session id, in bytes.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Stops one recurring tick. Consumed on cancel, so it can only happen once.
pub trait ScheduleHandle {
    fn cancel(self);
}

/// Starts recurring ticks for a room.
pub trait TickScheduler {
    type Handle: ScheduleHandle;

    /// Begin posting ticks tagged with `schedule_id` for `room_id`.
    fn schedule(&mut self, room_id: &str, schedule_id: u64) -> Self::Handle;
}

struct Schedule<H> {
    id: u64,
    handle: H,
}

struct RoomEntry<H> {
    room: Room,
    /// Every connection that joined the session, seated or not
    members: Vec<ConnectionId>,
    schedule: Option<Schedule<H>>,
}

struct Connection {
    outbox: mpsc::Sender<ServerMsg>,
    room: Option<String>,
}

fn send_to(connections: &HashMap<ConnectionId, Connection>, id: ConnectionId, msg: ServerMsg) {
    let Some(conn) = connections.get(&id) else {
        return;
    };
    match conn.outbox.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Outbox for connection {} is full, dropping message", id);
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!("Outbox for connection {} is closed", id);
        }
    }
}

fn broadcast(
    connections: &HashMap<ConnectionId, Connection>,
    members: &[ConnectionId],
    msg: &ServerMsg,
) {
    for &member in members {
        send_to(connections, member, msg.clone());
    }
}

pub struct RoomRegistry<S: TickScheduler> {
    rooms: HashMap<String, RoomEntry<S::Handle>>,
    connections: HashMap<ConnectionId, Connection>,
    scheduler: S,
    config: ServerConfig,
    next_connection_id: ConnectionId,
    next_schedule_id: u64,
    rooms_created: u64,
}

impl<S: TickScheduler> RoomRegistry<S> {
    pub fn new(scheduler: S, config: ServerConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            connections: HashMap::new(),
            scheduler,
            config,
            next_connection_id: 1,
            next_schedule_id: 1,
            rooms_created: 0,
        }
    }

    /// Register a new connection and its outbound queue.
    pub fn connect(&mut self, outbox: mpsc::Sender<ServerMsg>) -> ConnectionId {
        let id = loop {
            let candidate = self.next_connection_id;
            // Wraps around, skipping 0 and ids still connected
            self.next_connection_id = self.next_connection_id.wrapping_add(1).max(1);
            if !self.connections.contains_key(&candidate) {
                break candidate;
            }
        };
        self.connections.insert(id, Connection { outbox, room: None });
        tracing::info!("Connection {} registered", id);
        id
    }

    pub fn welcome(&self, id: ConnectionId) -> WelcomeMsg {
        welcome_msg(id, self.config.arena)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id).map(|e| &e.room)
    }

    /// The session a connection is currently in.
    pub fn room_of(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id)?.room.as_deref()
    }

    pub fn members(&self, room_id: &str) -> &[ConnectionId] {
        self.rooms
            .get(room_id)
            .map(|e| e.members.as_slice())
            .unwrap_or(&[])
    }

    /// Route one inbound message.
    pub fn handle_client_msg(&mut self, id: ConnectionId, msg: ClientMsg) {
        match msg {
            ClientMsg::JoinSession(join) => self.join_session(id, &join.session_id),
            ClientMsg::NewPlayer => self.new_player(id),
            ClientMsg::PlayerMove { x, y } => self.player_move(id, x, y),
            ClientMsg::PhysicsStep { .. } => self.physics_step(id),
            ClientMsg::RequestBots => self.request_bots(id),
        }
    }

    fn start_schedule(&mut self, room_id: &str) {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            return;
        };
        if entry.schedule.is_some() {
            return;
        }
        let id = self.next_schedule_id;
        self.next_schedule_id += 1;
        let handle = self.scheduler.schedule(room_id, id);
        entry.schedule = Some(Schedule { id, handle });
    }

    fn cancel_schedule(entry: &mut RoomEntry<S::Handle>) {
        if let Some(schedule) = entry.schedule.take() {
            schedule.handle.cancel();
        }
    }

    fn current_room_id(&self, id: ConnectionId, event: &str) -> Option<String> {
        let room_id = self.room_of(id).map(str::to_owned);
        if room_id.is_none() {
            tracing::debug!("Ignoring {} from connection {} outside any room", event, id);
        }
        room_id
    }

    pub fn join_session(&mut self, id: ConnectionId, session_id: &str) {
        let session_id = session_id.trim();
        if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
            tracing::debug!("Ignoring malformed session id from connection {}", id);
            return;
        }
        let Some(conn) = self.connections.get(&id) else {
            return;
        };

        match conn.room.as_deref() {
            Some(current) if current == session_id => {
                let msg = ServerMsg::JoinSuccess(JoinSuccessMsg {
                    session_id: session_id.to_string(),
                });
                send_to(&self.connections, id, msg);
                return;
            }
            Some(_) => {
                let msg = ServerMsg::JoinFailure(JoinFailureMsg {
                    reason: JoinFailureReason::AlreadyInRoom,
                });
                send_to(&self.connections, id, msg);
                return;
            }
            None => {}
        }

        match self.rooms.get(session_id) {
            Some(entry) if entry.room.is_full() => {
                let msg = ServerMsg::JoinFailure(JoinFailureMsg {
                    reason: JoinFailureReason::Full,
                });
                send_to(&self.connections, id, msg);
                return;
            }
            Some(_) => {}
            None => {
                let seed = self.config.rng_seed.wrapping_add(self.rooms_created);
                self.rooms_created += 1;
                let room = Room::new(session_id, self.config.room_config(), seed);
                self.rooms.insert(
                    session_id.to_string(),
                    RoomEntry {
                        room,
                        members: Vec::with_capacity(MAX_PLAYERS),
                        schedule: None,
                    },
                );
                self.start_schedule(session_id);
                tracing::info!("Room {} created", session_id);
            }
        }

        if let Some(entry) = self.rooms.get_mut(session_id) {
            entry.members.push(id);
        }
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.room = Some(session_id.to_string());
        }
        let msg = ServerMsg::JoinSuccess(JoinSuccessMsg {
            session_id: session_id.to_string(),
        });
        send_to(&self.connections, id, msg);
        tracing::info!("Connection {} joined room {}", id, session_id);
    }

    pub fn new_player(&mut self, id: ConnectionId) {
        let Some(room_id) = self.current_room_id(id, "new_player") else {
            return;
        };
        let Some(entry) = self.rooms.get_mut(&room_id) else {
            return;
        };

        match entry.room.join(id) {
            Ok(player_no) => {
                tracing::info!("Connection {} is player {} in room {}", id, player_no, room_id);
                if player_no == 1 {
                    send_to(&self.connections, id, ServerMsg::Host);
                }
                if entry.room.is_full() && !entry.room.is_active() {
                    entry.room.start_game();
                    broadcast(&self.connections, &entry.members, &ServerMsg::GameStart);
                    self.start_schedule(&room_id);
                }
            }
            Err(JoinError::RoomFull) => {
                entry.members.retain(|&m| m != id);
                let msg = ServerMsg::JoinFailure(JoinFailureMsg {
                    reason: JoinFailureReason::Full,
                });
                send_to(&self.connections, id, msg);
                if let Some(conn) = self.connections.get_mut(&id) {
                    conn.room = None;
                }
                tracing::info!("Connection {} turned away from full room {}", id, room_id);
                if entry.members.is_empty() {
                    self.close_room(&room_id);
                }
            }
        }
    }

    pub fn player_move(&mut self, id: ConnectionId, x: f64, y: f64) {
        let Some(room_id) = self.current_room_id(id, "player_move") else {
            return;
        };
        if let Some(entry) = self.rooms.get_mut(&room_id) {
            if !entry.room.move_player(id, x, y) {
                tracing::debug!("Connection {} has no paddle in room {}", id, room_id);
            }
        }
    }

    pub fn physics_step(&mut self, id: ConnectionId) {
        if self.config.physics_driver == PhysicsDriver::Server {
            return;
        }
        let Some(room_id) = self.current_room_id(id, "physics_step") else {
            return;
        };
        if let Some(entry) = self.rooms.get_mut(&room_id) {
            entry.room.advance_physics_step();
        }
    }

    pub fn request_bots(&mut self, id: ConnectionId) {
        let Some(room_id) = self.current_room_id(id, "request_bots") else {
            return;
        };
        let Some(entry) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if entry.room.player_by_connection(id).map(|p| p.player_no) != Some(1) {
            tracing::debug!("Connection {} is not host of room {}, ignoring bot request", id, room_id);
            return;
        }
        if entry.room.is_active() {
            tracing::debug!("Room {} already playing, ignoring bot request", room_id);
            return;
        }
        let added = entry.room.fill_with_bots(MAX_PLAYERS);
        entry.room.start_game();
        broadcast(&self.connections, &entry.members, &ServerMsg::GameStart);
        self.start_schedule(&room_id);
        tracing::info!("Room {} filled with {} bots", room_id, added);
    }

    /// A connection went away. Its room, if any, is torn down for everyone.
    pub fn disconnect(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.remove(&id) else {
            return;
        };
        tracing::info!("Connection {} disconnected", id);
        if let Some(room_id) = conn.room {
            self.close_room(&room_id);
        }
    }

    fn close_room(&mut self, room_id: &str) {
        let Some(mut entry) = self.rooms.remove(room_id) else {
            return;
        };
        entry.room.stop_game();
        Self::cancel_schedule(&mut entry);
        for member in entry.members {
            send_to(&self.connections, member, ServerMsg::Restart);
            if let Some(conn) = self.connections.get_mut(&member) {
                conn.room = None;
            }
        }
        tracing::info!("Room {} closed", room_id);
    }

    /// One scheduled tick for `room_id`.
    pub fn on_tick(&mut self, room_id: &str, schedule_id: u64) {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            return;
        };
        if entry.schedule.as_ref().map(|s| s.id) != Some(schedule_id) {
            tracing::debug!("Dropping stale tick {} for room {}", schedule_id, room_id);
            return;
        }

        if entry.room.is_active() {
            if entry.room.update_time() {
                entry.room.stop_game();
                let msg = ServerMsg::GameOver(game_over_msg(&entry.room));
                broadcast(&self.connections, &entry.members, &msg);
                Self::cancel_schedule(entry);
                tracing::info!("Room {} match over", room_id);
                return;
            }
            if self.config.physics_driver == PhysicsDriver::Server {
                entry.room.advance_physics_step();
            }
        }

        entry.room.sweep_bots();
        let msg = ServerMsg::State(entry.room.snapshot());
        broadcast(&self.connections, &entry.members, &msg);
    }

    /// Cancel every outstanding schedule.
    pub fn shutdown(&mut self) {
        for entry in self.rooms.values_mut() {
            Self::cancel_schedule(entry);
        }
    }
}
