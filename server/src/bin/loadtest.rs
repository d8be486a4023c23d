//! Load test for the quadpong server.
//!
//! Spawns fake WebSocket clients in groups of four. Each group shares a
//! session, so every room fills and starts a match. Clients then:
//! - Periodically send player_move messages
//! - Optionally drive the ball with physics_step
//! - Receive and count state broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --rooms N        Number of four-player rooms (default: 25)
//!   --duration S     Test duration in seconds (default: 30)
//!   --move-rate R    player_move messages per second per client (default: 30)
//!   --step           Host of each room sends physics_step at the move rate
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Protocol types (minimal subset) ===

#[derive(Serialize)]
#[serde(tag = "type")]
enum ClientMsg {
    #[serde(rename = "join_session")]
    JoinSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    #[serde(rename = "new_player")]
    NewPlayer,
    #[serde(rename = "player_move")]
    PlayerMove { x: f64, y: f64 },
    #[serde(rename = "physics_step")]
    PhysicsStep,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
#[allow(dead_code)]
enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome {},
    #[serde(rename = "join_success")]
    JoinSuccess {},
    #[serde(rename = "join_failure")]
    JoinFailure {},
    #[serde(rename = "host")]
    Host,
    #[serde(rename = "game_start")]
    GameStart,
    #[serde(rename = "state")]
    State {},
    #[serde(rename = "game_over")]
    GameOver {},
    #[serde(rename = "restart")]
    Restart,
}

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    states_received: AtomicU64,
    games_started: AtomicU64,
    join_failures: AtomicU64,
    restarts: AtomicU64,
    moves_sent: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            states_received: AtomicU64::new(0),
            games_started: AtomicU64::new(0),
            join_failures: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            moves_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }
}

struct ClientPlan {
    client_id: u32,
    session_id: String,
    move_rate: f64,
    drives_physics: bool,
    duration: Duration,
}

fn encode(msg: &ClientMsg) -> Message {
    // These types always serialize
    Message::Text(serde_json::to_string(msg).unwrap_or_default().into())
}

// === Client task ===

async fn run_client(plan: ClientPlan, url: String, metrics: Arc<Metrics>) {
    let client_id = plan.client_id;
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let join = ClientMsg::JoinSession {
        session_id: plan.session_id.clone(),
    };
    if ws.send(encode(&join)).await.is_err() || ws.send(encode(&ClientMsg::NewPlayer)).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let move_interval = if plan.move_rate > 0.0 {
        Duration::from_secs_f64(1.0 / plan.move_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };

    let mut move_timer = tokio::time::interval(move_interval);
    move_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + plan.duration;
    let mut rng_state: u64 = client_id as u64 * 12345 + 67890;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = move_timer.tick() => {
                // Simple LCG for a wandering cursor
                rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let x = ((rng_state >> 32) as f64 / u32::MAX as f64) * 600.0;
                let y = ((rng_state >> 16) as u32 as f64 / u32::MAX as f64) * 600.0;

                if ws.send(encode(&ClientMsg::PlayerMove { x, y })).await.is_ok() {
                    metrics.moves_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                if plan.drives_physics && ws.send(encode(&ClientMsg::PhysicsStep)).await.is_err() {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::State {}) => {
                                metrics.states_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::GameStart) => {
                                metrics.games_started.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::JoinFailure {}) => {
                                metrics.join_failures.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Restart) => {
                                metrics.restarts.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(_) => {}
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if client_id < 3 {
                            eprintln!("Client {} got Close: {:?}", client_id, frame);
                        }
                        break;
                    }
                    None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_rooms: u32 = 25;
    let mut duration_secs: u64 = 30;
    let mut move_rate: f64 = 30.0;
    let mut drive_physics = false;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rooms" => {
                i += 1;
                num_rooms = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(25);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--move-rate" => {
                i += 1;
                move_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30.0);
            }
            "--step" => drive_physics = true,
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    let num_clients = num_rooms * 4;

    println!("=== Quadpong Server Load Test ===");
    println!("Rooms: {} ({} clients)", num_rooms, num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Move rate: {}/s per client", move_rate);
    println!("Physics driven by clients: {}", drive_physics);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let plan = ClientPlan {
            client_id,
            session_id: format!("load-{}", client_id / 4),
            move_rate,
            drives_physics: drive_physics && client_id % 4 == 0,
            duration,
        };
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(plan, url, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, states={}, games={}, moves={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.states_received.load(Ordering::Relaxed),
                metrics_clone.games_started.load(Ordering::Relaxed),
                metrics_clone.moves_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    // Wait for all clients to finish
    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let states = metrics.states_received.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total state messages: {}", states);
    println!(
        "game_start received: {}",
        metrics.games_started.load(Ordering::Relaxed)
    );
    println!(
        "join_failure received: {}",
        metrics.join_failures.load(Ordering::Relaxed)
    );
    println!("restart received: {}", metrics.restarts.load(Ordering::Relaxed));
    println!(
        "Total player_move sent: {}",
        metrics.moves_sent.load(Ordering::Relaxed)
    );
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    let states_per_client = states as f64 / num_clients.max(1) as f64;
    // 60 Hz room ticks
    let expected = duration_secs as f64 * 60.0;
    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("States per client: {:.1}", states_per_client);
    println!("Expected states per client: {:.1}", expected);
    if expected > 0.0 {
        println!("Delivery rate: {:.1}%", states_per_client / expected * 100.0);
    }
}
