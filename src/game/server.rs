//! Game server task - single-threaded command and tick loop
//!
//! One task owns the room registry. Session tasks feed it commands
//! over an mpsc channel; a fixed-rate interval drives the simulation.
//! Commands and ticks are multiplexed with `select!`, so room state
//! never needs a lock and no handler can overlap a physics pass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::registry::{Departure, RoomRegistry};
use super::snapshot::{build_roster, build_state, SnapshotCadence};

/// Outbound side of the transport collaborator. The simulation never
/// blocks on delivery; a failed send to one session must not affect
/// the rest of a room.
pub trait Transport: Send + 'static {
    /// Fire-and-forget send to one session
    fn send(&self, session: Uuid, msg: &ServerMsg);

    /// Fan a message out to many sessions, serializing once
    fn broadcast(&self, sessions: &[Uuid], msg: &ServerMsg);
}

/// Inbound work for the game loop
#[derive(Debug)]
pub enum Command {
    /// Parsed client message from a connected session
    Inbound { session: Uuid, msg: ClientMsg },
    /// Session's connection is gone
    Disconnect { session: Uuid },
}

/// Counters shared with the HTTP health endpoint
#[derive(Debug, Default)]
pub struct ServerStats {
    pub active_rooms: AtomicUsize,
    pub active_players: AtomicUsize,
}

impl ServerStats {
    fn update(&self, registry: &RoomRegistry) {
        self.active_rooms
            .store(registry.active_rooms(), Ordering::Relaxed);
        self.active_players
            .store(registry.total_players(), Ordering::Relaxed);
    }
}

/// The authoritative game loop
pub struct GameServer<T: Transport> {
    registry: RoomRegistry,
    transport: T,
    config: GameConfig,
    commands: mpsc::Receiver<Command>,
    cadence: SnapshotCadence,
    stats: Arc<ServerStats>,
}

impl<T: Transport> GameServer<T> {
    pub fn new(
        config: GameConfig,
        transport: T,
        stats: Arc<ServerStats>,
    ) -> (Self, mpsc::Sender<Command>) {
        let (tx, rx) = mpsc::channel(256);
        let server = Self {
            registry: RoomRegistry::new(),
            transport,
            config,
            commands: rx,
            cadence: SnapshotCadence::new(config.broadcast_divisor),
            stats,
        };
        (server, tx)
    }

    /// Run until every command sender is dropped
    pub async fn run(mut self) {
        info!(
            tick_rate = self.config.tick_rate,
            broadcast_divisor = self.config.broadcast_divisor,
            "Game loop started"
        );

        let mut ticker = tokio::time::interval(self.config.tick_duration());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.step(Instant::now()),
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }

        info!("Game loop stopped");
    }

    /// One scheduler pass: advance every room, then broadcast on the
    /// throttle cadence.
    fn step(&mut self, now: Instant) {
        for room in self.registry.rooms_mut() {
            room.tick(now, &self.config);
        }

        if self.cadence.should_send() {
            for room in self.registry.rooms_mut() {
                let sessions = room.session_ids();
                let msg = build_state(room);
                self.transport.broadcast(&sessions, &msg);
            }
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Inbound { session, msg } => self.handle_msg(session, msg),
            Command::Disconnect { session } => self.handle_disconnect(session),
        }
    }

    fn handle_msg(&mut self, session: Uuid, msg: ClientMsg) {
        match msg {
            ClientMsg::Create { name } => {
                if self.registry.is_member(session) {
                    self.send_error(session, "Already in a room");
                    return;
                }
                let room = self.registry.create_room(session, &name);
                let created = ServerMsg::RoomCreated {
                    code: room.code.clone(),
                };
                self.transport.send(session, &created);
                self.transport.send(session, &build_roster(room));
                self.stats.update(&self.registry);
            }

            ClientMsg::Join { code, name } => {
                if self.registry.is_member(session) {
                    self.send_error(session, "Already in a room");
                    return;
                }
                match self.registry.join_room(&code, session, &name) {
                    Ok(room) => {
                        let sessions = room.session_ids();
                        let roster = build_roster(room);
                        self.transport
                            .send(session, &ServerMsg::Joined { code: code.clone() });
                        self.transport.broadcast(&sessions, &roster);
                        info!(room = %code, session = %session, "Player joined");
                        self.stats.update(&self.registry);
                    }
                    Err(e) => self.send_error(session, &e.to_string()),
                }
            }

            ClientMsg::Start => {
                let Some(room) = self.registry.room_of(session) else {
                    return;
                };
                match room.start(session, Instant::now()) {
                    Ok(true) => {
                        let host = room.host;
                        let sessions = room.session_ids();
                        self.transport
                            .broadcast(&sessions, &ServerMsg::GameStart { host_id: host });
                    }
                    Ok(false) => {}
                    Err(e) => self.send_error(session, &e.to_string()),
                }
            }

            ClientMsg::Restart => {
                let Some(room) = self.registry.room_of(session) else {
                    return;
                };
                match room.restart(session, Instant::now()) {
                    Ok(true) => {
                        let sessions = room.session_ids();
                        self.transport
                            .broadcast(&sessions, &ServerMsg::MatchRestart);
                    }
                    Ok(false) => {}
                    Err(e) => self.send_error(session, &e.to_string()),
                }
            }

            ClientMsg::ReadyUp => {
                let Some(room) = self.registry.room_of(session) else {
                    return;
                };
                if let Some((ready, total)) = room.ready_up(session) {
                    let sessions = room.session_ids();
                    self.transport
                        .broadcast(&sessions, &ServerMsg::ReadyCount { ready, total });
                }
            }

            ClientMsg::Turn { dir } => {
                if let Some(room) = self.registry.room_of(session) {
                    room.set_turning(session, dir);
                }
            }
        }
    }

    fn handle_disconnect(&mut self, session: Uuid) {
        match self.registry.remove_session(session) {
            Departure::NotInRoom => {}
            Departure::RoomClosed(code) => {
                info!(room = %code, session = %session, "Last player left, room closed");
                self.stats.update(&self.registry);
            }
            Departure::Left(code) => {
                info!(room = %code, session = %session, "Player left");
                if let Some(room) = self.registry.rooms_mut().find(|r| r.code == code) {
                    let sessions = room.session_ids();
                    let roster = build_roster(room);
                    self.transport.broadcast(&sessions, &roster);
                }
                self.stats.update(&self.registry);
            }
        }
    }

    fn send_error(&self, session: Uuid, message: &str) {
        self.transport.send(
            session,
            &ServerMsg::Error {
                message: message.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Transport that records every delivery for assertions
    #[derive(Default)]
    struct Recording {
        log: Arc<Mutex<Vec<(Uuid, ServerMsg)>>>,
    }

    impl Transport for Recording {
        fn send(&self, session: Uuid, msg: &ServerMsg) {
            self.log.lock().unwrap().push((session, msg.clone()));
        }

        fn broadcast(&self, sessions: &[Uuid], msg: &ServerMsg) {
            let mut log = self.log.lock().unwrap();
            for s in sessions {
                log.push((*s, msg.clone()));
            }
        }
    }

    fn server() -> (
        GameServer<Recording>,
        mpsc::Sender<Command>,
        Arc<Mutex<Vec<(Uuid, ServerMsg)>>>,
        Arc<ServerStats>,
    ) {
        let transport = Recording::default();
        let log = transport.log.clone();
        let stats = Arc::new(ServerStats::default());
        let (srv, tx) = GameServer::new(GameConfig::default(), transport, stats.clone());
        (srv, tx, log, stats)
    }

    fn inbound(session: Uuid, msg: ClientMsg) -> Command {
        Command::Inbound { session, msg }
    }

    fn created_code(log: &Arc<Mutex<Vec<(Uuid, ServerMsg)>>>) -> String {
        log.lock()
            .unwrap()
            .iter()
            .find_map(|(_, m)| match m {
                ServerMsg::RoomCreated { code } => Some(code.clone()),
                _ => None,
            })
            .expect("no roomCreated seen")
    }

    #[test]
    fn create_join_start_flow() {
        let (mut srv, _tx, log, stats) = server();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        let code = created_code(&log);
        assert_eq!(stats.active_rooms.load(Ordering::Relaxed), 1);

        srv.handle(inbound(
            b,
            ClientMsg::Join {
                code: code.clone(),
                name: "B".into(),
            },
        ));
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .any(|(s, m)| *s == b && matches!(m, ServerMsg::Joined { code: c } if *c == code)));
        assert_eq!(stats.active_players.load(Ordering::Relaxed), 2);

        srv.handle(inbound(a, ClientMsg::Start));
        let starts: Vec<Uuid> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| matches!(m, ServerMsg::GameStart { host_id } if *host_id == a))
            .map(|(s, _)| *s)
            .collect();
        assert_eq!(starts.len(), 2, "gameStart fans out to the whole room");
    }

    #[test]
    fn non_host_start_gets_an_error() {
        let (mut srv, _tx, log, _) = server();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        let code = created_code(&log);
        srv.handle(inbound(b, ClientMsg::Join { code, name: "B".into() }));

        srv.handle(inbound(b, ClientMsg::Start));
        assert!(log.lock().unwrap().iter().any(|(s, m)| {
            *s == b && matches!(m, ServerMsg::Error { message } if message.contains("host"))
        }));
    }

    #[test]
    fn unknown_room_code_is_an_error() {
        let (mut srv, _tx, log, _) = server();
        let b = Uuid::new_v4();
        srv.handle(inbound(
            b,
            ClientMsg::Join {
                code: "????".into(),
                name: "B".into(),
            },
        ));
        assert!(log.lock().unwrap().iter().any(|(s, m)| {
            *s == b && matches!(m, ServerMsg::Error { message } if message == "Room not found")
        }));
    }

    #[test]
    fn ninth_join_reports_room_full() {
        let (mut srv, _tx, log, _) = server();
        let a = Uuid::new_v4();
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        let code = created_code(&log);
        for i in 1..8 {
            srv.handle(inbound(
                Uuid::new_v4(),
                ClientMsg::Join {
                    code: code.clone(),
                    name: format!("p{i}"),
                },
            ));
        }
        let ninth = Uuid::new_v4();
        srv.handle(inbound(ninth, ClientMsg::Join { code, name: "X".into() }));
        assert!(log.lock().unwrap().iter().any(|(s, m)| {
            *s == ninth
                && matches!(m, ServerMsg::Error { message } if message == "Room is full (max 8)")
        }));
    }

    #[test]
    fn commands_outside_a_room_are_silent() {
        let (mut srv, _tx, log, _) = server();
        let stray = Uuid::new_v4();
        srv.handle(inbound(stray, ClientMsg::Start));
        srv.handle(inbound(stray, ClientMsg::Turn { dir: 1 }));
        srv.handle(inbound(stray, ClientMsg::ReadyUp));
        srv.handle(Command::Disconnect { session: stray });
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn broadcast_runs_on_the_throttle_cadence() {
        let (mut srv, _tx, log, _) = server();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        let code = created_code(&log);
        srv.handle(inbound(b, ClientMsg::Join { code, name: "B".into() }));
        log.lock().unwrap().clear();

        // Divisor is 2: first tick is silent, second broadcasts.
        let now = Instant::now();
        srv.step(now);
        assert!(log.lock().unwrap().is_empty());
        srv.step(now);
        let states = log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| matches!(m, ServerMsg::State(_)))
            .count();
        assert_eq!(states, 2, "one state per room member");
    }

    #[test]
    fn first_broadcast_after_join_is_full_sync() {
        let (mut srv, _tx, log, _) = server();
        let a = Uuid::new_v4();
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        log.lock().unwrap().clear();

        let now = Instant::now();
        srv.step(now);
        srv.step(now);
        let log = log.lock().unwrap();
        let sync = log
            .iter()
            .find_map(|(_, m)| match m {
                ServerMsg::State(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert!(sync.f);
        assert_eq!(sync.hid, a);
    }

    #[test]
    fn disconnect_rebroadcasts_roster_and_closes_empty_rooms() {
        let (mut srv, _tx, log, stats) = server();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        let code = created_code(&log);
        srv.handle(inbound(b, ClientMsg::Join { code, name: "B".into() }));
        log.lock().unwrap().clear();

        srv.handle(Command::Disconnect { session: a });
        assert!(log.lock().unwrap().iter().any(|(s, m)| {
            *s == b && matches!(m, ServerMsg::PlayerList { players } if players.len() == 1)
        }));
        assert_eq!(stats.active_players.load(Ordering::Relaxed), 1);

        srv.handle(Command::Disconnect { session: b });
        assert_eq!(stats.active_rooms.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn create_while_in_a_room_is_rejected() {
        let (mut srv, _tx, log, _) = server();
        let a = Uuid::new_v4();
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        srv.handle(inbound(a, ClientMsg::Create { name: "A".into() }));
        assert!(log.lock().unwrap().iter().any(|(s, m)| {
            *s == a && matches!(m, ServerMsg::Error { message } if message == "Already in a room")
        }));
    }
}
