//! Room registry - code to room table and session routing
//!
//! The single piece of cross-room state. Owned by the game loop task
//! and passed around explicitly; nothing else mutates rooms.

use std::collections::HashMap;

use rand::Rng;
use tracing::info;
use uuid::Uuid;

use super::room::{Room, RoomError};

/// Process-wide table of live rooms keyed by join code
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    /// session id -> code of the room it occupies
    memberships: HashMap<Uuid, String>,
}

/// What happened to a room when a session left it
#[derive(Debug, PartialEq, Eq)]
pub enum Departure {
    /// Session was in no room
    NotInRoom,
    /// Room still has players; carries the code for rebroadcast
    Left(String),
    /// Session was the last player, room destroyed
    RoomClosed(String),
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with a fresh collision-free 4-digit code and seat
    /// the creator as host.
    pub fn create_room(&mut self, host: Uuid, host_name: &str) -> &Room {
        let code = self.unique_code();
        let room = Room::new(code.clone(), host, host_name);
        self.memberships.insert(host, code.clone());
        info!(room = %code, host = %host, "Room created");
        self.rooms.entry(code).or_insert(room)
    }

    fn unique_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = format!("{:04}", rng.gen_range(0..10_000));
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Join a session into the room with the given code
    pub fn join_room(
        &mut self,
        code: &str,
        session: Uuid,
        name: &str,
    ) -> Result<&Room, RoomError> {
        let room = self.rooms.get_mut(code).ok_or(RoomError::NotFound)?;
        room.join(session, name)?;
        self.memberships.insert(session, code.to_string());
        Ok(room)
    }

    /// The room a session currently occupies
    pub fn room_of(&mut self, session: Uuid) -> Option<&mut Room> {
        let code = self.memberships.get(&session)?;
        self.rooms.get_mut(code)
    }

    pub fn is_member(&self, session: Uuid) -> bool {
        self.memberships.contains_key(&session)
    }

    /// Drop a session from its room, destroying the room if it empties
    pub fn remove_session(&mut self, session: Uuid) -> Departure {
        let Some(code) = self.memberships.remove(&session) else {
            return Departure::NotInRoom;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Departure::NotInRoom;
        };
        room.remove_player(session);
        if room.is_empty() {
            self.rooms.remove(&code);
            info!(room = %code, "Room closed");
            Departure::RoomClosed(code)
        } else {
            Departure::Left(code)
        }
    }

    pub fn rooms_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.memberships.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_four_digits_and_unique() {
        let mut reg = RoomRegistry::new();
        for _ in 0..50 {
            let code = reg.create_room(Uuid::new_v4(), "host").code.clone();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
        assert_eq!(reg.active_rooms(), 50);
    }

    #[test]
    fn join_routes_by_code() {
        let mut reg = RoomRegistry::new();
        let host = Uuid::new_v4();
        let code = reg.create_room(host, "A").code.clone();

        let guest = Uuid::new_v4();
        reg.join_room(&code, guest, "B").unwrap();
        assert_eq!(reg.total_players(), 2);
        assert!(reg.is_member(guest));
        assert_eq!(reg.room_of(guest).unwrap().code, code);
    }

    #[test]
    fn unknown_code_is_an_error() {
        let mut reg = RoomRegistry::new();
        let err = reg.join_room("9999", Uuid::new_v4(), "B").unwrap_err();
        assert_eq!(err, RoomError::NotFound);
        assert_eq!(reg.total_players(), 0);
    }

    #[test]
    fn full_room_rejects_and_membership_is_unchanged() {
        let mut reg = RoomRegistry::new();
        let code = reg.create_room(Uuid::new_v4(), "A").code.clone();
        for i in 1..8 {
            reg.join_room(&code, Uuid::new_v4(), &format!("p{i}")).unwrap();
        }
        let late = Uuid::new_v4();
        let err = reg.join_room(&code, late, "late").unwrap_err();
        assert_eq!(err, RoomError::Full);
        assert!(!reg.is_member(late));
        assert_eq!(reg.total_players(), 8);
    }

    #[test]
    fn last_departure_destroys_the_room() {
        let mut reg = RoomRegistry::new();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let code = reg.create_room(host, "A").code.clone();
        reg.join_room(&code, guest, "B").unwrap();

        assert_eq!(reg.remove_session(host), Departure::Left(code.clone()));
        assert_eq!(reg.remove_session(guest), Departure::RoomClosed(code));
        assert_eq!(reg.active_rooms(), 0);
        assert_eq!(reg.remove_session(guest), Departure::NotInRoom);
    }
}
