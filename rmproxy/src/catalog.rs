//! Rooms and commands: resolving a (room, command) pair to a device and an
//! opaque code.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::{ProxyError, Result};

/// A remote command code belonging to a group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
    pub group: String,
    pub command: String,
    pub data: String,
}

/// A room: a device plus an ordered list of command groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Room {
    pub name: String,
    pub host: String,
    pub groups: Vec<String>,
}

/// The resolved command catalog. Read-only after loading.
pub struct Catalog {
    rooms: HashMap<String, Room>,
    groups: HashMap<String, HashMap<String, Command>>,
}

impl Catalog {
    /// Load commands and rooms from their JSON streams. Command names must
    /// not contain spaces (they appear as macro tokens and path segments).
    pub fn load(commands: impl Read, rooms: impl Read) -> Result<Self> {
        let commands: Vec<Command> =
            serde_json::from_reader(commands).map_err(|e| ProxyError::json("commands", e))?;
        for command in &commands {
            if command.command.contains(' ') {
                return Err(ProxyError::CommandWithSpace(command.command.clone()));
            }
        }

        let rooms: Vec<Room> =
            serde_json::from_reader(rooms).map_err(|e| ProxyError::json("rooms", e))?;

        let mut grouped: HashMap<String, HashMap<String, Command>> = HashMap::new();
        for command in commands {
            grouped
                .entry(command.group.clone())
                .or_default()
                .insert(command.command.clone(), command);
        }

        Ok(Self {
            rooms: rooms
                .into_iter()
                .map(|room| (room.name.to_lowercase(), room))
                .collect(),
            groups: grouped,
        })
    }

    /// Resolve a (room, command) pair to the room's host and the command
    /// data. The room's groups are searched in declared order; the first
    /// group carrying the command wins.
    pub fn resolve(&self, room_name: &str, command_name: &str) -> Result<(&str, &str)> {
        let room = self
            .rooms
            .get(&room_name.to_lowercase())
            .ok_or_else(|| ProxyError::UnknownRoom(room_name.to_string()))?;

        for group_name in &room.groups {
            let Some(group) = self.groups.get(group_name) else {
                continue;
            };
            if let Some(command) = group.get(command_name) {
                return Ok((&room.host, &command.data));
            }
        }
        Err(ProxyError::CommandNotInRoom {
            room: room_name.to_string(),
            command: command_name.to_string(),
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
