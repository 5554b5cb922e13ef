use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// A player present in the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPlayer {
    pub name: String,
    pub identity: Uuid,
}

impl RosterPlayer {
    pub fn new(name: impl Into<String>, identity: Uuid) -> Self {
        Self {
            name: name.into(),
            identity,
        }
    }
}

/// Players known to the hosting session (online list of the joined server)
///
/// Implemented by the host runtime; the resolver asks it before any network
/// lookup.
pub trait SessionRoster: Send + Sync {
    /// Everyone currently in the session
    fn players(&self) -> Vec<RosterPlayer>;

    /// Case-insensitive exact name match
    fn find(&self, name: &str) -> Option<Uuid> {
        self.players()
            .into_iter()
            .find(|player| player.name.eq_ignore_ascii_case(name))
            .map(|player| player.identity)
    }
}

/// In-memory roster whose player set is replaced by its owner
#[derive(Debug, Default)]
pub struct StaticRoster {
    players: RwLock<Vec<RosterPlayer>>,
}

impl StaticRoster {
    pub fn new(players: Vec<RosterPlayer>) -> Self {
        Self {
            players: RwLock::new(players),
        }
    }

    pub fn replace(&self, players: Vec<RosterPlayer>) {
        *self.players.write().unwrap_or_else(PoisonError::into_inner) = players;
    }
}

impl SessionRoster for StaticRoster {
    fn players(&self) -> Vec<RosterPlayer> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
