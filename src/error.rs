//! Error taxonomy shared by the catalog, rating store and recommender.

use crate::catalog::{SongId, StationId, UserId};
use std::fmt;

/// Something a caller referred to by id that the catalog does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Song(SongId),
    User(UserId),
    Station(StationId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Song(id) => write!(f, "song {id}"),
            Entity::User(id) => write!(f, "user {id}"),
            Entity::Station(id) => write!(f, "station {id}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RadioError {
    #[error("Not found: {0}")]
    NotFound(Entity),

    #[error("Cannot predict rating: {0}")]
    Unpredictable(String),

    #[error("Cannot suggest a song: {0}")]
    Unsuggestable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Catalog is full ({capacity} songs)")]
    CatalogFull { capacity: usize },
}

impl RadioError {
    /// True for the "not enough data" signal the suggester skips over.
    #[must_use]
    pub const fn is_unpredictable(&self) -> bool {
        matches!(self, RadioError::Unpredictable(_))
    }
}

pub type Result<T> = std::result::Result<T, RadioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = RadioError::NotFound(Entity::Song(SongId(7)));
        assert_eq!(err.to_string(), "Not found: song 7");

        let err = RadioError::NotFound(Entity::Station(StationId(2)));
        assert_eq!(err.to_string(), "Not found: station 2");
    }

    #[test]
    fn test_is_unpredictable() {
        assert!(RadioError::Unpredictable("no history".into()).is_unpredictable());
        assert!(!RadioError::Validation("bad".into()).is_unpredictable());
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = RadioError::CatalogFull { capacity: 3 }.into();
        assert!(err.to_string().contains("3 songs"));
    }
}
