//! # Catalog Store
//!
//! Songs, users and stations, addressed by small integer ids. The recommender
//! never holds references into the catalog; it only asks whether an id exists
//! and which songs a station plays, through the [`CatalogStore`] trait.
//!
//! [`MemoryCatalog`] is the in-memory implementation used by
//! [`crate::radio::StreamingRadio`] and by the tests.

use crate::error::{Entity, RadioError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Identity of a song in the catalog.
    SongId
);
id_type!(
    /// Identity of a listener.
    UserId
);
id_type!(
    /// Identity of a radio station.
    StationId
);

/// A catalogued song. Attributes are opaque to the recommender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// A listener. Only the id matters to the recommender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A radio station and its playlist.
///
/// The playlist keeps insertion order and never holds the same song twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    playlist: Vec<SongId>,
}

impl Station {
    #[must_use]
    pub fn new(id: StationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            playlist: Vec::new(),
        }
    }

    #[must_use]
    pub fn playlist(&self) -> &[SongId] {
        &self.playlist
    }

    #[must_use]
    pub fn contains(&self, song: SongId) -> bool {
        self.playlist.contains(&song)
    }
}

/// Read-only view of the catalog consumed by the recommender.
pub trait CatalogStore {
    fn song_exists(&self, song: SongId) -> bool;

    fn user_exists(&self, user: UserId) -> bool;

    fn station_exists(&self, station: StationId) -> bool;

    /// Songs on a station's playlist, or `None` if the station is unknown.
    fn station_playlist(&self, station: StationId) -> Option<&[SongId]>;

    /// Every song id in the catalog, ascending.
    fn song_ids(&self) -> Vec<SongId>;
}

/// In-memory catalog with an optional cap on the number of songs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    songs: BTreeMap<SongId, Song>,
    users: BTreeMap<UserId, User>,
    stations: BTreeMap<StationId, Station>,
    capacity: Option<usize>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog that refuses new songs once `capacity` songs are stored.
    #[must_use]
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Only affects later insertions; songs already stored are kept.
    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    pub fn insert_song(&mut self, song: Song) -> Result<()> {
        if self.songs.contains_key(&song.id) {
            return Err(RadioError::Validation(format!(
                "song {} already exists",
                song.id
            )));
        }
        if let Some(capacity) = self.capacity {
            if self.songs.len() >= capacity {
                return Err(RadioError::CatalogFull { capacity });
            }
        }

        debug!("Adding song {} `{}'", song.id, song.title);
        self.songs.insert(song.id, song);
        Ok(())
    }

    /// Removes a song and strips it from every station playlist.
    ///
    /// Ratings live elsewhere; the caller purges them.
    pub fn remove_song(&mut self, id: SongId) -> Result<Song> {
        let song = self
            .songs
            .remove(&id)
            .ok_or(RadioError::NotFound(Entity::Song(id)))?;

        for station in self.stations.values_mut() {
            station.playlist.retain(|&s| s != id);
        }

        debug!("Removed song {id} from catalog and all playlists");
        Ok(song)
    }

    pub fn insert_user(&mut self, user: User) -> Result<()> {
        if self.users.contains_key(&user.id) {
            return Err(RadioError::Validation(format!(
                "user {} already exists",
                user.id
            )));
        }
        self.users.insert(user.id, user);
        Ok(())
    }

    pub fn insert_station(&mut self, station: Station) -> Result<()> {
        if self.stations.contains_key(&station.id) {
            return Err(RadioError::Validation(format!(
                "station {} already exists",
                station.id
            )));
        }
        self.stations.insert(station.id, station);
        Ok(())
    }

    pub fn add_to_station(&mut self, song: SongId, station: StationId) -> Result<()> {
        if !self.songs.contains_key(&song) {
            return Err(RadioError::NotFound(Entity::Song(song)));
        }
        let entry = self
            .stations
            .get_mut(&station)
            .ok_or(RadioError::NotFound(Entity::Station(station)))?;

        if entry.contains(song) {
            return Err(RadioError::Validation(format!(
                "song {song} is already on station {station}"
            )));
        }

        entry.playlist.push(song);
        Ok(())
    }

    pub fn remove_from_station(&mut self, song: SongId, station: StationId) -> Result<()> {
        let entry = self
            .stations
            .get_mut(&station)
            .ok_or(RadioError::NotFound(Entity::Station(station)))?;

        let position = entry
            .playlist
            .iter()
            .position(|&s| s == song)
            .ok_or_else(|| {
                RadioError::Validation(format!("song {song} is not on station {station}"))
            })?;

        entry.playlist.remove(position);
        Ok(())
    }

    #[must_use]
    pub fn song(&self, id: SongId) -> Option<&Song> {
        self.songs.get(&id)
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    #[must_use]
    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.songs.values()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// One past the highest song id, or 1 for an empty catalog.
    ///
    /// # Errors
    ///
    /// [`RadioError::Validation`] once `u32::MAX` is taken.
    pub fn next_song_id(&self) -> Result<SongId> {
        next_id(self.songs.keys().next_back().map(|id| id.0), "song").map(SongId)
    }

    pub fn next_user_id(&self) -> Result<UserId> {
        next_id(self.users.keys().next_back().map(|id| id.0), "user").map(UserId)
    }

    pub fn next_station_id(&self) -> Result<StationId> {
        next_id(self.stations.keys().next_back().map(|id| id.0), "station").map(StationId)
    }
}

fn next_id(last: Option<u32>, kind: &str) -> Result<u32> {
    match last {
        None => Ok(1),
        Some(last) => last.checked_add(1).ok_or_else(|| {
            RadioError::Validation(format!("no {kind} id left after {last}"))
        }),
    }
}

impl CatalogStore for MemoryCatalog {
    fn song_exists(&self, song: SongId) -> bool {
        self.songs.contains_key(&song)
    }

    fn user_exists(&self, user: UserId) -> bool {
        self.users.contains_key(&user)
    }

    fn station_exists(&self, station: StationId) -> bool {
        self.stations.contains_key(&station)
    }

    fn station_playlist(&self, station: StationId) -> Option<&[SongId]> {
        self.stations.get(&station).map(Station::playlist)
    }

    fn song_ids(&self) -> Vec<SongId> {
        self.songs.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: u32) -> Song {
        Song {
            id: SongId(id),
            title: format!("Song {id}"),
            artist: "Test Artist".to_string(),
            album: "Test Album".to_string(),
        }
    }

    fn catalog_with_station() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_song(song(1)).unwrap();
        catalog.insert_song(song(2)).unwrap();
        catalog
            .insert_station(Station::new(StationId(1), "Morning Drive"))
            .unwrap();
        catalog
    }

    #[test]
    fn test_duplicate_song_is_rejected() {
        let mut catalog = catalog_with_station();
        let err = catalog.insert_song(song(1)).unwrap_err();
        assert!(matches!(err, RadioError::Validation(_)));
        assert_eq!(catalog.song_ids(), vec![SongId(1), SongId(2)]);
    }

    #[test]
    fn test_capacity_limit() {
        let mut catalog = MemoryCatalog::with_capacity(Some(1));
        catalog.insert_song(song(1)).unwrap();
        assert_eq!(
            catalog.insert_song(song(2)),
            Err(RadioError::CatalogFull { capacity: 1 })
        );
        assert!(!catalog.song_exists(SongId(2)));
    }

    #[test]
    fn test_station_membership_is_a_set() {
        let mut catalog = catalog_with_station();
        catalog.add_to_station(SongId(2), StationId(1)).unwrap();
        catalog.add_to_station(SongId(1), StationId(1)).unwrap();

        let err = catalog.add_to_station(SongId(2), StationId(1)).unwrap_err();
        assert!(matches!(err, RadioError::Validation(_)));

        // Insertion order is kept.
        assert_eq!(
            catalog.station_playlist(StationId(1)),
            Some(&[SongId(2), SongId(1)][..])
        );
    }

    #[test]
    fn test_add_to_station_requires_existing_song_and_station() {
        let mut catalog = catalog_with_station();
        assert_eq!(
            catalog.add_to_station(SongId(9), StationId(1)),
            Err(RadioError::NotFound(Entity::Song(SongId(9))))
        );
        assert_eq!(
            catalog.add_to_station(SongId(1), StationId(9)),
            Err(RadioError::NotFound(Entity::Station(StationId(9))))
        );
    }

    #[test]
    fn test_remove_from_station_absent_song() {
        let mut catalog = catalog_with_station();
        let err = catalog
            .remove_from_station(SongId(1), StationId(1))
            .unwrap_err();
        assert!(matches!(err, RadioError::Validation(_)));
    }

    #[test]
    fn test_remove_song_cascades_to_playlists() {
        let mut catalog = catalog_with_station();
        catalog.add_to_station(SongId(1), StationId(1)).unwrap();
        catalog.add_to_station(SongId(2), StationId(1)).unwrap();

        let removed = catalog.remove_song(SongId(1)).unwrap();
        assert_eq!(removed.id, SongId(1));
        assert!(!catalog.song_exists(SongId(1)));
        assert_eq!(
            catalog.station_playlist(StationId(1)),
            Some(&[SongId(2)][..])
        );

        assert_eq!(
            catalog.remove_song(SongId(1)),
            Err(RadioError::NotFound(Entity::Song(SongId(1))))
        );
    }

    #[test]
    fn test_next_ids() {
        let catalog = catalog_with_station();
        assert_eq!(catalog.next_song_id(), Ok(SongId(3)));
        assert_eq!(catalog.next_user_id(), Ok(UserId(1)));
        assert_eq!(catalog.next_station_id(), Ok(StationId(2)));
    }

    #[test]
    fn test_next_id_after_largest_id() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_song(song(u32::MAX)).unwrap();
        catalog
            .insert_user(User {
                id: UserId(u32::MAX),
                name: "last".to_string(),
            })
            .unwrap();

        assert!(matches!(catalog.next_song_id(), Err(RadioError::Validation(_))));
        assert!(matches!(catalog.next_user_id(), Err(RadioError::Validation(_))));
        assert_eq!(catalog.next_station_id(), Ok(StationId(1)));
    }

    #[test]
    fn test_lookups() {
        let mut catalog = catalog_with_station();
        catalog
            .insert_user(User {
                id: UserId(3),
                name: "grace".to_string(),
            })
            .unwrap();

        assert_eq!(catalog.user(UserId(3)).map(|u| u.name.as_str()), Some("grace"));
        assert!(catalog.user(UserId(4)).is_none());
        assert!(catalog.station_exists(StationId(1)));
        assert!(!catalog.station_exists(StationId(2)));
        assert_eq!(catalog.capacity(), None);
    }
}
