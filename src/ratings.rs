//! # Rating Store
//!
//! Sparse (user, song) → star matrix, indexed both ways so the similarity
//! engine can walk a song's raters and the predictor a user's history without
//! scanning the whole matrix.
//!
//! Every mutation bumps [`RatingStore::version`]; memoized similarities are
//! tagged with the version they were computed against. Versions come from one
//! process-wide counter, so two stores never share a version even when one
//! was cloned from the other.

use crate::catalog::{SongId, UserId};
use crate::error::{RadioError, Result};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NO_SONG_RATINGS: BTreeMap<SongId, Stars> = BTreeMap::new();
static NO_USER_RATINGS: BTreeMap<UserId, Stars> = BTreeMap::new();
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// A star rating, always between [`Stars::MIN`] and [`Stars::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stars(u8);

impl Stars {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(RadioError::Validation(format!(
                "rating must be between {} and {} stars, got {stars}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Rounds half away from zero and clamps into range.
    #[must_use]
    pub fn from_estimate(estimate: f64) -> Self {
        let rounded = estimate.round().clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        // In range after clamping, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(rounded as u8)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl TryFrom<u8> for Stars {
    type Error = RadioError;

    fn try_from(stars: u8) -> Result<Self> {
        Self::new(stars)
    }
}

impl From<Stars> for u8 {
    fn from(stars: Stars) -> Self {
        stars.0
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of the rating matrix consumed by the recommender.
pub trait RatingStore {
    fn rating_of(&self, user: UserId, song: SongId) -> Option<Stars>;

    /// Everything `user` has rated, keyed by song.
    fn ratings_by_user(&self, user: UserId) -> &BTreeMap<SongId, Stars>;

    /// Everyone who rated `song`, keyed by user.
    fn ratings_by_song(&self, song: SongId) -> &BTreeMap<UserId, Stars>;

    /// Snapshot version; changes on every mutation and is unique to this
    /// store's current contents.
    fn version(&self) -> u64;
}

/// In-memory rating matrix.
///
/// The store itself does not know which users and songs exist; existence is
/// checked by [`crate::radio::StreamingRadio`] before it calls in here.
#[derive(Debug)]
pub struct MemoryRatings {
    by_user: BTreeMap<UserId, BTreeMap<SongId, Stars>>,
    by_song: BTreeMap<SongId, BTreeMap<UserId, Stars>>,
    version: u64,
}

impl Default for MemoryRatings {
    fn default() -> Self {
        Self {
            by_user: BTreeMap::new(),
            by_song: BTreeMap::new(),
            version: next_version(),
        }
    }
}

impl Clone for MemoryRatings {
    fn clone(&self) -> Self {
        Self {
            by_user: self.by_user.clone(),
            by_song: self.by_song.clone(),
            version: next_version(),
        }
    }
}

impl MemoryRatings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a rating, returning the previous one if any.
    pub fn set(&mut self, user: UserId, song: SongId, stars: Stars) -> Option<Stars> {
        let previous = self.by_user.entry(user).or_default().insert(song, stars);
        self.by_song.entry(song).or_default().insert(user, stars);
        self.bump();
        trace!("User {user} rated song {song} with {stars} stars (was {previous:?})");
        previous
    }

    /// Removes an existing rating. Clearing a rating that does not exist is a
    /// usage error and leaves the store untouched.
    pub fn clear(&mut self, user: UserId, song: SongId) -> Result<Stars> {
        let removed = self
            .by_user
            .get_mut(&user)
            .and_then(|songs| songs.remove(&song))
            .ok_or_else(|| {
                RadioError::Validation(format!("user {user} has no rating on song {song}"))
            })?;

        if self.by_user.get(&user).is_some_and(BTreeMap::is_empty) {
            self.by_user.remove(&user);
        }
        if let Some(users) = self.by_song.get_mut(&song) {
            users.remove(&user);
            if users.is_empty() {
                self.by_song.remove(&song);
            }
        }

        self.bump();
        Ok(removed)
    }

    /// Drops every rating of `song`. Returns how many were removed.
    pub fn purge_song(&mut self, song: SongId) -> usize {
        let Some(users) = self.by_song.remove(&song) else {
            return 0;
        };

        for user in users.keys() {
            if let Some(songs) = self.by_user.get_mut(user) {
                songs.remove(&song);
                if songs.is_empty() {
                    self.by_user.remove(user);
                }
            }
        }

        self.bump();
        users.len()
    }

    /// Every rating as (user, song, stars), ordered by user then song.
    pub fn iter(&self) -> impl Iterator<Item = (UserId, SongId, Stars)> + '_ {
        self.by_user.iter().flat_map(|(&user, songs)| {
            songs.iter().map(move |(&song, &stars)| (user, song, stars))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_user.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    fn bump(&mut self) {
        self.version = next_version();
    }
}

impl RatingStore for MemoryRatings {
    fn rating_of(&self, user: UserId, song: SongId) -> Option<Stars> {
        self.by_user
            .get(&user)
            .and_then(|songs| songs.get(&song))
            .copied()
    }

    fn ratings_by_user(&self, user: UserId) -> &BTreeMap<SongId, Stars> {
        self.by_user.get(&user).unwrap_or(&NO_SONG_RATINGS)
    }

    fn ratings_by_song(&self, song: SongId) -> &BTreeMap<UserId, Stars> {
        self.by_song.get(&song).unwrap_or(&NO_USER_RATINGS)
    }

    fn version(&self) -> u64 {
        self.version
    }
}
