//! # Streaming Radio
//!
//! [`StreamingRadio`] owns the catalog, the rating matrix and the similarity
//! memo, and is the one place that keeps them consistent with each other:
//! ratings only ever point at existing users and songs, and removing a song
//! takes its ratings and playlist entries with it.
//!
//! Every mutation checks all of its preconditions before changing anything,
//! so a failed call leaves the radio exactly as it was.
//!
//! ```
//! use radiorec::catalog::{Song, SongId, User, UserId};
//! use radiorec::radio::StreamingRadio;
//!
//! let mut radio = StreamingRadio::new();
//! radio.add_user(User { id: UserId(1), name: "ada".into() })?;
//! radio.add_song(Song {
//!     id: SongId(1),
//!     title: "So What".into(),
//!     artist: "Miles Davis".into(),
//!     album: "Kind of Blue".into(),
//! })?;
//! radio.rate_song(UserId(1), SongId(1), 5)?;
//!
//! // One rating is not enough history to predict anything.
//! assert!(radio.suggest_song(UserId(1)).is_err());
//! # Ok::<(), radiorec::error::RadioError>(())
//! ```

use crate::catalog::{CatalogStore, MemoryCatalog, Song, SongId, Station, StationId, User, UserId};
use crate::config::RecommenderConfig;
use crate::error::{Entity, RadioError, Result};
use crate::predictor::{Prediction, Predictor};
use crate::ratings::{MemoryRatings, RatingStore, Stars};
use crate::similarity::SimilarityEngine;
use crate::suggester::Suggester;
use log::info;

#[derive(Debug, Default)]
pub struct StreamingRadio {
    catalog: MemoryCatalog,
    ratings: MemoryRatings,
    engine: SimilarityEngine,
    config: RecommenderConfig,
}

impl StreamingRadio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RecommenderConfig) -> Self {
        Self {
            catalog: MemoryCatalog::with_capacity(config.catalog_capacity),
            ratings: MemoryRatings::new(),
            engine: SimilarityEngine::new(config.min_co_raters),
            config,
        }
    }

    /// Assemble a radio from stores loaded elsewhere.
    ///
    /// # Errors
    ///
    /// [`RadioError::Validation`] if a rating refers to a user or song the
    /// catalog does not contain.
    pub fn from_parts(
        catalog: MemoryCatalog,
        ratings: MemoryRatings,
        config: RecommenderConfig,
    ) -> Result<Self> {
        if let Some((user, song, _)) = ratings
            .iter()
            .find(|&(user, song, _)| !catalog.user_exists(user) || !catalog.song_exists(song))
        {
            return Err(RadioError::Validation(format!(
                "rating by user {user} on song {song} refers to a missing user or song"
            )));
        }

        let mut catalog = catalog;
        catalog.set_capacity(config.catalog_capacity);
        Ok(Self {
            catalog,
            ratings,
            engine: SimilarityEngine::new(config.min_co_raters),
            config,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn ratings(&self) -> &MemoryRatings {
        &self.ratings
    }

    #[must_use]
    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn add_song(&mut self, song: Song) -> Result<()> {
        self.catalog.insert_song(song)
    }

    /// Removes a song from the catalog, every station playlist, and every
    /// user's ratings.
    pub fn remove_song(&mut self, song: SongId) -> Result<Song> {
        let removed = self.catalog.remove_song(song)?;
        let purged = self.ratings.purge_song(song);
        info!("Removed song {song} `{}' and {purged} ratings", removed.title);
        Ok(removed)
    }

    pub fn add_user(&mut self, user: User) -> Result<()> {
        self.catalog.insert_user(user)
    }

    pub fn add_station(&mut self, station: Station) -> Result<()> {
        self.catalog.insert_station(station)
    }

    pub fn add_to_station(&mut self, song: SongId, station: StationId) -> Result<()> {
        self.catalog.add_to_station(song, station)
    }

    pub fn remove_from_station(&mut self, song: SongId, station: StationId) -> Result<()> {
        self.catalog.remove_from_station(song, station)
    }

    /// Sets (or replaces) `user`'s rating of `song`. Returns the previous
    /// rating, if any.
    ///
    /// # Errors
    ///
    /// [`RadioError::NotFound`] for an unknown user or song,
    /// [`RadioError::Validation`] if `stars` is not between 1 and 5.
    pub fn rate_song(&mut self, user: UserId, song: SongId, stars: u8) -> Result<Option<Stars>> {
        self.ensure_user(user)?;
        self.ensure_song(song)?;
        let stars = Stars::new(stars)?;
        Ok(self.ratings.set(user, song, stars))
    }

    /// Clears an existing rating and returns it.
    pub fn clear_rating(&mut self, user: UserId, song: SongId) -> Result<Stars> {
        self.ensure_user(user)?;
        self.ensure_song(song)?;
        self.ratings.clear(user, song)
    }

    /// Similarity of two catalog songs; `None` if undefined.
    pub fn similarity(&self, a: SongId, b: SongId) -> Result<Option<f64>> {
        self.ensure_song(a)?;
        self.ensure_song(b)?;
        Ok(self.engine.similarity(&self.ratings, a, b))
    }

    #[must_use]
    pub fn predictor(&self) -> Predictor<'_, MemoryCatalog, MemoryRatings> {
        Predictor::new(&self.catalog, &self.ratings, &self.engine)
            .with_max_neighbors(self.config.max_neighbors)
    }

    #[must_use]
    pub fn suggester(&self) -> Suggester<'_, MemoryCatalog, MemoryRatings> {
        Suggester::new(self.predictor())
    }

    pub fn predict_rating(&self, user: UserId, song: SongId) -> Result<Stars> {
        self.predictor().predict_rating(user, song)
    }

    pub fn explain(&self, user: UserId, song: SongId) -> Result<Prediction> {
        self.predictor().explain(user, song)
    }

    pub fn suggest_song(&self, user: UserId) -> Result<SongId> {
        self.suggester().suggest_song(user)
    }

    pub fn suggest_from_station(&self, user: UserId, station: StationId) -> Result<SongId> {
        self.suggester().suggest_from_station(user, station)
    }

    pub fn rank_songs(&self, user: UserId, limit: usize) -> Result<Vec<(SongId, Stars)>> {
        self.suggester().rank_songs(user, limit)
    }

    fn ensure_user(&self, user: UserId) -> Result<()> {
        if self.catalog.user_exists(user) {
            Ok(())
        } else {
            Err(RadioError::NotFound(Entity::User(user)))
        }
    }

    fn ensure_song(&self, song: SongId) -> Result<()> {
        if self.catalog.song_exists(song) {
            Ok(())
        } else {
            Err(RadioError::NotFound(Entity::Song(song)))
        }
    }
}
