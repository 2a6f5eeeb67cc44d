//! # Predictor
//!
//! Item-based k-nearest-neighbor rating prediction. To guess how user `u`
//! would rate song `t`:
//!
//! 1. take every other song `u` has rated,
//! 2. keep those whose similarity to `t` is defined and positive (the
//!    *neighbors*), at most `max_neighbors` of the most similar,
//! 3. average `u`'s ratings of the neighbors, weighted by similarity,
//! 4. round to whole stars and clamp into 1..=5.
//!
//! For a fixed rating snapshot the result is a pure function of its inputs.

use crate::catalog::{CatalogStore, SongId, UserId};
use crate::error::{Entity, RadioError, Result};
use crate::ratings::{RatingStore, Stars};
use crate::similarity::SimilarityEngine;
use log::{debug, trace};

/// Neighbors voting on a prediction unless configured otherwise.
pub const DEFAULT_MAX_NEIGHBORS: usize = 20;

/// A previously rated song that votes on a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub song: SongId,
    pub similarity: f64,
    /// The user's own rating of `song`.
    pub stars: Stars,
}

/// A prediction together with how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub user: UserId,
    pub song: SongId,
    pub stars: Stars,
    /// Weighted mean before rounding.
    pub estimate: f64,
    /// Voting neighbors, most similar first.
    pub neighbors: Vec<Neighbor>,
}

/// Borrows a catalog, a rating snapshot and a similarity engine for the
/// duration of one or more predictions.
pub struct Predictor<'a, C: ?Sized, R: ?Sized> {
    catalog: &'a C,
    ratings: &'a R,
    engine: &'a SimilarityEngine,
    max_neighbors: usize,
}

impl<'a, C, R> Predictor<'a, C, R>
where
    C: CatalogStore + ?Sized,
    R: RatingStore + ?Sized,
{
    #[must_use]
    pub fn new(catalog: &'a C, ratings: &'a R, engine: &'a SimilarityEngine) -> Self {
        Self {
            catalog,
            ratings,
            engine,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
        }
    }

    /// Limit how many neighbors vote. Zero is treated as one.
    #[must_use]
    pub fn with_max_neighbors(mut self, max_neighbors: usize) -> Self {
        self.max_neighbors = max_neighbors.max(1);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &'a C {
        self.catalog
    }

    #[must_use]
    pub fn ratings(&self) -> &'a R {
        self.ratings
    }

    /// Predicted star rating of `song` by `user`.
    ///
    /// # Errors
    ///
    /// - [`RadioError::NotFound`] if the user or song is not in the catalog.
    /// - [`RadioError::Unpredictable`] if the user has no other ratings, or
    ///   none of them correlates positively with `song`.
    pub fn predict_rating(&self, user: UserId, song: SongId) -> Result<Stars> {
        self.explain(user, song).map(|prediction| prediction.stars)
    }

    /// Same as [`Predictor::predict_rating`], keeping the voting neighbors.
    pub fn explain(&self, user: UserId, song: SongId) -> Result<Prediction> {
        if !self.catalog.user_exists(user) {
            return Err(RadioError::NotFound(Entity::User(user)));
        }
        if !self.catalog.song_exists(song) {
            return Err(RadioError::NotFound(Entity::Song(song)));
        }

        let history: Vec<(SongId, Stars)> = self
            .ratings
            .ratings_by_user(user)
            .iter()
            .filter(|&(&rated, _)| rated != song && self.catalog.song_exists(rated))
            .map(|(&rated, &stars)| (rated, stars))
            .collect();

        if history.is_empty() {
            return Err(RadioError::Unpredictable(format!(
                "cannot predict without any rating history for user {user}"
            )));
        }

        let mut neighbors: Vec<Neighbor> = history
            .into_iter()
            .filter_map(|(rated, stars)| {
                self.engine
                    .similarity(self.ratings, song, rated)
                    .filter(|&similarity| similarity > 0.0)
                    .map(|similarity| Neighbor {
                        song: rated,
                        similarity,
                        stars,
                    })
            })
            .collect();

        if neighbors.is_empty() {
            return Err(RadioError::Unpredictable(format!(
                "no song rated by user {user} correlates positively with song {song}"
            )));
        }

        neighbors.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.song.cmp(&b.song))
        });
        neighbors.truncate(self.max_neighbors);

        let (weighted, total) = neighbors.iter().fold((0.0, 0.0), |(sum, weight), n| {
            (sum + n.similarity * n.stars.as_f64(), weight + n.similarity)
        });
        let estimate = weighted / total;
        let stars = Stars::from_estimate(estimate);

        trace!(
            "predict({user}, {song}): {} neighbors, estimate {estimate:.3}",
            neighbors.len()
        );
        debug!("Predicted {stars} stars for user {user} on song {song}");

        Ok(Prediction {
            user,
            song,
            stars,
            estimate,
            neighbors,
        })
    }
}
