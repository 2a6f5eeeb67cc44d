//! # Suggester
//!
//! Picks the unrated song a user is predicted to like most.
//!
//! Candidates are scanned in ascending id order. A candidate the predictor
//! cannot score is skipped; the highest prediction wins and ties go to the
//! lowest id, so the answer is reproducible for a fixed rating snapshot. The
//! scan stops at the first five-star prediction since nothing after it can
//! win.

use crate::catalog::{CatalogStore, SongId, StationId, UserId};
use crate::error::{Entity, RadioError, Result};
use crate::predictor::Predictor;
use crate::ratings::{RatingStore, Stars};
use log::{debug, trace};
use rayon::prelude::*;

pub struct Suggester<'a, C: ?Sized, R: ?Sized> {
    predictor: Predictor<'a, C, R>,
}

impl<'a, C, R> Suggester<'a, C, R>
where
    C: CatalogStore + ?Sized,
    R: RatingStore + ?Sized,
{
    #[must_use]
    pub fn new(predictor: Predictor<'a, C, R>) -> Self {
        Self { predictor }
    }

    /// The catalog song `user` has not rated with the best predicted rating.
    ///
    /// # Errors
    ///
    /// - [`RadioError::NotFound`] if the user is unknown.
    /// - [`RadioError::Unsuggestable`] if the user has rated every song, or
    ///   no unrated song can be predicted.
    pub fn suggest_song(&self, user: UserId) -> Result<SongId> {
        self.ensure_user(user)?;

        let candidates = self.unrated(user, self.predictor.catalog().song_ids());
        if candidates.is_empty() {
            return Err(RadioError::Unsuggestable(format!(
                "user {user} has rated the entire catalog"
            )));
        }

        self.best_of(user, candidates)
    }

    /// Like [`Suggester::suggest_song`], limited to one station's playlist.
    pub fn suggest_from_station(&self, user: UserId, station: StationId) -> Result<SongId> {
        self.ensure_user(user)?;

        let catalog = self.predictor.catalog();
        if !catalog.station_exists(station) {
            return Err(RadioError::NotFound(Entity::Station(station)));
        }
        let mut playlist = catalog.station_playlist(station).unwrap_or_default().to_vec();
        playlist.sort_unstable();

        let candidates = self.unrated(user, playlist);
        if candidates.is_empty() {
            return Err(RadioError::Unsuggestable(format!(
                "user {user} has rated every song on station {station}"
            )));
        }

        self.best_of(user, candidates)
    }

    /// Every unrated song that can be predicted, best first, at most `limit`.
    ///
    /// Predictions run in parallel; the result is sorted afterwards so it does
    /// not depend on scheduling. An exhausted catalog yields an empty list.
    pub fn rank_songs(&self, user: UserId, limit: usize) -> Result<Vec<(SongId, Stars)>>
    where
        C: Sync,
        R: Sync,
    {
        self.ensure_user(user)?;

        let candidates = self.unrated(user, self.predictor.catalog().song_ids());
        let predictions: Vec<(SongId, Result<Stars>)> = candidates
            .par_iter()
            .map(|&song| (song, self.predictor.predict_rating(user, song)))
            .collect();

        let mut ranked = Vec::with_capacity(predictions.len());
        for (song, prediction) in predictions {
            match prediction {
                Ok(stars) => ranked.push((song, stars)),
                Err(err) if err.is_unpredictable() => {}
                Err(err) => return Err(err),
            }
        }

        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn ensure_user(&self, user: UserId) -> Result<()> {
        if self.predictor.catalog().user_exists(user) {
            Ok(())
        } else {
            Err(RadioError::NotFound(Entity::User(user)))
        }
    }

    /// `songs` minus those `user` already rated, order preserved.
    fn unrated(&self, user: UserId, songs: Vec<SongId>) -> Vec<SongId> {
        let rated = self.predictor.ratings().ratings_by_user(user);
        songs
            .into_iter()
            .filter(|song| !rated.contains_key(song))
            .collect()
    }

    /// `candidates` must be in ascending id order for the tie-break to hold.
    fn best_of(&self, user: UserId, candidates: Vec<SongId>) -> Result<SongId> {
        let total = candidates.len();
        let mut best: Option<(SongId, Stars)> = None;

        for song in candidates {
            match self.predictor.predict_rating(user, song) {
                Ok(stars) => {
                    if best.map_or(true, |(_, top)| stars > top) {
                        best = Some((song, stars));
                    }
                    if stars.get() == Stars::MAX {
                        trace!("Song {song} predicted at {stars} stars; stopping scan");
                        break;
                    }
                }
                Err(err) if err.is_unpredictable() => {
                    trace!("Skipping song {song}: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        let (song, stars) = best.ok_or_else(|| {
            RadioError::Unsuggestable(format!(
                "none of the {total} unrated songs can be predicted for user {user}"
            ))
        })?;

        debug!("Suggesting song {song} ({stars} stars predicted) for user {user}");
        Ok(song)
    }
}
