//! # Similarity Engine
//!
//! How alike two songs are, judged by the users who rated both of them (the
//! *co-raters*). The score is the Pearson correlation of the two songs'
//! ratings over the co-rater set:
//!
//! ```text
//!            Σ (xᵢ - x̄)(yᵢ - ȳ)
//! r = ──────────────────────────────
//!     √(Σ (xᵢ - x̄)²) · √(Σ (yᵢ - ȳ)²)
//! ```
//!
//! where the means are taken over the co-raters only. The score is undefined
//! (`None`) when there are too few co-raters or when either side has no
//! variance; undefined scores are left out of prediction rather than counted
//! as zero.
//!
//! Scores are memoized per engine. The memo is tagged with the
//! [`RatingStore::version`] it was filled from and is dropped as a whole the
//! first time a lookup sees a newer version.

use crate::catalog::{SongId, UserId};
use crate::ratings::{RatingStore, Stars};
use log::{trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Fewest co-raters a correlation can be computed from.
pub const MIN_CO_RATERS: usize = 2;

/// Memoized scores for one rating snapshot.
#[derive(Debug, Default)]
struct SimilarityCache {
    version: Option<u64>,
    scores: HashMap<(SongId, SongId), Option<f64>>,
}

impl SimilarityCache {
    /// Forget everything if the store moved on since the memo was filled.
    fn sync(&mut self, version: u64) {
        if self.version != Some(version) {
            if !self.scores.is_empty() {
                trace!(
                    "Rating snapshot {version} replaces {:?}; dropping {} cached similarities",
                    self.version,
                    self.scores.len()
                );
            }
            self.scores.clear();
            self.version = Some(version);
        }
    }
}

/// Pairwise song similarity with a per-snapshot memo.
#[derive(Debug)]
pub struct SimilarityEngine {
    min_co_raters: usize,
    cache: Mutex<SimilarityCache>,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(MIN_CO_RATERS)
    }
}

impl SimilarityEngine {
    /// `min_co_raters` below [`MIN_CO_RATERS`] is raised to it; a correlation
    /// over a single pair is meaningless.
    #[must_use]
    pub fn new(min_co_raters: usize) -> Self {
        if min_co_raters < MIN_CO_RATERS {
            warn!("min_co_raters = {min_co_raters} is too small, using {MIN_CO_RATERS}");
        }
        Self {
            min_co_raters: min_co_raters.max(MIN_CO_RATERS),
            cache: Mutex::new(SimilarityCache::default()),
        }
    }

    #[must_use]
    pub fn min_co_raters(&self) -> usize {
        self.min_co_raters
    }

    /// Similarity of `a` and `b` in the current snapshot of `ratings`.
    ///
    /// Symmetric: the pair is normalized before lookup and computation.
    pub fn similarity<R>(&self, ratings: &R, a: SongId, b: SongId) -> Option<f64>
    where
        R: RatingStore + ?Sized,
    {
        let key = if a <= b { (a, b) } else { (b, a) };
        if a == b {
            let songs = ratings.ratings_by_song(a);
            return pearson(songs, songs, self.min_co_raters);
        }
        let version = ratings.version();

        if let Some(mut cache) = self.lock_cache() {
            cache.sync(version);
            if let Some(&cached) = cache.scores.get(&key) {
                return cached;
            }
        }

        let score = pearson(
            ratings.ratings_by_song(key.0),
            ratings.ratings_by_song(key.1),
            self.min_co_raters,
        );
        trace!("similarity({}, {}) = {score:?}", key.0, key.1);

        if let Some(mut cache) = self.lock_cache() {
            if cache.version == Some(version) {
                cache.scores.insert(key, score);
            }
        }

        score
    }

    /// Number of memoized pairs for the current snapshot.
    #[must_use]
    pub fn cached_pairs(&self) -> usize {
        self.lock_cache().map_or(0, |cache| cache.scores.len())
    }

    pub fn clear(&self) {
        if let Some(mut cache) = self.lock_cache() {
            cache.scores.clear();
            cache.version = None;
        }
    }

    /// `None` if a panicking thread poisoned the memo; scores are then
    /// computed without it.
    fn lock_cache(&self) -> Option<MutexGuard<'_, SimilarityCache>> {
        match self.cache.lock() {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!("Similarity memo unavailable, computing uncached: {err}");
                None
            }
        }
    }
}

/// Pearson correlation over the users present in both maps.
#[must_use]
pub fn pearson(
    a: &BTreeMap<UserId, Stars>,
    b: &BTreeMap<UserId, Stars>,
    min_co_raters: usize,
) -> Option<f64> {
    let (small, large, swapped) = if a.len() <= b.len() {
        (a, b, false)
    } else {
        (b, a, true)
    };

    let pairs: Vec<(f64, f64)> = small
        .iter()
        .filter_map(|(user, x)| large.get(user).map(|y| (x.as_f64(), y.as_f64())))
        .map(|(x, y)| if swapped { (y, x) } else { (x, y) })
        .collect();

    if pairs.len() < min_co_raters.max(MIN_CO_RATERS) {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (covariance, var_x, var_y) = pairs.iter().fold((0.0, 0.0, 0.0), |(c, vx, vy), (x, y)| {
        let dx = x - mean_x;
        let dy = y - mean_y;
        (c + dx * dy, vx + dx * dx, vy + dy * dy)
    });

    // Star ratings are small integers, so an exact zero is the only way to
    // have no spread.
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((covariance / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::MemoryRatings;

    fn stars(n: u8) -> Stars {
        Stars::new(n).unwrap()
    }

    /// Three users rating three songs; songs 1 and 2 move together, song 3
    /// moves against them.
    fn fixture() -> MemoryRatings {
        let mut ratings = MemoryRatings::new();
        for (user, s1, s2, s3) in [(1, 5, 4, 1), (2, 3, 3, 3), (3, 1, 2, 5)] {
            ratings.set(UserId(user), SongId(1), stars(s1));
            ratings.set(UserId(user), SongId(2), stars(s2));
            ratings.set(UserId(user), SongId(3), stars(s3));
        }
        ratings
    }

    #[test]
    fn test_perfect_correlation() {
        let mut ratings = MemoryRatings::new();
        ratings.set(UserId(1), SongId(1), stars(1));
        ratings.set(UserId(1), SongId(2), stars(2));
        ratings.set(UserId(2), SongId(1), stars(4));
        ratings.set(UserId(2), SongId(2), stars(5));

        let engine = SimilarityEngine::default();
        let score = engine.similarity(&ratings, SongId(1), SongId(2)).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_positive_and_negative_neighbors() {
        let ratings = fixture();
        let engine = SimilarityEngine::default();

        let together = engine.similarity(&ratings, SongId(1), SongId(2)).unwrap();
        let against = engine.similarity(&ratings, SongId(1), SongId(3)).unwrap();
        assert!(together > 0.9);
        assert!(against < -0.9);
    }

    #[test]
    fn test_symmetry() {
        let ratings = fixture();
        let engine = SimilarityEngine::default();
        for a in 1..=3 {
            for b in 1..=3 {
                assert_eq!(
                    engine.similarity(&ratings, SongId(a), SongId(b)),
                    engine.similarity(&ratings, SongId(b), SongId(a))
                );
            }
        }
        // Same answer straight from the formula, bypassing the memo.
        assert_eq!(
            pearson(
                ratings.ratings_by_song(SongId(1)),
                ratings.ratings_by_song(SongId(3)),
                2
            ),
            pearson(
                ratings.ratings_by_song(SongId(3)),
                ratings.ratings_by_song(SongId(1)),
                2
            )
        );
    }

    #[test]
    fn test_too_few_co_raters_is_undefined() {
        let mut ratings = MemoryRatings::new();
        ratings.set(UserId(1), SongId(1), stars(5));
        ratings.set(UserId(1), SongId(2), stars(1));
        ratings.set(UserId(2), SongId(1), stars(2));

        let engine = SimilarityEngine::default();
        assert_eq!(engine.similarity(&ratings, SongId(1), SongId(2)), None);
    }

    #[test]
    fn test_zero_variance_is_undefined() {
        let mut ratings = MemoryRatings::new();
        for user in 1..=3 {
            ratings.set(UserId(user), SongId(1), stars(4));
            ratings.set(UserId(user), SongId(2), stars(u8::try_from(user).unwrap()));
        }

        let engine = SimilarityEngine::default();
        assert_eq!(engine.similarity(&ratings, SongId(1), SongId(2)), None);
    }

    #[test]
    fn test_min_co_raters_is_configurable_but_floored() {
        let ratings = fixture();
        assert_eq!(SimilarityEngine::new(0).min_co_raters(), MIN_CO_RATERS);

        let strict = SimilarityEngine::new(4);
        assert_eq!(strict.similarity(&ratings, SongId(1), SongId(2)), None);
    }

    #[test]
    fn test_memo_is_invalidated_on_rating_change() {
        let mut ratings = fixture();
        let engine = SimilarityEngine::default();

        let before = engine.similarity(&ratings, SongId(1), SongId(2));
        engine.similarity(&ratings, SongId(1), SongId(3));
        assert_eq!(engine.cached_pairs(), 2);

        ratings.set(UserId(3), SongId(2), stars(5));
        let after = engine.similarity(&ratings, SongId(1), SongId(2));

        assert_ne!(before, after);
        assert_eq!(engine.cached_pairs(), 1);
    }

    #[test]
    fn test_self_similarity_is_not_memoized() {
        let ratings = fixture();
        let engine = SimilarityEngine::default();
        let score = engine.similarity(&ratings, SongId(1), SongId(1)).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
        assert_eq!(engine.cached_pairs(), 0);
    }

    #[test]
    fn test_shared_engine_does_not_mix_up_stores() {
        let mut left = fixture();
        let mut right = left.clone();
        left.set(UserId(3), SongId(2), stars(5));
        right.set(UserId(3), SongId(2), stars(1));

        let engine = SimilarityEngine::default();
        let from_left = engine.similarity(&left, SongId(1), SongId(2));
        let from_right = engine.similarity(&right, SongId(1), SongId(2));

        assert_eq!(
            from_right,
            SimilarityEngine::default().similarity(&right, SongId(1), SongId(2))
        );
        assert_ne!(from_left, from_right);
    }

    #[test]
    fn test_poisoned_memo_still_answers() {
        let ratings = fixture();
        let engine = SimilarityEngine::default();
        let expected = engine.similarity(&ratings, SongId(1), SongId(2));

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = engine.cache.lock().unwrap();
            panic!("poison the memo");
        }));

        assert_eq!(engine.similarity(&ratings, SongId(1), SongId(2)), expected);
        assert_eq!(engine.cached_pairs(), 0);
    }

    #[test]
    fn test_clear() {
        let ratings = fixture();
        let engine = SimilarityEngine::default();
        engine.similarity(&ratings, SongId(1), SongId(2));
        engine.clear();
        assert_eq!(engine.cached_pairs(), 0);
    }
}
