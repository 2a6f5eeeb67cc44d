//! Streaming radio catalog that predicts ratings and suggests songs.
//!
//! Core modules:
//! - [`catalog`] - Songs, users, stations and playlists
//! - [`ratings`] - Sparse user × song star matrix
//! - [`similarity`] - Pearson song similarity with a per-snapshot memo
//! - [`predictor`] - Item-based k-nearest-neighbor rating prediction
//! - [`suggester`] - Picks and ranks unrated songs for a user
//! - [`radio`] - [`StreamingRadio`] facade keeping the stores consistent
//!
//! ### Supporting Modules
//!
//! - [`error`] - Error taxonomy ([`RadioError`])
//! - [`db`] - SQLite snapshot storage
//! - [`config`] - Data directory and recommender settings
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use radiorec::catalog::{Song, SongId, User, UserId};
//! use radiorec::StreamingRadio;
//!
//! let mut radio = StreamingRadio::new();
//! for (id, title) in [(1, "So What"), (2, "Freddie Freeloader"), (3, "Blue in Green")] {
//!     radio.add_song(Song {
//!         id: SongId(id),
//!         title: title.to_string(),
//!         artist: "Miles Davis".to_string(),
//!         album: "Kind of Blue".to_string(),
//!     })?;
//! }
//! for id in 1..=3 {
//!     radio.add_user(User { id: UserId(id), name: format!("listener {id}") })?;
//! }
//!
//! // Listeners 1 and 2 agree that songs 1 and 3 go together.
//! for (user, s1, s2, s3) in [(1, 5, 2, 4), (2, 2, 4, 1)] {
//!     radio.rate_song(UserId(user), SongId(1), s1)?;
//!     radio.rate_song(UserId(user), SongId(2), s2)?;
//!     radio.rate_song(UserId(user), SongId(3), s3)?;
//! }
//! radio.rate_song(UserId(3), SongId(1), 5)?;
//!
//! assert_eq!(radio.predict_rating(UserId(3), SongId(3))?.get(), 5);
//! assert_eq!(radio.suggest_song(UserId(3))?, SongId(3));
//! # Ok::<(), radiorec::RadioError>(())
//! ```
//!
//! ## Error Handling
//!
//! Catalog and recommender operations return [`error::Result`], whose error
//! separates unknown ids ([`RadioError::NotFound`]), bad input
//! ([`RadioError::Validation`]) and "not enough data"
//! ([`RadioError::Unpredictable`], [`RadioError::Unsuggestable`]).
//! Storage and configuration use `anyhow::Result` with context.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod predictor;
pub mod radio;
pub mod ratings;
pub mod similarity;
pub mod suggester;

pub use error::RadioError;
pub use radio::StreamingRadio;
