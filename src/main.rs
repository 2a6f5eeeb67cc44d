//! # radiorec
//!
//! Command-line front end for the streaming radio catalog. The catalog lives
//! in a SQLite file; each invocation loads it, runs one command, and saves it
//! again if the command changed anything.
//!
//! ```bash
//! radiorec add-user ada
//! radiorec add-song "So What" --artist "Miles Davis"
//! radiorec rate 1 1 5
//! radiorec suggest 1
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::{debug, info};
use radiorec::catalog::{Song, SongId, Station, StationId, User, UserId};
use radiorec::cli::{self, Command};
use radiorec::config::RuntimeConfig;
use radiorec::ratings::RatingStore;
use radiorec::{completion, db, StreamingRadio};
use std::io;

/// Main entry point for radiorec.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug radiorec suggest 1` - Enable debug logging
/// - `RUST_LOG=radiorec::similarity=trace radiorec predict 1 2` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    // Commands that never touch the catalog.
    if let Command::Completion { shell } = &args.command {
        let mut cmd = cli::Args::command();
        completion::write_completions(shell, &mut cmd, &mut io::stdout())?;
        return Ok(());
    }

    let config = match args.db {
        Some(db_path) => RuntimeConfig::for_db_path(db_path)?,
        None => RuntimeConfig::new()?,
    };
    debug!("Using database {}", config.db_path.display());

    if matches!(args.command, Command::CompleteSongs) {
        return completion::print_song_completions(&config.db_path);
    }

    let mut conn = db::connect(&config.db_path)?;
    let mut radio = db::load(&conn, config.recommender.clone())?;

    let mutates = args.command.mutates();
    execute(&mut radio, args.command)?;

    if mutates {
        db::save(&mut conn, &radio)?;
    }

    Ok(())
}

/// Run one catalog command against the loaded radio.
fn execute(radio: &mut StreamingRadio, command: Command) -> Result<()> {
    match command {
        Command::AddSong {
            title,
            artist,
            album,
        } => {
            let id = radio.catalog().next_song_id()?;
            radio.add_song(Song {
                id,
                title,
                artist,
                album,
            })?;
            println!("{id}");
        }
        Command::RemoveSong { song } => {
            let removed = radio.remove_song(SongId(song))?;
            println!("Removed {} `{}'", removed.id, removed.title);
        }
        Command::AddUser { name } => {
            let id = radio.catalog().next_user_id()?;
            radio.add_user(User { id, name })?;
            println!("{id}");
        }
        Command::AddStation { name } => {
            let id = radio.catalog().next_station_id()?;
            radio.add_station(Station::new(id, name))?;
            println!("{id}");
        }
        Command::AddToStation { song, station } => {
            radio.add_to_station(SongId(song), StationId(station))?;
        }
        Command::RemoveFromStation { song, station } => {
            radio.remove_from_station(SongId(song), StationId(station))?;
        }
        Command::Rate { user, song, stars } => {
            if let Some(previous) = radio.rate_song(UserId(user), SongId(song), stars)? {
                info!("Replaced previous rating of {previous} stars");
            }
        }
        Command::ClearRating { user, song } => {
            radio.clear_rating(UserId(user), SongId(song))?;
        }
        Command::Predict {
            user,
            song,
            verbose,
        } => {
            let prediction = radio.explain(UserId(user), SongId(song))?;
            println!("{}", prediction.stars);
            if verbose {
                println!("estimate: {:.3}", prediction.estimate);
                for neighbor in &prediction.neighbors {
                    println!(
                        "  song {:>5}  similarity {:>6.3}  rated {}",
                        neighbor.song, neighbor.similarity, neighbor.stars
                    );
                }
            }
        }
        Command::Suggest { user, station, top } => match (station, top) {
            (Some(station), _) => {
                let song = radio.suggest_from_station(UserId(user), StationId(station))?;
                print_song(radio, song);
            }
            (None, Some(limit)) => {
                for (song, stars) in radio.rank_songs(UserId(user), limit)? {
                    println!("{stars}  {}", describe(radio, song));
                }
            }
            (None, None) => {
                let song = radio.suggest_song(UserId(user))?;
                print_song(radio, song);
            }
        },
        Command::Similarity { a, b } => match radio.similarity(SongId(a), SongId(b))? {
            Some(score) => println!("{score:.3}"),
            None => println!("undefined"),
        },
        Command::List { json } => {
            if json {
                let songs: Vec<&Song> = radio.catalog().songs().collect();
                println!("{}", serde_json::to_string_pretty(&songs)?);
            } else {
                for song in radio.catalog().songs() {
                    let raters = radio.ratings().ratings_by_song(song.id).len();
                    println!(
                        "{:>5}  {} - {} ({}) [{raters} ratings]",
                        song.id, song.artist, song.title, song.album
                    );
                }
            }
        }
        Command::Stations => {
            for station in radio.catalog().stations() {
                println!("{:>5}  {}", station.id, station.name);
                for &song in station.playlist() {
                    println!("       {}", describe(radio, song));
                }
            }
        }
        // Both are answered in `main` before the catalog is loaded.
        Command::Completion { .. } | Command::CompleteSongs => {}
    }

    Ok(())
}

fn describe(radio: &StreamingRadio, song: SongId) -> String {
    radio.catalog().song(song).map_or_else(
        || song.to_string(),
        |s| format!("{} {} - {}", s.id, s.artist, s.title),
    )
}

fn print_song(radio: &StreamingRadio, song: SongId) {
    println!("{}", describe(radio, song));
}
