//! # Database Module
//!
//! SQLite storage for the radio between CLI invocations. The whole catalog is
//! loaded into a [`StreamingRadio`] at start-up and written back in one
//! transaction after a mutation; the recommender itself never touches SQL.

use crate::catalog::{MemoryCatalog, Song, SongId, Station, StationId, User, UserId};
use crate::config::RecommenderConfig;
use crate::radio::StreamingRadio;
use crate::ratings::{MemoryRatings, Stars};
use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

/// Open (or create) the database at `db_path` and make sure the schema exists.
pub fn connect(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS songs (
            id      INTEGER PRIMARY KEY,
            title   TEXT    NOT NULL,
            artist  TEXT    NOT NULL,
            album   TEXT    NOT NULL
        );
        CREATE TABLE IF NOT EXISTS users (
            id      INTEGER PRIMARY KEY,
            name    TEXT    NOT NULL
        );
        CREATE TABLE IF NOT EXISTS stations (
            id      INTEGER PRIMARY KEY,
            name    TEXT    NOT NULL
        );
        CREATE TABLE IF NOT EXISTS station_songs (
            station_id INTEGER NOT NULL,
            song_id    INTEGER NOT NULL,
            position   INTEGER NOT NULL,
            PRIMARY KEY (station_id, song_id),
            FOREIGN KEY (station_id) REFERENCES stations(id) ON DELETE CASCADE,
            FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS ratings (
            user_id INTEGER NOT NULL,
            song_id INTEGER NOT NULL,
            stars   INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
            PRIMARY KEY (user_id, song_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_ratings_song ON ratings(song_id);",
    )
    .context("Failed to create database schema")?;

    Ok(())
}

/// Read the full catalog and rating matrix into memory.
pub fn load(conn: &Connection, config: RecommenderConfig) -> Result<StreamingRadio> {
    let mut catalog = MemoryCatalog::new();

    let mut stmt = conn
        .prepare("SELECT id, title, artist, album FROM songs ORDER BY id")
        .context("Failed to prepare songs query")?;
    let songs = stmt
        .query_map([], |row| {
            Ok(Song {
                id: SongId(row.get(0)?),
                title: row.get(1)?,
                artist: row.get(2)?,
                album: row.get(3)?,
            })
        })
        .context("Cannot query songs.")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Queried song row could not be read.")?;
    for song in songs {
        catalog.insert_song(song)?;
    }

    let mut stmt = conn
        .prepare("SELECT id, name FROM users ORDER BY id")
        .context("Failed to prepare users query")?;
    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: UserId(row.get(0)?),
                name: row.get(1)?,
            })
        })
        .context("Cannot query users.")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Queried user row could not be read.")?;
    for user in users {
        catalog.insert_user(user)?;
    }

    let mut stmt = conn
        .prepare("SELECT id, name FROM stations ORDER BY id")
        .context("Failed to prepare stations query")?;
    let stations = stmt
        .query_map([], |row| {
            Ok(Station::new(StationId(row.get(0)?), row.get::<_, String>(1)?))
        })
        .context("Cannot query stations.")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Queried station row could not be read.")?;
    for station in stations {
        catalog.insert_station(station)?;
    }

    let mut stmt = conn
        .prepare("SELECT station_id, song_id FROM station_songs ORDER BY station_id, position")
        .context("Failed to prepare playlist query")?;
    let entries = stmt
        .query_map([], |row| {
            Ok((StationId(row.get(0)?), SongId(row.get(1)?)))
        })
        .context("Cannot query playlists.")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Queried playlist row could not be read.")?;
    for (station, song) in entries {
        catalog.add_to_station(song, station)?;
    }

    let mut ratings = MemoryRatings::new();
    let mut stmt = conn
        .prepare("SELECT user_id, song_id, stars FROM ratings")
        .context("Failed to prepare ratings query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((UserId(row.get(0)?), SongId(row.get(1)?), row.get::<_, u8>(2)?))
        })
        .context("Cannot query ratings.")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Queried rating row could not be read.")?;
    for (user, song, stars) in rows {
        ratings.set(user, song, Stars::new(stars)?);
    }

    let radio = StreamingRadio::from_parts(catalog, ratings, config)?;
    debug!(
        "Loaded {} songs and {} ratings",
        radio.catalog().songs().count(),
        radio.ratings().len()
    );
    Ok(radio)
}

/// Replace the stored catalog with `radio`'s contents in one transaction.
pub fn save(conn: &mut Connection, radio: &StreamingRadio) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "DELETE FROM ratings;
         DELETE FROM station_songs;
         DELETE FROM stations;
         DELETE FROM users;
         DELETE FROM songs;",
    )
    .context("Failed to clear previous snapshot")?;

    {
        let catalog = radio.catalog();

        let mut stmt =
            tx.prepare("INSERT INTO songs (id, title, artist, album) VALUES (?1, ?2, ?3, ?4)")?;
        for song in catalog.songs() {
            stmt.execute(params![song.id.0, song.title, song.artist, song.album])
                .with_context(|| format!("Invalid SQL statement when INSERTing song: {song:?}"))?;
        }

        let mut stmt = tx.prepare("INSERT INTO users (id, name) VALUES (?1, ?2)")?;
        for user in catalog.users() {
            stmt.execute(params![user.id.0, user.name])
                .with_context(|| format!("Invalid SQL statement when INSERTing user: {user:?}"))?;
        }

        let mut station_stmt = tx.prepare("INSERT INTO stations (id, name) VALUES (?1, ?2)")?;
        let mut entry_stmt = tx.prepare(
            "INSERT INTO station_songs (station_id, song_id, position) VALUES (?1, ?2, ?3)",
        )?;
        for station in catalog.stations() {
            station_stmt
                .execute(params![station.id.0, station.name])
                .with_context(|| format!("Failed to INSERT station {}", station.id))?;
            for (position, song) in station.playlist().iter().enumerate() {
                entry_stmt
                    .execute(params![station.id.0, song.0, position])
                    .with_context(|| {
                        format!("Failed to INSERT song {song} into station {}", station.id)
                    })?;
            }
        }

        let mut stmt =
            tx.prepare("INSERT INTO ratings (user_id, song_id, stars) VALUES (?1, ?2, ?3)")?;
        for (user, song, stars) in radio.ratings().iter() {
            stmt.execute(params![user.0, song.0, stars.get()])
                .with_context(|| {
                    format!("Failed to INSERT rating of song {song} by user {user}")
                })?;
        }
    }

    tx.commit().context("Committing SQL transaction failed.")?;
    info!("Saved radio snapshot");
    Ok(())
}
