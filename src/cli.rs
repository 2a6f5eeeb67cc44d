//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `radiorec` binary. Every command loads the
//! catalog from the SQLite database, runs one operation, and writes the
//! database back if the operation changed anything.
//!
//! ## Examples
//!
//! ```bash
//! radiorec add-user ada
//! radiorec add-song "So What" --artist "Miles Davis" --album "Kind of Blue"
//! radiorec rate 1 1 5
//! radiorec predict 1 2 --verbose
//! radiorec suggest 1 --top 5
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "radiorec")]
#[command(about = "Streaming radio catalog with rating prediction & song suggestions")]
#[command(version)]
pub struct Args {
    /// Database file to use instead of the platform data directory
    #[arg(long, global = true, env = "RADIOREC_DB")]
    pub db: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a song to the catalog
    ///
    /// Prints the id assigned to the new song.
    AddSong {
        /// Song title
        title: String,

        #[arg(long, default_value = "Unknown Artist")]
        artist: String,

        #[arg(long, default_value = "Unknown Album")]
        album: String,
    },

    /// Remove a song from the catalog
    ///
    /// Also removes the song from every station playlist and drops every
    /// rating of it.
    RemoveSong {
        song: u32,
    },

    /// Register a listener
    AddUser {
        name: String,
    },

    /// Create a radio station with an empty playlist
    AddStation {
        name: String,
    },

    /// Add a song to a station's playlist
    AddToStation {
        song: u32,
        station: u32,
    },

    /// Remove a song from a station's playlist
    RemoveFromStation {
        song: u32,
        station: u32,
    },

    /// Rate a song from 1 to 5 stars
    Rate {
        user: u32,
        song: u32,
        /// Number of stars, 1 to 5
        stars: u8,
    },

    /// Clear a user's rating on a song
    ClearRating {
        user: u32,
        song: u32,
    },

    /// Predict the rating a user would give a song
    Predict {
        user: u32,
        song: u32,

        /// Show the neighbor songs that voted on the prediction
        #[arg(short, long)]
        verbose: bool,
    },

    /// Suggest a song the user is predicted to enjoy
    Suggest {
        user: u32,

        /// Only consider songs on this station's playlist
        #[arg(long, conflicts_with = "top")]
        station: Option<u32>,

        /// List the N best candidates instead of a single pick
        #[arg(long)]
        top: Option<usize>,
    },

    /// Show how similar two songs are, judged by shared raters
    Similarity {
        a: u32,
        b: u32,
    },

    /// List all songs in the catalog
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stations and their playlists
    Stations,

    /// Generate shell completions
    ///
    /// Usage: radiorec completion bash > ~/.local/share/bash-completion/completions/radiorec
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List song ids and titles for completion (hidden command)
    #[command(hide = true)]
    CompleteSongs,
}

impl Command {
    /// Whether the command changes the catalog and must be saved afterwards.
    #[must_use]
    pub const fn mutates(&self) -> bool {
        matches!(
            self,
            Command::AddSong { .. }
                | Command::RemoveSong { .. }
                | Command::AddUser { .. }
                | Command::AddStation { .. }
                | Command::AddToStation { .. }
                | Command::RemoveFromStation { .. }
                | Command::Rate { .. }
                | Command::ClearRating { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_rate() {
        let args = Args::try_parse_from(["radiorec", "rate", "1", "2", "5"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Rate {
                user: 1,
                song: 2,
                stars: 5
            }
        ));
        assert!(args.command.mutates());
    }

    #[test]
    fn test_global_db_flag() {
        let args =
            Args::try_parse_from(["radiorec", "suggest", "3", "--db", "/tmp/r.db"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/r.db")));
        assert!(!args.command.mutates());
    }

    #[test]
    fn test_station_and_top_conflict() {
        let result =
            Args::try_parse_from(["radiorec", "suggest", "1", "--station", "2", "--top", "3"]);
        assert!(result.is_err());
    }
}
