//! # Shell Completion Module
//!
//! Completion scripts via clap_complete, plus a hidden `complete-songs`
//! command that lists catalogued song ids for dynamic completion. The fish
//! script calls it for commands whose first argument is a song.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! radiorec completion bash > ~/.local/share/bash-completion/completions/radiorec
//!
//! # Generate zsh completions
//! radiorec completion zsh > ~/.config/zsh/completions/_radiorec
//! ```

use crate::cli::Shell;
use crate::config::RecommenderConfig;
use crate::db;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Shell as CompletionShell};
use std::io::{self, Write};
use std::path::Path;

/// Fish rules completing song ids from the database.
pub const FISH_SONG_COMPLETIONS: &str = r#"
function __radiorec_complete_songs
    radiorec complete-songs 2>/dev/null
end

complete -c radiorec -f -n '__fish_seen_subcommand_from remove-song add-to-station remove-from-station similarity' -a '(__radiorec_complete_songs)'
"#;

/// Write the completion script for `shell` to `out`.
pub fn write_completions(shell: &Shell, cmd: &mut Command, out: &mut dyn Write) -> io::Result<()> {
    let name = cmd.get_name().to_string();
    generate(shell_to_completion_shell(shell), cmd, name, out);
    if *shell == Shell::Fish {
        out.write_all(FISH_SONG_COMPLETIONS.as_bytes())?;
    }
    Ok(())
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// `id<TAB>title - artist` for every song, ordered by id.
///
/// An absent or unreadable database yields no completions rather than an
/// error, so a broken database never breaks the user's shell.
pub fn get_song_completions(db_path: &Path) -> Vec<String> {
    if !db_path.exists() {
        return Vec::new();
    }

    let radio = match db::connect(db_path).and_then(|conn| db::load(&conn, RecommenderConfig::default())) {
        Ok(radio) => radio,
        Err(err) => {
            log::debug!("No song completions: {err:#}");
            return Vec::new();
        }
    };

    radio
        .catalog()
        .songs()
        .map(|song| format!("{}\t{} - {}", song.id, song.title, song.artist))
        .collect()
}

/// Print available completions for song ids
pub fn print_song_completions(db_path: &Path) -> Result<()> {
    for completion in get_song_completions(db_path) {
        println!("{completion}");
    }
    Ok(())
}
