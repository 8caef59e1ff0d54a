//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `playflon` binary.
//!
//! ## Commands
//!
//! - `serve`: Run the wave HTTP service
//! - `scan`: Import the audio root into the track catalog
//! - `list`: Print catalogued tracks
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! playflon scan --audio-root /srv/audio
//! AUDIO_BASE_PATH=/srv/audio playflon serve --port 8080
//! playflon list --mood focus
//! ```

use crate::models::Mood;
use clap::{Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, Ipv4Addr};
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

#[derive(Parser, Debug)]
#[command(name = "playflon")]
#[command(about = "Playflon: endless mood waves over a local audio library")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    ///
    /// Serves session start, next-track selection, event logging and
    /// range-capable audio streaming.
    Serve {
        /// Directory holding one sub-directory per mood
        #[arg(long, env = "AUDIO_BASE_PATH", value_hint = clap::ValueHint::DirPath)]
        audio_root: PathBuf,

        /// Address to bind
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        host: IpAddr,

        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3001)]
        port: u16,

        /// SQLite database file (defaults to the platform data directory)
        #[arg(long, env = "PLAYFLON_DB_PATH", value_hint = clap::ValueHint::FilePath)]
        db: Option<PathBuf>,
    },

    /// Import audio files into the catalog
    ///
    /// Walks `<audio-root>/<mood>/` for every mood and creates or refreshes
    /// one track per .mp3, .wav, .m4a or .ogg file.
    Scan {
        #[arg(long, env = "AUDIO_BASE_PATH", value_hint = clap::ValueHint::DirPath)]
        audio_root: PathBuf,

        #[arg(long, env = "PLAYFLON_DB_PATH", value_hint = clap::ValueHint::FilePath)]
        db: Option<PathBuf>,
    },

    /// List catalogued tracks
    ///
    /// With an audio root, also reports whether each track's file exists.
    List {
        /// Only show tracks of this mood
        #[arg(long, value_enum)]
        mood: Option<Mood>,

        #[arg(long, env = "AUDIO_BASE_PATH", value_hint = clap::ValueHint::DirPath)]
        audio_root: Option<PathBuf>,

        #[arg(long, env = "PLAYFLON_DB_PATH", value_hint = clap::ValueHint::FilePath)]
        db: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Usage: playflon completion bash > ~/.local/share/bash-completion/completions/playflon
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let args = Args::try_parse_from(["playflon", "serve", "--audio-root", "/srv/audio", "--port", "8080"]).unwrap();
        match args.command {
            Command::Serve { audio_root, host, port, .. } => {
                assert_eq!(audio_root, PathBuf::from("/srv/audio"));
                assert_eq!(host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
                assert_eq!(port, 8080);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_list_mood_filter() {
        let args = Args::try_parse_from(["playflon", "list", "--mood", "sleep"]).unwrap();
        assert!(matches!(args.command, Command::List { mood: Some(Mood::Sleep), .. }));

        assert!(Args::try_parse_from(["playflon", "list", "--mood", "party"]).is_err());
    }
}
