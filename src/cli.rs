use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::formats::Format;

#[derive(Debug, Parser)]
#[command(name = "subtl")]
#[command(about = "Edit subtitle timelines: SRT/JSON import and export, timecodes, project storage.")]
pub struct Args {
    /// Path to config TOML (defaults to ./config.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the store file from the config
    #[arg(long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert between SRT and JSON subtitle files
    Convert(ConvertCmd),
    /// Show which subtitle is active at a playback position
    Active(ActiveCmd),
    /// Format or parse timecodes
    #[command(subcommand)]
    Time(TimeCmd),
    /// Manage projects in the store
    #[command(subcommand)]
    Project(ProjectCmd),
    /// Manage a project's subtitles in the store
    #[command(subcommand)]
    Subs(SubsCmd),
    /// Print the effective default config as TOML and exit
    PrintDefaultConfig,
}

#[derive(Debug, Parser)]
pub struct ConvertCmd {
    /// Input .srt or .json file
    pub input: PathBuf,

    /// Target format
    #[arg(long, value_enum)]
    pub to: Format,

    /// Force input format (otherwise inferred from extension)
    #[arg(long, value_enum)]
    pub from: Option<Format>,

    #[command(flatten)]
    pub out: OutputOpts,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct OutputOpts {
    /// Output file path (optional)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Allow overwriting output file
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Parser)]
pub struct ActiveCmd {
    /// Input .srt or .json file
    pub input: PathBuf,

    /// Playback position, as a timecode or seconds
    #[arg(long)]
    pub at: String,

    /// Force input format (otherwise inferred from extension)
    #[arg(long, value_enum)]
    pub from: Option<Format>,

    /// Media duration in seconds; positions past it are clamped
    #[arg(long)]
    pub duration: Option<f64>,

    /// Loop over this subtitle (1-based) and report where playback continues
    #[arg(long = "loop")]
    pub loop_cue: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum TimeCmd {
    /// Seconds to HH:MM:SS.mmm
    Format { seconds: f64 },
    /// HH:MM:SS.mmm (or HH:MM:SS,mmm) to seconds
    Parse { text: String },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCmd {
    /// Create or update a project
    Init {
        id: String,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Print a project as JSON
    Show { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SubsCmd {
    /// List stored subtitles
    List {
        project: String,
        /// Only rows starting at or after this timecode
        #[arg(long)]
        start_after: Option<String>,
        /// Only rows ending at or before this timecode
        #[arg(long)]
        end_before: Option<String>,
    },
    /// Add an empty subtitle at a position
    Add {
        project: String,
        /// Position, as a timecode or seconds
        #[arg(long)]
        at: String,
        /// Media duration in seconds, caps the new cue's end
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Edit a stored subtitle and save it
    Set {
        project: String,
        id: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        ja: Option<String>,
        #[arg(long)]
        romaji: Option<String>,
    },
    /// Delete a stored subtitle
    Delete { project: String, id: String },
    /// Import an .srt or .json file into a project
    Import {
        project: String,
        input: PathBuf,
        #[arg(long, value_enum)]
        from: Option<Format>,
    },
    /// Export a project's subtitles
    Export {
        project: String,
        #[arg(long, value_enum)]
        to: Format,
        #[command(flatten)]
        out: OutputOpts,
    },
}
