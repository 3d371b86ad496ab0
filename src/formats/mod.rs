use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;

use crate::model::SubtitleRecord;

pub mod json;
pub mod srt;
pub mod time;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Format {
    Srt,
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Srt => "srt",
            Format::Json => "json",
        }
    }

    /// Picks a format from the file extension; anything but `.srt`/`.json` is refused.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "srt" => Ok(Format::Srt),
            "json" => Ok(Format::Json),
            _ => bail!(
                "only .srt or .json files are supported: {}",
                path.display()
            ),
        }
    }
}

pub fn parse_any(raw: &str, fmt: Format) -> Result<Vec<SubtitleRecord>> {
    match fmt {
        Format::Srt => Ok(srt::parse_srt(raw)),
        Format::Json => json::parse_json(raw).context("failed parsing JSON subtitles"),
    }
}

pub fn render_any(records: &[SubtitleRecord], fmt: Format, json_pretty: bool) -> Result<String> {
    match fmt {
        Format::Srt => Ok(srt::write_srt(records)),
        Format::Json => json::write_json(records, json_pretty),
    }
}
