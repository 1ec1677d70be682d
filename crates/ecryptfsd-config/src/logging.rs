use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output encodings understood by the daemon's telemetry layer.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for journald or log shippers.
    #[default]
    Json,
    /// Terse single-line text for interactive foreground runs.
    Compact,
}

/// Returned when a textual log format does not name a [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
