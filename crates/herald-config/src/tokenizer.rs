use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Strategy used to split command argument text into tokens.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TokenizerMode {
    /// Honour quotes and a leading `-flags` token.
    #[default]
    Quoting,
    /// Split on spaces only and leave flag parsing to the host.
    Plain,
}

/// Errors encountered while parsing a [`TokenizerMode`] from text.
pub type TokenizerModeParseError = strum::ParseError;
