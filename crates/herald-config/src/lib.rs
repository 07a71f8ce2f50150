//! Shared configuration for the Herald command dispatch engine.
//!
//! The [`Config`] type gathers the settings a host passes to the engine:
//! logging output, tokenizer behaviour, the default session lifetime, and the
//! locale plus message overrides used to build the dispatcher's message
//! catalogue. Loading configuration from files or the environment is left to
//! the host; this crate only defines the typed settings, their defaults and
//! validation.

mod defaults;
mod logging;
mod tokenizer;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_LOCALE, DEFAULT_LOG_FILTER, DEFAULT_SESSION_TTL_SECS, default_locale_string,
    default_log_filter, default_log_filter_string, default_log_format, default_tokenizer_mode,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use tokenizer::{TokenizerMode, TokenizerModeParseError};

/// Characters the tokenizer already treats specially.
const RESERVED_ESCAPES: &[char] = &[' ', '"', '\'', '-'];

/// Errors raised when configuration values are inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The log filter expression was blank.
    #[error("log filter must not be empty")]
    EmptyLogFilter,

    /// The locale identifier was blank.
    #[error("locale must not be empty")]
    EmptyLocale,

    /// The escape character collides with a character the tokenizer reserves.
    #[error("escape character {character:?} is reserved by the tokenizer")]
    ReservedEscape {
        /// Offending character.
        character: char,
    },

    /// The escape character was configured for a tokenizer that ignores it.
    #[error("escape character is only supported by the quoting tokenizer")]
    EscapeWithoutQuoting,
}

/// Engine settings supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter expression, for example `info` or `herald=debug`.
    pub log_filter: String,
    /// Output format used by the host's log subscriber.
    pub log_format: LogFormat,
    /// Strategy used to split argument text.
    pub tokenizer: TokenizerMode,
    /// Optional escape character honoured by the quoting tokenizer.
    pub escape_character: Option<char>,
    /// Inactivity lifetime for sessions whose type declares none.
    pub session_ttl_secs: u64,
    /// Locale used when an executor does not report one.
    pub locale: String,
    /// Message overrides keyed by `id` or `locale/id`, written as Fluent
    /// patterns such as `No such command: { $command }`.
    pub messages: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            tokenizer: default_tokenizer_mode(),
            escape_character: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            locale: default_locale_string(),
            messages: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the configured tokenizer strategy.
    #[must_use]
    pub const fn tokenizer(&self) -> TokenizerMode {
        self.tokenizer
    }

    /// Returns the configured escape character, when any.
    #[must_use]
    pub const fn escape_character(&self) -> Option<char> {
        self.escape_character
    }

    /// Returns the default session lifetime. Zero disables expiry.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Returns the fallback locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Returns the message template overrides.
    #[must_use]
    pub const fn messages(&self) -> &BTreeMap<String, String> {
        &self.messages
    }

    /// Checks that the settings are usable together.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        if self.locale.trim().is_empty() {
            return Err(ConfigError::EmptyLocale);
        }
        if let Some(character) = self.escape_character {
            if RESERVED_ESCAPES.contains(&character) {
                return Err(ConfigError::ReservedEscape { character });
            }
            if self.tokenizer != TokenizerMode::Quoting {
                return Err(ConfigError::EscapeWithoutQuoting);
            }
        }
        Ok(())
    }
}
