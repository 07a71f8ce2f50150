use crate::logging::LogFormat;
use crate::tokenizer::TokenizerMode;

/// Default log filter expression used by hosts.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Locale used when an executor does not report one.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Session lifetime applied to session types without their own TTL.
///
/// Zero means sessions never expire through inactivity.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 0;

/// Default log filter expression used by hosts.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for hosts.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default tokenizer strategy.
#[must_use]
pub const fn default_tokenizer_mode() -> TokenizerMode {
    TokenizerMode::Quoting
}

/// Owned default locale.
#[must_use]
pub fn default_locale_string() -> String {
    DEFAULT_LOCALE.to_owned()
}
