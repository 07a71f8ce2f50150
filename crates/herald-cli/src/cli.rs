//! Command-line flags for the `herald` shell.

use std::collections::BTreeMap;

use clap::Parser;
use herald::Executor;
use herald_config::{
    Config, DEFAULT_LOCALE, DEFAULT_LOG_FILTER, DEFAULT_SESSION_TTL_SECS, LogFormat,
    TokenizerMode,
};

/// Interactive shell that feeds standard input to the Herald dispatcher.
///
/// Each input line is dispatched as one command. `exit` or `quit` ends the
/// session early.
#[derive(Parser, Debug)]
#[command(name = "herald", version)]
pub(crate) struct Cli {
    /// Runs as the player NAME instead of the console.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: Option<String>,
    /// Marks the player as an operator.
    #[arg(long, requires = "name")]
    pub(crate) operator: bool,
    /// Adds another known player, for commands that take a player argument.
    #[arg(long = "player", value_name = "NAME")]
    pub(crate) players: Vec<String>,
    /// Grants a permission node. `prefix.*` grants a whole subtree. Without
    /// any grant the host reports no permission support.
    #[arg(long = "grant", value_name = "NODE")]
    pub(crate) grants: Vec<String>,
    /// Runs asynchronous commands inline instead of on worker threads.
    #[arg(long)]
    pub(crate) no_scheduler: bool,
    /// Locale the host reports for every executor.
    #[arg(long, value_name = "LOCALE")]
    pub(crate) executor_locale: Option<String>,
    /// `tracing` filter expression.
    #[arg(long, value_name = "FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Log output format (`compact` or `json`).
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    /// Argument tokenizer (`quoting` or `plain`).
    #[arg(long, value_name = "MODE", default_value_t = TokenizerMode::Quoting)]
    pub(crate) tokenizer: TokenizerMode,
    /// Escape character honoured by the quoting tokenizer.
    #[arg(long, value_name = "CHAR")]
    pub(crate) escape: Option<char>,
    /// Inactivity lifetime for sessions, in seconds. Zero never expires.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_SESSION_TTL_SECS)]
    pub(crate) session_ttl: u64,
    /// Fallback locale for messages.
    #[arg(long, value_name = "LOCALE", default_value = DEFAULT_LOCALE)]
    pub(crate) locale: String,
    /// Overrides a message template, for example
    /// `not-found=No such command: { $command }` or `fr-FR/not-found=...`.
    #[arg(long = "message", value_name = "ID=TEMPLATE", value_parser = parse_message)]
    pub(crate) messages: Vec<(String, String)>,
}

impl Cli {
    /// Engine settings selected by the flags.
    pub(crate) fn config(&self) -> Config {
        Config {
            log_filter: self.log_filter.clone(),
            log_format: self.log_format,
            tokenizer: self.tokenizer,
            escape_character: self.escape,
            session_ttl_secs: self.session_ttl,
            locale: self.locale.clone(),
            messages: self.messages.iter().cloned().collect::<BTreeMap<_, _>>(),
        }
    }

    /// Identity the shell dispatches as.
    pub(crate) fn executor(&self) -> Executor {
        match &self.name {
            Some(name) => Executor::player(name.as_str()).with_operator(self.operator),
            None => Executor::console(),
        }
    }
}

fn parse_message(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, template)) if !id.trim().is_empty() => {
            Ok((id.trim().to_owned(), template.to_owned()))
        }
        _ => Err(format!("expected ID=TEMPLATE, got '{raw}'")),
    }
}
