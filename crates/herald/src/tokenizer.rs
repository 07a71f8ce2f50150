//! Argument-line tokenizer.
//!
//! The quoting tokenizer is a small character-class state machine. It
//! recognises `"` and `'` quote regions, drops empty tokens unless they were
//! explicitly quoted, and collects a leading `-xyz` token into a
//! deduplicated flag set. The plain tokenizer only splits on spaces and
//! leaves flag handling to the host.
//!
//! Escaping is opt-in: by default a backslash is an ordinary character.
//! Configuring an escape character makes the following character literal.

use herald_config::{Config, TokenizerMode};

/// Flags and positional tokens produced from one argument line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedLine {
    flags: String,
    args: Vec<String>,
}

impl TokenizedLine {
    /// Builds a tokenized line from its parts.
    #[must_use]
    pub const fn new(flags: String, args: Vec<String>) -> Self {
        Self { flags, args }
    }

    /// Deduplicated flag characters in first-seen order.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Ordered positional tokens.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Splits the line into its flag string and positional tokens.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.flags, self.args)
    }
}

/// Configurable argument splitter.
///
/// # Example
///
/// ```
/// use herald::Tokenizer;
///
/// let line = Tokenizer::quoting().split("-fl \"a b\" c");
/// assert_eq!(line.flags(), "fl");
/// assert_eq!(line.args(), ["a b", "c"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    mode: TokenizerMode,
    escape: Option<char>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::quoting()
    }
}

impl Tokenizer {
    /// Quote- and flag-aware tokenizer without escaping.
    #[must_use]
    pub const fn quoting() -> Self {
        Self {
            mode: TokenizerMode::Quoting,
            escape: None,
        }
    }

    /// Naive space splitter that never reports flags.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            mode: TokenizerMode::Plain,
            escape: None,
        }
    }

    /// Enables `escape` as the escape character for the quoting tokenizer.
    #[must_use]
    pub const fn with_escape(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Builds the tokenizer described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let base = match config.tokenizer() {
            TokenizerMode::Quoting => Self::quoting(),
            TokenizerMode::Plain => Self::plain(),
        };
        match config.escape_character() {
            Some(escape) => base.with_escape(escape),
            None => base,
        }
    }

    /// Returns the configured splitting strategy.
    #[must_use]
    pub const fn mode(&self) -> TokenizerMode {
        self.mode
    }

    /// Splits `raw` into flags and positional tokens.
    #[must_use]
    pub fn split(&self, raw: &str) -> TokenizedLine {
        match self.mode {
            TokenizerMode::Quoting => split_quoted(raw, self.escape),
            TokenizerMode::Plain => split_plain(raw),
        }
    }

    /// Splits the command label off the front of `raw`.
    ///
    /// The label follows the same quoting and escape rules as positional
    /// tokens but is never read as a flag token. Returns the label and the
    /// text after it, or `None` when `raw` holds no token.
    ///
    /// ```
    /// use herald::Tokenizer;
    ///
    /// let (label, rest) = Tokenizer::quoting()
    ///     .split_label("\"note\" -f add")
    ///     .expect("label");
    /// assert_eq!(label, "note");
    /// assert_eq!(rest.trim_start(), "-f add");
    /// ```
    #[must_use]
    pub fn split_label<'a>(&self, raw: &'a str) -> Option<(String, &'a str)> {
        match self.mode {
            TokenizerMode::Quoting => label_quoted(raw, self.escape),
            TokenizerMode::Plain => {
                let trimmed = raw.trim_start_matches(' ');
                if trimmed.is_empty() {
                    return None;
                }
                let (label, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
                Some((label.to_owned(), rest))
            }
        }
    }
}

/// Splits `raw` with the default quoting tokenizer.
#[must_use]
pub fn split(raw: &str) -> TokenizedLine {
    split_quoted(raw, None)
}

/// Splits `raw` on spaces only; the flag string is always empty.
#[must_use]
pub fn split_plain(raw: &str) -> TokenizedLine {
    let args = raw
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect();
    TokenizedLine::new(String::new(), args)
}

#[derive(Default)]
struct SplitState {
    flags: String,
    args: Vec<String>,
    current: String,
    quote: Option<char>,
    quoted: bool,
    in_flags: bool,
}

impl SplitState {
    fn push_literal(&mut self, ch: char) {
        if self.in_flags {
            self.push_flag(ch);
        } else {
            self.current.push(ch);
        }
    }

    fn push_flag(&mut self, ch: char) {
        if !self.flags.contains(ch) {
            self.flags.push(ch);
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() || self.quoted {
            self.args.push(std::mem::take(&mut self.current));
        }
        self.quoted = false;
    }

    fn finish(mut self) -> TokenizedLine {
        self.flush();
        TokenizedLine::new(self.flags, self.args)
    }
}

fn split_quoted(raw: &str, escape: Option<char>) -> TokenizedLine {
    let mut state = SplitState::default();
    let mut chars = raw.chars();
    if let Some(rest) = raw.strip_prefix('-') {
        state.in_flags = true;
        chars = rest.chars();
    }

    while let Some(ch) = chars.next() {
        if Some(ch) == escape {
            // A trailing lone escape stays literal.
            let literal = chars.next().unwrap_or(ch);
            match state.quote {
                Some(_) => state.current.push(literal),
                None => state.push_literal(literal),
            }
            continue;
        }

        match state.quote {
            Some(active) if ch == active => state.quote = None,
            Some(_) => state.current.push(ch),
            None => match ch {
                ' ' if state.in_flags => state.in_flags = false,
                ' ' => state.flush(),
                '"' | '\'' => {
                    state.in_flags = false;
                    state.quote = Some(ch);
                    state.quoted = true;
                }
                _ => state.push_literal(ch),
            },
        }
    }

    state.finish()
}

fn label_quoted(raw: &str, escape: Option<char>) -> Option<(String, &str)> {
    let mut state = SplitState::default();
    let mut chars = raw.char_indices();

    while let Some((index, ch)) = chars.next() {
        if Some(ch) == escape {
            let literal = chars.next().map_or(ch, |(_, next)| next);
            state.current.push(literal);
            continue;
        }

        match state.quote {
            Some(active) if ch == active => state.quote = None,
            Some(_) => state.current.push(ch),
            None => match ch {
                ' ' if state.current.is_empty() && !state.quoted => {}
                ' ' => return Some((state.current, raw.get(index..).unwrap_or_default())),
                '"' | '\'' => {
                    state.quote = Some(ch);
                    state.quoted = true;
                }
                _ => state.current.push(ch),
            },
        }
    }

    (!state.current.is_empty() || state.quoted).then_some((state.current, ""))
}
