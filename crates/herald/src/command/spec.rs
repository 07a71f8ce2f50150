//! Builder-style command descriptions.

use std::fmt;
use std::sync::Arc;

use super::context::CommandContext;
use super::tree::TreeId;
use super::{CommandError, Handler};
use crate::convert::ParamType;

/// Description of one command.
///
/// Players and the console may both run a command unless restricted.
/// Argument counts are unchecked unless bounded with [`Self::min_args`] or
/// [`Self::max_args`]. Declaring parameter types switches the handler to
/// typed arguments.
///
/// # Example
///
/// ```
/// use herald::command::CommandSpec;
/// use herald::convert::ParamType;
///
/// let add = CommandSpec::new("add")
///     .alias("plus")
///     .description("Adds two integers")
///     .usage("add <a> <b>")
///     .params([ParamType::Integer, ParamType::Integer])
///     .min_args(2)
///     .max_args(2)
///     .handler(|ctx| {
///         ctx.reply(&format!("{:?}", ctx.arguments()));
///         Ok(())
///     });
/// assert!(add.is_typed());
/// assert_eq!(add.names().collect::<Vec<_>>(), ["add", "plus"]);
/// ```
#[derive(Clone)]
pub struct CommandSpec {
    name: String,
    aliases: Vec<String>,
    permission: Option<String>,
    description: String,
    usage: String,
    allow_players: bool,
    allow_console: bool,
    operator_only: bool,
    asynchronous: bool,
    flags: String,
    min_args: Option<usize>,
    max_args: Option<usize>,
    params: Option<Vec<ParamType>>,
    handler: Option<Handler>,
    child: Option<TreeId>,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("flags", &self.flags)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("asynchronous", &self.asynchronous)
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

impl CommandSpec {
    /// Starts a spec for the command called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let owned: String = name.into();
        Self {
            usage: owned.clone(),
            name: owned,
            aliases: Vec::new(),
            permission: None,
            description: String::new(),
            allow_players: true,
            allow_console: true,
            operator_only: false,
            asynchronous: false,
            flags: String::new(),
            min_args: None,
            max_args: None,
            params: None,
            handler: None,
            child: None,
        }
    }

    /// Adds an alternative name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Requires the permission node `node`.
    #[must_use]
    pub fn permission(mut self, node: impl Into<String>) -> Self {
        self.permission = Some(node.into());
        self
    }

    /// Sets the one-line description shown in help output.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the usage text shown when the argument count is wrong.
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Allows or forbids player-like executors.
    #[must_use]
    pub const fn allow_players(mut self, allow: bool) -> Self {
        self.allow_players = allow;
        self
    }

    /// Allows or forbids console-like executors.
    #[must_use]
    pub const fn allow_console(mut self, allow: bool) -> Self {
        self.allow_console = allow;
        self
    }

    /// Restricts the command to operators.
    #[must_use]
    pub const fn operator_only(mut self, operator_only: bool) -> Self {
        self.operator_only = operator_only;
        self
    }

    /// Runs the handler through the host scheduler.
    #[must_use]
    pub const fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Sets the accepted flag characters.
    #[must_use]
    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Requires at least `min` arguments.
    #[must_use]
    pub const fn min_args(mut self, min: usize) -> Self {
        self.min_args = Some(min);
        self
    }

    /// Accepts at most `max` arguments.
    #[must_use]
    pub const fn max_args(mut self, max: usize) -> Self {
        self.max_args = Some(max);
        self
    }

    /// Declares positional parameter types, enabling typed arguments.
    #[must_use]
    pub fn params(mut self, params: impl IntoIterator<Item = ParamType>) -> Self {
        self.params = Some(params.into_iter().collect());
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CommandContext) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Delegates further words to the sub-command level `tree`.
    #[must_use]
    pub const fn children(mut self, tree: TreeId) -> Self {
        self.child = Some(tree);
        self
    }

    /// Primary name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Required permission node.
    #[must_use]
    pub fn permission_node(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    /// Help description.
    #[must_use]
    pub fn description_text(&self) -> &str {
        &self.description
    }

    /// Usage text.
    #[must_use]
    pub fn usage_text(&self) -> &str {
        &self.usage
    }

    /// Whether player-like executors may run the command.
    #[must_use]
    pub const fn players_allowed(&self) -> bool {
        self.allow_players
    }

    /// Whether console-like executors may run the command.
    #[must_use]
    pub const fn console_allowed(&self) -> bool {
        self.allow_console
    }

    /// Whether only operators may run the command.
    #[must_use]
    pub const fn is_operator_only(&self) -> bool {
        self.operator_only
    }

    /// Whether the handler runs through the host scheduler.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.asynchronous
    }

    /// Accepted flag characters.
    #[must_use]
    pub fn supported_flags(&self) -> &str {
        &self.flags
    }

    /// Minimum argument count, when bounded.
    #[must_use]
    pub const fn min(&self) -> Option<usize> {
        self.min_args
    }

    /// Maximum argument count, when bounded.
    #[must_use]
    pub const fn max(&self) -> Option<usize> {
        self.max_args
    }

    /// Declared parameter types, when arguments are typed.
    #[must_use]
    pub fn param_types(&self) -> Option<&[ParamType]> {
        self.params.as_deref()
    }

    /// Whether arguments are converted before the handler runs.
    #[must_use]
    pub const fn is_typed(&self) -> bool {
        self.params.is_some()
    }

    pub(crate) const fn handler_ref(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    /// Sub-command level, when the command has one.
    #[must_use]
    pub const fn child(&self) -> Option<TreeId> {
        self.child
    }
}
