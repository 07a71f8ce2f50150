//! Arena of command levels and the iterative resolver that walks it.
//!
//! Each level maps lower-cased names and aliases to specs stored in a shared
//! arena. A spec may point at a child level by [`TreeId`]. Resolution takes
//! one token at a time off the tokenized line and follows child links until
//! it reaches a spec without children; the tokens after the path are the
//! command's arguments.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::spec::CommandSpec;
use super::RegistrationError;

/// Handle to one command level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(usize);

impl TreeId {
    /// The top-level tree every dispatcher starts with.
    pub const ROOT: Self = Self(0);

    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecId(usize);

/// No command matched the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A word does not name any command at its level.
    #[error("no command named '{word}'")]
    NotFound {
        /// Words consumed before the failing one.
        path: String,
        /// Unmatched word.
        word: String,
    },

    /// Input ended at a level without a default command.
    #[error("'{path}' needs a sub-command")]
    Incomplete {
        /// Words consumed.
        path: String,
    },
}

impl ResolutionError {
    /// The text reported back to the executor.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::NotFound { word, .. } => word,
            Self::Incomplete { path } => path,
        }
    }
}

/// Outcome of resolving a token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// Matched spec.
    pub spec: SpecId,
    /// Name or alias the executor typed, or the spec name for defaults.
    pub label: &'a str,
    /// Tokens taken by the command path; the rest are arguments.
    pub consumed: usize,
}

#[derive(Debug, Default)]
struct Level {
    names: HashMap<String, SpecId>,
    order: Vec<SpecId>,
    default: Option<SpecId>,
}

/// Hierarchical command registry.
#[derive(Debug)]
pub struct CommandTree {
    levels: Vec<Level>,
    specs: Vec<CommandSpec>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

impl CommandTree {
    /// Creates a tree holding only the empty root level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: vec![Level::default()],
            specs: Vec::new(),
        }
    }

    /// Adds an empty level for sub-commands.
    pub fn create_child(&mut self) -> TreeId {
        self.levels.push(Level::default());
        TreeId(self.levels.len() - 1)
    }

    fn level(&self, tree: TreeId) -> Result<&Level, RegistrationError> {
        self.levels
            .get(tree.0)
            .ok_or(RegistrationError::UnknownTree { tree: tree.0 })
    }

    /// Registers `spec` at level `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the tree or child tree is unknown,
    /// a name is blank or taken, the bounds are inverted, or the spec has
    /// nothing to run.
    pub fn register(
        &mut self,
        tree: TreeId,
        spec: CommandSpec,
    ) -> Result<SpecId, RegistrationError> {
        validate_spec(&spec)?;
        if let Some(child) = spec.child() {
            self.level(child)?;
        }
        let level = self.level(tree)?;
        let mut folded = Vec::new();
        for name in spec.names() {
            let key = fold(name);
            if level.names.contains_key(&key) || folded.contains(&key) {
                return Err(RegistrationError::Duplicate {
                    name: name.to_owned(),
                });
            }
            folded.push(key);
        }

        let id = SpecId(self.specs.len());
        self.specs.push(spec);
        let level_mut = self
            .levels
            .get_mut(tree.0)
            .ok_or(RegistrationError::UnknownTree { tree: tree.0 })?;
        for key in folded {
            level_mut.names.insert(key, id);
        }
        level_mut.order.push(id);
        Ok(id)
    }

    /// Runs the command called `name` when input ends at level `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownDefault`] when `name` is not
    /// registered at that level.
    pub fn set_default(&mut self, tree: TreeId, name: &str) -> Result<(), RegistrationError> {
        let level = self
            .levels
            .get_mut(tree.0)
            .ok_or(RegistrationError::UnknownTree { tree: tree.0 })?;
        let id = level
            .names
            .get(&fold(name))
            .copied()
            .ok_or_else(|| RegistrationError::UnknownDefault {
                name: name.to_owned(),
            })?;
        level.default = Some(id);
        Ok(())
    }

    /// Looks up a registered spec.
    #[must_use]
    pub fn spec(&self, id: SpecId) -> Option<&CommandSpec> {
        self.specs.get(id.0)
    }

    /// Specs registered at `tree`, in registration order.
    pub fn commands(&self, tree: TreeId) -> impl Iterator<Item = &CommandSpec> {
        self.levels
            .get(tree.0)
            .into_iter()
            .flat_map(|level| level.order.iter())
            .filter_map(|id| self.spec(*id))
    }

    /// Resolves the command path at the start of `tokens`: the root label
    /// followed by the tokenized argument line.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when a token matches nothing or the input
    /// ends at a level that has neither a default command nor a runnable
    /// parent.
    pub fn resolve<'a, S: AsRef<str>>(
        &'a self,
        tokens: &'a [S],
    ) -> Result<Resolved<'a>, ResolutionError> {
        let mut tree = TreeId::ROOT;
        let mut remaining = tokens.iter().map(S::as_ref);
        let mut path: Vec<&str> = Vec::new();
        let mut parent: Option<(SpecId, &'a str)> = None;

        loop {
            let Some(level) = self.levels.get(tree.0) else {
                return Err(ResolutionError::Incomplete {
                    path: path.join(" "),
                });
            };

            let Some(word) = remaining.next() else {
                return self.resolve_exhausted(level, parent, &path);
            };

            let Some(id) = level.names.get(&fold(word)).copied() else {
                return Err(ResolutionError::NotFound {
                    path: path.join(" "),
                    word: word.to_owned(),
                });
            };
            path.push(word);

            match self.spec(id).and_then(CommandSpec::child) {
                Some(child) => {
                    tree = child;
                    parent = Some((id, word));
                }
                None => {
                    return Ok(Resolved {
                        spec: id,
                        label: word,
                        consumed: path.len(),
                    });
                }
            }
        }
    }

    fn resolve_exhausted<'a>(
        &'a self,
        level: &Level,
        parent: Option<(SpecId, &'a str)>,
        path: &[&str],
    ) -> Result<Resolved<'a>, ResolutionError> {
        if let Some(id) = level.default {
            let label = self.spec(id).map_or("", CommandSpec::name);
            return Ok(Resolved {
                spec: id,
                label,
                consumed: path.len(),
            });
        }
        parent
            .filter(|(id, _)| self.spec(*id).is_some_and(|spec| spec.handler_ref().is_some()))
            .map(|(spec, label)| Resolved {
                spec,
                label,
                consumed: path.len(),
            })
            .ok_or_else(|| ResolutionError::Incomplete {
                path: path.join(" "),
            })
    }
}

fn validate_spec(spec: &CommandSpec) -> Result<(), RegistrationError> {
    if let Some(name) = spec.names().find(|name| name.is_empty() || name.contains(' ')) {
        return Err(RegistrationError::InvalidName {
            name: name.to_owned(),
        });
    }
    if let (Some(min), Some(max)) = (spec.min(), spec.max())
        && min > max
    {
        return Err(RegistrationError::InvalidBounds {
            command: spec.name().to_owned(),
            min,
            max,
        });
    }
    if spec.handler_ref().is_none() && spec.child().is_none() {
        return Err(RegistrationError::MissingHandler {
            command: spec.name().to_owned(),
        });
    }
    Ok(())
}
