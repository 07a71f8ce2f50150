//! Pluggable string-to-value conversion for typed command parameters.
//!
//! The [`ConverterRegistry`] maps a converter key (see [`ParamType::key`]) to
//! a [`TypeConverter`]. Built-in converters cover integers, floats,
//! booleans, characters, passthrough text, enum variants and executor
//! lookups; hosts register further converters for their own types.
//!
//! Conversion failures are soft. [`ConverterRegistry::convert`] logs a
//! warning and yields `None`, so a single malformed argument never aborts
//! dispatch; handlers receive the gap and decide what to do with it.

mod value;


use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::executor::{Backend, CONSOLE_NAME, Executor};

pub use self::value::{EnumType, ParamType, Value};

/// Tracing target for argument conversion.
pub(crate) const CONVERT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::convert");

/// Reasons a raw token could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The token is not a valid literal of the requested type.
    #[error("'{raw}' is not a valid {expected}")]
    Malformed {
        /// Offending token.
        raw: String,
        /// Requested type.
        expected: String,
    },

    /// The token does not name a variant of the requested enum.
    #[error("'{raw}' is not a variant of {ty} (expected one of: {expected})")]
    UnknownVariant {
        /// Offending token.
        raw: String,
        /// Enum type name.
        ty: &'static str,
        /// Comma-separated accepted names.
        expected: String,
    },

    /// No executor with the given name is known to the backend.
    #[error("no executor named '{name}' is available")]
    UnknownExecutor {
        /// Requested executor name.
        name: String,
    },

    /// No converter is registered for the requested type.
    #[error("no converter registered for type '{ty}'")]
    Unsupported {
        /// Requested type.
        ty: String,
    },
}

impl ConversionError {
    /// Creates a malformed-literal error.
    pub fn malformed(raw: impl Into<String>, expected: &ParamType) -> Self {
        Self::Malformed {
            raw: raw.into(),
            expected: expected.to_string(),
        }
    }
}

/// Converts one raw token into a [`Value`] of a given type.
pub trait TypeConverter: Send + Sync {
    /// Converts `raw` for a parameter of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] when `raw` cannot represent `ty`.
    fn convert(
        &self,
        raw: &str,
        ty: &ParamType,
        executor: &Executor,
        backend: &dyn Backend,
    ) -> Result<Value, ConversionError>;
}

type ConvertFn =
    dyn Fn(&str, &ParamType, &Executor, &dyn Backend) -> Result<Value, ConversionError>
        + Send
        + Sync;

/// Adapts a closure into a [`TypeConverter`].
struct FnConverter {
    convert: Box<ConvertFn>,
}

impl TypeConverter for FnConverter {
    fn convert(
        &self,
        raw: &str,
        ty: &ParamType,
        executor: &Executor,
        backend: &dyn Backend,
    ) -> Result<Value, ConversionError> {
        (self.convert)(raw, ty, executor, backend)
    }
}

/// Converter for types that need neither the executor nor the backend.
struct LiteralConverter(fn(&str, &ParamType) -> Result<Value, ConversionError>);

impl TypeConverter for LiteralConverter {
    fn convert(
        &self,
        raw: &str,
        ty: &ParamType,
        _executor: &Executor,
        _backend: &dyn Backend,
    ) -> Result<Value, ConversionError> {
        (self.0)(raw, ty)
    }
}

/// Resolves `console` (any case) or an empty token to the console identity
/// and any other token through [`Backend::find_executor`].
struct ExecutorConverter;

impl TypeConverter for ExecutorConverter {
    fn convert(
        &self,
        raw: &str,
        _ty: &ParamType,
        _executor: &Executor,
        backend: &dyn Backend,
    ) -> Result<Value, ConversionError> {
        if raw.is_empty() || raw.eq_ignore_ascii_case(CONSOLE_NAME) {
            return Ok(Value::Executor(Executor::console()));
        }
        backend
            .find_executor(raw)
            .map(Value::Executor)
            .ok_or_else(|| ConversionError::UnknownExecutor {
                name: raw.to_owned(),
            })
    }
}

fn convert_integer(raw: &str, ty: &ParamType) -> Result<Value, ConversionError> {
    raw.parse::<i64>()
        .map(Value::Integer)
        .map_err(|_| ConversionError::malformed(raw, ty))
}

fn convert_float(raw: &str, ty: &ParamType) -> Result<Value, ConversionError> {
    raw.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ConversionError::malformed(raw, ty))
}

fn convert_boolean(raw: &str, ty: &ParamType) -> Result<Value, ConversionError> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(Value::Boolean(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(Value::Boolean(false))
    } else {
        Err(ConversionError::malformed(raw, ty))
    }
}

fn convert_character(raw: &str, ty: &ParamType) -> Result<Value, ConversionError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(Value::Character(ch)),
        _ => Err(ConversionError::malformed(raw, ty)),
    }
}

fn convert_text(raw: &str, _ty: &ParamType) -> Result<Value, ConversionError> {
    Ok(Value::Text(raw.to_owned()))
}

fn convert_enum(raw: &str, ty: &ParamType) -> Result<Value, ConversionError> {
    let ParamType::Enum(enum_type) = ty else {
        return Err(ConversionError::Unsupported { ty: ty.to_string() });
    };
    enum_type
        .variant(raw)
        .map(|variant| Value::Enum {
            ty: *enum_type,
            variant,
        })
        .ok_or_else(|| ConversionError::UnknownVariant {
            raw: raw.to_owned(),
            ty: enum_type.name(),
            expected: enum_type.variants().join(", "),
        })
}

/// Registry of converters keyed by [`ParamType::key`].
///
/// # Example
///
/// ```
/// use herald::convert::{ConverterRegistry, ParamType};
///
/// let registry = ConverterRegistry::new();
/// assert!(registry.is_supported(&ParamType::Integer));
/// assert!(!registry.is_supported(&ParamType::custom("colour")));
/// ```
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn TypeConverter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("converters", &keys)
            .finish()
    }
}

impl ConverterRegistry {
    /// Creates a registry holding the built-in converters.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("integer", LiteralConverter(convert_integer));
        registry.register("float", LiteralConverter(convert_float));
        registry.register("boolean", LiteralConverter(convert_boolean));
        registry.register("character", LiteralConverter(convert_character));
        registry.register("text", LiteralConverter(convert_text));
        registry.register("enum", LiteralConverter(convert_enum));
        registry.register("executor", ExecutorConverter);
        registry
    }

    /// Creates a registry without any converters.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registers `converter` under `key`, replacing any previous converter.
    pub fn register(&mut self, key: impl Into<String>, converter: impl TypeConverter + 'static) {
        self.converters.insert(key.into(), Arc::new(converter));
    }

    /// Registers a closure as the converter for `key`.
    pub fn register_fn<F>(&mut self, key: impl Into<String>, convert: F)
    where
        F: Fn(&str, &ParamType, &Executor, &dyn Backend) -> Result<Value, ConversionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(
            key,
            FnConverter {
                convert: Box::new(convert),
            },
        );
    }

    /// Returns `true` when a converter exists for `ty`.
    #[must_use]
    pub fn is_supported(&self, ty: &ParamType) -> bool {
        self.converters.contains_key(ty.key())
    }

    /// Converts `raw`, reporting failures to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Unsupported`] when no converter handles
    /// `ty`, or the converter's own error.
    pub fn try_convert(
        &self,
        raw: &str,
        ty: &ParamType,
        executor: &Executor,
        backend: &dyn Backend,
    ) -> Result<Value, ConversionError> {
        let converter =
            self.converters
                .get(ty.key())
                .ok_or_else(|| ConversionError::Unsupported { ty: ty.to_string() })?;
        converter.convert(raw, ty, executor, backend)
    }

    /// Converts `raw`, logging failures and yielding `None` in their place.
    #[must_use]
    pub fn convert(
        &self,
        raw: &str,
        ty: &ParamType,
        executor: &Executor,
        backend: &dyn Backend,
    ) -> Option<Value> {
        match self.try_convert(raw, ty, executor, backend) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    target: CONVERT_TARGET,
                    raw,
                    ty = %ty,
                    executor = executor.name(),
                    %error,
                    "argument conversion failed"
                );
                None
            }
        }
    }

    /// Converts `tokens` positionally against `params`.
    ///
    /// Tokens beyond the declared parameters pass through as text.
    #[must_use]
    pub fn convert_all(
        &self,
        tokens: &[String],
        params: &[ParamType],
        executor: &Executor,
        backend: &dyn Backend,
    ) -> Vec<Option<Value>> {
        tokens
            .iter()
            .enumerate()
            .map(|(index, raw)| match params.get(index) {
                Some(ty) => self.convert(raw, ty, executor, backend),
                None => Some(Value::Text(raw.clone())),
            })
            .collect()
    }
}
