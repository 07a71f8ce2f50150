//! Parameter types and converted argument values.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::executor::Executor;

/// Closed set of names accepted by an enum parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: &'static str,
    variants: &'static [&'static str],
}

impl EnumType {
    /// Declares an enum type with its accepted variant names.
    #[must_use]
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    /// Type name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Accepted variant names.
    #[must_use]
    pub const fn variants(&self) -> &'static [&'static str] {
        self.variants
    }

    /// Looks up a variant by its exact name.
    #[must_use]
    pub fn variant(&self, raw: &str) -> Option<&'static str> {
        self.variants.iter().copied().find(|variant| *variant == raw)
    }
}

/// Declared type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// `true` or `false`.
    Boolean,
    /// Exactly one character.
    Character,
    /// Passthrough string.
    Text,
    /// Enum variant matched by exact name.
    Enum(EnumType),
    /// Executor resolved through the backend.
    Executor,
    /// Host-defined type handled by a registered converter.
    Custom(Cow<'static, str>),
}

impl ParamType {
    /// Declares a host-defined type.
    #[must_use]
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Custom(name.into())
    }

    /// Registry key of the converter responsible for this type.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Character => "character",
            Self::Text => "text",
            Self::Enum(_) => "enum",
            Self::Executor => "executor",
            Self::Custom(name) => name.as_ref(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(ty) => write!(f, "enum {}", ty.name()),
            other => f.write_str(other.key()),
        }
    }
}

/// Converted argument handed to typed handlers.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// Single character.
    Character(char),
    /// Unconverted text.
    Text(String),
    /// Enum variant name.
    Enum {
        /// Enum type the variant belongs to.
        ty: EnumType,
        /// Matched variant name.
        variant: &'static str,
    },
    /// Resolved executor identity.
    Executor(Executor),
    /// Value produced by a host converter.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Returns the integer payload.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float payload.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the character payload.
    #[must_use]
    pub const fn as_character(&self) -> Option<char> {
        match self {
            Self::Character(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the enum variant name.
    #[must_use]
    pub const fn as_variant(&self) -> Option<&'static str> {
        match self {
            Self::Enum { variant, .. } => Some(*variant),
            _ => None,
        }
    }

    /// Returns the executor payload.
    #[must_use]
    pub const fn as_executor(&self) -> Option<&Executor> {
        match self {
            Self::Executor(executor) => Some(executor),
            _ => None,
        }
    }

    /// Downcasts a host-defined payload.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Character(a), Self::Character(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (
                Self::Enum {
                    ty: a_ty,
                    variant: a_variant,
                },
                Self::Enum {
                    ty: b_ty,
                    variant: b_variant,
                },
            ) => a_ty == b_ty && a_variant == b_variant,
            (Self::Executor(a), Self::Executor(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
