//! Localized messages the dispatcher sends on its own behalf.
//!
//! Every [`MessageKey`] pairs a Fluent identifier with an English fallback
//! pattern. A [`MessageCatalogue`] resolves keys through
//! [`ortho_config::Localizer`] implementations: per-locale override bundles
//! first, then the embedded en-US catalogue, then the fallback pattern. The
//! catalogue is built explicitly and owned by the dispatcher; there is no
//! process-wide table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentResource, FluentValue};
use herald_config::Config;
use ortho_config::{
    FluentLocalizer, FluentLocalizerError, LanguageIdentifier, LocalizationArgs, Localizer,
    NoOpLocalizer,
};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;
use tracing::warn;

const MESSAGES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::messages");

/// Embedded en-US Fluent catalogue.
pub(crate) static HERALD_EN_US: &str = include_str!("../locales/en-US/messages.ftl");

/// Locale of the embedded catalogue.
const EMBEDDED_LOCALE: &str = "en-US";

/// Separates a locale from a message identifier in override keys.
const LOCALE_SEPARATOR: char = '/';

/// Named arguments passed to a message, in Fluent `{ $name }` form.
pub type MessageArgs = Vec<(&'static str, String)>;

/// Messages the dispatcher can emit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum MessageKey {
    /// No command matched the input. Takes `$command`.
    NotFound,
    /// A handler failed with an unhandled error.
    Exception,
    /// The executor lacks the command's permission node. Takes `$node`.
    PermissionDenied,
    /// The executor kind may not run the command. Takes `$command`.
    ContextMismatch,
    /// An unsupported flag was supplied. Takes `$flag` and `$supported`.
    FlagInvalid,
    /// Too few arguments. Takes `$min` and `$usage`.
    ArgCountMin,
    /// Too many arguments. Takes `$max` and `$usage`.
    ArgCountMax,
    /// Logged once when asynchronous commands run without a scheduler.
    NoSchedulerWarning,
}

impl MessageKey {
    /// Fluent message identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// English Fluent pattern used when no catalogue provides the message.
    #[must_use]
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::NotFound => "Unknown command: { $command }",
            Self::Exception => "An internal error occurred while running that command.",
            Self::PermissionDenied => "You do not have permission to do that ({ $node }).",
            Self::ContextMismatch => "You cannot run { $command } from here.",
            Self::FlagInvalid => "Unknown flag -{ $flag }. Supported flags: { $supported }",
            Self::ArgCountMin => "Not enough arguments (at least { $min }). Usage: { $usage }",
            Self::ArgCountMax => "Too many arguments (at most { $max }). Usage: { $usage }",
            Self::NoSchedulerWarning => {
                "No asynchronous scheduler is available; running asynchronous commands inline."
            }
        }
    }
}

/// Errors raised while building a catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// An override names a message the dispatcher never sends.
    #[error("unknown message identifier '{id}'")]
    UnknownMessage {
        /// Offending identifier.
        id: String,
    },

    /// An override key has an empty locale before the separator.
    #[error("message override '{key}' has an empty locale")]
    EmptyLocale {
        /// Offending override key.
        key: String,
    },

    /// An override names a locale that is not a valid language identifier.
    #[error("'{locale}' is not a valid locale")]
    InvalidLocale {
        /// Offending locale.
        locale: String,
    },

    /// An override template is not a valid Fluent pattern.
    #[error("override for '{id}' in {locale} is not valid Fluent: {detail}")]
    InvalidTemplate {
        /// Locale of the override.
        locale: String,
        /// Message identifier.
        id: String,
        /// Parser diagnostics.
        detail: String,
    },

    /// Fluent rejected the override resources for a locale.
    #[error("failed to register overrides for {locale}: {detail}")]
    Registration {
        /// Locale of the overrides.
        locale: String,
        /// Registration diagnostics.
        detail: String,
    },

    /// The localizer could not be assembled.
    #[error(transparent)]
    Localizer(#[from] FluentLocalizerError),
}

/// Override templates for one locale and the localizer built from them.
struct LocaleOverrides {
    templates: BTreeMap<MessageKey, String>,
    localizer: FluentLocalizer,
}

/// Locale-aware dispatcher messages.
///
/// # Example
///
/// ```
/// use herald::messages::{MessageCatalogue, MessageKey};
///
/// let mut catalogue = MessageCatalogue::new("en-US");
/// catalogue
///     .insert("fr-FR", MessageKey::NotFound, "Commande inconnue : { $command }")
///     .expect("valid override");
///
/// let args = vec![("command", "foo".to_owned())];
/// assert_eq!(
///     catalogue.translate(Some("fr-FR"), MessageKey::NotFound, &args),
///     "Commande inconnue : foo"
/// );
/// assert_eq!(
///     catalogue.translate(None, MessageKey::NotFound, &args),
///     "Unknown command: foo"
/// );
/// ```
pub struct MessageCatalogue {
    default_locale: String,
    overrides: HashMap<String, LocaleOverrides>,
    embedded: Box<dyn Localizer>,
}

impl fmt::Debug for MessageCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCatalogue")
            .field("default_locale", &self.default_locale)
            .field("override_locales", &self.overrides.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl MessageCatalogue {
    /// Creates a catalogue backed only by the embedded en-US messages.
    #[must_use]
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            overrides: HashMap::new(),
            embedded: build_localizer(),
        }
    }

    /// Builds a catalogue from configured overrides.
    ///
    /// Keys are either a bare identifier such as `not-found`, which applies
    /// to the configured locale, or `locale/identifier` such as
    /// `fr-FR/not-found`. Templates use Fluent syntax, for example
    /// `No such command: { $command }`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] when a key is malformed, names an unknown
    /// message, or carries an invalid template.
    pub fn from_config(config: &Config) -> Result<Self, CatalogueError> {
        let mut grouped: BTreeMap<&str, BTreeMap<MessageKey, String>> = BTreeMap::new();
        for (key, template) in config.messages() {
            let (locale, id) = match key.split_once(LOCALE_SEPARATOR) {
                Some(("", _)) => return Err(CatalogueError::EmptyLocale { key: key.clone() }),
                Some((locale, id)) => (locale, id),
                None => (config.locale(), key.as_str()),
            };
            let message = MessageKey::from_str(id)
                .map_err(|_| CatalogueError::UnknownMessage { id: id.to_owned() })?;
            grouped
                .entry(locale)
                .or_default()
                .insert(message, template.clone());
        }

        let mut catalogue = Self::new(config.locale());
        for (locale, templates) in grouped {
            catalogue.replace_locale(locale, templates)?;
        }
        Ok(catalogue)
    }

    /// Locale used when the executor reports none.
    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Overrides the Fluent pattern for `key` in `locale`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] when the locale or template is invalid.
    /// The catalogue is unchanged on error.
    pub fn insert(
        &mut self,
        locale: &str,
        key: MessageKey,
        template: impl Into<String>,
    ) -> Result<(), CatalogueError> {
        let mut templates = self
            .overrides
            .get(locale)
            .map(|existing| existing.templates.clone())
            .unwrap_or_default();
        templates.insert(key, template.into());
        self.replace_locale(locale, templates)
    }

    /// Renders `key` for `locale` with named `args`, trying `locale`, then
    /// the default locale, then the embedded catalogue.
    #[must_use]
    pub fn translate(
        &self,
        locale: Option<&str>,
        key: MessageKey,
        args: &[(&str, String)],
    ) -> String {
        let named: LocalizationArgs<'_> = args
            .iter()
            .map(|(name, value)| (*name, FluentValue::from(value.as_str())))
            .collect();
        let fluent_args = (!named.is_empty()).then_some(&named);
        locale
            .into_iter()
            .chain(std::iter::once(self.default_locale.as_str()))
            .filter_map(|candidate| self.overrides.get(candidate))
            .find_map(|overrides| overrides.localizer.lookup(key.id(), fluent_args))
            .unwrap_or_else(|| self.embedded.message(key.id(), fluent_args, key.fallback()))
    }

    /// Every key the catalogue can render.
    pub fn keys() -> impl Iterator<Item = MessageKey> {
        MessageKey::iter()
    }

    fn replace_locale(
        &mut self,
        locale: &str,
        templates: BTreeMap<MessageKey, String>,
    ) -> Result<(), CatalogueError> {
        let localizer = override_localizer(locale, &templates)?;
        self.overrides.insert(
            locale.to_owned(),
            LocaleOverrides {
                templates,
                localizer,
            },
        );
        Ok(())
    }
}

/// Builds the embedded en-US localizer, falling back to [`NoOpLocalizer`]
/// so a broken catalogue degrades to the English fallback patterns.
fn build_localizer() -> Box<dyn Localizer> {
    let built = EMBEDDED_LOCALE
        .parse::<LanguageIdentifier>()
        .map_err(|_| CatalogueError::InvalidLocale {
            locale: EMBEDDED_LOCALE.to_owned(),
        })
        .and_then(|locale| {
            let resource = parse_resource(EMBEDDED_LOCALE, "*", HERALD_EN_US.to_owned())?;
            let bundle = bundle_from_resources(&locale, [resource])?;
            localizer_from_bundle(locale, bundle)
        });
    match built {
        Ok(localizer) => Box::new(localizer),
        Err(error) => {
            warn!(
                target: MESSAGES_TARGET,
                %error,
                "embedded message catalogue unavailable; using fallback text"
            );
            Box::new(NoOpLocalizer)
        }
    }
}

fn override_localizer(
    locale: &str,
    templates: &BTreeMap<MessageKey, String>,
) -> Result<FluentLocalizer, CatalogueError> {
    let language = locale
        .parse::<LanguageIdentifier>()
        .map_err(|_| CatalogueError::InvalidLocale {
            locale: locale.to_owned(),
        })?;
    let resources = templates
        .iter()
        .map(|(key, template)| {
            parse_resource(locale, key.id(), fluent_entry(key.id(), template))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let bundle = bundle_from_resources(&language, resources)?;
    localizer_from_bundle(language, bundle)
}

/// Renders one `id = pattern` entry, indenting continuation lines.
fn fluent_entry(id: &str, template: &str) -> String {
    format!("{id} = {}\n", template.replace('\n', "\n    "))
}

fn parse_resource(
    locale: &str,
    id: &str,
    source: String,
) -> Result<FluentResource, CatalogueError> {
    FluentResource::try_new(source).map_err(|(_, errors)| CatalogueError::InvalidTemplate {
        locale: locale.to_owned(),
        id: id.to_owned(),
        detail: join_errors(&errors),
    })
}

fn bundle_from_resources(
    locale: &LanguageIdentifier,
    resources: impl IntoIterator<Item = FluentResource>,
) -> Result<FluentBundle<Arc<FluentResource>>, CatalogueError> {
    let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
    // Replies are plain text; bidi isolation marks would leak into them.
    bundle.set_use_isolating(false);
    for resource in resources {
        bundle
            .add_resource(Arc::new(resource))
            .map_err(|errors| CatalogueError::Registration {
                locale: locale.to_string(),
                detail: join_errors(&errors),
            })?;
    }
    Ok(bundle)
}

fn localizer_from_bundle(
    locale: LanguageIdentifier,
    bundle: FluentBundle<Arc<FluentResource>>,
) -> Result<FluentLocalizer, CatalogueError> {
    Ok(FluentLocalizer::builder(locale)
        .disable_defaults()
        .with_consumer_bundle(bundle)
        .try_build()?)
}

fn join_errors<E: fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
