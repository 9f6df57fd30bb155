//! Field-name validation.
//!
//! Every raw name that becomes part of an expression tree (a member path,
//! a projection alias) passes through a [`FieldNameValidator`] before a
//! formatter can see it. Names are checked against a configurable character
//! class; the qualified form also allows dot-separated segments and a
//! trailing `*` wildcard.
//!
//! ```
//! use query_expr::FieldNameValidator;
//!
//! let validator = FieldNameValidator::default();
//! assert!(validator.is_valid("field1"));
//! assert!(validator.is_valid("people.*"));
//! assert!(!validator.is_valid("space2/**/comment"));
//! assert_eq!(validator.escape("people.name", "\"$1\"").unwrap(), "\"people\".\"name\"");
//! ```

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use regex::Regex;
use serde::Deserialize;

use crate::error::{CompileError, CompileResult};

/// Built-in character classes accepted in a name segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    /// ASCII letters, digits, underscore
    #[default]
    Default,
    /// Default plus Latin-1 supplement and Latin extended A/B letters
    LatinExtended,
    /// Default plus Greek
    Greek,
    /// Default plus Cyrillic
    Cyrillic,
    /// Default plus Hebrew
    Hebrew,
}

impl Charset {
    /// Regex character-class body (without brackets).
    pub fn class(self) -> &'static str {
        match self {
            Charset::Default => r"a-zA-Z0-9_",
            Charset::LatinExtended => r"a-zA-Z0-9_\x{00C0}-\x{00D6}\x{00D8}-\x{00F6}\x{00F8}-\x{024F}",
            Charset::Greek => r"a-zA-Z0-9_\x{0370}-\x{03FF}",
            Charset::Cyrillic => r"a-zA-Z0-9_\x{0400}-\x{04FF}",
            Charset::Hebrew => r"a-zA-Z0-9_\x{0590}-\x{05FF}",
        }
    }
}

/// Validator configuration, deserializable from any serde source.
///
/// ```
/// use query_expr::validator::{Charset, ValidatorConfig};
///
/// let config: ValidatorConfig = serde_json::from_str(r#"{ "charset": "greek" }"#).unwrap();
/// assert_eq!(config.charset, Charset::Greek);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub charset: Charset,
    /// Custom character-class body; overrides `charset` when set.
    pub pattern: Option<String>,
}

/// Mutable decision record handed to `validating` hooks.
///
/// Hooks run in registration order before the built-in pattern check.
/// Setting `valid` overrides that check; the last hook to write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatingEvent {
    pub name: String,
    pub qualified: bool,
    pub valid: Option<bool>,
}

pub type ValidatingHook = Arc<dyn Fn(&mut ValidatingEvent) + Send + Sync>;

/// Checks raw names against a character-class pattern.
///
/// Holds only immutable configuration once built, so a single instance can
/// be shared across threads.
#[derive(Clone)]
pub struct FieldNameValidator {
    class: String,
    simple: Regex,
    qualified: Regex,
    hooks: Vec<ValidatingHook>,
}

impl FieldNameValidator {
    /// Builds a validator from a built-in charset.
    pub fn new(charset: Charset) -> Self {
        Self::with_class(charset.class()).expect("built-in charsets are valid regex classes")
    }

    /// Builds a validator from a custom character-class body such as
    /// `a-z0-9_`.
    pub fn with_class(class: &str) -> CompileResult<Self> {
        let build = |pattern: String| {
            Regex::new(&pattern).map_err(|e| {
                CompileError::Configuration(format!("invalid name pattern `{}`: {}", class, e))
            })
        };
        Ok(FieldNameValidator {
            class: class.to_string(),
            simple: build(format!(r"^[{c}]+$", c = class))?,
            qualified: build(format!(r"^(?:\*|[{c}]+(?:\.[{c}]+)*(?:\.\*)?)$", c = class))?,
            hooks: Vec::new(),
        })
    }

    pub fn from_config(config: &ValidatorConfig) -> CompileResult<Self> {
        match &config.pattern {
            Some(class) => Self::with_class(class),
            None => Ok(Self::new(config.charset)),
        }
    }

    /// Registers a hook that fires before the pattern check.
    pub fn on_validating(
        mut self,
        hook: impl Fn(&mut ValidatingEvent) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Process-wide default validator (default charset, no hooks) for
    /// callers that do not inject their own.
    pub fn installed() -> Arc<FieldNameValidator> {
        static INSTALLED: OnceLock<Arc<FieldNameValidator>> = OnceLock::new();
        INSTALLED
            .get_or_init(|| Arc::new(FieldNameValidator::default()))
            .clone()
    }

    /// Character-class body this validator was built from.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Validates `name`.
    ///
    /// With `qualified`, dotted paths and a trailing `*` are accepted. A
    /// rejected name is an [`CompileError::InvalidFieldName`] when
    /// `throw_error` is set, otherwise `Ok(false)`.
    pub fn test(&self, name: &str, qualified: bool, throw_error: bool) -> CompileResult<bool> {
        let mut event = ValidatingEvent {
            name: name.to_string(),
            qualified,
            valid: None,
        };
        for hook in &self.hooks {
            hook(&mut event);
        }

        let valid = match event.valid {
            Some(decision) => decision,
            None if qualified => self.qualified.is_match(name),
            None => self.simple.is_match(name),
        };

        if valid {
            return Ok(true);
        }
        tracing::warn!(name, qualified, "rejected object name");
        if throw_error {
            Err(CompileError::InvalidFieldName(name.to_string()))
        } else {
            Ok(false)
        }
    }

    /// Non-throwing qualified check.
    pub fn is_valid(&self, name: &str) -> bool {
        self.test(name, true, false).unwrap_or(false)
    }

    /// Re-validates `name` and substitutes each segment into `format`
    /// (`$1` is the placeholder). Wildcard segments are kept as they are.
    pub fn escape(&self, name: &str, format: &str) -> CompileResult<String> {
        self.test(name, true, true)?;
        Ok(name
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    segment.to_string()
                } else {
                    format.replace("$1", segment)
                }
            })
            .collect::<Vec<_>>()
            .join("."))
    }
}

impl Default for FieldNameValidator {
    fn default() -> Self {
        Self::new(Charset::Default)
    }
}

impl fmt::Debug for FieldNameValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldNameValidator")
            .field("class", &self.class)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
