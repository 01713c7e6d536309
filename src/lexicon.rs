//! Response text resolution.
//!
//! Handlers and the dispatcher never hard-code user-facing text. They resolve
//! a symbolic key such as `tell.delivered` together with named parameters
//! through the [`Lexicon`] trait, and the active implementation renders the
//! final line. This keeps wording, translations and phrasing tweaks out of
//! the dispatch core.

use std::collections::HashMap;

use log::warn;
use mockall::automock;
use serde_json::Value;

/// A named parameter for phrase rendering.
pub type Param = (String, String);

/// Builds a rendering parameter from a key and anything string-like.
///
/// # Examples
///
/// ```
/// # use ratatosk::lexicon::param;
/// let p = param("who", "alice");
/// assert_eq!(p, ("who".to_string(), "alice".to_string()));
/// ```
pub fn param(key: &str, value: impl Into<String>) -> Param {
    (key.to_owned(), value.into())
}

/// Resolves symbolic response keys to user-facing text.
///
/// This trait is the boundary between the dispatch core and the response
/// wording. The core only depends on this interface, never on the template
/// syntax or storage format behind it.
#[automock]
pub trait Lexicon: Send + Sync {
    /// Renders the phrase registered under `key` with the given parameters.
    ///
    /// Implementations must always return something displayable; an unknown
    /// key falls back to the key itself rather than failing the command.
    fn resolve(&self, key: &str, params: &[Param]) -> String;
}

/// Default JSON phrase map shipped with the bot.
const DEFAULT_PHRASES: &str = include_str!("../assets/phrases.json");

/// A [`Lexicon`] backed by a flat JSON map of `key -> template`.
///
/// Templates use `{name}` placeholders that are substituted with the
/// parameters supplied at resolution time. Placeholders without a matching
/// parameter are left verbatim so mistakes stay visible in the output.
pub struct Phrasebook {
    phrases: HashMap<String, String>,
}

impl Phrasebook {
    /// Creates a phrasebook from the embedded default phrases.
    pub fn new() -> Self {
        // The embedded asset is validated by tests, so a parse failure here
        // means a broken build rather than a runtime condition.
        Self::from_json(DEFAULT_PHRASES).unwrap_or_else(|_| Phrasebook {
            phrases: HashMap::new(),
        })
    }

    /// Creates a phrasebook from a JSON object of string templates.
    ///
    /// # Arguments
    ///
    /// * `json` - A JSON document whose top level is an object mapping phrase
    ///   keys to template strings
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or the top level is
    /// not an object. Non-string values are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        let value: Value = serde_json::from_str(json)?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("phrase file must be a JSON object"))?;

        let mut phrases = HashMap::new();
        for (key, template) in object {
            match template.as_str() {
                Some(text) => {
                    phrases.insert(key.clone(), text.to_owned());
                }
                None => warn!("ignoring non-string phrase {}", key),
            }
        }

        Ok(Phrasebook { phrases })
    }

    /// Merges templates from another JSON document over the current ones.
    ///
    /// Used to apply an operator-provided override file on top of the
    /// embedded defaults.
    pub fn merge_json(&mut self, json: &str) -> Result<(), anyhow::Error> {
        let overrides = Self::from_json(json)?;
        self.phrases.extend(overrides.phrases);
        Ok(())
    }
}

impl Default for Phrasebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon for Phrasebook {
    fn resolve(&self, key: &str, params: &[Param]) -> String {
        let Some(template) = self.phrases.get(key) else {
            warn!("unknown phrase key {}", key);
            return key.to_owned();
        };

        let mut rendered = template.clone();
        for (name, value) in params {
            rendered = rendered.replace(&format!("{{{}}}", name), value);
        }

        rendered
    }
}
