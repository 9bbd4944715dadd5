//! Entity extraction: catalog lookup first, fuzzy matching second.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use deskpilot_core::{
    types::{ContextSnapshot, ElementKind},
    Error, Result,
};

use crate::fuzzy::best_match;

/// Kind of entity a plan step can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Channel,
    Extension,
    App,
    Control,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::User,
        EntityKind::Channel,
        EntityKind::Extension,
        EntityKind::App,
        EntityKind::Control,
    ];

    /// Name used as template variable and in placeholders.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Channel => "channel",
            Self::Extension => "extension",
            Self::App => "app",
            Self::Control => "control",
        }
    }

    /// Kind of context candidate this entity is matched against.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            Self::User => ElementKind::Actor,
            Self::Channel | Self::Extension | Self::App => ElementKind::Surface,
            Self::Control => ElementKind::Button,
        }
    }

    /// `unknown-<kind>`.
    pub fn placeholder(&self) -> String {
        format!("unknown-{}", self.as_str())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One known entity name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Phrase searched for in the command, case-insensitively.
    pub keyword: String,
    /// Name passed to the capability; defaults to the keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

impl CatalogEntry {
    pub fn new(keyword: &str, canonical: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            canonical: Some(canonical.to_string()),
        }
    }

    pub fn canonical(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.keyword)
    }
}

/// Curated entity names per kind, searched in order.
///
/// Longer phrases must precede their prefixes ("Talend API" before "Talend").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCatalog {
    entries: BTreeMap<EntityKind, Vec<CatalogEntry>>,
}

impl EntityCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for a kind.
    pub fn with_entry(mut self, kind: EntityKind, keyword: &str, canonical: &str) -> Self {
        self.entries
            .entry(kind)
            .or_default()
            .push(CatalogEntry::new(keyword, canonical));
        self
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        use EntityKind::*;

        Self::new()
            .with_entry(Channel, "aws developers", "aws developers")
            .with_entry(Channel, "aws-cloud-club", "aws-cloud-club")
            .with_entry(Channel, "aws cloud club", "aws-cloud-club")
            .with_entry(Extension, "talend api", "Talend API")
            .with_entry(Extension, "talend", "Talend API")
            .with_entry(Extension, "adblock", "AdBlock")
            .with_entry(Extension, "lastpass", "LastPass")
            .with_entry(Extension, "postman", "Postman")
            .with_entry(Extension, "react", "React Developer Tools")
            .with_entry(Extension, "vue", "Vue.js devtools")
            .with_entry(App, "messaging app", "Messenger")
            .with_entry(App, "messenger", "Messenger")
            .with_entry(App, "slack", "Slack")
            .with_entry(App, "text editor", "TextEdit")
            .with_entry(App, "notepad", "TextEdit")
            .with_entry(App, "chrome", "Google Chrome")
            .with_entry(App, "browser", "Google Chrome")
            .with_entry(App, "mail", "Mail")
            .with_entry(Control, "send", "Send")
            .with_entry(Control, "submit", "Submit")
            .with_entry(Control, "cancel", "Cancel")
            .with_entry(Control, "confirm", "Confirm")
    }

    /// Parse a catalog from YAML (`kind: [{keyword, canonical}]`).
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a catalog from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    /// Entries for a kind, in search order.
    pub fn entries(&self, kind: EntityKind) -> &[CatalogEntry] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Canonical name of the first entry whose keyword occurs in `text`.
    pub fn lookup(&self, kind: EntityKind, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.entries(kind)
            .iter()
            .find(|entry| text.contains(&entry.keyword.to_lowercase()))
            .map(CatalogEntry::canonical)
    }
}

/// How an entity value was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySource {
    Catalog,
    /// Best fuzzy candidate and its score.
    Fuzzy(f64),
    /// No candidate scored above the threshold; the first was taken.
    FirstCandidate,
    Placeholder,
}

/// A resolved entity value.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: String,
    pub source: EntitySource,
}

/// Resolves entity names from command text and context.
#[derive(Debug, Clone, Default)]
pub struct EntityExtractor {
    catalog: EntityCatalog,
}

impl EntityExtractor {
    pub fn new(catalog: EntityCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Resolve one entity kind.
    pub fn extract(&self, kind: EntityKind, command: &str, context: &ContextSnapshot) -> Extracted {
        if let Some(name) = self.catalog.lookup(kind, command) {
            return Extracted {
                value: name.to_string(),
                source: EntitySource::Catalog,
            };
        }

        let candidates: Vec<&str> = context
            .candidates_of(kind.element_kind())
            .map(|c| c.text.as_str())
            .collect();

        match best_match(command, &candidates) {
            Some(found) if found.fallback => Extracted {
                value: found.candidate.to_string(),
                source: EntitySource::FirstCandidate,
            },
            Some(found) => Extracted {
                value: found.candidate.to_string(),
                source: EntitySource::Fuzzy(found.score),
            },
            None => Extracted {
                value: kind.placeholder(),
                source: EntitySource::Placeholder,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::types::CandidateElement;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(EntityCatalog::builtin())
    }

    #[test]
    fn test_catalog_lookup_respects_order() {
        let catalog = EntityCatalog::builtin();
        assert_eq!(
            catalog.lookup(EntityKind::Extension, "turn on the Talend API extension"),
            Some("Talend API")
        );
        assert_eq!(
            catalog.lookup(EntityKind::App, "open the messaging app"),
            Some("Messenger")
        );
        assert_eq!(catalog.lookup(EntityKind::User, "message alice"), None);
    }

    #[test]
    fn test_fuzzy_fallback_to_context() {
        let context = ContextSnapshot::new("Messenger")
            .with_candidate(CandidateElement::actor("Bob"))
            .with_candidate(CandidateElement::actor("Alice"))
            .with_candidate(CandidateElement::button("Alice"));

        let found = extractor().extract(EntityKind::User, "go to Alice's conversation", &context);
        assert_eq!(found.value, "Alice");
        assert!(matches!(found.source, EntitySource::Fuzzy(_)));
    }

    #[test]
    fn test_low_scores_take_first_candidate() {
        let context = ContextSnapshot::new("Slack")
            .with_candidate(CandidateElement::actor("Zed"))
            .with_candidate(CandidateElement::actor("Quinn"));

        let found = extractor().extract(EntityKind::User, "summarize what was said today", &context);
        assert_eq!(found.value, "Zed");
        assert_eq!(found.source, EntitySource::FirstCandidate);
    }

    #[test]
    fn test_placeholder_without_candidates() {
        let found = extractor().extract(EntityKind::User, "read it", &ContextSnapshot::empty());
        assert_eq!(found.value, "unknown-user");
        assert_eq!(found.source, EntitySource::Placeholder);
    }

    #[test]
    fn test_catalog_from_yaml() {
        let catalog = EntityCatalog::from_yaml(
            r#"
user:
  - keyword: boss
    canonical: Dana Smith
channel:
  - keyword: general
"#,
        )
        .unwrap();

        assert_eq!(catalog.lookup(EntityKind::User, "ping the BOSS"), Some("Dana Smith"));
        assert_eq!(catalog.lookup(EntityKind::Channel, "join general"), Some("general"));
        assert!(catalog.entries(EntityKind::App).is_empty());
    }
}
