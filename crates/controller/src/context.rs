//! Situational context from the screen.
//!
//! [`ScreenTextParser`] turns recognised screen text into candidate
//! elements, and [`ScreenContextProvider`] assembles a [`ContextSnapshot`]
//! from the `screen` capability.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use deskpilot_core::{
    traits::{CapabilityRegistry, ContextProvider},
    types::{CandidateElement, ContextSnapshot, ElementKind, ParamBag},
    Error, Result,
};

// =============================================================================
// Screen Text Parsing
// =============================================================================

/// Extracts candidate elements from screen text.
pub struct ScreenTextParser {
    button: Regex,
    speaker: Regex,
    mention: Regex,
    channel: Regex,
    identifier: Regex,
}

impl ScreenTextParser {
    /// Create a new parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            button: compile(
                r"(?i)\b(send|submit|cancel|ok|confirm|save|delete|join|search|next|back|close|sign in|log in)\b",
            )?,
            speaker: compile(r"(?m)^\s*([A-Z][\w.]*(?: [A-Z][\w.]*)?)\s*:")?,
            mention: compile(r"@([A-Za-z][\w-]*)")?,
            channel: compile(r"#(\w[\w-]*)")?,
            identifier: compile(r"\b([A-Za-z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)+|[A-Za-z][A-Za-z0-9_]{15,})\b")?,
        })
    }

    /// Candidate elements found in `text`, buttons first, then actors,
    /// then surfaces, each in order of appearance.
    pub fn derive_candidates(&self, text: &str) -> Vec<CandidateElement> {
        let mut candidates = Vec::new();

        for m in self.button.find_iter(text) {
            push_unique(&mut candidates, CandidateElement::button(title_case(m.as_str())));
        }
        for regex in [&self.speaker, &self.mention] {
            for caps in regex.captures_iter(text) {
                push_unique(&mut candidates, CandidateElement::actor(&caps[1]));
            }
        }
        for regex in [&self.channel, &self.identifier] {
            for caps in regex.captures_iter(text) {
                push_unique(&mut candidates, CandidateElement::surface(&caps[1]));
            }
        }

        candidates
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::internal(format!("Invalid pattern {}: {}", pattern, e)))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn push_unique(candidates: &mut Vec<CandidateElement>, candidate: CandidateElement) {
    let duplicate = candidates
        .iter()
        .any(|c| c.kind == candidate.kind && c.text.eq_ignore_ascii_case(&candidate.text));
    if !duplicate {
        candidates.push(candidate);
    }
}

// =============================================================================
// Operation Inference
// =============================================================================

const CHAT_SURFACES: &[&str] = &["messenger", "slack", "discord", "teams", "kakao", "chat"];
const BROWSER_SURFACES: &[&str] = &["chrome", "browser", "safari", "firefox", "edge"];
const MAIL_SURFACES: &[&str] = &["mail", "inbox"];

/// `module.operation` names usable on the active surface, sorted.
pub fn infer_operations(active_surface: &str, candidates: &[CandidateElement]) -> Vec<String> {
    let surface = active_surface.to_lowercase();
    let on = |names: &[&str]| names.iter().any(|n| surface.contains(n));

    let mut operations: BTreeSet<&str> = ["automation.launch_app", "ai_inference.analyze"].into();

    if on(CHAT_SURFACES) {
        operations.extend([
            "messaging.read_last_message",
            "messaging.search_channels",
            "messaging.join_channel",
            "messaging.filter_messages_by_user",
            "automation.type_text",
            "ai_inference.summarize",
        ]);
    }
    if on(BROWSER_SURFACES) {
        operations.extend([
            "browser.open_url",
            "browser.list_extensions",
            "browser.activate_extension",
        ]);
    }
    if on(MAIL_SURFACES) {
        operations.insert("browser.open_url");
    }

    let has = |kind: ElementKind| candidates.iter().any(|c: &CandidateElement| c.kind == kind);
    if has(ElementKind::Button) {
        operations.insert("automation.find_and_click");
    }
    if has(ElementKind::Actor) {
        operations.insert("automation.navigate_to_user");
    }

    operations.into_iter().map(String::from).collect()
}

// =============================================================================
// Screen Context Provider
// =============================================================================

/// Context provider backed by the `screen` capability module.
pub struct ScreenContextProvider {
    registry: Arc<dyn CapabilityRegistry>,
    parser: ScreenTextParser,
}

impl ScreenContextProvider {
    /// Create a new provider reading through `registry`.
    pub fn new(registry: Arc<dyn CapabilityRegistry>) -> Result<Self> {
        Ok(Self {
            registry,
            parser: ScreenTextParser::new()?,
        })
    }
}

#[async_trait]
impl ContextProvider for ScreenContextProvider {
    async fn snapshot(&self) -> Result<ContextSnapshot> {
        let output = self
            .registry
            .invoke("screen", "capture", ParamBag::new())
            .await
            .map_err(|e| Error::ContextUnavailable(e.to_string()))?;

        if !output.success {
            return Err(Error::ContextUnavailable(output.message));
        }

        let text_field = |key: &str| {
            output
                .payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let active_surface = text_field("activeSurface");
        let text = text_field("text");

        let mut candidates = Vec::new();
        if let Some(Value::Array(buttons)) = output.payload.get("buttons") {
            for label in buttons.iter().filter_map(Value::as_str) {
                push_unique(&mut candidates, CandidateElement::button(label));
            }
        }
        for candidate in self.parser.derive_candidates(&text) {
            push_unique(&mut candidates, candidate);
        }

        let operations = infer_operations(&active_surface, &candidates);
        tracing::debug!(
            surface = %active_surface,
            candidates = candidates.len(),
            operations = operations.len(),
            "Context captured"
        );

        Ok(ContextSnapshot::new(active_surface)
            .with_text(text)
            .with_candidates(candidates)
            .with_operations(operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::traits::CapabilityModule;
    use deskpilot_skills::{DefaultCapabilityRegistry, ScreenFrame, ScreenModule};

    fn texts(candidates: &[CandidateElement], kind: ElementKind) -> Vec<&str> {
        candidates
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.text.as_str())
            .collect()
    }

    #[test]
    fn test_derive_candidates() {
        let parser = ScreenTextParser::new().unwrap();
        let candidates = parser.derive_candidates(
            "Alice: are you joining #aws-cloud-club?\nBob Smith: ping @carol\n[send] [Cancel]",
        );

        assert_eq!(texts(&candidates, ElementKind::Button), vec!["Send", "Cancel"]);
        assert_eq!(texts(&candidates, ElementKind::Actor), vec!["Alice", "Bob Smith", "carol"]);
        assert_eq!(texts(&candidates, ElementKind::Surface), vec!["aws-cloud-club"]);
    }

    #[test]
    fn test_derive_candidates_from_plain_text() {
        let parser = ScreenTextParser::new().unwrap();
        assert!(parser.derive_candidates("nothing to see here").is_empty());
    }

    #[test]
    fn test_infer_operations() {
        let operations = infer_operations("Slack", &[CandidateElement::button("Send")]);
        assert!(operations.contains(&"messaging.join_channel".to_string()));
        assert!(operations.contains(&"automation.find_and_click".to_string()));
        assert!(!operations.contains(&"browser.open_url".to_string()));

        let mut sorted = operations.clone();
        sorted.sort();
        assert_eq!(operations, sorted);

        let operations = infer_operations("Google Chrome", &[]);
        assert!(operations.contains(&"browser.activate_extension".to_string()));
    }

    #[tokio::test]
    async fn test_provider_builds_snapshot_from_screen() {
        let registry = Arc::new(DefaultCapabilityRegistry::new());
        let screen = ScreenModule::with_frame(ScreenFrame {
            active_surface: "Slack".into(),
            text: "Alice: ship it".into(),
            buttons: vec!["Send".into()],
        });
        registry
            .register("screen", Arc::new(screen) as Arc<dyn CapabilityModule>)
            .await
            .unwrap();

        let provider = ScreenContextProvider::new(registry).unwrap();
        let snapshot = provider.snapshot().await.unwrap();

        assert_eq!(snapshot.active_surface, "Slack");
        assert_eq!(snapshot.extracted_text, "Alice: ship it");
        assert_eq!(texts(&snapshot.candidate_elements, ElementKind::Button), vec!["Send"]);
        assert_eq!(texts(&snapshot.candidate_elements, ElementKind::Actor), vec!["Alice"]);
        assert!(snapshot
            .available_operations
            .contains(&"automation.navigate_to_user".to_string()));
    }

    #[tokio::test]
    async fn test_provider_without_screen_module() {
        let provider = ScreenContextProvider::new(Arc::new(DefaultCapabilityRegistry::new())).unwrap();
        let err = provider.snapshot().await.unwrap_err();
        assert!(matches!(err, Error::ContextUnavailable(_)));
    }
}
