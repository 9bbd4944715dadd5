use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Situational Context
// =============================================================================

/// Kind of on-screen element a candidate represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// A pressable control.
    Button,
    /// A person or conversation partner.
    Actor,
    /// An application, channel, page or other navigable surface.
    Surface,
}

impl ElementKind {
    /// Lower-case name used in logs and placeholders.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Actor => "actor",
            Self::Surface => "surface",
        }
    }
}

/// How a candidate element can be interacted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    Clickable,
    Selectable,
    Navigable,
}

impl From<ElementKind> for Affordance {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Button => Affordance::Clickable,
            ElementKind::Actor => Affordance::Selectable,
            ElementKind::Surface => Affordance::Navigable,
        }
    }
}

/// An element visible in the current situation, used as a fuzzy-match candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateElement {
    /// Element kind.
    pub kind: ElementKind,
    /// Visible text.
    pub text: String,
    /// Interaction affordance.
    pub affordance: Affordance,
}

impl CandidateElement {
    /// Create a candidate with the affordance implied by its kind.
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            affordance: kind.into(),
        }
    }

    /// A clickable button.
    pub fn button(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Button, text)
    }

    /// A selectable person.
    pub fn actor(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Actor, text)
    }

    /// A navigable surface (app, channel, page).
    pub fn surface(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Surface, text)
    }
}

/// Snapshot of the user's current situation.
///
/// Produced fresh for each classification call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    /// Name of the frontmost application or surface.
    #[serde(default)]
    pub active_surface: String,
    /// Text extracted from the screen.
    #[serde(default)]
    pub extracted_text: String,
    /// Elements that entity extraction may match against.
    #[serde(default)]
    pub candidate_elements: Vec<CandidateElement>,
    /// Operations the active surface is known to support.
    #[serde(default)]
    pub available_operations: Vec<String>,
    /// Capture time.
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl ContextSnapshot {
    /// Create a snapshot for the given active surface.
    pub fn new(active_surface: impl Into<String>) -> Self {
        Self {
            active_surface: active_surface.into(),
            extracted_text: String::new(),
            candidate_elements: Vec::new(),
            available_operations: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    /// An empty snapshot, used when no context could be acquired.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Set the extracted screen text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = text.into();
        self
    }

    /// Add a candidate element.
    pub fn with_candidate(mut self, candidate: CandidateElement) -> Self {
        self.candidate_elements.push(candidate);
        self
    }

    /// Replace the candidate elements.
    pub fn with_candidates(mut self, candidates: Vec<CandidateElement>) -> Self {
        self.candidate_elements = candidates;
        self
    }

    /// Set the available operations.
    pub fn with_operations(mut self, operations: Vec<String>) -> Self {
        self.available_operations = operations;
        self
    }

    /// Candidates of a given kind, in capture order.
    pub fn candidates_of(&self, kind: ElementKind) -> impl Iterator<Item = &CandidateElement> {
        self.candidate_elements.iter().filter(move |c| c.kind == kind)
    }

    /// Whether any candidate of the given kind is present.
    pub fn has_candidate(&self, kind: ElementKind) -> bool {
        self.candidates_of(kind).next().is_some()
    }
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affordance_follows_kind() {
        assert_eq!(CandidateElement::button("Send").affordance, Affordance::Clickable);
        assert_eq!(CandidateElement::actor("Alice").affordance, Affordance::Selectable);
        assert_eq!(CandidateElement::surface("general").affordance, Affordance::Navigable);
    }

    #[test]
    fn test_candidates_of_filters_by_kind() {
        let snapshot = ContextSnapshot::new("Slack")
            .with_candidate(CandidateElement::actor("Alice"))
            .with_candidate(CandidateElement::button("Send"))
            .with_candidate(CandidateElement::actor("Bob"));

        let actors: Vec<_> = snapshot
            .candidates_of(ElementKind::Actor)
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(actors, vec!["Alice", "Bob"]);
        assert!(snapshot.has_candidate(ElementKind::Button));
        assert!(!snapshot.has_candidate(ElementKind::Surface));
    }

    #[test]
    fn test_deserialize_minimal_snapshot() {
        let snapshot: ContextSnapshot = serde_json::from_str(
            r#"{"activeSurface": "KakaoTalk", "candidateElements": [
                {"kind": "actor", "text": "Alice", "affordance": "selectable"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.active_surface, "KakaoTalk");
        assert_eq!(snapshot.candidate_elements.len(), 1);
        assert!(snapshot.extracted_text.is_empty());
    }
}
