//! Text templating for plan parameters and step descriptions.
//!
//! Templates are compiled once, up front, and rendered against a flat map of
//! string variables (`command`, entity values, configured URLs).

use std::collections::BTreeMap;
use tera::{Context, Tera};

use crate::error::{Error, Result};

/// Variables available to a template render.
pub type TemplateVars = BTreeMap<String, String>;

/// A set of named, pre-compiled templates.
#[derive(Debug, Default)]
pub struct TemplateSet {
    tera: Tera,
}

impl TemplateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add a template under `name`.
    pub fn add(&mut self, name: &str, source: &str) -> Result<()> {
        self.tera
            .add_raw_template(name, source)
            .map_err(|e| Error::Template(format!("{}: {}", name, e)))
    }

    /// Render a registered template.
    pub fn render(&self, name: &str, vars: &TemplateVars) -> Result<String> {
        self.tera
            .render(name, &context(vars))
            .map_err(|e| Error::Template(format!("{}: {}", name, e)))
    }
}

fn context(vars: &TemplateVars) -> Context {
    let mut context = Context::new();
    for (key, value) in vars {
        context.insert(key.as_str(), value);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_registered_template() {
        let mut set = TemplateSet::new();
        set.add("join", "Join channel {{ channel }}").unwrap();

        let rendered = set.render("join", &vars(&[("channel", "aws developers")])).unwrap();
        assert_eq!(rendered, "Join channel aws developers");
    }

    #[test]
    fn test_missing_variable_is_template_error() {
        let mut set = TemplateSet::new();
        set.add("open", "Open {{ url }}").unwrap();

        let err = set.render("open", &TemplateVars::new()).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_syntax_error_rejected_on_add() {
        let mut set = TemplateSet::new();
        assert!(set.add("broken", "{{ unclosed").is_err());
        assert!(set.render("broken", &TemplateVars::new()).is_err());
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut set = TemplateSet::new();
        set.add("echo", "{{ command }}").unwrap();

        let rendered = set.render("echo", &vars(&[("command", "a & <b>")])).unwrap();
        assert_eq!(rendered, "a & <b>");
    }
}
