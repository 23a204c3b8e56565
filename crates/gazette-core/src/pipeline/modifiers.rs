//! Typed prompt modifiers.
//!
//! Modifier options arrive as user-supplied keys, are validated against the
//! configured lookup tables, and render as extra sentences appended to the
//! base system prompt in one fixed order, independent of how the options
//! were supplied.

use std::collections::BTreeMap;

use crate::{config::Config, domain::SummaryRequest, errors::Error, Result};

/// Modifier categories in their fixed application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModifierKind {
    Style,
    Mood,
    Narrator,
    HistoricalPerspective,
    CulturalContext,
}

impl ModifierKind {
    pub fn label(self) -> &'static str {
        match self {
            ModifierKind::Style => "style",
            ModifierKind::Mood => "mood",
            ModifierKind::Narrator => "narrator",
            ModifierKind::HistoricalPerspective => "historical perspective",
            ModifierKind::CulturalContext => "cultural context",
        }
    }
}

/// A validated modifier: the key the user asked for and the directive
/// sentence it resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModifierDirective {
    pub kind: ModifierKind,
    pub key: String,
    pub directive: String,
}

/// Resolve a request's modifier options against the config tables.
///
/// Unknown keys fail with a user-visible message naming the option and the
/// valid choices; no LLM call happens after that.
pub fn resolve_modifiers(cfg: &Config, req: &SummaryRequest) -> Result<Vec<ModifierDirective>> {
    let mut out = Vec::new();

    let slots: [(ModifierKind, &Option<String>, &BTreeMap<String, String>); 5] = [
        (ModifierKind::Style, &req.style, &cfg.styles),
        (ModifierKind::Mood, &req.mood, &cfg.moods),
        (ModifierKind::Narrator, &req.narrator, &cfg.narrators),
        (
            ModifierKind::HistoricalPerspective,
            &req.historical_perspective,
            &cfg.historical_perspectives,
        ),
        (
            ModifierKind::CulturalContext,
            &req.cultural_context,
            &cfg.cultural_contexts,
        ),
    ];

    for (kind, choice, tbl) in slots {
        if let Some(key) = choice {
            out.push(lookup(kind, key, tbl)?);
        }
    }

    out.sort_by_key(|d| d.kind);
    Ok(out)
}

fn lookup(
    kind: ModifierKind,
    key: &str,
    table: &BTreeMap<String, String>,
) -> Result<ModifierDirective> {
    let normalized = key.trim().to_lowercase();
    let Some(directive) = table.get(&normalized) else {
        let choices = table.keys().cloned().collect::<Vec<_>>().join(", ");
        return Err(Error::InvalidRequest(format!(
            "Unknown {} '{}'. Available: {}",
            kind.label(),
            key,
            choices
        )));
    };
    Ok(ModifierDirective {
        kind,
        key: normalized,
        directive: directive.clone(),
    })
}

/// Append directives to the base system prompt, one sentence each, in kind
/// order.
pub fn apply_modifiers(base_prompt: &str, directives: &[ModifierDirective]) -> String {
    let mut prompt = base_prompt.trim_end().to_string();
    for d in directives {
        prompt.push(' ');
        prompt.push_str(d.directive.trim_end_matches('.'));
        prompt.push('.');
    }
    prompt
}
