//! `{{placeholder}}` rendering for step commands.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

pub fn render_map(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Names of every `{{placeholder}}` in the template, sorted and deduplicated.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    let Ok(pattern) = Regex::new(r"\{\{([A-Za-z0-9_.-]+)\}\}") else {
        return BTreeSet::new();
    };

    pattern
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}
