/*
 * variables.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * `#{name}` placeholder substitution for update documents.
 */

use std::collections::BTreeMap;

/// Result of [`substitute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Names that were replaced at least once, in order of first use.
    pub applied: Vec<String>,
}

/// Replace every `#{name}` in `text` whose name is in `variables`.
///
/// Unknown placeholders are left as written. Substituted values are not
/// scanned again.
pub fn substitute(text: &str, variables: &BTreeMap<String, String>) -> Substitution {
    let mut result = String::with_capacity(text.len());
    let mut applied: Vec<String> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("#{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after
            .find(['}', '\n'])
            .filter(|end| after[*end..].starts_with('}'))
            .and_then(|end| {
                let name = &after[..end];
                variables.get(name).map(|value| (name, value, end))
            });
        match value {
            Some((name, value, end)) => {
                result.push_str(value);
                if !applied.iter().any(|n| n == name) {
                    applied.push(name.to_string());
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str("#{");
                rest = after;
            }
        }
    }
    result.push_str(rest);

    Substitution {
        text: result,
        applied,
    }
}
