/*
 * tree/path.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Slash-separated yaml paths.
 */

use std::fmt;

/// A `/`-separated property chain with `[index]` list markers.
///
/// `server/port`, `list[2]/name`, `[0]` (item of a root-level list).
/// Indices reflect sibling order at the time the path was built; use
/// [`YamlPath::unified`] to compare paths across documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct YamlPath(String);

/// One step of a parsed path: an optional property name followed by list indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathStep {
    pub key: Option<String>,
    pub indices: Vec<usize>,
}

impl YamlPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a property name.
    pub fn child(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}/{}", self.0, key))
        }
    }

    /// Append a list position to the last segment.
    pub fn item(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// The same path with every `[index]` replaced by `[*]`.
    pub fn unified(&self) -> Self {
        let mut result = String::with_capacity(self.0.len());
        let mut chars = self.0.chars().peekable();
        while let Some(ch) = chars.next() {
            result.push(ch);
            if ch == '[' && chars.peek().is_some_and(char::is_ascii_digit) {
                while chars.peek().is_some_and(char::is_ascii_digit) {
                    chars.next();
                }
                result.push('*');
            }
        }
        Self(result)
    }

    /// Split into steps. Returns `None` for malformed index suffixes.
    pub(crate) fn steps(&self) -> Option<Vec<PathStep>> {
        self.0
            .split('/')
            .filter(|s| !s.is_empty())
            .map(parse_step)
            .collect()
    }
}

fn parse_step(segment: &str) -> Option<PathStep> {
    let (key, mut rest) = match segment.find('[') {
        // keys may legitimately contain '[' only when not followed by an index suffix
        Some(pos) if segment.ends_with(']') => (&segment[..pos], &segment[pos..]),
        _ => (segment, ""),
    };
    let mut indices = Vec::new();
    while !rest.is_empty() {
        let close = rest.find(']')?;
        let index = rest.get(1..close)?.parse::<usize>().ok()?;
        indices.push(index);
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return None;
        }
    }
    Some(PathStep {
        key: (!key.is_empty()).then(|| key.to_string()),
        indices,
    })
}

impl fmt::Display for YamlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for YamlPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_item() {
        let path = YamlPath::root().child("list").item(2).child("name");
        assert_eq!(path.as_str(), "list[2]/name");
        assert_eq!(YamlPath::root().item(0).as_str(), "[0]");
    }

    #[test]
    fn test_unified() {
        let path = YamlPath::new("a[0]/b[12][3]/c");
        assert_eq!(path.unified().as_str(), "a[*]/b[*][*]/c");
        assert_eq!(YamlPath::new("plain/key").unified().as_str(), "plain/key");
    }

    #[test]
    fn test_steps() {
        let steps = YamlPath::new("list[1]/name").steps().unwrap();
        assert_eq!(
            steps,
            vec![
                PathStep {
                    key: Some("list".to_string()),
                    indices: vec![1]
                },
                PathStep {
                    key: Some("name".to_string()),
                    indices: vec![]
                },
            ]
        );
        let steps = YamlPath::new("[0]").steps().unwrap();
        assert_eq!(steps[0].key, None);
        assert_eq!(steps[0].indices, vec![0]);
    }

    #[test]
    fn test_malformed_index() {
        assert!(YamlPath::new("list[x]").steps().is_none());
    }
}
