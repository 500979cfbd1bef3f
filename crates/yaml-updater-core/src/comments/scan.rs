/*
 * comments/scan.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line classification for the comment-preserving parser.
 */

//! Line-level scanning: the parse state machine and the lexical helpers it
//! relies on.
//!
//! The parser keeps one of three states between lines ([`ScanState`]) and asks
//! [`classify`] what to do with each new line. All transitions live in
//! [`classify`] and [`ScanState::after`], which keeps the lookahead rules
//! (block scalars, flow continuation, re-absorbed blank lines) testable
//! without building trees.

use crate::tree::NodeId;

/// Parser state carried from one line to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanState {
    /// No open multiline value.
    Scanning,
    /// Inside a `|` / `>` block scalar: lines indented deeper than `indent`
    /// belong to `owner`.
    BlockScalar { owner: NodeId, indent: usize },
    /// After an inline value of `owner`. With an open `balance` (unclosed
    /// bracket or quote) every line belongs to the value; without it, a line
    /// at `indent` or deeper that is nothing else continues the value.
    FlowScalar {
        owner: NodeId,
        indent: usize,
        balance: Option<FlowBalance>,
    },
}

/// What to do with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineAction {
    /// Buffer as a pending comment (comment or blank line).
    Comment,
    /// Append to the owner's value, draining buffered blank lines first.
    Continue,
    /// Document marker (`---`, `...`) or directive (`%YAML`).
    Marker,
    ListItem,
    Property,
    Invalid,
}

/// Decide how a line is handled in `state`.
///
/// `padding` is the count of leading whitespace; `body` the rest of the line.
pub(crate) fn classify(state: &ScanState, padding: usize, body: &str) -> LineAction {
    let blank = body.trim().is_empty();
    match state {
        ScanState::BlockScalar { indent, .. } => {
            if blank {
                return LineAction::Comment;
            }
            if padding > *indent {
                return LineAction::Continue;
            }
        }
        ScanState::FlowScalar {
            balance: Some(_), ..
        } => return LineAction::Continue,
        _ => {}
    }

    if blank || body.starts_with('#') {
        return LineAction::Comment;
    }
    if padding == 0 && is_document_marker(body) {
        return LineAction::Marker;
    }
    if is_list_dash(body) {
        return LineAction::ListItem;
    }
    if parse_property(body).is_some() {
        return LineAction::Property;
    }
    if let ScanState::FlowScalar {
        indent,
        balance: None,
        ..
    } = state
    {
        if padding >= *indent {
            return LineAction::Continue;
        }
    }
    LineAction::Invalid
}

impl ScanState {
    /// State after a line was handled with `action`.
    ///
    /// Value-opening actions (properties, list items) are handled by the
    /// parser itself, which knows the new owner.
    pub(crate) fn after(self, action: LineAction, line: &str) -> ScanState {
        match (self, action) {
            // blank lines never end a multiline value
            (state, LineAction::Comment) if line.trim().is_empty() => state,
            (
                ScanState::FlowScalar {
                    owner,
                    indent,
                    balance: Some(mut balance),
                },
                LineAction::Continue,
            ) => {
                balance.feed(line);
                if balance.is_open() {
                    ScanState::FlowScalar {
                        owner,
                        indent,
                        balance: Some(balance),
                    }
                } else {
                    ScanState::Scanning
                }
            }
            (state, LineAction::Continue) => state,
            _ => ScanState::Scanning,
        }
    }

    /// State entered after a value line of `owner` at `indent`.
    pub(crate) fn for_value(owner: NodeId, indent: usize, raw: &str) -> ScanState {
        let text = value_text(raw);
        if is_block_marker(text) {
            ScanState::BlockScalar { owner, indent }
        } else if let Some(balance) = FlowBalance::open_for(raw) {
            ScanState::FlowScalar {
                owner,
                indent,
                balance: Some(balance),
            }
        } else if !text.is_empty() {
            ScanState::FlowScalar {
                owner,
                indent,
                balance: None,
            }
        } else {
            ScanState::Scanning
        }
    }

    pub(crate) fn owner(&self) -> Option<NodeId> {
        match self {
            ScanState::Scanning => None,
            ScanState::BlockScalar { owner, .. } | ScanState::FlowScalar { owner, .. } => {
                Some(*owner)
            }
        }
    }
}

/// Tracks open brackets and quotes of a flow value spanning lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FlowBalance {
    depth: usize,
    quote: Option<char>,
}

impl FlowBalance {
    /// Start tracking if `raw` opens a flow collection or quoted scalar that
    /// does not close on the same line.
    pub(crate) fn open_for(raw: &str) -> Option<FlowBalance> {
        let text = raw.trim_start();
        if !text.starts_with(['[', '{', '"', '\'']) {
            return None;
        }
        let mut balance = FlowBalance::default();
        balance.feed(raw);
        balance.is_open().then_some(balance)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.depth > 0 || self.quote.is_some()
    }

    pub(crate) fn feed(&mut self, line: &str) {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match self.quote {
                Some('"') => match c {
                    '\\' => i += 1,
                    '"' => self.quote = None,
                    _ => {}
                },
                Some(_) => {
                    if c == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            i += 1;
                        } else {
                            self.quote = None;
                        }
                    }
                }
                None => {
                    let prev = if i == 0 { None } else { Some(chars[i - 1]) };
                    match c {
                        '[' | '{' => self.depth += 1,
                        ']' | '}' => self.depth = self.depth.saturating_sub(1),
                        '"' | '\'' if opens_quote(prev) => self.quote = Some(c),
                        '#' if prev.is_none_or(char::is_whitespace) => return,
                        _ => {}
                    }
                }
            }
            i += 1;
        }
    }
}

fn opens_quote(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(p) => p.is_whitespace() || matches!(p, '[' | '{' | ',' | ':'),
    }
}

/// Count of leading spaces and tabs.
pub(crate) fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Cut a trailing `# comment` (outside quotes) from a raw value.
pub(crate) fn strip_comment(raw: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut skip_next = false;
    for (i, c) in raw.char_indices() {
        if skip_next {
            skip_next = false;
            prev = Some(c);
            continue;
        }
        match quote {
            Some('"') => {
                if c == '\\' {
                    skip_next = true;
                } else if c == '"' {
                    quote = None;
                }
            }
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '#' if prev.is_none_or(char::is_whitespace) => return &raw[..i],
                '"' | '\'' if opens_quote(prev) => quote = Some(c),
                _ => {}
            },
        }
        prev = Some(c);
    }
    raw
}

/// The meaningful part of a raw value: comment removed, whitespace trimmed.
pub(crate) fn value_text(raw: &str) -> &str {
    strip_comment(raw).trim()
}

/// `|`, `>-`, `|2+` ... optionally preceded by an anchor or tag.
pub(crate) fn is_block_marker(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((last, before)) = tokens.split_last() else {
        return false;
    };
    if !before.iter().all(|t| t.starts_with(['&', '!'])) {
        return false;
    }
    let mut chars = last.chars();
    matches!(chars.next(), Some('|' | '>'))
        && last.len() <= 3
        && chars.all(|c| c == '+' || c == '-' || c.is_ascii_digit())
}

/// A dash followed by whitespace or end of line.
pub(crate) fn is_list_dash(body: &str) -> bool {
    let mut chars = body.chars();
    chars.next() == Some('-') && chars.next().is_none_or(|c| c == ' ' || c == '\t')
}

pub(crate) fn is_document_marker(body: &str) -> bool {
    if body.starts_with('%') {
        return true;
    }
    (body.starts_with("---") || body.starts_with("..."))
        && body[3..].chars().next().is_none_or(char::is_whitespace)
}

/// A `key: value` line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PropertyLine<'a> {
    /// Key as written, up to (not including) the colon.
    pub source_key: &'a str,
    /// Unquoted key.
    pub key: String,
    /// Everything after the colon.
    pub value: &'a str,
}

/// Try to read `key: value` from a line body (no leading whitespace).
pub(crate) fn parse_property(body: &str) -> Option<PropertyLine<'_>> {
    let first = body.chars().next()?;
    let (key, colon) = match first {
        '"' => {
            let close = find_double_close(body)?;
            let colon = colon_after(body, close + 1)?;
            (unescape_double(&body[1..close]), colon)
        }
        '\'' => {
            let close = find_single_close(body)?;
            let colon = colon_after(body, close + 1)?;
            (body[1..close].replace("''", "'"), colon)
        }
        '[' | '{' | '#' | '|' | '>' | '%' | '@' | '`' | ',' | '&' | '*' | '!' | '?' => {
            return None;
        }
        _ => {
            let colon = plain_key_end(body)?;
            let key = body[..colon].trim_end();
            if key.is_empty() {
                return None;
            }
            (key.to_string(), colon)
        }
    };
    Some(PropertyLine {
        source_key: &body[..colon],
        key,
        value: &body[colon + 1..],
    })
}

fn is_value_separator(rest: &str) -> bool {
    rest.chars().next().is_none_or(|c| c == ' ' || c == '\t')
}

fn plain_key_end(body: &str) -> Option<usize> {
    let mut prev: Option<char> = None;
    for (i, c) in body.char_indices() {
        match c {
            ':' if is_value_separator(&body[i + 1..]) => return Some(i),
            '#' if prev.is_some_and(char::is_whitespace) => return None,
            _ => {}
        }
        prev = Some(c);
    }
    None
}

/// Index of the colon following a quoted key (whitespace allowed before it).
fn colon_after(body: &str, start: usize) -> Option<usize> {
    let rest = &body[start..];
    let spaces = leading_whitespace(rest);
    let colon = start + spaces;
    (body[colon..].starts_with(':') && is_value_separator(&body[colon + 1..])).then_some(colon)
}

fn find_double_close(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in body.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Some(i);
        }
    }
    None
}

fn find_single_close(body: &str) -> Option<usize> {
    let mut chars = body.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if chars.peek().is_some_and(|(_, n)| *n == '\'') {
                chars.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

fn unescape_double(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(ch) => result.push(ch),
                    None => {
                        result.push_str("\\u");
                        result.push_str(&code);
                    }
                }
            }
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> NodeId {
        // any id works for state tests
        crate::tree::YamlTree::new_comments().root()
    }

    #[test]
    fn test_plain_property() {
        let prop = parse_property("port: 8080 # prod").unwrap();
        assert_eq!(prop.source_key, "port");
        assert_eq!(prop.key, "port");
        assert_eq!(prop.value, " 8080 # prod");
    }

    #[test]
    fn test_property_with_empty_value() {
        let prop = parse_property("server:").unwrap();
        assert_eq!(prop.key, "server");
        assert_eq!(prop.value, "");
    }

    #[test]
    fn test_quoted_keys() {
        let prop = parse_property("'it''s': 1").unwrap();
        assert_eq!(prop.source_key, "'it''s'");
        assert_eq!(prop.key, "it's");

        let prop = parse_property("\"a\\\"b\" : x").unwrap();
        assert_eq!(prop.source_key, "\"a\\\"b\" ");
        assert_eq!(prop.key, "a\"b");
        assert_eq!(prop.value, " x");
    }

    #[test]
    fn test_not_properties() {
        assert!(parse_property("http://example.com").is_none());
        assert!(parse_property("[a, b]").is_none());
        assert!(parse_property("{a: 1}").is_none());
        assert!(parse_property("\"quoted: text\"").is_none());
        assert!(parse_property("plain text # note: here").is_none());
        assert!(parse_property("key:value").is_none());
    }

    #[test]
    fn test_url_value() {
        let prop = parse_property("url: http://example.com:8080/x").unwrap();
        assert_eq!(prop.key, "url");
        assert_eq!(prop.value, " http://example.com:8080/x");
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(value_text(" 8080 # prod"), "8080");
        assert_eq!(value_text(" 'a # b' # c"), "'a # b'");
        assert_eq!(value_text(" a#b"), "a#b");
        assert_eq!(value_text("  # only comment"), "");
        assert_eq!(value_text(" \"x\\\" # y\""), "\"x\\\" # y\"");
    }

    #[test]
    fn test_block_markers() {
        for marker in ["|", ">", "|-", ">+", "|2", "|2-", "!!str |", "&anchor >-"] {
            assert!(is_block_marker(marker), "{}", marker);
        }
        for text in ["", "value", "|x", "a |", "|2--"] {
            assert!(!is_block_marker(text), "{}", text);
        }
    }

    #[test]
    fn test_list_dash_and_markers() {
        assert!(is_list_dash("- a"));
        assert!(is_list_dash("-"));
        assert!(!is_list_dash("-1"));
        assert!(!is_list_dash("---"));
        assert!(is_document_marker("---"));
        assert!(is_document_marker("--- # doc"));
        assert!(is_document_marker("%YAML 1.2"));
        assert!(!is_document_marker("----"));
    }

    #[test]
    fn test_flow_balance() {
        assert!(FlowBalance::open_for(" [a, b]").is_none());
        assert!(FlowBalance::open_for(" plain").is_none());

        let mut balance = FlowBalance::open_for(" [a,").unwrap();
        balance.feed("   {b: 1},");
        assert!(balance.is_open());
        balance.feed("   c]  # done");
        assert!(!balance.is_open());

        let mut balance = FlowBalance::open_for(" \"multi").unwrap();
        balance.feed("  line \\\" still\"");
        assert!(!balance.is_open());

        let balance = FlowBalance::open_for(" 'it''s").unwrap();
        assert!(balance.is_open());
    }

    #[test]
    fn test_classify_block_scalar() {
        let state = ScanState::BlockScalar {
            owner: owner(),
            indent: 2,
        };
        assert_eq!(classify(&state, 4, "text: like property"), LineAction::Continue);
        assert_eq!(classify(&state, 4, "# not a comment"), LineAction::Continue);
        assert_eq!(classify(&state, 0, ""), LineAction::Comment);
        assert_eq!(classify(&state, 2, "next: 1"), LineAction::Property);
        assert_eq!(classify(&state, 2, "- item"), LineAction::ListItem);
    }

    #[test]
    fn test_classify_flow_continuation() {
        let state = ScanState::FlowScalar {
            owner: owner(),
            indent: 2,
            balance: None,
        };
        assert_eq!(classify(&state, 4, "more words"), LineAction::Continue);
        assert_eq!(classify(&state, 4, "key: value"), LineAction::Property);
        assert_eq!(classify(&state, 0, "more words"), LineAction::Invalid);
        assert_eq!(classify(&ScanState::Scanning, 4, "more words"), LineAction::Invalid);
    }

    #[test]
    fn test_classify_open_balance_absorbs_everything() {
        let state = ScanState::FlowScalar {
            owner: owner(),
            indent: 0,
            balance: FlowBalance::open_for(" {a: 1,"),
        };
        assert_eq!(classify(&state, 2, "b: 2}"), LineAction::Continue);
        assert_eq!(classify(&state, 0, ""), LineAction::Continue);
    }

    #[test]
    fn test_state_transitions() {
        let id = owner();
        let block = ScanState::BlockScalar { owner: id, indent: 0 };
        assert_eq!(block.clone().after(LineAction::Comment, ""), block);
        assert_eq!(block.clone().after(LineAction::Continue, "  x"), block);
        assert_eq!(
            block.after(LineAction::Comment, "# c"),
            ScanState::Scanning
        );

        let flow = ScanState::for_value(id, 0, " [a,");
        assert!(matches!(flow, ScanState::FlowScalar { balance: Some(_), .. }));
        assert_eq!(flow.after(LineAction::Continue, "  b]"), ScanState::Scanning);

        assert_eq!(
            ScanState::for_value(id, 2, " |"),
            ScanState::BlockScalar { owner: id, indent: 2 }
        );
        assert_eq!(ScanState::for_value(id, 2, " # c"), ScanState::Scanning);
        assert_eq!(
            ScanState::for_value(id, 2, " text"),
            ScanState::FlowScalar {
                owner: id,
                indent: 2,
                balance: None
            }
        );
    }
}
