//! A line-level outline of a block-style YAML document.
//!
//! The outline records, for every mapping entry and sequence item, which
//! physical lines it spans. Edits are made on the lines and the outline is
//! rebuilt afterwards, so nodes never refer back to their parents.

use super::path::Segment;

/// Half-open range of physical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowItem {
    pub raw: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub span: Span,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub span: Span,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// No value, `~`, `null` or `{}`.
    Empty,
    Scalar(String),
    /// Block scalars, multi-line flow collections and anything else that is
    /// kept verbatim.
    Opaque,
    /// A single-line `[a, b]` sequence. `open` and `close` are the byte
    /// offsets of the brackets on `line`.
    Flow {
        line: usize,
        open: usize,
        close: usize,
        items: Vec<FlowItem>,
    },
    Mapping(Vec<Entry>),
    Sequence(Vec<Item>),
}

impl Node {
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Flow { items, .. } => items.is_empty(),
            Node::Mapping(entries) => entries.is_empty(),
            Node::Sequence(items) => items.is_empty(),
            Node::Scalar(_) | Node::Opaque => false,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|entry| entry.key == key),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|entry| &entry.value)
    }

    /// Follows path segments from this node. A `base[selector]` segment picks
    /// the item of the `base` sequence whose `name` is `selector`, or the
    /// unnamed item at that position.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Node> {
        let mut current = self;

        for segment in segments {
            current = match Segment::parse(segment.as_ref())? {
                Segment::Key(key) => current.get(key)?,
                Segment::Select { base, selector } => {
                    let Node::Sequence(items) = current.get(base)? else {
                        return None;
                    };
                    select_item(items, selector)?
                }
            };
        }

        Some(current)
    }
}

fn select_item<'a>(items: &'a [Item], selector: &str) -> Option<&'a Node> {
    let named = items.iter().find(|item| {
        matches!(item.value.get("name"), Some(Node::Scalar(name)) if name == selector)
    });

    if let Some(item) = named {
        return Some(&item.value);
    }

    let position: usize = selector.parse().ok()?;
    let item = items.get(position)?;
    match &item.value {
        Node::Mapping(_) if !matches!(item.value.get("name"), Some(Node::Scalar(_))) => {
            Some(&item.value)
        }
        _ => None,
    }
}

/// A content line, or the part of a `- key: value` line after the dash.
#[derive(Debug, Clone, Copy)]
struct View<'a> {
    line: usize,
    /// Byte column where `body` starts.
    indent: usize,
    body: &'a str,
}

pub fn parse<S: AsRef<str>>(lines: &[S]) -> Node {
    let views: Vec<View<'_>> = lines
        .iter()
        .enumerate()
        .filter_map(|(line, text)| {
            let text = text.as_ref();
            let body = text.trim_start_matches(' ');
            if is_ignorable(body) {
                return None;
            }
            Some(View {
                line,
                indent: text.len() - body.len(),
                body,
            })
        })
        .collect();

    parse_node(&views)
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Number of leading spaces.
pub fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_ignorable(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed == "---"
        || trimmed == "..."
        || trimmed.starts_with("--- ")
        || trimmed.starts_with('%')
}

fn is_dash(body: &str) -> bool {
    body == "-" || body.starts_with("- ") || body.starts_with("-\t")
}

fn parse_node(views: &[View<'_>]) -> Node {
    let Some(first) = views.first() else {
        return Node::Empty;
    };

    if is_dash(first.body) {
        parse_sequence(views, first.indent)
    } else if split_key(first.body).is_some() {
        parse_mapping(views, first.indent)
    } else {
        Node::Opaque
    }
}

fn parse_mapping(views: &[View<'_>], indent: usize) -> Node {
    let mut entries = Vec::new();
    let mut i = 0;

    while i < views.len() {
        let view = views[i];
        let key = if view.indent == indent {
            split_key(view.body)
        } else {
            None
        };
        let Some((key, after_colon)) = key else {
            i += 1;
            continue;
        };

        let rest = &view.body[after_colon..];
        let opens_block = strip_properties(strip_comment(rest).trim()).is_empty();

        let mut j = i + 1;
        while j < views.len() {
            let next = views[j];
            let belongs = next.indent > indent
                || (opens_block && next.indent == indent && is_dash(next.body));
            if !belongs {
                break;
            }
            j += 1;
        }

        let children = &views[i + 1..j];
        let value = parse_inline(view.line, view.indent + after_colon, rest, children);
        let last = children.last().map_or(view.line, |child| child.line);

        entries.push(Entry {
            key,
            span: Span {
                start: view.line,
                end: last + 1,
            },
            value,
        });
        i = j;
    }

    Node::Mapping(entries)
}

fn parse_sequence(views: &[View<'_>], indent: usize) -> Node {
    let mut items = Vec::new();
    let mut i = 0;

    while i < views.len() {
        let view = views[i];
        if view.indent != indent || !is_dash(view.body) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < views.len() && views[j].indent > indent {
            j += 1;
        }

        let children = &views[i + 1..j];
        let after_dash = &view.body[1..];
        let rest = after_dash.trim_start();
        let column = view.indent + 1 + (after_dash.len() - rest.len());

        let value = if !rest.is_empty() && (is_dash(rest) || split_key(rest).is_some()) {
            let mut nested = Vec::with_capacity(children.len() + 1);
            nested.push(View {
                line: view.line,
                indent: column,
                body: rest,
            });
            nested.extend_from_slice(children);
            parse_node(&nested)
        } else {
            parse_inline(view.line, column, rest, children)
        };

        let last = children.last().map_or(view.line, |child| child.line);
        items.push(Item {
            span: Span {
                start: view.line,
                end: last + 1,
            },
            value,
        });
        i = j;
    }

    Node::Sequence(items)
}

/// Value that starts inline on `line` at byte `column` (possibly empty),
/// followed by the deeper `children`.
fn parse_inline(line: usize, column: usize, text: &str, children: &[View<'_>]) -> Node {
    let leading = text.len() - text.trim_start().len();
    let uncommented = strip_comment(text).trim();
    let value = strip_properties(uncommented);
    let offset = column + leading + (uncommented.len() - value.len());

    if value.is_empty() {
        return parse_node(children);
    }

    if !children.is_empty() || value.starts_with('|') || value.starts_with('>') {
        return Node::Opaque;
    }

    if value.starts_with('[') {
        if !value.ends_with(']') {
            return Node::Opaque;
        }
        return Node::Flow {
            line,
            open: offset,
            close: offset + value.len() - 1,
            items: split_flow(&value[1..value.len() - 1]),
        };
    }

    if value == "{}" || value == "~" || value == "null" {
        return Node::Empty;
    }

    if value.starts_with('{') {
        return Node::Opaque;
    }

    Node::Scalar(decode_scalar(value))
}

/// Splits `key: rest` and returns the decoded key with the byte offset just
/// past the colon.
pub fn split_key(body: &str) -> Option<(String, usize)> {
    if is_dash(body) {
        return None;
    }

    let first = body.chars().next()?;
    if matches!(first, '#' | '[' | '{' | '|' | '>' | '&' | '!' | '*' | '%' | '@' | '`' | '?') {
        return None;
    }

    if first == '"' || first == '\'' {
        let close = closing_quote(body, first)?;
        let after = &body[close + 1..];
        let trimmed = after.trim_start();
        let colon = close + 1 + (after.len() - trimmed.len());
        if !trimmed.starts_with(':') || !ends_or_space(&trimmed[1..]) {
            return None;
        }
        return Some((decode_scalar(&body[..=close]), colon + 1));
    }

    let mut prev_space = false;
    for (idx, ch) in body.char_indices() {
        if ch == '#' && prev_space {
            return None;
        }
        if ch == ':' && ends_or_space(&body[idx + 1..]) {
            let key = body[..idx].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key.to_string(), idx + 1));
        }
        prev_space = ch == ' ' || ch == '\t';
    }

    None
}

fn ends_or_space(text: &str) -> bool {
    text.is_empty() || text.starts_with(' ') || text.starts_with('\t')
}

fn closing_quote(text: &str, quote: char) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut idx = 1;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if quote == '"' && byte == b'\\' {
            idx += 2;
            continue;
        }
        if byte == quote as u8 {
            if quote == '\'' && bytes.get(idx + 1) == Some(&b'\'') {
                idx += 2;
                continue;
            }
            return Some(idx);
        }
        idx += 1;
    }

    None
}

/// Cuts a trailing `# comment`, ignoring `#` inside quoted scalars.
pub fn strip_comment(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut idx = 0;
    let mut prev: Option<u8> = None;

    while idx < bytes.len() {
        let byte = bytes[idx];
        let at_token_start = matches!(prev, None | Some(b' ' | b'\t' | b'[' | b',' | b'{' | b':'));

        if (byte == b'"' || byte == b'\'') && at_token_start {
            match closing_quote(&text[idx..], byte as char) {
                Some(close) => {
                    idx += close + 1;
                    prev = Some(byte);
                    continue;
                }
                None => return text,
            }
        }

        if byte == b'#' && matches!(prev, None | Some(b' ' | b'\t')) {
            return &text[..idx];
        }

        prev = Some(byte);
        idx += 1;
    }

    text
}

/// Drops leading anchors (`&name`) and tags (`!tag`).
fn strip_properties(mut text: &str) -> &str {
    while text.starts_with('&') || text.starts_with('!') {
        text = match text.find([' ', '\t']) {
            Some(idx) => text[idx..].trim_start(),
            None => "",
        };
    }
    text
}

pub fn decode_scalar(text: &str) -> String {
    let text = text.trim();

    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return unescape_double(&text[1..text.len() - 1]);
    }

    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return text[1..text.len() - 1].replace("''", "'");
    }

    text.to_string()
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn split_flow(inner: &str) -> Vec<FlowItem> {
    let mut items = Vec::new();
    let bytes = inner.as_bytes();
    let mut start = 0;
    let mut idx = 0;

    while idx <= bytes.len() {
        if idx == bytes.len() || bytes[idx] == b',' {
            let raw = inner[start..idx].trim();
            if !raw.is_empty() {
                items.push(FlowItem {
                    raw: raw.to_string(),
                    value: decode_scalar(raw),
                });
            }
            start = idx + 1;
            idx += 1;
            continue;
        }

        let byte = bytes[idx];
        if (byte == b'"' || byte == b'\'') && inner[start..idx].trim().is_empty() {
            if let Some(close) = closing_quote(&inner[idx..], byte as char) {
                idx += close + 1;
                continue;
            }
        }

        idx += 1;
    }

    items
}
