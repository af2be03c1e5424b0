//! Format-as-you-type repair for the active tail.
//!
//! The scanner walks the tail once per update and records which inline/block
//! constructs are still open at end-of-text; the repairer virtually closes
//! them so a partial parse still renders sensibly. Repair is non-destructive:
//! it only ever appends to a copy, never mutates the input.

use fnv::FnvHashMap;

use crate::syntax::{self, ComponentScan};

#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub emphasis: bool,
    pub inline_code: bool,
    pub strikethrough: bool,
    pub code_fences: bool,
    /// Tail-only scan window for repair scanning.
    pub window_bytes: usize,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            emphasis: true,
            inline_code: true,
            strikethrough: true,
            code_fences: true,
            window_bytes: 16 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Bold,
    Italic,
    InlineCode,
    CodeFence,
    Strikethrough,
    Link,
    Component,
}

/// One still-open construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub kind: TagKind,
    /// Byte offset of the opening marker within the scanned text.
    pub position: usize,
    /// The exact marker text that opened the construct.
    pub opening: String,
}

/// Open constructs at end-of-text.
///
/// Recomputed from the active tail on every update; it has no identity
/// beyond the current text snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncompleteTagState {
    /// Open constructs in nesting order (most recent last).
    pub stack: Vec<OpenTag>,
    /// Offset of the earliest still-open construct; text from here on is
    /// unstable and must be excluded from stabilization decisions.
    pub earliest_position: Option<usize>,
    /// Aggregate open counts per construct kind. Diagnostic only.
    pub tag_counts: FnvHashMap<TagKind, usize>,
}

impl IncompleteTagState {
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn contains(&self, kind: TagKind) -> bool {
        self.stack.iter().any(|t| t.kind == kind)
    }

    fn from_stack(stack: Vec<OpenTag>) -> Self {
        let earliest_position = stack.iter().map(|t| t.position).min();
        let mut tag_counts = FnvHashMap::default();
        for tag in &stack {
            *tag_counts.entry(tag.kind).or_insert(0usize) += 1;
        }
        Self {
            stack,
            earliest_position,
            tag_counts,
        }
    }
}

fn tail_window(text: &str, window_bytes: usize) -> (&str, usize) {
    if text.len() <= window_bytes {
        return (text, 0);
    }
    let start = text.len() - window_bytes;
    // Move to char boundary.
    let mut s = start;
    while !text.is_char_boundary(s) {
        s += 1;
    }
    (&text[s..], s)
}

fn run_len(bytes: &[u8], i: usize, b: u8) -> usize {
    let mut n = 0usize;
    while i + n < bytes.len() && bytes[i + n] == b {
        n += 1;
    }
    n
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `*` at an indented line start followed by whitespace is a list bullet,
/// not emphasis.
fn is_list_bullet(bytes: &[u8], line_start: usize, i: usize) -> bool {
    if i - line_start > 3 {
        return false;
    }
    if bytes[line_start..i].iter().any(|b| *b != b' ') {
        return false;
    }
    matches!(bytes.get(i + 1), Some(b' ') | Some(b'\t'))
}

/// Pop the most recent matching open marker, or push a new one.
fn toggle(stack: &mut Vec<OpenTag>, kind: TagKind, position: usize, opening: &str) {
    if let Some(idx) = stack
        .iter()
        .rposition(|t| t.kind == kind && t.opening == opening)
    {
        stack.remove(idx);
    } else {
        stack.push(OpenTag {
            kind,
            position,
            opening: opening.to_string(),
        });
    }
}

/// Scan `text` for constructs left open at end-of-text.
pub fn scan_incomplete_tags(text: &str, opts: &RepairOptions) -> IncompleteTagState {
    let (window, offset) = tail_window(text, opts.window_bytes);
    let bytes = window.as_bytes();

    let mut stack: Vec<OpenTag> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut i = 0usize;
    let mut line_start = 0usize;

    while i < bytes.len() {
        let in_inline_code = stack.iter().any(|t| t.kind == TagKind::InlineCode);

        if i == line_start && !in_inline_code {
            let line_end = window[i..]
                .find('\n')
                .map(|rel| i + rel)
                .unwrap_or(window.len());
            let line = &window[i..line_end];

            if let Some((fence_char, fence_len)) = fence {
                if syntax::is_code_fence_closing_line(line, fence_char, fence_len) {
                    if let Some(idx) = stack.iter().rposition(|t| t.kind == TagKind::CodeFence) {
                        stack.remove(idx);
                    }
                    fence = None;
                }
                // Fence content: inline constructs are suspended.
                i = line_end + 1;
                line_start = i;
                continue;
            }
            if let Some(header) = syntax::parse_code_fence_header(line) {
                stack.push(OpenTag {
                    kind: TagKind::CodeFence,
                    position: offset + i,
                    opening: header
                        .fence_char
                        .to_string()
                        .repeat(header.fence_len),
                });
                fence = Some((header.fence_char, header.fence_len));
                i = line_end + 1;
                line_start = i;
                continue;
            }
            if syntax::is_thematic_break(line) {
                // Marker-only lines are structure, not emphasis.
                i = line_end + 1;
                line_start = i;
                continue;
            }
        }

        let b = bytes[i];

        if b == b'\n' {
            i += 1;
            line_start = i;
            continue;
        }

        if in_inline_code {
            if b == b'`' {
                let run = run_len(bytes, i, b'`');
                toggle(&mut stack, TagKind::InlineCode, offset + i, &window[i..i + run]);
                i += run;
            } else {
                i += 1;
            }
            continue;
        }

        match b {
            b'\\' => {
                // Escape consumes exactly one following character.
                i += 2;
            }
            b'`' => {
                let run = run_len(bytes, i, b'`');
                toggle(&mut stack, TagKind::InlineCode, offset + i, &window[i..i + run]);
                i += run;
            }
            b'[' => {
                if window[i..].starts_with(syntax::COMPONENT_OPEN) {
                    match syntax::scan_component(&window[i..]) {
                        ComponentScan::Closed(n) => {
                            i += n;
                        }
                        ComponentScan::Open => {
                            // The remainder is component innards.
                            stack.push(OpenTag {
                                kind: TagKind::Component,
                                position: offset + i,
                                opening: syntax::COMPONENT_OPEN.to_string(),
                            });
                            i = bytes.len();
                        }
                        ComponentScan::Malformed => {
                            i += 1;
                        }
                    }
                } else {
                    stack.push(OpenTag {
                        kind: TagKind::Link,
                        position: offset + i,
                        opening: "[".to_string(),
                    });
                    i += 1;
                }
            }
            b']' => {
                let Some(idx) = stack.iter().rposition(|t| t.kind == TagKind::Link) else {
                    i += 1;
                    continue;
                };
                if bytes.get(i + 1) == Some(&b'(') {
                    // URL part must close on the same line.
                    let mut j = i + 2;
                    let mut closed_at = None;
                    while j < bytes.len() {
                        match bytes[j] {
                            b')' => {
                                closed_at = Some(j);
                                break;
                            }
                            b'\n' => break,
                            _ => j += 1,
                        }
                    }
                    match closed_at {
                        Some(close) => {
                            stack.remove(idx);
                            i = close + 1;
                        }
                        None => {
                            // Unterminated URL: the link stays open to the end.
                            i = bytes.len();
                        }
                    }
                } else {
                    // `[text]` with no URL yet reads as plain bracketed text.
                    stack.remove(idx);
                    i += 1;
                }
            }
            b'*' => {
                let run = run_len(bytes, i, b'*');
                let prev = if i > line_start { bytes[i - 1] } else { 0 };
                let next = bytes.get(i + run).copied().unwrap_or(0);
                match run {
                    1 => {
                        let word_internal = is_word_byte(prev) && is_word_byte(next);
                        if !word_internal && !is_list_bullet(bytes, line_start, i) {
                            toggle(&mut stack, TagKind::Italic, offset + i, "*");
                        }
                    }
                    2 => toggle(&mut stack, TagKind::Bold, offset + i, "**"),
                    3 => {
                        toggle(&mut stack, TagKind::Bold, offset + i, "**");
                        toggle(&mut stack, TagKind::Italic, offset + i + 2, "*");
                    }
                    _ => {}
                }
                i += run;
            }
            b'_' => {
                let run = run_len(bytes, i, b'_');
                let prev = if i > line_start { bytes[i - 1] } else { 0 };
                let next = bytes.get(i + run).copied().unwrap_or(0);
                match run {
                    1 => {
                        if !(is_word_byte(prev) && is_word_byte(next)) {
                            toggle(&mut stack, TagKind::Italic, offset + i, "_");
                        }
                    }
                    2 => toggle(&mut stack, TagKind::Bold, offset + i, "__"),
                    _ => {}
                }
                i += run;
            }
            b'~' => {
                let run = run_len(bytes, i, b'~');
                if run == 2 {
                    toggle(&mut stack, TagKind::Strikethrough, offset + i, "~~");
                }
                i += run;
            }
            _ => {
                i += 1;
            }
        }
    }

    IncompleteTagState::from_stack(stack)
}

/// A closer is only worth appending when real content follows the opener.
fn has_repairable_content(text: &str, tag: &OpenTag) -> bool {
    let Some(after) = text.get(tag.position + tag.opening.len()..) else {
        return false;
    };
    !after
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '*' | '_' | '~' | '`'))
}

/// Append the minimal closers for the given open-tag state.
///
/// Constructs are closed in reverse order of opening. Unmatched links and
/// components get no closer: a link without its `(url)` renders as plain
/// text, and an open component renders as a skeleton. If the text ends
/// inside a fenced code block, only the fence is closed; code content is
/// never auto-formatted.
pub fn repair_with_state(text: &str, state: &IncompleteTagState, opts: &RepairOptions) -> String {
    if state.stack.is_empty() {
        return text.to_string();
    }

    if let Some(tag) = state.stack.iter().find(|t| t.kind == TagKind::CodeFence) {
        // A lone opening-fence line may still be growing its info string;
        // only close once the fence has a body to protect.
        let opened = text.get(tag.position..).is_some_and(|s| s.contains('\n'));
        if !opts.code_fences || !opened {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len() + tag.opening.len() + 1);
        out.push_str(text);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&tag.opening);
        return out;
    }

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(text);
    for tag in state.stack.iter().rev() {
        let enabled = match tag.kind {
            TagKind::Bold | TagKind::Italic => opts.emphasis,
            TagKind::InlineCode => opts.inline_code,
            TagKind::Strikethrough => opts.strikethrough,
            TagKind::CodeFence => opts.code_fences,
            TagKind::Link | TagKind::Component => false,
        };
        if !enabled || !has_repairable_content(text, tag) {
            continue;
        }
        out.push_str(&tag.opening);
    }
    out
}

/// Scan and repair in one step.
pub fn fix_incomplete_markdown(text: &str, opts: &RepairOptions) -> String {
    if text.is_empty() {
        return String::new();
    }
    let state = scan_incomplete_tags(text, opts);
    repair_with_state(text, &state, opts)
}
