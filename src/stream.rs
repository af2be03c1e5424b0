//! The segmentation engine: splits the growing stream into immutable stable
//! blocks and a single active tail.
//!
//! Each append re-scans only the tail after the last stable block. A block
//! stabilizes exactly once; the stable sequence is append-only and never
//! reordered or retracted. Boundary judgments on the still-growing last line
//! are restricted to prefix-stable predicates, which keeps incremental and
//! one-shot segmentation identical.

use std::fmt;

use fnv::FnvHashMap;

use crate::meta::BlockMeta;
use crate::options::Options;
use crate::repair;
use crate::syntax::{self, ComponentScan};
use crate::types::{ActiveBlock, Block, BlockId, BlockKind, Span, Update, hash_content};

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    end: usize,        // end excluding '\n'
    has_newline: bool, // true if ended by '\n'
}

impl Line {
    fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    fn end_with_newline(&self) -> usize {
        if self.has_newline { self.end + 1 } else { self.end }
    }
}

fn split_lines(text: &str) -> Vec<Line> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            out.push(Line {
                start,
                end: i,
                has_newline: true,
            });
            start = i + 1;
        }
    }
    out.push(Line {
        start,
        end: text.len(),
        has_newline: false,
    });
    out
}

/// Mode of the multi-line construct currently being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailMode {
    Paragraph,
    List,
    BlockQuote,
    Table,
    /// Plain text with no structural reading (e.g. a malformed component
    /// span demoted to ordinary content).
    Text,
}

impl TailMode {
    fn kind(self) -> BlockKind {
        match self {
            TailMode::Paragraph => BlockKind::Paragraph,
            TailMode::List => BlockKind::List,
            TailMode::BlockQuote => BlockKind::BlockQuote,
            TailMode::Table => BlockKind::Table,
            TailMode::Text => BlockKind::Text,
        }
    }
}

pub struct Segmenter {
    opts: Options,
    buffer: String,
    stable: Vec<Block>,
    /// Byte offset of the end of the last stable block.
    cursor: usize,
    counters: FnvHashMap<BlockKind, u32>,
    pending_cr: bool,
}

impl fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segmenter")
            .field("buffer_len", &self.buffer.len())
            .field("stable_len", &self.stable.len())
            .field("cursor", &self.cursor)
            .field("pending_cr", &self.pending_cr)
            .finish()
    }
}

impl Segmenter {
    pub fn new(opts: Options) -> Self {
        Self {
            opts,
            buffer: String::new(),
            stable: Vec::new(),
            cursor: 0,
            counters: FnvHashMap::default(),
            pending_cr: false,
        }
    }

    /// The accumulated source text, with newlines normalized to `\n`.
    ///
    /// Block spans index into this buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// All blocks stabilized so far, in document order.
    pub fn stable(&self) -> &[Block] {
        &self.stable
    }

    /// Append a chunk and stabilize whatever it closes.
    pub fn append(&mut self, chunk: &str) -> Update {
        let mut update = Update::default();
        if chunk.is_empty() && !self.pending_cr {
            update.active = self.active();
            return update;
        }

        let chunk = self.normalize_newlines(chunk);
        self.buffer.push_str(&chunk);
        self.drain_stable(&mut update);
        update.active = self.active();
        update
    }

    /// End of stream: the remaining non-blank tail stabilizes as-is.
    pub fn finalize(&mut self) -> Update {
        let mut update = Update::default();
        if self.pending_cr {
            // A trailing '\r' at EOF reads as a newline.
            self.buffer.push('\n');
            self.pending_cr = false;
        }
        self.drain_stable(&mut update);

        let start = self.tail_block_start();
        if start < self.buffer.len() {
            let tail = &self.buffer[start..];
            if tail.trim().is_empty() {
                self.cursor = self.buffer.len();
            } else {
                let kind = self.classify_tail(tail);
                let block = self.finish_block(start, self.buffer.len(), kind);
                update.stable.push(block);
            }
        }
        update
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stable.clear();
        self.cursor = 0;
        self.counters.clear();
        self.pending_cr = false;
    }

    /// Snapshot of the current active tail.
    pub fn active(&self) -> Option<ActiveBlock> {
        let start = self.tail_block_start();
        if start >= self.buffer.len() {
            return None;
        }
        let content = &self.buffer[start..];
        if content.trim().is_empty() {
            return None;
        }
        let kind = self.classify_tail(content);
        let tags = repair::scan_incomplete_tags(content, &self.opts.repair);
        let display = if kind == BlockKind::Component {
            // Component tails render as skeletons from a partial extract,
            // not as repaired Markdown.
            content.to_string()
        } else {
            repair::repair_with_state(content, &tags, &self.opts.repair)
        };
        Some(ActiveBlock {
            kind,
            content: content.to_string(),
            span: Span {
                start,
                end: self.buffer.len(),
            },
            display,
            tags,
        })
    }

    fn drain_stable(&mut self, update: &mut Update) {
        while let Some(block) = self.try_stabilize_next() {
            update.stable.push(block);
        }
    }

    /// Start of the next block: the cursor advanced past completed blank
    /// lines (document leading whitespace, or the gap after a mid-line
    /// component close).
    fn tail_block_start(&self) -> usize {
        let tail = &self.buffer[self.cursor..];
        let mut offset = 0usize;
        for line in tail.split_inclusive('\n') {
            if line.ends_with('\n') && line.trim().is_empty() {
                offset += line.len();
            } else {
                break;
            }
        }
        self.cursor + offset
    }

    /// Stabilize the next closed top-level construct, if any.
    fn try_stabilize_next(&mut self) -> Option<Block> {
        let start = self.tail_block_start();
        if start >= self.buffer.len() {
            return None;
        }
        let text = &self.buffer[start..];
        let lines = split_lines(text);
        let first_line = lines[0];
        let first_str = first_line.as_str(text);

        // Only the still-growing last line can be blank here; wait for it.
        if syntax::is_blank_line(first_str) {
            return None;
        }

        let mut kind_override: Option<TailMode> = None;

        if self.opts.component_blocks && syntax::is_component_start(first_str) {
            match syntax::scan_component(text) {
                ComponentScan::Closed(len) => {
                    return Some(self.finish_block(start, start + len, BlockKind::Component));
                }
                ComponentScan::Open => return None,
                // Malformed spans make forward progress as plain text.
                ComponentScan::Malformed => kind_override = Some(TailMode::Text),
            }
        }

        if kind_override.is_none() {
            if let Some(header) = syntax::parse_code_fence_header(first_str) {
                if !first_line.has_newline {
                    return None;
                }
                for line in &lines[1..] {
                    if line.has_newline
                        && syntax::is_code_fence_closing_line(
                            line.as_str(text),
                            header.fence_char,
                            header.fence_len,
                        )
                    {
                        return Some(self.finish_block(
                            start,
                            start + line.end_with_newline(),
                            BlockKind::CodeBlock,
                        ));
                    }
                }
                return None;
            }

            if syntax::is_atx_heading(first_str) {
                if !first_line.has_newline {
                    return None;
                }
                return Some(self.finish_block(
                    start,
                    start + first_line.end_with_newline(),
                    BlockKind::Heading,
                ));
            }

            if first_line.has_newline && syntax::is_thematic_break(first_str) {
                return Some(self.finish_block(
                    start,
                    start + first_line.end_with_newline(),
                    BlockKind::ThematicBreak,
                ));
            }
        }

        let mut mode = kind_override.unwrap_or_else(|| {
            if syntax::is_list_item_start(first_str) {
                TailMode::List
            } else if syntax::is_blockquote_start(first_str) {
                TailMode::BlockQuote
            } else {
                TailMode::Paragraph
            }
        });

        for idx in 1..lines.len() {
            let prev = lines[idx - 1];
            let curr = lines[idx];
            let prev_str = prev.as_str(text);
            let curr_str = curr.as_str(text);
            let curr_complete = curr.has_newline;

            // Setext underline right after a single paragraph line upgrades
            // it to a heading.
            if mode == TailMode::Paragraph
                && idx == 1
                && curr_complete
                && syntax::setext_underline_char(curr_str).is_some()
                && !syntax::is_blank_line(prev_str)
            {
                return Some(self.finish_block(
                    start,
                    start + curr.end_with_newline(),
                    BlockKind::Heading,
                ));
            }

            if mode == TailMode::Paragraph
                && curr_complete
                && syntax::is_table_delimiter_row(curr_str)
                && prev_str.contains('|')
            {
                if idx == 1 {
                    mode = TailMode::Table;
                    continue;
                }
                // The table starts at the previous line; everything before
                // it stabilizes on its own.
                return Some(self.finish_block(start, start + prev.start, mode.kind()));
            }

            // Paragraph-family blocks end at a completed blank line.
            if matches!(mode, TailMode::Paragraph | TailMode::Table | TailMode::Text)
                && curr_complete
                && syntax::is_blank_line(curr_str)
            {
                return Some(self.finish_block(
                    start,
                    start + curr.end_with_newline(),
                    mode.kind(),
                ));
            }

            if syntax::is_blank_line(curr_str) {
                // Blank inside a list/quote (or still-growing whitespace):
                // closure is decided by what follows.
                continue;
            }

            if self.is_boundary(prev_str, curr_str, mode, curr_complete) {
                return Some(self.finish_block(start, start + curr.start, mode.kind()));
            }
        }
        None
    }

    fn is_boundary(&self, prev: &str, curr: &str, mode: TailMode, curr_complete: bool) -> bool {
        // After a blank line, anything but a continuation starts a new block.
        if syntax::is_blank_line(prev) {
            return match mode {
                TailMode::List => curr_complete && !syntax::is_list_continuation(curr),
                TailMode::BlockQuote => curr_complete && !syntax::is_blockquote_start(curr),
                _ => true,
            };
        }

        // Certain starters interrupt a block without a blank line. Only
        // prefix-stable judgments are allowed on a still-growing line.
        if syntax::is_atx_heading(curr) {
            return true;
        }
        if syntax::parse_code_fence_header(curr).is_some() {
            return true;
        }
        if self.opts.component_blocks && syntax::is_component_start(curr) {
            return true;
        }
        if curr_complete && syntax::is_thematic_break(curr) {
            return true;
        }
        if syntax::is_blockquote_start(curr)
            && mode != TailMode::BlockQuote
            && !syntax::is_blockquote_start(prev)
        {
            return true;
        }
        if syntax::is_list_item_start(curr)
            && mode != TailMode::List
            && !syntax::is_list_item_start(prev)
        {
            return true;
        }
        false
    }

    fn classify_tail(&self, tail: &str) -> BlockKind {
        let first_line = tail.split('\n').next().unwrap_or(tail);
        if self.opts.component_blocks && syntax::is_component_start(tail) {
            return match syntax::scan_component(tail) {
                ComponentScan::Malformed => BlockKind::Text,
                _ => BlockKind::Component,
            };
        }
        if syntax::parse_code_fence_header(first_line).is_some() {
            return BlockKind::CodeBlock;
        }
        if syntax::is_atx_heading(first_line) {
            return BlockKind::Heading;
        }
        if syntax::is_thematic_break(first_line) {
            return BlockKind::ThematicBreak;
        }
        if syntax::is_list_item_start(first_line) {
            return BlockKind::List;
        }
        if syntax::is_blockquote_start(first_line) {
            return BlockKind::BlockQuote;
        }
        if first_line.contains('|')
            && tail
                .split('\n')
                .nth(1)
                .is_some_and(syntax::is_table_delimiter_row)
        {
            return BlockKind::Table;
        }
        BlockKind::Paragraph
    }

    fn finish_block(&mut self, start: usize, end: usize, kind: BlockKind) -> Block {
        let content = self.buffer[start..end].to_string();
        let counter = self.counters.entry(kind).or_insert(0);
        let seq = *counter;
        *counter += 1;

        let block = Block {
            id: BlockId::new(kind, seq),
            kind,
            content_hash: hash_content(&content),
            span: Span { start, end },
            meta: BlockMeta::extract(&content, kind),
            content,
        };
        self.stable.push(block.clone());
        self.cursor = end;
        block
    }

    fn normalize_newlines(&mut self, chunk: &str) -> String {
        if !chunk.contains('\r') && !self.pending_cr {
            return chunk.to_string();
        }

        let mut out = String::with_capacity(chunk.len() + 1);
        let mut chars = chunk.chars().peekable();

        if self.pending_cr {
            // Previous chunk ended with '\r' (possibly CRLF across chunks).
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
            self.pending_cr = false;
        }

        while let Some(c) = chars.next() {
            if c != '\r' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'\n') {
                chars.next();
                out.push('\n');
                continue;
            }
            if chars.peek().is_none() {
                // Defer: this may be a CRLF pair split across chunks.
                self.pending_cr = true;
                continue;
            }
            out.push('\n');
        }

        out
    }
}
