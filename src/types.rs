use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;

use crate::meta::BlockMeta;
use crate::repair::IncompleteTagState;

/// Identity of a stable block: its kind plus a per-kind sequence number.
///
/// The pair is unique within a document. Sequence numbers only ever grow, so
/// ids are safe to use as long-lived render keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub kind: BlockKind,
    pub seq: u32,
}

impl BlockId {
    pub fn new(kind: BlockKind, seq: u32) -> Self {
        Self { kind, seq }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.slug(), self.seq)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({self})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading,
    CodeBlock,
    List,
    Table,
    Component,
    BlockQuote,
    ThematicBreak,
    /// Generic text content that fits no structural kind (including spans
    /// that opened like a component but turned out malformed).
    Text,
}

impl BlockKind {
    pub fn slug(self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::CodeBlock => "code",
            BlockKind::List => "list",
            BlockKind::Table => "table",
            BlockKind::Component => "component",
            BlockKind::BlockQuote => "quote",
            BlockKind::ThematicBreak => "rule",
            BlockKind::Text => "text",
        }
    }
}

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Content hash used as the stable-block cache key (64-bit FNV-1a).
///
/// Two blocks with equal hashes are interchangeable for rendering purposes;
/// this is a cache key, not a security boundary.
pub fn hash_content(text: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// A finalized, immutable unit of content.
///
/// Once emitted, `content`, `meta`, `content_hash`, and `span` never change.
/// Compiled trees are cached externally, keyed by `content_hash` (see
/// `compile::TreeCache`), so the block itself stays render-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// The exact substring of the source text covered by this block.
    pub content: String,
    pub content_hash: u64,
    pub span: Span,
    /// Kind-specific summary, derived once from `content`.
    pub meta: BlockMeta,
}

impl Block {
    pub fn heading_level(&self) -> Option<u8> {
        match &self.meta {
            BlockMeta::Heading { level } => Some(*level),
            _ => None,
        }
    }

    pub fn code_language(&self) -> Option<&str> {
        match &self.meta {
            BlockMeta::CodeBlock { language } if !language.is_empty() => Some(language),
            _ => None,
        }
    }

    pub fn component_name(&self) -> Option<&str> {
        match &self.meta {
            BlockMeta::Component { name, .. } if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

/// The still-open tail of the stream.
///
/// There is at most one of these at a time. It changes on every update, has
/// no hash-based identity, and must be re-rendered unconditionally.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBlock {
    pub kind: BlockKind,
    /// The raw tail text. Never mutated by repair.
    pub content: String,
    pub span: Span,
    /// Repaired display text with open constructs virtually closed.
    ///
    /// For component blocks this equals `content`; consumers extract a
    /// partial component instead of parsing Markdown.
    pub display: String,
    /// Open inline/block constructs at end-of-text, recomputed per update.
    pub tags: IncompleteTagState,
}

impl ActiveBlock {
    /// The safer text to feed into a downstream Markdown parser.
    pub fn display_or_content(&self) -> &str {
        if self.display.is_empty() {
            &self.content
        } else {
            &self.display
        }
    }
}

/// Result of one `append`/`finalize` cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    /// Blocks newly stabilized by this cycle, in document order.
    pub stable: Vec<Block>,
    /// The current active tail, if any non-whitespace tail remains.
    pub active: Option<ActiveBlock>,
}

impl Update {
    pub fn is_empty(&self) -> bool {
        self.stable.is_empty() && self.active.is_none()
    }
}
