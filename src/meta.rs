//! Kind-specific block summaries, derived once at stabilization and
//! invariant thereafter.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::component;
use crate::syntax::{parse_code_fence_header_from_block, setext_underline_char};
use crate::types::BlockKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockMeta {
    Heading {
        level: u8,
    },
    CodeBlock {
        language: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Component {
        name: String,
        /// Sanitized before this struct is built; see `sanitize`.
        props: Map<String, Value>,
    },
    None,
}

impl BlockMeta {
    pub fn extract(content: &str, kind: BlockKind) -> BlockMeta {
        match kind {
            BlockKind::Heading => heading_meta(content),
            BlockKind::CodeBlock => code_meta(content),
            BlockKind::List => list_meta(content),
            BlockKind::Table => table_meta(content),
            BlockKind::Component => component_meta(content),
            _ => BlockMeta::None,
        }
    }
}

fn heading_meta(content: &str) -> BlockMeta {
    let first = content.split('\n').next().unwrap_or(content).trim_start();
    if first.starts_with('#') {
        let level = first.bytes().take_while(|b| *b == b'#').count().min(6) as u8;
        return BlockMeta::Heading { level: level.max(1) };
    }
    // Setext heading: level from the underline character.
    let underline = content
        .split('\n')
        .nth(1)
        .and_then(setext_underline_char);
    let level = match underline {
        Some('=') => 1,
        Some('-') => 2,
        _ => 1,
    };
    BlockMeta::Heading { level }
}

fn code_meta(content: &str) -> BlockMeta {
    let language = parse_code_fence_header_from_block(content)
        .and_then(|h| h.language)
        .unwrap_or("")
        .to_string();
    BlockMeta::CodeBlock { language }
}

fn list_meta(content: &str) -> BlockMeta {
    let items: Vec<String> = content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect();
    let ordered = items
        .first()
        .is_some_and(|line| line.trim_start().starts_with(|c: char| c.is_ascii_digit()));
    BlockMeta::List { ordered, items }
}

fn table_meta(content: &str) -> BlockMeta {
    let lines: Vec<&str> = content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    let split_cells = |line: &str| -> Vec<String> {
        line.split('|')
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty())
            .collect()
    };
    let headers = lines.first().map(|l| split_cells(l)).unwrap_or_default();
    let rows: Vec<Vec<String>> = lines.iter().skip(2).map(|l| split_cells(l)).collect();
    BlockMeta::Table { headers, rows }
}

fn component_meta(content: &str) -> BlockMeta {
    let partial = component::extract_component_data(content);
    BlockMeta::Component {
        name: partial.name.unwrap_or_default(),
        props: partial.props,
    }
}
