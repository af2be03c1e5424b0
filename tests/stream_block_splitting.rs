use stabledown::{BlockKind, BlockMeta, Options, Segmenter};

#[test]
fn splits_paragraphs_on_blank_line() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("A\n\nB");
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].content, "A\n\n");
    assert_eq!(u.stable[0].kind, BlockKind::Paragraph);
    assert_eq!(u.active.as_ref().unwrap().content, "B");
}

#[test]
fn commits_atx_heading_at_end_of_line() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("# Title\nBody");
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].kind, BlockKind::Heading);
    assert_eq!(u.stable[0].content, "# Title\n");
    assert_eq!(u.stable[0].meta, BlockMeta::Heading { level: 1 });
    assert_eq!(u.active.as_ref().unwrap().content, "Body");
}

#[test]
fn commits_setext_heading_as_single_block() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("Title\n---\nAfter");
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::Heading && b.content == "Title\n---\n")
    );
    assert_eq!(u.active.as_ref().unwrap().content, "After");
}

#[test]
fn commits_thematic_break_with_spaces() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("- - -\nAfter");
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::ThematicBreak && b.content == "- - -\n")
    );
    assert_eq!(u.active.as_ref().unwrap().content, "After");
}

#[test]
fn commits_list_as_single_block() {
    let mut s = Segmenter::new(Options::default());
    s.append("- a\n- b\n");
    let u = s.append("\nC\n");
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::List && b.content == "- a\n- b\n\n")
    );
}

#[test]
fn list_keeps_blank_separated_continuations() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("- a\n\n  indented continuation\n\nNext\n");
    assert!(u.stable.iter().any(|b| {
        b.kind == BlockKind::List && b.content == "- a\n\n  indented continuation\n\n"
    }));
    assert_eq!(u.active.as_ref().unwrap().content, "Next\n");
}

#[test]
fn list_followed_by_unmarked_line_reads_as_lazy_continuation() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("- a\nlazy line\n\nX\n");
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::List && b.content == "- a\nlazy line\n\n")
    );
}

#[test]
fn commits_blockquote_as_single_block() {
    let mut s = Segmenter::new(Options::default());
    s.append("> a\n> b\n");
    let u = s.append("\nC\n");
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::BlockQuote && b.content == "> a\n> b\n\n")
    );
}

#[test]
fn commits_code_fence_on_closing_line() {
    let mut s = Segmenter::new(Options::default());
    let u1 = s.append("```js\nconst a = 1;\n");
    assert!(u1.stable.is_empty());
    assert_eq!(u1.active.as_ref().unwrap().kind, BlockKind::CodeBlock);

    let u2 = s.append("```\nAfter");
    assert_eq!(u2.stable.len(), 1);
    assert_eq!(u2.stable[0].kind, BlockKind::CodeBlock);
    assert_eq!(u2.stable[0].content, "```js\nconst a = 1;\n```\n");
    assert_eq!(u2.stable[0].code_language(), Some("js"));
    assert_eq!(u2.active.as_ref().unwrap().content, "After");
}

#[test]
fn fence_content_never_splits_blocks() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("```\n# not a heading\n\n- not a list\n```\nAfter");
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].kind, BlockKind::CodeBlock);
    assert_eq!(u.stable[0].content, "```\n# not a heading\n\n- not a list\n```\n");
}

#[test]
fn tilde_fence_closes_on_longer_run() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("~~~py\nprint(1)\n~~~~~\nAfter");
    assert_eq!(u.stable[0].content, "~~~py\nprint(1)\n~~~~~\n");
    assert_eq!(u.stable[0].code_language(), Some("py"));
}

#[test]
fn commits_table_as_single_block() {
    let mut s = Segmenter::new(Options::default());
    s.append("| A | B |\n|---|---|\n| 1 | 2 |\n");
    let u = s.append("\nAfter\n");
    let table = u
        .stable
        .iter()
        .find(|b| b.kind == BlockKind::Table)
        .expect("table block");
    assert_eq!(table.content, "| A | B |\n|---|---|\n| 1 | 2 |\n\n");
    assert_eq!(
        table.meta,
        BlockMeta::Table {
            headers: vec!["A".to_string(), "B".to_string()],
            rows: vec![vec!["1".to_string(), "2".to_string()]],
        }
    );
    assert_eq!(u.active.as_ref().unwrap().content, "After\n");
}

#[test]
fn table_after_paragraph_is_a_separate_block() {
    let mut s = Segmenter::new(Options::default());
    let u1 = s.append("Intro\n| A | B |\n|---|---|\n| 1 | 2 |\n\nAfter\n");
    assert!(u1.stable.iter().any(|b| b.content == "Intro\n"));
    assert!(u1.stable.iter().any(|b| {
        b.kind == BlockKind::Table && b.content == "| A | B |\n|---|---|\n| 1 | 2 |\n\n"
    }));
    assert_eq!(u1.active.as_ref().unwrap().content, "After\n");
}

#[test]
fn heading_interrupts_paragraph_without_blank_line() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("para\n# Head\n");
    assert!(u.stable.iter().any(|b| b.content == "para\n"));
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::Heading && b.content == "# Head\n")
    );
}

#[test]
fn blockquote_interrupts_paragraph() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("para\n> quote");
    assert!(u.stable.iter().any(|b| b.content == "para\n"));
    assert_eq!(u.active.as_ref().unwrap().kind, BlockKind::BlockQuote);
}

#[test]
fn per_kind_ids_count_independently() {
    let mut s = Segmenter::new(Options::default());
    let mut u = s.append("one\n\n# H\n\ntwo\n\n");
    u.stable.extend(s.finalize().stable);
    let ids: Vec<String> = u.stable.iter().map(|b| b.id.to_string()).collect();
    assert_eq!(ids, vec!["paragraph-0", "heading-0", "paragraph-1"]);
}

#[test]
fn empty_and_whitespace_documents_yield_nothing() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("");
    assert!(u.stable.is_empty());
    assert!(u.active.is_none());

    let mut s = Segmenter::new(Options::default());
    let u = s.append("  \n \n   ");
    assert!(u.stable.is_empty());
    assert!(u.active.is_none());
    let u = s.finalize();
    assert!(u.stable.is_empty());
    assert!(u.active.is_none());
}

#[test]
fn finalize_commits_the_remaining_tail() {
    let mut s = Segmenter::new(Options::default());
    let u1 = s.append("last paragraph");
    assert!(u1.stable.is_empty());
    let u2 = s.finalize();
    assert_eq!(u2.stable.len(), 1);
    assert_eq!(u2.stable[0].content, "last paragraph");
    assert_eq!(u2.stable[0].kind, BlockKind::Paragraph);
    assert!(u2.active.is_none());
}

#[test]
fn finalize_commits_an_unclosed_fence_as_code() {
    let mut s = Segmenter::new(Options::default());
    s.append("```rust\nfn main() {}\n");
    let u = s.finalize();
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].kind, BlockKind::CodeBlock);
    assert_eq!(u.stable[0].content, "```rust\nfn main() {}\n");
}

#[test]
fn spans_index_into_the_buffer() {
    let mut s = Segmenter::new(Options::default());
    let mut blocks = s.append("A\n\nB\n\n").stable;
    blocks.extend(s.finalize().stable);
    for b in &blocks {
        assert_eq!(&s.buffer()[b.span.start..b.span.end], b.content);
    }
}

#[test]
fn reset_returns_to_a_fresh_stream() {
    let mut s = Segmenter::new(Options::default());
    s.append("A\n\nB\n\n");
    assert!(!s.stable().is_empty());
    s.reset();
    assert!(s.stable().is_empty());
    assert_eq!(s.buffer(), "");
    let u = s.append("C\n\n");
    assert_eq!(u.stable[0].id.to_string(), "paragraph-0");
}
