use pretty_assertions::assert_eq;
use serde_json::json;
use stabledown::{BlockKind, BlockMeta, Options, Segmenter, extract_component_data};

#[test]
fn component_block_stabilizes_only_on_structural_close() {
    let mut s = Segmenter::new(Options::default());

    let u1 = s.append(r#"[{c:"Card",p:{"title":"Hel"#);
    assert!(u1.stable.is_empty());
    let active = u1.active.expect("active");
    assert_eq!(active.kind, BlockKind::Component);

    let partial = extract_component_data(&active.content);
    assert_eq!(partial.name.as_deref(), Some("Card"));
    assert!(partial.props.is_empty());

    let u2 = s.append(r#"lo"}}]"#);
    assert_eq!(u2.stable.len(), 1);
    let block = &u2.stable[0];
    assert_eq!(block.kind, BlockKind::Component);
    assert_eq!(block.content, r#"[{c:"Card",p:{"title":"Hello"}}]"#);
    assert_eq!(
        block.meta,
        BlockMeta::Component {
            name: "Card".to_string(),
            props: json!({"title": "Hello"}).as_object().unwrap().clone(),
        }
    );
    assert!(u2.active.is_none());
}

#[test]
fn component_close_splits_mid_line() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("[{c:\"Chip\",p:{}}] trailing text\n\nNext\n");
    assert_eq!(u.stable.len(), 2);
    assert_eq!(u.stable[0].kind, BlockKind::Component);
    assert_eq!(u.stable[0].content, "[{c:\"Chip\",p:{}}]");
    assert_eq!(u.stable[1].content, " trailing text\n\n");
    assert_eq!(u.active.as_ref().unwrap().content, "Next\n");
}

#[test]
fn multi_line_component_stays_one_block() {
    let mut s = Segmenter::new(Options::default());
    let source = "[{c:\"Stack\",p:{},\n  children:[\n    {c:\"Card\",p:{\"x\":1}}\n  ]\n}]";
    let u = s.append(source);
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].kind, BlockKind::Component);
    assert_eq!(u.stable[0].content, source);
}

#[test]
fn malformed_component_degrades_to_text_and_makes_progress() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("[{c:\"X\"}}]\n\nAfter\n");
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].kind, BlockKind::Text);
    assert_eq!(u.stable[0].content, "[{c:\"X\"}}]\n\n");
    assert_eq!(u.active.as_ref().unwrap().content, "After\n");
}

#[test]
fn component_marker_interrupts_a_paragraph() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append("intro line\n[{c:\"Card\",p:{}}]\n\nend\n");
    assert!(u.stable.iter().any(|b| b.content == "intro line\n"));
    assert!(
        u.stable
            .iter()
            .any(|b| b.kind == BlockKind::Component && b.content == "[{c:\"Card\",p:{}}]")
    );
    assert_eq!(u.active.as_ref().unwrap().content, "end\n");
}

#[test]
fn component_props_are_sanitized_before_meta() {
    let mut s = Segmenter::new(Options::default());
    let u = s.append(r#"[{c:"Link",p:{"href":"javascript:alert(1)","to":"https://x.com"}}]"#);
    let BlockMeta::Component { name, props } = &u.stable[0].meta else {
        panic!("expected component meta");
    };
    assert_eq!(name, "Link");
    assert_eq!(props.get("href"), Some(&json!("")));
    assert_eq!(props.get("to"), Some(&json!("https://x.com")));
}

#[test]
fn component_blocks_can_be_disabled() {
    let opts = Options {
        component_blocks: false,
        ..Options::default()
    };
    let mut s = Segmenter::new(opts);
    let u = s.append("[{c:\"Card\",p:{}}]\n\nAfter\n");
    assert_eq!(u.stable.len(), 1);
    assert_eq!(u.stable[0].kind, BlockKind::Paragraph);
    assert_eq!(u.stable[0].content, "[{c:\"Card\",p:{}}]\n\n");
}
