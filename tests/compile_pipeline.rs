use std::cell::Cell;
use std::rc::Rc;

use stabledown::{
    CompileError, CompilePipeline, DocumentState, FnCompiler, FnTextStage, Options, Segmenter,
    TreeCache,
};

fn counting_compiler(calls: Rc<Cell<usize>>) -> FnCompiler<Vec<String>, impl Fn(&str) -> Result<Vec<String>, CompileError>> {
    FnCompiler::new(
        move |text: &str| {
            calls.set(calls.get() + 1);
            Ok(vec![text.to_string()])
        },
        Vec::new(),
    )
}

#[test]
fn stable_blocks_compile_exactly_once() {
    let calls = Rc::new(Cell::new(0usize));
    let mut cache = TreeCache::new(CompilePipeline::bare(counting_compiler(calls.clone())));

    let mut s = Segmenter::new(Options::default());
    let mut blocks = s.append("first\n\nsecond\n\n").stable;
    blocks.extend(s.finalize().stable);
    assert_eq!(blocks.len(), 2);

    let first_tree = cache.tree_for(&blocks[0]).clone();
    assert_eq!(first_tree, vec!["first\n\n".to_string()]);
    assert_eq!(calls.get(), 1);

    // Same hash: cached, no recompile.
    let again = cache.tree_for(&blocks[0]).clone();
    assert_eq!(again, first_tree);
    assert_eq!(calls.get(), 1);

    cache.tree_for(&blocks[1]);
    assert_eq!(calls.get(), 2);
    assert!(cache.contains(blocks[0].content_hash));
}

#[test]
fn active_blocks_compile_from_the_repaired_display() {
    let calls = Rc::new(Cell::new(0usize));
    let cache = TreeCache::new(CompilePipeline::bare(counting_compiler(calls.clone())));

    let mut s = Segmenter::new(Options::default());
    let active = s.append("streaming **bold").active.expect("active");
    let tree = cache.compile_active(&active);
    assert_eq!(tree, vec!["streaming **bold**".to_string()]);

    // Active compiles are never cached.
    cache.compile_active(&active);
    assert_eq!(calls.get(), 2);
}

#[test]
fn compiler_failure_degrades_to_the_empty_tree() {
    let compiler = FnCompiler::new(
        |_: &str| -> Result<Vec<String>, CompileError> { Err(CompileError::new("parser blew up")) },
        Vec::new(),
    );
    let mut cache = TreeCache::new(CompilePipeline::bare(compiler));

    let mut s = Segmenter::new(Options::default());
    let blocks = s.append("broken\n\n").stable;
    assert_eq!(cache.tree_for(&blocks[0]), &Vec::<String>::new());
}

#[test]
fn default_pipeline_guards_ambiguous_setext_tails() {
    let compiler = FnCompiler::new(|text: &str| Ok(vec![text.to_string()]), Vec::new());
    let pipeline = CompilePipeline::new(compiler);
    assert_eq!(pipeline.compile("Some text\n--"), vec!["Some text\n--\u{200B}".to_string()]);
    assert_eq!(pipeline.compile("Some text\n---"), vec!["Some text\n---".to_string()]);
}

#[test]
fn user_stages_wrap_the_compiler() {
    let compiler = FnCompiler::new(|text: &str| Ok(vec![text.to_string()]), Vec::new());
    let pipeline = CompilePipeline::bare(compiler)
        .with_pre_stage(FnTextStage(|t: &str| Some(t.to_uppercase())))
        .with_post_stage(|tree: &mut Vec<String>| tree.push("marker".to_string()));
    assert_eq!(
        pipeline.compile("abc"),
        vec!["ABC".to_string(), "marker".to_string()]
    );
}

#[test]
fn document_state_accumulates_updates() {
    let mut s = Segmenter::new(Options::default());
    let mut doc = DocumentState::new();

    doc.apply(s.append("one\n\ntw"));
    assert_eq!(doc.stable().len(), 1);
    assert_eq!(doc.active().unwrap().content, "tw");

    doc.apply(s.append("o\n\n"));
    assert_eq!(doc.stable().len(), 2);
    assert!(doc.active().is_none());

    let id = doc.stable()[0].id;
    assert_eq!(doc.find_stable(id).unwrap().content, "one\n\n");

    doc.apply(s.finalize());
    assert_eq!(doc.stable().len(), 2);
}
