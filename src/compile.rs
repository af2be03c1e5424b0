//! The markdown-compiler collaborator boundary.
//!
//! The core treats "markdown -> generic tree" as an external, synchronous
//! function behind a narrow trait, with pluggable pre/post-processing
//! stages. Compiler failures degrade to an empty tree; they never
//! propagate past this boundary.

use fnv::FnvHashMap;
use thiserror::Error;

use crate::types::{ActiveBlock, Block};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("markdown compiler failed: {message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The external tree compiler.
pub trait TreeCompiler {
    type Tree: Clone;

    fn compile(&self, text: &str) -> Result<Self::Tree, CompileError>;

    /// Fallback tree used when compilation fails.
    fn empty_tree(&self) -> Self::Tree;
}

/// Adapt a closure as a compiler.
pub struct FnCompiler<T, F> {
    f: F,
    empty: T,
}

impl<T, F> FnCompiler<T, F>
where
    T: Clone,
    F: Fn(&str) -> Result<T, CompileError>,
{
    pub fn new(f: F, empty: T) -> Self {
        Self { f, empty }
    }
}

impl<T, F> TreeCompiler for FnCompiler<T, F>
where
    T: Clone,
    F: Fn(&str) -> Result<T, CompileError>,
{
    type Tree = T;

    fn compile(&self, text: &str) -> Result<T, CompileError> {
        (self.f)(text)
    }

    fn empty_tree(&self) -> T {
        self.empty.clone()
    }
}

/// Text -> text stage applied before the compiler.
///
/// Return `Some(new_text)` to replace the input, or `None` to leave it
/// unchanged.
pub trait TextStage: Send + Sync {
    fn apply(&self, text: &str) -> Option<String>;
}

pub struct FnTextStage<F>(pub F);

impl<F> TextStage for FnTextStage<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn apply(&self, text: &str) -> Option<String> {
        (self.0)(text)
    }
}

/// Guards ambiguous trailing setext underlines with a zero-width space so a
/// preview parse cannot reinterpret the previous line as a heading mid-stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetextGuardStage;

impl TextStage for SetextGuardStage {
    fn apply(&self, text: &str) -> Option<String> {
        let last_nl = text.rfind('\n')?;
        let prev = &text[..last_nl];
        if prev.is_empty() || prev.ends_with('\n') {
            return None;
        }

        // Only 1-2 dashes/equals are ambiguous; trailing whitespace after
        // the marker already breaks the setext reading.
        let last_line = &text[last_nl + 1..];
        let trimmed_last = last_line.trim();
        let ambiguous = matches!(trimmed_last, "-" | "--" | "=" | "==");
        let broken = last_line.ends_with(' ') || last_line.ends_with('\t');
        if !ambiguous || broken {
            return None;
        }

        let prev_line = prev.rsplit('\n').next().unwrap_or(prev);
        if prev_line.trim().is_empty() {
            return None;
        }

        let mut out = String::with_capacity(text.len() + 3);
        out.push_str(text);
        out.push('\u{200B}');
        Some(out)
    }
}

type PostStage<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// A compiler wrapped with pre/post-processing stages and total error
/// handling.
pub struct CompilePipeline<C: TreeCompiler> {
    compiler: C,
    pre: Vec<Box<dyn TextStage>>,
    post: Vec<PostStage<C::Tree>>,
}

impl<C: TreeCompiler> CompilePipeline<C> {
    /// Pipeline with the default pre stages.
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            pre: vec![Box::new(SetextGuardStage)],
            post: Vec::new(),
        }
    }

    /// Pipeline with no stages at all.
    pub fn bare(compiler: C) -> Self {
        Self {
            compiler,
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn push_pre_stage<S>(&mut self, stage: S)
    where
        S: TextStage + 'static,
    {
        self.pre.push(Box::new(stage));
    }

    pub fn with_pre_stage<S>(mut self, stage: S) -> Self
    where
        S: TextStage + 'static,
    {
        self.push_pre_stage(stage);
        self
    }

    pub fn push_post_stage<F>(&mut self, stage: F)
    where
        F: Fn(&mut C::Tree) + Send + Sync + 'static,
    {
        self.post.push(Box::new(stage));
    }

    pub fn with_post_stage<F>(mut self, stage: F) -> Self
    where
        F: Fn(&mut C::Tree) + Send + Sync + 'static,
    {
        self.push_post_stage(stage);
        self
    }

    /// Compile `text`. Total: compiler failures degrade to the empty tree.
    pub fn compile(&self, text: &str) -> C::Tree {
        let mut owned: Option<String> = None;
        for stage in &self.pre {
            let current = owned.as_deref().unwrap_or(text);
            if let Some(next) = stage.apply(current) {
                owned = Some(next);
            }
        }
        let input = owned.as_deref().unwrap_or(text);

        let mut tree = match self.compiler.compile(input) {
            Ok(tree) => tree,
            Err(err) => {
                if cfg!(debug_assertions) {
                    tracing::warn!(error = %err, "markdown compile failed; degrading to empty tree");
                }
                self.compiler.empty_tree()
            }
        };
        for stage in &self.post {
            stage(&mut tree);
        }
        tree
    }
}

/// Attach-once tree cache for stable blocks, keyed by content hash.
///
/// Stable content is immutable, so equal hashes always mean equal trees;
/// each distinct block body compiles exactly once. Active blocks compile
/// uncached from their repaired display text.
pub struct TreeCache<C: TreeCompiler> {
    pipeline: CompilePipeline<C>,
    trees: FnvHashMap<u64, C::Tree>,
}

impl<C: TreeCompiler> TreeCache<C> {
    pub fn new(pipeline: CompilePipeline<C>) -> Self {
        Self {
            pipeline,
            trees: FnvHashMap::default(),
        }
    }

    pub fn pipeline(&self) -> &CompilePipeline<C> {
        &self.pipeline
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn contains(&self, content_hash: u64) -> bool {
        self.trees.contains_key(&content_hash)
    }

    pub fn clear(&mut self) {
        self.trees.clear();
    }

    /// The compiled tree for a stable block, computed on first use.
    pub fn tree_for(&mut self, block: &Block) -> &C::Tree {
        let Self { pipeline, trees } = self;
        trees
            .entry(block.content_hash)
            .or_insert_with(|| pipeline.compile(&block.content))
    }

    /// Compile the active tail from its repaired display text. Never cached.
    pub fn compile_active(&self, active: &ActiveBlock) -> C::Tree {
        self.pipeline.compile(active.display_or_content())
    }
}
