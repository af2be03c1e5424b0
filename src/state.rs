use crate::types::{ActiveBlock, Block, BlockId, Update};

/// A UI-friendly container for streaming document state.
///
/// Keeps only the renderable split:
/// - stable blocks (append-only, cache by `content_hash`)
/// - an optional active block (changes every tick, re-render unconditionally)
///
/// It intentionally does not own the `Segmenter`, to stay render- and
/// pipeline-agnostic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocumentState {
    stable: Vec<Block>,
    active: Option<ActiveBlock>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stable(&self) -> &[Block] {
        &self.stable
    }

    pub fn active(&self) -> Option<&ActiveBlock> {
        self.active.as_ref()
    }

    pub fn clear(&mut self) {
        self.stable.clear();
        self.active = None;
    }

    pub fn apply(&mut self, update: Update) {
        self.stable.extend(update.stable);
        self.active = update.active;
    }

    pub fn find_stable(&self, id: BlockId) -> Option<&Block> {
        self.stable.iter().find(|b| b.id == id)
    }
}
