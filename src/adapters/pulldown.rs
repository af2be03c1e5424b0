use pulldown_cmark::{Event, Options as PulldownOptions, Parser};

use crate::compile::{CompileError, TreeCompiler};

/// `pulldown-cmark` as the external tree compiler.
///
/// The tree is the owned event stream; renderers walk events per block.
#[derive(Debug, Clone)]
pub struct PulldownCompiler {
    pub options: PulldownOptions,
}

impl Default for PulldownCompiler {
    fn default() -> Self {
        Self {
            options: PulldownOptions::ENABLE_TABLES | PulldownOptions::ENABLE_STRIKETHROUGH,
        }
    }
}

impl PulldownCompiler {
    pub fn new(options: PulldownOptions) -> Self {
        Self { options }
    }
}

impl TreeCompiler for PulldownCompiler {
    type Tree = Vec<Event<'static>>;

    fn compile(&self, text: &str) -> Result<Self::Tree, CompileError> {
        Ok(Parser::new_ext(text, self.options)
            .map(|event| event.into_static())
            .collect())
    }

    fn empty_tree(&self) -> Self::Tree {
        Vec::new()
    }
}
