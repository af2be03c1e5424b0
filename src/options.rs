use crate::repair::RepairOptions;

#[derive(Debug, Clone)]
pub struct Options {
    /// Recognize the embedded `[{c:"Name",...}]` component grammar as a
    /// block-level construct. When disabled, such spans segment as text.
    pub component_blocks: bool,
    pub repair: RepairOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            component_blocks: true,
            repair: RepairOptions::default(),
        }
    }
}
