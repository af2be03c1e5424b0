pub mod compile;
pub mod component;
pub mod meta;
pub mod options;
pub mod registry;
pub mod repair;
pub mod sanitize;
pub mod state;
pub mod stream;
pub mod syntax;
pub mod types;

#[cfg(feature = "pulldown")]
pub mod adapters;

pub use compile::*;
pub use component::*;
pub use meta::*;
pub use options::*;
pub use registry::*;
pub use repair::*;
pub use sanitize::*;
pub use state::*;
pub use stream::*;
pub use syntax::*;
pub use types::*;
