//! The external component-registry collaborator.
//!
//! Embedded component names resolve through a registry lookup. An unknown
//! name is not an error: callers render a visible placeholder and the
//! pipeline keeps going.

use std::collections::HashMap;

/// A registered component and its optional streaming skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered<H> {
    pub component: H,
    pub skeleton: Option<H>,
}

pub trait ComponentRegistry {
    type Handle;

    fn get(&self, name: &str) -> Option<&Registered<Self::Handle>>;
}

/// Map-backed registry.
#[derive(Debug, Clone)]
pub struct MapRegistry<H> {
    entries: HashMap<String, Registered<H>>,
}

impl<H> Default for MapRegistry<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<H> MapRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, component: H) {
        self.entries.insert(
            name.into(),
            Registered {
                component,
                skeleton: None,
            },
        );
    }

    pub fn insert_with_skeleton(&mut self, name: impl Into<String>, component: H, skeleton: H) {
        self.entries.insert(
            name.into(),
            Registered {
                component,
                skeleton: Some(skeleton),
            },
        );
    }

    pub fn with(mut self, name: impl Into<String>, component: H) -> Self {
        self.insert(name, component);
        self
    }
}

impl<H> ComponentRegistry for MapRegistry<H> {
    type Handle = H;

    fn get(&self, name: &str) -> Option<&Registered<H>> {
        self.entries.get(name)
    }
}
