use std::sync::Arc;

use crate::app::{BridgeError, Result};
use crate::bridges;

use super::{BridgeDescriptor, DynBridge};

/// Bridges available to the runner, looked up by id.
#[derive(Default)]
pub struct BridgeRegistry {
    bridges: Vec<Arc<dyn DynBridge>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every bridge shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for bridge in bridges::all() {
            registry.register(bridge);
        }
        registry
    }

    pub fn register(&mut self, bridge: Arc<dyn DynBridge>) {
        let id = bridge.describe().id;
        if self.position(id).is_some() {
            tracing::warn!("Bridge {} registered twice, keeping the first", id);
            return;
        }
        self.bridges.push(bridge);
    }

    /// Case-insensitive lookup. `AO3`, `ao3` and `AO3Bridge` all resolve.
    pub fn get(&self, name: &str) -> Result<Arc<dyn DynBridge>> {
        let trimmed = name.trim();
        let bare = strip_bridge_suffix(trimmed);

        self.position(trimmed)
            .or_else(|| self.position(bare))
            .map(|i| self.bridges[i].clone())
            .ok_or_else(|| BridgeError::config(trimmed, "no such bridge"))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static BridgeDescriptor> + '_ {
        self.bridges.iter().map(|b| b.describe())
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.bridges
            .iter()
            .position(|b| b.describe().id.eq_ignore_ascii_case(id))
    }
}

fn strip_bridge_suffix(name: &str) -> &str {
    const SUFFIX: &str = "bridge";
    let split = name.len().saturating_sub(SUFFIX.len());
    match name.get(split..) {
        Some(tail) if split > 0 && tail.eq_ignore_ascii_case(SUFFIX) => &name[..split],
        _ => name,
    }
}
