//! The contract every site bridge implements.
//!
//! # Architecture
//!
//! ```text
//! Parameters → select_context → Bridge::parse_context → Invocation
//!            → Invocation::collect(&Pipeline) → Collected { items, identity }
//! ```
//!
//! A bridge declares its contexts statically in a [`BridgeDescriptor`].
//! Context selection and typed validation happen before any network access.
//! [`DynBridge`] is the object-safe face used by the registry; it erases the
//! bridge's context type behind a single-use [`Invocation`].

mod context;
mod registry;

pub use context::{select_context, ContextSpec, ParameterSpec, Parameters, ResolvedContext};
pub use registry::BridgeRegistry;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::Result;
use crate::domain::Item;
use crate::pipeline::Pipeline;

/// Static description of a bridge.
#[derive(Debug)]
pub struct BridgeDescriptor {
    /// Lookup key, e.g. `"AO3"`.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    pub uri: &'static str,
    pub description: &'static str,
    pub maintainer: &'static str,
    /// How long run results and secondary pages stay cached.
    pub cache_timeout: Duration,
    pub contexts: &'static [ContextSpec],
}

impl BridgeDescriptor {
    /// `favicon.ico` at the root of the bridge's site.
    pub fn default_icon(&self) -> Option<String> {
        Url::parse(self.uri)
            .and_then(|uri| uri.join("/favicon.ico"))
            .ok()
            .map(String::from)
    }

    pub fn default_identity(&self) -> Identity {
        Identity {
            name: self.name.to_string(),
            uri: self.uri.to_string(),
            icon: self.default_icon(),
        }
    }

    pub fn select_context(&self, parameters: &Parameters) -> Result<ResolvedContext> {
        select_context(self.id, self.contexts, parameters)
    }
}

/// How a feed presents itself: name, canonical URI and icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub uri: String,
    pub icon: Option<String>,
}

/// Output of one run: the items and the identity resolved while collecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collected {
    pub identity: Identity,
    pub items: Vec<Item>,
}

impl Collected {
    pub fn new(identity: Identity, items: Vec<Item>) -> Self {
        Self { identity, items }
    }
}

/// A site integration with a typed context.
#[async_trait]
pub trait Bridge: Clone + Send + Sync + 'static {
    type Context: Send + Sync + 'static;

    fn descriptor(&self) -> &'static BridgeDescriptor;

    /// Typed validation of the selected context. Runs before any fetch.
    fn parse_context(&self, resolved: &ResolvedContext) -> Result<Self::Context>;

    /// Identity known before collecting.
    fn identity(&self, _context: &Self::Context) -> Identity {
        self.descriptor().default_identity()
    }

    async fn collect(&self, context: &Self::Context, pipeline: &Pipeline) -> Result<Collected>;
}

/// A bridge bound to a validated context. Collecting consumes it.
#[async_trait]
pub trait Invocation: Send {
    fn descriptor(&self) -> &'static BridgeDescriptor;

    fn context(&self) -> &ResolvedContext;

    fn identity(&self) -> Identity;

    async fn collect(self: Box<Self>, pipeline: &Pipeline) -> Result<Collected>;
}

/// Object-safe bridge, as held by [`BridgeRegistry`].
pub trait DynBridge: Send + Sync {
    fn describe(&self) -> &'static BridgeDescriptor;

    /// Select and validate a context for `parameters`.
    fn prepare(&self, parameters: &Parameters) -> Result<Box<dyn Invocation>>;
}

impl<B: Bridge> DynBridge for B {
    fn describe(&self) -> &'static BridgeDescriptor {
        Bridge::descriptor(self)
    }

    fn prepare(&self, parameters: &Parameters) -> Result<Box<dyn Invocation>> {
        let resolved = Bridge::descriptor(self).select_context(parameters)?;
        let context = self.parse_context(&resolved)?;
        Ok(Box::new(Prepared {
            bridge: self.clone(),
            resolved,
            context,
        }))
    }
}

struct Prepared<B: Bridge> {
    bridge: B,
    resolved: ResolvedContext,
    context: B::Context,
}

#[async_trait]
impl<B: Bridge> Invocation for Prepared<B> {
    fn descriptor(&self) -> &'static BridgeDescriptor {
        Bridge::descriptor(&self.bridge)
    }

    fn context(&self) -> &ResolvedContext {
        &self.resolved
    }

    fn identity(&self) -> Identity {
        self.bridge.identity(&self.context)
    }

    async fn collect(self: Box<Self>, pipeline: &Pipeline) -> Result<Collected> {
        self.bridge.collect(&self.context, pipeline).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::app::BridgeError;

    #[test]
    fn test_prepare_validates_before_collect() {
        let bridge = ListingBridge;
        let err = bridge
            .prepare(&Parameters::new().with("id", "abc"))
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::Config { .. }));

        let invocation = bridge.prepare(&Parameters::new().with("id", "5")).unwrap();
        assert_eq!(invocation.context().name, "Work");
        assert_eq!(invocation.identity().name, "Listing");
    }

    #[test]
    fn test_default_icon() {
        assert_eq!(
            DESCRIPTOR.default_icon().as_deref(),
            Some("https://listing.example/favicon.ico")
        );
    }
}
