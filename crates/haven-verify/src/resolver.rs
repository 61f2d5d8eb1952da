//! Resolver abstraction for the content-addressed network.
//!
//! Resolution of a content address into raw bytes is performed by an
//! external network (object resolve/pin); this crate only defines the
//! seam. [`StaticResolver`] is an in-memory implementation for tests and
//! local tooling.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, VerifyError};

/// Resolves a content address to the bytes it names.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `address`, returning the referenced bytes.
    async fn resolve(&self, address: &str) -> Result<Bytes>;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for std::sync::Arc<R> {
    async fn resolve(&self, address: &str) -> Result<Bytes> {
        (**self).resolve(address).await
    }
}

/// A fixed in-memory address → bytes map.
pub struct StaticResolver {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl StaticResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Register the bytes a given address resolves to.
    pub fn insert(&self, address: impl Into<String>, bytes: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(address.into(), bytes.into());
        }
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, address: &str) -> Result<Bytes> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(address).cloned())
            .ok_or_else(|| VerifyError::Unresolvable(address.to_string()))
    }
}
