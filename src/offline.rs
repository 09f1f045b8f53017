//! Offline asset cache policy.
//!
//! A fixed manifest of static assets is copied into a cache named after the
//! current version tag on install. Requests are answered from the cache first
//! and fall back to the network. On activation every cache with a different
//! name is deleted.
//!
//! The policy is generic over [`CacheBackend`] so it can run against the
//! browser's Cache Storage (see [`crate::browser::WebCacheBackend`]) or an
//! in-memory store in tests. An install failure is logged and reported; the
//! app keeps working online without the cache.

use crate::error::OfflineError;
use log::{debug, info, warn};

#[allow(async_fn_in_trait)]
pub trait CacheBackend {
    type Request;
    type Response;

    /// Fetch every asset into the cache called `cache_name`.
    async fn populate(&self, cache_name: &str, assets: &[&str]) -> Result<(), OfflineError>;

    async fn lookup(&self, request: &Self::Request) -> Option<Self::Response>;

    async fn fetch(&self, request: &Self::Request) -> Result<Self::Response, OfflineError>;

    async fn cache_names(&self) -> Result<Vec<String>, OfflineError>;

    async fn delete(&self, cache_name: &str) -> Result<bool, OfflineError>;
}

pub struct OfflineCache<B> {
    version: String,
    manifest: Vec<&'static str>,
    backend: B,
}

impl<B: CacheBackend> OfflineCache<B> {
    pub fn new(version: impl Into<String>, manifest: &[&'static str], backend: B) -> Self {
        Self {
            version: version.into(),
            manifest: manifest.to_vec(),
            backend,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn install(&self) -> Result<(), OfflineError> {
        match self.backend.populate(&self.version, &self.manifest).await {
            Ok(()) => {
                info!("cached {} assets in {}", self.manifest.len(), self.version);
                Ok(())
            }
            Err(err) => {
                warn!("offline cache unavailable, continuing online only: {err}");
                Err(err)
            }
        }
    }

    /// Cache first, network second.
    pub async fn respond(&self, request: &B::Request) -> Result<B::Response, OfflineError> {
        if let Some(hit) = self.backend.lookup(request).await {
            return Ok(hit);
        }
        debug!("cache miss, going to network");
        self.backend.fetch(request).await
    }

    /// Delete every cache not named after the current version. Returns the
    /// names that were removed.
    pub async fn activate(&self) -> Result<Vec<String>, OfflineError> {
        let mut pruned = Vec::new();
        for name in self.backend.cache_names().await? {
            if name == self.version {
                continue;
            }
            if self.backend.delete(&name).await? {
                info!("pruned stale cache {name}");
                pruned.push(name);
            }
        }
        Ok(pruned)
    }
}
