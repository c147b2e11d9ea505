// src/metadata.rs

use crate::error::GateError;
use crate::provider::model::{DiscoveryDocument, KeySet};
use crate::provider::ProviderClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

/// Everything the router needs from the provider, fetched together.
#[derive(Debug)]
pub struct ProviderMetadata {
    pub discovery: DiscoveryDocument,
    pub keys: KeySet,
}

/// Lazily populated cache of the provider's discovery document and key set.
///
/// The cache is either empty or holds one complete `ProviderMetadata`; the
/// snapshot is swapped in as a whole, so readers never see a partial write.
/// Population happens once per cache lifetime. There is no background
/// refresh.
#[derive(Default)]
pub struct MetadataCache {
    slot: Mutex<Slot>,
    // Completed bootstrap attempts. Only bumped while `slot` is held.
    attempts: AtomicU64,
}

#[derive(Default)]
struct Slot {
    ready: Option<Arc<ProviderMetadata>>,
    last_failure: Option<String>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached metadata, bootstrapping it first if the cache is empty.
    ///
    /// Bootstrap is single-flight: the first caller fetches while holding the
    /// gate, and callers that queued behind it get that attempt's result,
    /// success or failure, instead of issuing their own fetch. A caller that
    /// arrives after a failed attempt starts a fresh one.
    #[instrument(skip_all, err)]
    pub async fn ensure_ready(
        &self,
        provider: &ProviderClient,
    ) -> Result<Arc<ProviderMetadata>, GateError> {
        let observed = self.attempts.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;

        if let Some(metadata) = &slot.ready {
            return Ok(Arc::clone(metadata));
        }
        if self.attempts.load(Ordering::Acquire) != observed {
            if let Some(reason) = &slot.last_failure {
                debug!("Sharing the result of the bootstrap this caller waited on");
                return Err(GateError::Bootstrap(reason.clone()));
            }
        }

        let attempt = bootstrap(provider).await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match attempt {
            Ok(metadata) => {
                let metadata = Arc::new(metadata);
                info!(
                    issuer = metadata.discovery.issuer.as_deref().unwrap_or("unknown"),
                    keys = metadata.keys.len(),
                    "Provider metadata cached for the lifetime of this gate"
                );
                slot.ready = Some(Arc::clone(&metadata));
                slot.last_failure = None;
                Ok(metadata)
            }
            Err(e) => {
                let reason = e.to_string();
                error!("Bootstrap failed, cache stays empty: {}", reason);
                slot.last_failure = Some(reason.clone());
                Err(GateError::Bootstrap(reason))
            }
        }
    }

    /// A snapshot of the cached metadata, if populated. Never performs I/O.
    pub async fn current(&self) -> Option<Arc<ProviderMetadata>> {
        self.slot.lock().await.ready.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.slot.lock().await.ready.is_some()
    }
}

/// Discovery, then keys. Either both succeed or nothing is returned.
async fn bootstrap(provider: &ProviderClient) -> Result<ProviderMetadata, GateError> {
    let discovery = provider.fetch_discovery().await?;
    let keys = provider.fetch_key_set(&discovery.jwks_uri).await?;
    if keys.is_empty() {
        return Err(GateError::InvalidProviderResponse(
            "key set contains no keys".to_string(),
        ));
    }
    Ok(ProviderMetadata { discovery, keys })
}
