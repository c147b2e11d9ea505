// src/lib.rs

pub mod config;
pub mod error;
pub mod metadata;
pub mod provider;
pub mod request;
pub mod response;
pub mod router;
pub mod telemetry;
pub mod verifier;

/// The public prelude for the `oidc-edge-gate` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{ClientSecret, Config, ConfigBuilder, GateSettings};
    pub use crate::error::{Disposition, GateError};
    pub use crate::metadata::{MetadataCache, ProviderMetadata};
    pub use crate::provider::model::{DiscoveryDocument, KeySet, SigningKey};
    pub use crate::provider::ProviderClient;
    pub use crate::router::{Gate, Outcome};
    pub use crate::verifier::{TokenVerifier, VerificationPolicy, VerifiedIdentity};
    pub use jsonwebtoken::Algorithm;
}
