//! Secret resolution for the boundary components.
//!
//! [`SecretRefs`] maps secret names to references.
//! [`KeyStore`] is the async trait for resolving a reference into its plaintext value;
//! [`SsmKeyStore`] uses AWS SSM Parameter Store and [`EnvKeyStore`] the process environment.

mod config;
mod env;
mod ssm;

pub use config::SecretRefs;
pub use env::EnvKeyStore;
pub use ssm::SsmKeyStore;

use anyhow::Result;
use late_bus_tracker::config::Credentials;

/// Name under which the feed API key reference is stored in [`SecretRefs`].
pub const FEED_API_KEY: &str = "feed_api_key";

/// Resolves a vault reference (e.g. an SSM parameter path) into a plaintext secret.
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, reference: &str) -> Result<String>;
}

/// Resolves every secret the run needs, once, at startup.
pub async fn resolve_credentials(
    store: &dyn KeyStore,
    refs: &SecretRefs,
    default_feed_ref: &str,
) -> Result<Credentials> {
    let feed_api_key = store.get(refs.get_or(FEED_API_KEY, default_feed_ref)).await?;
    Ok(Credentials { feed_api_key })
}
