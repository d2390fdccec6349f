use anyhow::{Result, anyhow};

use super::KeyStore;

/// Resolves secrets from environment variables (including a loaded `.env`).
pub struct EnvKeyStore;

#[async_trait::async_trait]
impl KeyStore for EnvKeyStore {
    async fn get(&self, reference: &str) -> Result<String> {
        std::env::var(reference)
            .map_err(|_| anyhow!("environment variable '{reference}' is not set"))
    }
}
