use async_trait::async_trait;

use crate::error::TransportError;

/// A text-generation endpoint: one system instruction and one structured
/// payload in, free text out. The text is treated as untrusted.
#[async_trait]
pub trait TextGenerationBackend: Send + Sync {
    async fn generate(
        &self,
        system_instruction: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<String, TransportError>;
}
