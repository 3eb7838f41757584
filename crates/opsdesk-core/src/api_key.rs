use serde::Serialize;

/// API key metadata. Only the SHA-256 hash of the secret is stored.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub key_hash: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
}
