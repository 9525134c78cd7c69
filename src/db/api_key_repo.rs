use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// The account an API key belongs to.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KeyOwner {
    pub user_id: String,
    pub email: String,
}

/// API keys are shown once at issue time; only their SHA-256 is stored.
#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: SqlitePool,
}

impl ApiKeyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issues a new key for `user_id` and returns the plaintext.
    pub async fn issue(&self, user_id: &str, label: Option<&str>) -> Result<String, sqlx::Error> {
        let key = generate_key();

        sqlx::query("INSERT INTO api_keys (key_hash, user_id, label, created_at) VALUES (?, ?, ?, ?)")
            .bind(hash_key(&key))
            .bind(user_id)
            .bind(label)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(key)
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<KeyOwner>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT p.id AS user_id, p.email AS email
            FROM api_keys k
            JOIN profiles p ON p.id = k.user_id
            WHERE k.key_hash = ?
            "#,
        )
        .bind(hash_key(key))
        .fetch_optional(&self.pool)
        .await
    }
}

/// Hex SHA-256 of a key.
pub fn hash_key(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn generate_key() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};

    #[test]
    fn test_generate_key_format() {
        let key = generate_key();
        // 32 bytes base64url without padding
        assert_eq!(key.len(), 43);
        assert!(!key.contains('='));
        assert_ne!(key, generate_key());
    }

    #[test]
    fn test_hash_key() {
        assert_eq!(
            hash_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_issue_and_lookup() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "key@example.com").await;

        let key = ctx.store.api_keys.issue(&user.id, Some("phone")).await.unwrap();
        let owner = ctx.store.api_keys.lookup(&key).await.unwrap().unwrap();
        assert_eq!(owner.user_id, user.id);
        assert_eq!(owner.email, "key@example.com");

        assert!(ctx.store.api_keys.lookup("not-a-key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plaintext_not_stored() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "hash@example.com").await;
        let key = ctx.store.api_keys.issue(&user.id, None).await.unwrap();

        let stored: Vec<(String,)> = sqlx::query_as("SELECT key_hash FROM api_keys")
            .fetch_all(ctx.store.pool())
            .await
            .unwrap();
        assert_eq!(stored, vec![(hash_key(&key),)]);
    }
}
