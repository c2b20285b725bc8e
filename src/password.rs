use crate::error::ApiError;

/// Lowest cost bcrypt accepts. Keeps hashing fast in tests and local scaffolding.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Hashes `password` with a fresh salt. Runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Checks `password` against a stored hash. A malformed stored hash never matches.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is unreadable");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_and_verifiable() {
        let first = hash_password("hunter2".into(), TEST_BCRYPT_COST).await.unwrap();
        let second = hash_password("hunter2".into(), TEST_BCRYPT_COST).await.unwrap();

        assert_ne!(first, "hunter2");
        assert_ne!(first, second);
        assert!(verify_password("hunter2".into(), first.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), first).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_does_not_match() {
        assert!(!verify_password("pw".into(), "plaintext".into()).await.unwrap());
    }
}
