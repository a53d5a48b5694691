//! Generate a signing identity.

use anyhow::Result;
use snap_client::generate_identity;
use std::path::Path;

use crate::config::save_identity;

/// Run the keygen command.
pub async fn run(out: &Path) -> Result<()> {
    let identity = generate_identity();
    save_identity(out, &identity).await?;

    println!("Identity generated!");
    println!();
    println!("  File: {}", out.display());
    println!("  Public JWK: {}", serde_json::to_string(&identity.public_jwk)?);
    println!();
    println!("Sign uploads with: snap-cli push --identity {} ...", out.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_signing_keys;
    use tempfile::tempdir;

    #[tokio::test]
    async fn keygen_writes_usable_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("id.json");

        run(&path).await.unwrap();

        let keys = load_signing_keys(&path).await.unwrap();
        assert!(keys.private_key().is_some());
    }

    #[tokio::test]
    async fn keygen_fails_if_file_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("id.json");

        run(&path).await.unwrap();
        assert!(run(&path).await.is_err());
    }
}
