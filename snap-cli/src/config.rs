//! Identity file handling for snap-cli.
//!
//! An identity file is the JSON export `{publicJwk, privateJwk}` written by
//! `snap-cli keygen`. It holds a private key, so it is written owner-only.

use anyhow::{Context, Result};
use snap_client::{import_signing_keys, ExportedIdentity, SigningKeys};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// File name used inside the data directory.
pub const IDENTITY_FILE: &str = "identity.json";

/// Default identity path inside the platform data directory.
pub fn default_identity_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "blindsnap", "snap-cli")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().join(IDENTITY_FILE))
}

/// Load an exported identity from disk.
pub async fn load_identity(path: &Path) -> Result<ExportedIdentity> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read identity file {}", path.display()))?;
    ExportedIdentity::from_json(&contents)
        .with_context(|| format!("Invalid identity file {}", path.display()))
}

/// Load an identity and import it as signing keys.
pub async fn load_signing_keys(path: &Path) -> Result<SigningKeys> {
    let identity = load_identity(path).await?;
    import_signing_keys(&identity)
        .with_context(|| format!("Identity in {} is not a usable P-256 key", path.display()))
}

/// Write an identity to disk, creating missing parent directories.
///
/// Refuses to overwrite an existing file. The file is created owner-only,
/// and only directories created here are restricted to the owner.
pub async fn save_identity(path: &Path, identity: &ExportedIdentity) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_private_dirs(parent).await?;
    }

    let contents = identity.to_json_pretty()?;
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = match options.open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => anyhow::bail!(
            "Identity already exists at {}. Delete it to generate a new one.",
            path.display()
        ),
        Err(e) => return Err(e).context("Failed to create identity file"),
    };
    file.write_all(contents.as_bytes())
        .await
        .context("Failed to save identity")?;
    file.flush().await.context("Failed to save identity")?;
    Ok(())
}

/// Create `dir` and any missing ancestors, setting 0700 on the ones created.
async fn create_private_dirs(dir: &Path) -> Result<()> {
    let missing: Vec<&Path> = dir.ancestors().take_while(|d| !d.exists()).collect();
    if missing.is_empty() {
        return Ok(());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .context("Failed to create identity directory")?;
    for created in missing {
        set_dir_permissions_0700(created).await?;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
