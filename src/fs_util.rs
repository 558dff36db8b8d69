use std::path::{Path, PathBuf};

/// Resolve the user's home directory, or error if unset.
pub fn home_dir() -> anyhow::Result<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))
}

/// `~/.reflex`, or the current directory when HOME is unset.
pub fn default_state_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".reflex")
}

/// Write `data` to a sibling temp file, then rename it over `path` so
/// readers never see a half-written blob.
pub async fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", tmp.display()))?;
    set_secure_file_permissions(&tmp)?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to rename {}: {e}", tmp.display()))
}

#[cfg(unix)]
pub fn set_secure_dir_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| anyhow::anyhow!("failed to chmod 700 {}: {e}", path.display()))
}

#[cfg(not(unix))]
pub fn set_secure_dir_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(unix)]
pub fn set_secure_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| anyhow::anyhow!("failed to chmod 600 {}: {e}", path.display()))
}

#[cfg(not(unix))]
pub fn set_secure_file_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
