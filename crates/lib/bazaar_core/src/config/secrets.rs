//! Signing secret resolution: environment variable, else a persisted file.

use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

/// Resolve a signing secret: env var `env_key` → `$APP_DATA/bazaar/<file_name>`.
///
/// When neither exists a new 64-char secret is generated and persisted so
/// that tokens survive restarts.
pub fn resolve_secret(env_key: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(env_key)
        && !secret.is_empty()
    {
        return secret;
    }
    resolve_secret_at(&secret_path(file_name))
}

/// Read the secret at `path`, generating and writing one if missing or empty.
pub fn resolve_secret_at(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret = generate_secret();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new signing secret"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not persist signing secret"),
    }
    secret
}

fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bazaar")
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_persists_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jwt-secret");

        let first = resolve_secret_at(&path);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));

        let second = resolve_secret_at(&path);
        assert_eq!(first, second);
    }

    #[test]
    fn reads_existing_file_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "  kept-secret \n").unwrap();
        assert_eq!(resolve_secret_at(&path), "kept-secret");
    }

    #[test]
    fn empty_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "\n").unwrap();
        let secret = resolve_secret_at(&path);
        assert_eq!(secret.len(), 64);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), secret);
    }
}
