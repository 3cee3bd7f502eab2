use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::User;

/// The signed-in account. Established by `account login`, torn down by
/// `account logout`; every user-scoped command reads it before touching the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
}

impl Session {
    fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            proj_dirs.data_dir().join("session.json")
        } else {
            PathBuf::from("session.json")
        }
    }

    pub fn current() -> Result<Option<Session>> {
        Self::load_from(&Self::default_path())
    }

    /// Like `current`, but a missing session is an error. Commands that
    /// render user-scoped data call this first.
    pub fn require() -> Result<Session> {
        Self::current()?.ok_or_else(|| {
            anyhow!("Not signed in. Run 'jobtrack account login <email>' first.")
        })
    }

    pub fn sign_in(user: &User) -> Result<()> {
        let session = Session {
            user_id: user.id,
            email: user.email.clone(),
        };
        session.store_to(&Self::default_path())
    }

    /// Returns whether a session existed.
    pub fn sign_out() -> Result<bool> {
        let path = Self::default_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn load_from(path: &Path) -> Result<Option<Session>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt session file at {}", path.display()))?;
        Ok(Some(session))
    }

    fn store_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("jobtrack-session-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_session_file_round_trip() {
        let path = temp_path("round-trip.json");
        let session = Session {
            user_id: 7,
            email: "me@example.com".to_string(),
        };
        session.store_to(&path).unwrap();

        let loaded = Session::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.user_id, 7);
        assert_eq!(loaded.email, "me@example.com");

        std::fs::remove_file(&path).unwrap();
        assert!(Session::load_from(&path).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let path = temp_path("corrupt.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Session::load_from(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
