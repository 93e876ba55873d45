//! User records and credential checks.
//!
//! Records live in a flat JSON array on disk. The file is validated hard
//! at startup (bad store = refuse to start) and rewritten wholesale after
//! every successful registration. The full rewrite is O(n) per write —
//! an accepted scaling limit for a service of this size, not a bug.
//!
//! Passwords are stored as bcrypt hashes, never plaintext; verification
//! is bcrypt's constant-time-safe comparison.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
}

/// Outcome of a login attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoginResult {
    Accepted,
    UnknownUser,
    WrongPassword,
}

/// Outcome of a registration attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterResult {
    Created,
    AlreadyExists,
}

/// In-memory view of the record store plus a username index.
#[derive(Debug)]
pub struct AuthStore {
    path: PathBuf,
    records: Vec<UserRecord>,
    usernames: HashSet<String>,
}

impl AuthStore {
    /// Load and validate the record store at `path`.
    ///
    /// Fatal if the file is missing, not JSON, not an array, or any
    /// element is not exactly a `{username, password_hash}` object.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("user database {} cannot be read", path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).context("user database is not in a valid JSON format")?;
        if !value.is_array() {
            bail!("user database is not a JSON array");
        }
        let records: Vec<UserRecord> = serde_json::from_value(value)
            .context("user database contains invalid user record formats")?;

        let usernames = records.iter().map(|r| r.username.clone()).collect();
        Ok(AuthStore {
            path: path.to_path_buf(),
            records,
            usernames,
        })
    }

    /// Check credentials against the stored hash.
    pub fn login(&self, username: &str, password: &str) -> LoginResult {
        match self.records.iter().find(|r| r.username == username) {
            None => LoginResult::UnknownUser,
            Some(record) => {
                // A corrupt hash verifies as a wrong password rather than
                // tearing the connection down.
                if bcrypt::verify(password, &record.password_hash).unwrap_or(false) {
                    LoginResult::Accepted
                } else {
                    LoginResult::WrongPassword
                }
            }
        }
    }

    /// Create a record with a freshly salted hash and rewrite the store.
    ///
    /// A persistence failure is logged and the in-memory record stands;
    /// no in-session error is fatal to the server.
    pub fn register(&mut self, username: &str, password: &str) -> anyhow::Result<RegisterResult> {
        if self.usernames.contains(username) {
            return Ok(RegisterResult::AlreadyExists);
        }
        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).context("hashing password")?;
        self.records.push(UserRecord {
            username: username.to_string(),
            password_hash,
        });
        self.usernames.insert(username.to_string());
        if let Err(err) = self.persist() {
            warn!(error = %err, "failed to rewrite user database");
        }
        Ok(RegisterResult::Created)
    }

    /// Rewrite the whole store as a formatted JSON array.
    fn persist(&self) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.records).context("serializing records")?;
        fs::write(&self.path, text)
            .with_context(|| format!("writing user database {}", self.path.display()))?;
        Ok(())
    }

    /// Number of known accounts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ttt-users-{}-{name}.json", std::process::id()))
    }

    fn store_with(name: &str, contents: &str) -> PathBuf {
        let path = store_path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    // Cheap hashes for tests; the store verifies whatever cost the hash
    // itself carries.
    fn test_hash(password: &str) -> String {
        bcrypt::hash(password, 4).unwrap()
    }

    #[test]
    fn missing_store_is_fatal() {
        assert!(AuthStore::load(Path::new("/nonexistent/users.json")).is_err());
    }

    #[test]
    fn non_json_store_is_fatal() {
        let path = store_with("notjson", "[{");
        let err = AuthStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("not in a valid JSON format"));
    }

    #[test]
    fn non_array_store_is_fatal() {
        let path = store_with("notarray", r#"{"username": "a"}"#);
        let err = AuthStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("not a JSON array"));
    }

    #[test]
    fn bad_record_shape_is_fatal() {
        for (name, contents) in [
            ("extrakey", r#"[{"username": "a", "password_hash": "h", "age": 3}]"#),
            ("missingkey", r#"[{"username": "a"}]"#),
            ("notobject", r#"["a"]"#),
        ] {
            let path = store_with(name, contents);
            let err = AuthStore::load(&path).unwrap_err();
            assert!(
                err.to_string().contains("invalid user record formats"),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn empty_array_is_a_valid_store() {
        let path = store_with("empty", "[]");
        let store = AuthStore::load(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn login_outcomes() {
        let record = UserRecord {
            username: "alice".into(),
            password_hash: test_hash("pw"),
        };
        let path = store_with("login", &serde_json::to_string(&vec![record]).unwrap());
        let store = AuthStore::load(&path).unwrap();

        assert_eq!(store.login("alice", "pw"), LoginResult::Accepted);
        assert_eq!(store.login("alice", "wrong"), LoginResult::WrongPassword);
        assert_eq!(store.login("nobody", "pw"), LoginResult::UnknownUser);
    }

    #[test]
    fn corrupt_hash_counts_as_wrong_password() {
        let record = UserRecord {
            username: "alice".into(),
            password_hash: "not-a-bcrypt-hash".into(),
        };
        let path = store_with("corrupt", &serde_json::to_string(&vec![record]).unwrap());
        let store = AuthStore::load(&path).unwrap();
        assert_eq!(store.login("alice", "pw"), LoginResult::WrongPassword);
    }

    #[test]
    fn register_persists_exactly_one_record_per_username() {
        let path = store_with("register", "[]");
        let mut store = AuthStore::load(&path).unwrap();

        assert_eq!(
            store.register("carol", "pw").unwrap(),
            RegisterResult::Created
        );
        assert_eq!(
            store.register("carol", "other").unwrap(),
            RegisterResult::AlreadyExists
        );
        assert_eq!(store.len(), 1);

        // The rewritten file reloads with the same single record and the
        // original credentials still verify.
        let reloaded = AuthStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.login("carol", "pw"), LoginResult::Accepted);
        assert_eq!(
            reloaded.login("carol", "other"),
            LoginResult::WrongPassword
        );
    }
}
