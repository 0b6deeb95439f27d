//! Repository configuration.
//!
//! Stored at `.store/config.toml`. A missing file means defaults; `init`
//! writes the defaults out so they can be edited. `ARBOR_AUTHOR_NAME` and
//! `ARBOR_AUTHOR_EMAIL` override the configured author.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_crypto::{Ed25519Signer, SigningContext, SigningKey};
use arbor_store::{Author, ZstdCompressor};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Environment variable overriding the author name.
pub const AUTHOR_NAME_ENV: &str = "ARBOR_AUTHOR_NAME";

/// Environment variable overriding the author email.
pub const AUTHOR_EMAIL_ENV: &str = "ARBOR_AUTHOR_EMAIL";

/// Per-repository configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Gitignore-style patterns excluded from snapshots.
    pub ignore: Vec<String>,

    pub author: AuthorConfig,

    pub store: StoreConfig,

    /// Commit signing. Absent means commits are neither signed nor verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningConfig>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            author: AuthorConfig::default(),
            store: StoreConfig::default(),
            signing: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "Arbor User".into(),
            email: "arbor@localhost".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// zstd level for new objects; 0 stores them uncompressed.
    pub compression_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression_level: ZstdCompressor::DEFAULT_LEVEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// File holding a hex-encoded 32-byte Ed25519 secret key. Relative paths
    /// are taken from the `.store` directory.
    pub key_file: PathBuf,

    /// Label of the key; a signer refuses to sign for any other label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hint: Option<String>,
}

impl RepoConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> RepoResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))
    }

    /// Write to `path` as TOML.
    pub fn save(&self, path: &Path) -> RepoResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RepoError::Config(format!("failed to serialize config: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply author overrides from `lookup` (normally the environment).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(name) = lookup(AUTHOR_NAME_ENV) {
            self.author.name = name;
        }
        if let Some(email) = lookup(AUTHOR_EMAIL_ENV) {
            self.author.email = email;
        }
        self
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn author(&self) -> Author {
        Author::new(self.author.name.clone(), self.author.email.clone())
    }

    /// Build the signing context, reading the key relative to `store_dir`.
    pub fn signing_context(&self, store_dir: &Path) -> RepoResult<Option<SigningContext>> {
        let Some(signing) = &self.signing else {
            return Ok(None);
        };
        let key_path = store_dir.join(&signing.key_file);
        let key_hex = fs::read_to_string(&key_path).map_err(|e| {
            RepoError::Config(format!("cannot read key file {}: {e}", key_path.display()))
        })?;
        let key = SigningKey::from_hex(&key_hex)?;

        let mut signer = Ed25519Signer::new(key);
        if let Some(hint) = &signing.key_hint {
            signer = signer.with_label(hint.clone());
        }
        Ok(Some(SigningContext::new(
            Arc::new(signer),
            signing.key_hint.clone(),
        )))
    }
}
