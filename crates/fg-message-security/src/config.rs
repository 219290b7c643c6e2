//! # Security Configuration
//!
//! Options are gathered loosely ([`SecurityOptions`], from YAML or a flat
//! string map plus environment overrides) and validated once into a typed
//! [`SecurityConfig`] for a given [`Role`].
//!
//! ## Requirements
//!
//! - Caller: `client_private`, `client_public`
//! - Responder: `server_private`, `server_public`, `client_cert_dir`
//! - `FABRIC_AES_PRIVATE` / `FABRIC_AES_PUBLIC` override the client key paths

use serde::Deserialize;
use shared_types::Role;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Default replay window in seconds.
pub const DEFAULT_MAXIMUM_AGE: u64 = 5;

/// Environment variable overriding `client_private`.
pub const ENV_CLIENT_PRIVATE: &str = "FABRIC_AES_PRIVATE";

/// Environment variable overriding `client_public`.
pub const ENV_CLIENT_PUBLIC: &str = "FABRIC_AES_PUBLIC";

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required option is not set.
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),

    /// An option is set to a value it cannot take.
    #[error("invalid value {value:?} for option `{option}`")]
    InvalidValue {
        /// Option name.
        option: String,
        /// Rejected value.
        value: String,
    },

    /// The configuration document does not parse.
    #[error("cannot parse configuration: {0}")]
    Parse(String),

    /// The configuration file cannot be read.
    #[error("cannot read configuration file {path:?}: {reason}")]
    Unreadable {
        /// File path.
        path: PathBuf,
        /// I/O failure.
        reason: String,
    },
}

/// Payload/envelope serializer selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// bincode.
    #[default]
    Binary,
    /// YAML.
    Yaml,
}

impl FromStr for SerializerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" => Ok(SerializerKind::Yaml),
            "binary" | "bincode" => Ok(SerializerKind::Binary),
            _ => Err(ConfigError::InvalidValue {
                option: "serializer".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// RAW OPTIONS
// =============================================================================

/// Unvalidated options, as read from a configuration source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityOptions {
    /// Serializer for payloads and envelopes.
    pub serializer: SerializerKind,
    /// Attach the local public key to outbound requests.
    pub send_pubkey: bool,
    /// Cache public keys attached to inbound requests (Responder only).
    pub learn_pubkeys: bool,
    /// Replay window in seconds.
    pub maximum_age: u64,
    /// Caller private key.
    pub client_private: Option<PathBuf>,
    /// Caller public key.
    pub client_public: Option<PathBuf>,
    /// Responder private key.
    pub server_private: Option<PathBuf>,
    /// Responder public key.
    pub server_public: Option<PathBuf>,
    /// Directory of distributed and learned public keys.
    pub client_cert_dir: Option<PathBuf>,
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self {
            serializer: SerializerKind::default(),
            send_pubkey: false,
            learn_pubkeys: false,
            maximum_age: DEFAULT_MAXIMUM_AGE,
            client_private: None,
            client_public: None,
            server_private: None,
            server_public: None,
            client_cert_dir: None,
        }
    }
}

impl SecurityOptions {
    /// Build options from a flat string map. Unknown keys are ignored.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = Self::default();

        for (key, value) in options {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "serializer" => parsed.serializer = value.parse()?,
                "send_pubkey" => parsed.send_pubkey = parse_bool(key, value)?,
                "learn_pubkeys" => parsed.learn_pubkeys = parse_bool(key, value)?,
                "maximum_age" => {
                    parsed.maximum_age =
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidValue {
                                option: key.to_string(),
                                value: value.to_string(),
                            })?
                }
                "client_private" => parsed.client_private = non_empty_path(value),
                "client_public" => parsed.client_public = non_empty_path(value),
                "server_private" => parsed.server_private = non_empty_path(value),
                "server_public" => parsed.server_public = non_empty_path(value),
                "client_cert_dir" => parsed.client_cert_dir = non_empty_path(value),
                other => debug!(option = other, "Ignoring unrecognised security option"),
            }
        }

        Ok(parsed)
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `FABRIC_AES_PRIVATE` / `FABRIC_AES_PUBLIC` from the process
    /// environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply the client key overrides from an arbitrary variable source.
    /// Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CLIENT_PRIVATE).as_deref().and_then(non_empty_path) {
            debug!(variable = ENV_CLIENT_PRIVATE, "Client private key overridden");
            self.client_private = Some(path);
        }
        if let Some(path) = lookup(ENV_CLIENT_PUBLIC).as_deref().and_then(non_empty_path) {
            debug!(variable = ENV_CLIENT_PUBLIC, "Client public key overridden");
            self.client_public = Some(path);
        }
        self
    }

    /// Validate the options for `role`.
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingOption` names the first required option that is
    /// absent; a zero `maximum_age` is `ConfigError::InvalidValue`.
    pub fn validate(self, role: Role) -> Result<SecurityConfig, ConfigError> {
        if self.maximum_age == 0 {
            return Err(ConfigError::InvalidValue {
                option: "maximum_age".to_string(),
                value: "0".to_string(),
            });
        }

        let (private_key_path, public_key_path, cert_dir) = match role {
            Role::Caller => (
                require(self.client_private, "client_private")?,
                require(self.client_public, "client_public")?,
                self.client_cert_dir,
            ),
            Role::Responder => (
                require(self.server_private, "server_private")?,
                require(self.server_public, "server_public")?,
                Some(require(self.client_cert_dir, "client_cert_dir")?),
            ),
        };

        Ok(SecurityConfig {
            role,
            serializer: self.serializer,
            send_pubkey: self.send_pubkey,
            learn_pubkeys: self.learn_pubkeys,
            maximum_age: self.maximum_age,
            private_key_path,
            public_key_path,
            cert_dir,
        })
    }
}

fn require(value: Option<PathBuf>, option: &'static str) -> Result<PathBuf, ConfigError> {
    value.ok_or(ConfigError::MissingOption(option))
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn parse_bool(option: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "y" | "t" | "on" => Ok(true),
        "0" | "no" | "false" | "n" | "f" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            option: option.to_string(),
            value: value.to_string(),
        }),
    }
}

// =============================================================================
// VALIDATED CONFIGURATION
// =============================================================================

/// Validated configuration for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    role: Role,
    serializer: SerializerKind,
    send_pubkey: bool,
    learn_pubkeys: bool,
    maximum_age: u64,
    private_key_path: PathBuf,
    public_key_path: PathBuf,
    cert_dir: Option<PathBuf>,
}

impl SecurityConfig {
    /// Role the configuration was validated for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Selected serializer.
    pub fn serializer(&self) -> SerializerKind {
        self.serializer
    }

    /// Whether outbound requests carry the local public key.
    pub fn send_pubkey(&self) -> bool {
        self.send_pubkey
    }

    /// Whether attached public keys are cached. Only honoured by Responders.
    pub fn learn_pubkeys(&self) -> bool {
        self.learn_pubkeys && self.role == Role::Responder
    }

    /// Replay window in seconds.
    pub fn maximum_age(&self) -> u64 {
        self.maximum_age
    }

    /// The role's private key file.
    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// The role's public key file; its basename is the local identity.
    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    /// Certificate directory, always present for Responders.
    pub fn cert_dir(&self) -> Option<&Path> {
        self.cert_dir.as_deref()
    }
}
