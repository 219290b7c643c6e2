//! # Serializers
//!
//! The serializer pair used for payloads and envelopes, chosen by the
//! `serializer` option.
//!
//! | Kind | Format |
//! |------|--------|
//! | `Binary` | bincode, fixed-width integers, input capped at [`MAX_DECODE_BYTES`] |
//! | `Yaml` | serde_yaml |

use crate::config::SerializerKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Upper bound on a bincode-decoded value, so that hostile length prefixes
/// cannot force large allocations.
pub const MAX_DECODE_BYTES: u64 = 16 * 1024 * 1024;

/// Serialization failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{format} serialization error: {message}")]
pub struct SerializationError {
    /// Format name.
    pub format: &'static str,
    /// Underlying error.
    pub message: String,
}

/// A serializer/deserializer pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Serializer {
    /// bincode.
    #[default]
    Binary,
    /// YAML.
    Yaml,
}

impl From<SerializerKind> for Serializer {
    fn from(kind: SerializerKind) -> Self {
        match kind {
            SerializerKind::Binary => Serializer::Binary,
            SerializerKind::Yaml => Serializer::Yaml,
        }
    }
}

fn bincode_options() -> impl bincode::Options {
    use bincode::Options;

    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_DECODE_BYTES)
}

impl Serializer {
    /// Format name, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Serializer::Binary => "bincode",
            Serializer::Yaml => "yaml",
        }
    }

    /// Serialize a value.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        match self {
            Serializer::Binary => {
                use bincode::Options;
                bincode_options()
                    .serialize(value)
                    .map_err(|e| self.error(e))
            }
            Serializer::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| self.error(e)),
        }
    }

    /// Deserialize a value.
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        match self {
            Serializer::Binary => {
                use bincode::Options;
                bincode_options()
                    .deserialize(bytes)
                    .map_err(|e| self.error(e))
            }
            Serializer::Yaml => serde_yaml::from_slice(bytes).map_err(|e| self.error(e)),
        }
    }

    fn error(&self, err: impl std::fmt::Display) -> SerializationError {
        SerializationError {
            format: self.name(),
            message: err.to_string(),
        }
    }
}
