//! Client credential registry.
//!
//! Holds the set of client credentials accepted by the gateway. The registry is
//! built once at startup, usually from the credential blob in the environment,
//! and is read-only afterwards. Rotating credentials requires a restart.
//!
//! # Blob format
//!
//! The blob is standard-alphabet base64 (unpadded on encode, padding optional
//! on decode) of a JSON object keyed by client id:
//!
//! ```json
//! {"<client_id>": {"client_secret": "<secret>", "app_name": "<app>"}}
//! ```
//!
//! # Invariants
//! - No two credentials share a client id. Duplicate keys in a blob are
//!   rejected rather than silently overwritten.
//! - Entries are never added or removed after construction.

use std::collections::BTreeMap;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Base64 engine for credential blobs.
const BLOB_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A single client credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Identifier presented by the client.
    pub client_id: String,
    /// Shared secret presented alongside the client id.
    pub client_secret: String,
    /// Application the credential belongs to. Becomes the identity subject.
    pub app_name: String,
}

impl Credential {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            app_name: app_name.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Errors that can occur when building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The blob is empty.
    EmptyBlob,
    /// The blob is not valid base64.
    Base64(String),
    /// The decoded blob is not the expected JSON shape.
    Json(String),
    /// The same client id appears more than once.
    DuplicateClientId(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBlob => write!(f, "credential blob is empty"),
            Self::Base64(reason) => {
                write!(f, "could not decode iam users credentials: {reason}")
            }
            Self::Json(reason) => write!(f, "could not decode IAM information: {reason}"),
            Self::DuplicateClientId(id) => write!(f, "duplicate client id: {id}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Wire form of a credential inside the blob.
#[derive(Serialize, Deserialize)]
struct SecretEntry {
    client_secret: String,
    app_name: String,
}

/// Blob entries in document order, duplicates preserved.
struct BlobEntries(Vec<(String, SecretEntry)>);

impl<'de> Deserialize<'de> for BlobEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = BlobEntries;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of client ids to credentials")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BlobEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((client_id, entry)) = map.next_entry::<String, SecretEntry>()? {
                    entries.push((client_id, entry));
                }
                Ok(BlobEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Read-only registry of client credentials keyed by client id.
///
/// # Thread Safety
///
/// The registry has no interior mutability and can be shared freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRegistry {
    credentials: BTreeMap<String, Credential>,
}

impl CredentialRegistry {
    /// Build a registry from a list of credentials.
    ///
    /// # Errors
    /// Returns `RegistryError::DuplicateClientId` if two credentials share a
    /// client id.
    pub fn from_credentials(
        credentials: impl IntoIterator<Item = Credential>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for credential in credentials {
            if map.contains_key(&credential.client_id) {
                return Err(RegistryError::DuplicateClientId(credential.client_id));
            }
            map.insert(credential.client_id.clone(), credential);
        }
        Ok(Self { credentials: map })
    }

    /// Decode a registry from a credential blob.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// Returns `RegistryError` if the blob is empty, not base64, not the
    /// expected JSON shape, or contains a duplicate client id.
    pub fn from_blob(blob: &str) -> Result<Self, RegistryError> {
        let blob = blob.trim();
        if blob.is_empty() {
            return Err(RegistryError::EmptyBlob);
        }

        let bytes = BLOB_ENGINE
            .decode(blob)
            .map_err(|e| RegistryError::Base64(e.to_string()))?;
        let entries: BlobEntries =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::Json(e.to_string()))?;

        Self::from_credentials(entries.0.into_iter().map(|(client_id, entry)| Credential {
            client_id,
            client_secret: entry.client_secret,
            app_name: entry.app_name,
        }))
    }

    /// Encode the registry into the blob format.
    #[must_use]
    pub fn to_blob(&self) -> String {
        BLOB_ENGINE.encode(self.to_json())
    }

    /// The JSON document wrapped by the blob, keys in sorted order.
    #[must_use]
    pub fn to_json(&self) -> String {
        let entries: BTreeMap<&str, SecretEntry> = self
            .credentials
            .values()
            .map(|c| {
                (
                    c.client_id.as_str(),
                    SecretEntry {
                        client_secret: c.client_secret.clone(),
                        app_name: c.app_name.clone(),
                    },
                )
            })
            .collect();
        // A map of strings to plain structs always serializes.
        serde_json::to_string(&entries).unwrap_or_default()
    }

    /// Look up the credential for `client_id`.
    #[must_use]
    pub fn lookup(&self, client_id: &str) -> Option<&Credential> {
        self.credentials.get(client_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Application names, ordered by client id.
    pub fn app_names(&self) -> impl Iterator<Item = &str> {
        self.credentials.values().map(|c| c.app_name.as_str())
    }
}
