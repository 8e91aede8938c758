//! Plugin identity and its fingerprint

use serde::{Deserialize, Serialize};

/// Immutable identity of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
}

impl PluginIdentity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            author: author.into(),
        }
    }

    /// BLAKE3 digest of `id:name:version`
    ///
    /// The author is not part of the fingerprint. Because fields may contain
    /// `:`, distinct identities can share a fingerprint; use
    /// [`Self::binding_digest`] wherever the digest must be unambiguous.
    pub fn fingerprint(&self) -> [u8; 32] {
        let material = format!("{}:{}:{}", self.id, self.name, self.version);
        *blake3::hash(material.as_bytes()).as_bytes()
    }

    /// Hex form of [`Self::fingerprint`]
    pub fn fingerprint_hex(&self) -> String {
        blake3::Hash::from(self.fingerprint()).to_hex().to_string()
    }

    /// Unambiguous digest of `id`, `name` and `version` for signature binding
    ///
    /// Each field is length-prefixed (u64 little endian) under a dedicated
    /// key-derivation context, so no two distinct identities collide.
    pub fn binding_digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key(BINDING_CONTEXT);
        for field in [&self.id, &self.name, &self.version] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }
}

const BINDING_CONTEXT: &str = "warden 2024 plugin identity binding v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_author() {
        let a = PluginIdentity::new("com.example.notes", "Notes", "1.0.0", "alice");
        let b = PluginIdentity::new("com.example.notes", "Notes", "1.0.0", "bob");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_version() {
        let a = PluginIdentity::new("com.example.notes", "Notes", "1.0.0", "alice");
        let b = PluginIdentity::new("com.example.notes", "Notes", "1.0.1", "alice");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint_hex().len(), 64);
    }

    #[test]
    fn test_fingerprint_hex_matches_digest() {
        let identity = PluginIdentity::new("notes", "Notes", "1.0.0", "alice");
        let expected = blake3::hash(b"notes:Notes:1.0.0").to_hex().to_string();
        assert_eq!(identity.fingerprint_hex(), expected);
    }

    #[test]
    fn test_binding_digest_separates_colon_bearing_fields() {
        let a = PluginIdentity::new("acme:notes", "pro", "1.0.0", "alice");
        let b = PluginIdentity::new("acme", "notes:pro", "1.0.0", "alice");

        // The display fingerprint collides, the binding digest must not
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.binding_digest(), b.binding_digest());
    }

    #[test]
    fn test_binding_digest_ignores_author() {
        let a = PluginIdentity::new("notes", "Notes", "1.0.0", "alice");
        let b = PluginIdentity::new("notes", "Notes", "1.0.0", "bob");
        assert_eq!(a.binding_digest(), b.binding_digest());
    }
}
