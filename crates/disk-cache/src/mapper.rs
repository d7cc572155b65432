//! Key to file name mapping
//!
//! A mapper turns an arbitrary cache key into the name of the file that holds
//! its value. The opportunistic format is shared with other implementations
//! reading the same directories, so it must stay bit-exact.

use crate::error::ConfigError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use md5::Md5;
use sha2::{Digest, Sha224};
use std::str::FromStr;
use std::sync::Arc;

/// Longest base64 name (in characters) before switching to hashing
const MAX_ENCODED_LEN: usize = 90;

/// Maps a cache key to a file name. Must be pure and deterministic.
pub trait KeyMapper: Send + Sync {
    fn map(&self, key: &str) -> String;
}

impl<F> KeyMapper for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn map(&self, key: &str) -> String {
        self(key)
    }
}

/// Returns the key unchanged. The caller is responsible for keys being safe
/// file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl KeyMapper for IdentityMapper {
    fn map(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Base64 for short keys, SHA-224 + MD5 for long ones.
///
/// Short keys become `b<base64url, unpadded>`. Keys whose encoding would be
/// longer than 90 characters become `h<len as hex><sha224 hex><md5 hex>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpportunisticMapper;

impl KeyMapper for OpportunisticMapper {
    fn map(&self, key: &str) -> String {
        let bytes = key.as_bytes();
        if bytes.len() * 4 <= MAX_ENCODED_LEN * 3 {
            return format!("b{}", URL_SAFE_NO_PAD.encode(bytes));
        }

        let sha224 = Sha224::digest(bytes);
        let md5 = Md5::digest(bytes);
        format!(
            "h{:x}{}{}",
            bytes.len(),
            hex::encode(sha224),
            hex::encode(md5)
        )
    }
}

/// Built-in mapper policies selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapperKind {
    Identity,
    #[default]
    Opportunistic,
}

impl MapperKind {
    pub fn build(self) -> Arc<dyn KeyMapper> {
        match self {
            MapperKind::Identity => Arc::new(IdentityMapper),
            MapperKind::Opportunistic => Arc::new(OpportunisticMapper),
        }
    }
}

impl FromStr for MapperKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "copy" => Ok(MapperKind::Identity),
            "opportunistic" => Ok(MapperKind::Opportunistic),
            _ => Err(ConfigError::UnknownMapper(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_returns_key() {
        assert_eq!(IdentityMapper.map("foobar"), "foobar");
        assert_eq!(IdentityMapper.map(""), "");
    }

    #[test]
    fn test_short_key_is_base64() {
        assert_eq!(OpportunisticMapper.map("short key"), "bc2hvcnQga2V5");
    }

    #[test]
    fn test_base64_uses_url_safe_alphabet() {
        assert_eq!(OpportunisticMapper.map("ab?/+"), "bYWI_Lys");
    }

    #[test]
    fn test_long_key_is_hashed() {
        assert_eq!(
            OpportunisticMapper.map(&"x".repeat(100)),
            "h64c49c94d0d9ac260177d358388f0461b8ea251125c11187b0878a361eaed563ecafb4bcc5654c597a421547b2"
        );
    }

    #[test]
    fn test_hashed_name_layout() {
        let name = OpportunisticMapper.map(&"z".repeat(200));
        assert!(name.starts_with("hc8"));
        let digests = &name[3..];
        assert_eq!(digests.len(), 56 + 32);
        assert!(digests.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            name,
            "hc8d1dd296a40f6852df1fd8298ccc5a09a946f3bc5a2c2a739739baa2b7057a5f99bf5773b65e06e0539314d1c"
        );
    }

    #[test]
    fn test_encoding_boundary() {
        // 67 * 4 / 3 = 89.3, 68 * 4 / 3 = 90.7
        assert!(OpportunisticMapper.map(&"a".repeat(67)).starts_with('b'));
        assert!(OpportunisticMapper.map(&"a".repeat(68)).starts_with('h'));
    }

    #[test]
    fn test_deterministic_and_distinct() {
        let a1 = OpportunisticMapper.map("key-0001");
        let a2 = OpportunisticMapper.map("key-0001");
        let b = OpportunisticMapper.map("key-0002");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);

        let long_a = format!("{}a", "k".repeat(120));
        let long_b = format!("{}b", "k".repeat(120));
        assert_ne!(
            OpportunisticMapper.map(&long_a),
            OpportunisticMapper.map(&long_b)
        );
    }

    #[test]
    fn test_closure_mapper() {
        let mapper = |key: &str| format!("custom-{}", key.len());
        assert_eq!(KeyMapper::map(&mapper, "abc"), "custom-3");
    }

    #[test]
    fn test_mapper_kind_parse() {
        assert_eq!("identity".parse::<MapperKind>(), Ok(MapperKind::Identity));
        assert_eq!("Copy".parse::<MapperKind>(), Ok(MapperKind::Identity));
        assert_eq!(
            " opportunistic ".parse::<MapperKind>(),
            Ok(MapperKind::Opportunistic)
        );
        assert_eq!(
            "sha1".parse::<MapperKind>(),
            Err(ConfigError::UnknownMapper("sha1".to_string()))
        );
    }

    #[test]
    fn test_mapper_kind_build() {
        assert_eq!(MapperKind::Identity.build().map("k"), "k");
        assert_eq!(MapperKind::default().build().map("k"), "baw");
    }
}
