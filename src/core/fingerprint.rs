//! Fingerprints: deterministic dedup keys for request descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ConfigError;
use super::request::Descriptor;

/// Registry key of one execution entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the canonical descriptor is turned into a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Lowercase hex SHA-256 of the canonical serialization.
    #[default]
    Digest,
    /// The canonical serialization itself. Larger keys, identical behavior.
    Canonical,
}

impl FromStr for KeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "digest" => Ok(Self::Digest),
            "canonical" => Ok(Self::Canonical),
            _ => Err(ConfigError::UnknownKeyPolicy(s.to_string())),
        }
    }
}

/// The hashed content. Field order is fixed by declaration and `env` is ordered,
/// so equal descriptors always serialize to equal bytes.
#[derive(Serialize)]
struct CanonicalDescriptor<'a> {
    command: &'a str,
    args: &'a [String],
    cwd: &'a Path,
    env: &'a BTreeMap<String, String>,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<u64>,
}

impl KeyPolicy {
    /// Fingerprint `descriptor`.
    ///
    /// Only command, arguments, working directory, environment and input take
    /// part. `nonce` is `Some` for non-shared requests and makes the key unique;
    /// shared requests pass `None` so identical descriptors collide.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Fingerprint`] if the descriptor cannot be
    /// serialized (e.g. a non UTF-8 working directory).
    pub fn fingerprint(
        self,
        descriptor: &Descriptor,
        nonce: Option<u64>,
    ) -> Result<Fingerprint, ConfigError> {
        let canonical = serde_json::to_string(&CanonicalDescriptor {
            command: &descriptor.command,
            args: &descriptor.args,
            cwd: &descriptor.cwd,
            env: &descriptor.env,
            input: hex::encode(&descriptor.input),
            nonce,
        })
        .map_err(|e| ConfigError::Fingerprint(e.to_string()))?;

        Ok(match self {
            Self::Digest => Fingerprint(format!("{:x}", Sha256::digest(canonical.as_bytes()))),
            Self::Canonical => Fingerprint(canonical),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecRequest, RunOptions};

    fn descriptor(command: &str, args: &[&str], options: RunOptions) -> Descriptor {
        ExecRequest::new(command)
            .with_args(args.iter().copied())
            .with_options(options.with_cwd("/tmp").with_env([("A", "1")]))
            .normalize(Path::new("/bin/sh"))
            .unwrap()
    }

    #[test]
    fn test_shared_descriptors_collide() {
        let a = descriptor("sleep", &["1"], RunOptions::new().with_shared(true));
        let b = descriptor("sleep", &["1"], RunOptions::new().with_shared(true));
        let ka = KeyPolicy::Digest.fingerprint(&a, None).unwrap();
        let kb = KeyPolicy::Digest.fingerprint(&b, None).unwrap();
        assert_eq!(ka, kb);
        assert_eq!(ka.as_str().len(), 64);
    }

    #[test]
    fn test_capture_and_timeout_excluded_from_key() {
        let a = descriptor("sleep", &["1"], RunOptions::new());
        let b = descriptor(
            "sleep",
            &["1"],
            RunOptions::new().with_store_stdout(true).with_max_time_secs(3.0),
        );
        assert_eq!(
            KeyPolicy::Digest.fingerprint(&a, None).unwrap(),
            KeyPolicy::Digest.fingerprint(&b, None).unwrap()
        );
    }

    #[test]
    fn test_any_descriptor_difference_changes_key() {
        let base = descriptor("sleep", &["1"], RunOptions::new());
        let variants = [
            descriptor("sleep", &["2"], RunOptions::new()),
            descriptor("sleep", &["1"], RunOptions::new().with_input_bytes(b"x".to_vec())),
            descriptor("sleep", &["1"], RunOptions::new().with_use_shell(true)),
        ];
        let key = KeyPolicy::Digest.fingerprint(&base, None).unwrap();
        for variant in &variants {
            assert_ne!(key, KeyPolicy::Digest.fingerprint(variant, None).unwrap());
        }
    }

    #[test]
    fn test_nonce_makes_key_unique() {
        let desc = descriptor("true", &[], RunOptions::new());
        let k1 = KeyPolicy::Digest.fingerprint(&desc, Some(1)).unwrap();
        let k2 = KeyPolicy::Digest.fingerprint(&desc, Some(2)).unwrap();
        let shared = KeyPolicy::Digest.fingerprint(&desc, None).unwrap();
        assert_ne!(k1, k2);
        assert_ne!(k1, shared);
    }

    #[test]
    fn test_canonical_policy_is_raw_serialization() {
        let desc = descriptor("echo", &["hi"], RunOptions::new());
        let key = KeyPolicy::Canonical.fingerprint(&desc, None).unwrap();
        assert!(key.as_str().starts_with(r#"{"command":"echo","args":["hi"],"cwd":"/tmp""#));
        assert!(!key.as_str().contains("nonce"));
        assert_eq!("canonical".parse::<KeyPolicy>().unwrap(), KeyPolicy::Canonical);
    }
}
