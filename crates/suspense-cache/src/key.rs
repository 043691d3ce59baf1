use std::fmt::{self, Write};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::InvalidKeyDerivation;
use crate::finite::ensure_finite;

/// The identity of a cache entry.
///
/// A key consists of human-readable, stable metadata describing the load parameters, and the
/// SHA-256 digest of that metadata. Only the digest takes part in equality and hashing.
#[derive(Debug, Clone, Eq)]
pub struct CacheKey {
    metadata: Arc<str>,
    hash: [u8; 32],
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.hash[..8]))
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl std::hash::Hash for CacheKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl CacheKey {
    /// Derives a [`CacheKey`] from the full set of load parameters.
    ///
    /// The parameters are serialized into canonical JSON: object members are sorted by name and
    /// strings are escaped, so a delimiter inside a parameter can never make two different
    /// parameter sets collide. Logically identical parameters always produce the same key, no
    /// matter where or how often they were constructed.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidKeyDerivation`] if the parameters can not be represented as JSON, for
    /// example maps with non-string keys, or if they contain `NaN` or infinite floats.
    pub fn from_params<P>(params: &P) -> Result<Self, InvalidKeyDerivation>
    where
        P: Serialize + ?Sized,
    {
        ensure_finite(params)?;
        let value = serde_json::to_value(params)?;
        let mut builder = CacheKeyBuilder::new();
        write_canonical(&mut builder.metadata, &value)?;
        Ok(builder.build())
    }

    /// Creates a [`CacheKeyBuilder`] for hand-assembled key metadata.
    pub fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::new()
    }

    /// Returns the human-readable metadata that forms the basis of the [`CacheKey`].
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// Returns the full hex-formatted digest of this key.
    pub fn hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// A builder for [`CacheKey`]s.
///
/// This builder implements the [`Write`](std::fmt::Write) trait, and the intention of it is to
/// accept human readable, but most importantly **stable**, input.
/// This input in then being hashed to form the [`CacheKey`].
#[derive(Debug, Default)]
pub struct CacheKeyBuilder {
    metadata: String,
}

impl CacheKeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a `name: value` line into the metadata.
    pub fn field(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        // writing into a `String` is infallible
        let _ = writeln!(self.metadata, "{name}: {value}");
        self
    }

    /// Finalize the [`CacheKey`].
    pub fn build(self) -> CacheKey {
        let hash = Sha256::digest(&self.metadata);

        CacheKey {
            metadata: self.metadata.into(),
            hash: hash.into(),
        }
    }
}

impl fmt::Write for CacheKeyBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.metadata.write_str(s)
    }
}

/// Writes `value` as compact JSON with object members in sorted order.
///
/// This does not rely on the ordering of [`serde_json::Map`], which changes with the
/// `preserve_order` feature of `serde_json`.
fn write_canonical(out: &mut String, value: &Value) -> Result<(), InvalidKeyDerivation> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item)?;
            }
            out.push(']');
        }
        Value::Object(members) => {
            let mut members: Vec<_> = members.iter().collect();
            members.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(name)?);
                out.push(':');
                write_canonical(out, member)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}
