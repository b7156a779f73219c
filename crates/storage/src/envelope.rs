//! The optional binary envelope decorator (spec §4.2): wraps a `KvStore`,
//! serializing values with bincode and optionally compressing with zstd
//! before the inner store ever sees them.
//!
//! Encoded payloads are length-prefixed so a read can tell an encoded blob
//! from an un-encoded historical value and pass the latter through
//! untouched — this layer is invisible to the core.

use vkv_core::types::VersionId;
use vkv_core::{Error, KvStore, Result};

/// Magic prefix marking a value as envelope-encoded. Chosen to be
/// vanishingly unlikely to occur at the start of arbitrary un-encoded
/// historical payloads.
const MAGIC: &[u8; 4] = b"VKV1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
enum Codec {
    Bincode,
    BincodeZstd,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope {
    codec: Codec,
    payload: Vec<u8>,
}

/// Wraps an inner [`KvStore`], transparently encoding and decoding values.
pub struct EnvelopeKvStore<S> {
    inner: S,
    compress: bool,
}

impl<S: KvStore> EnvelopeKvStore<S> {
    /// Wrap `inner`, enabling zstd compression on top of the bincode
    /// envelope when `compress` is set.
    pub fn new(inner: S, compress: bool) -> Self {
        EnvelopeKvStore { inner, compress }
    }

    fn encode(&self, value: &[u8]) -> Result<Vec<u8>> {
        let (codec, payload) = if self.compress {
            let compressed =
                zstd::encode_all(value, 0).map_err(|e| Error::internal(e.to_string()))?;
            (Codec::BincodeZstd, compressed)
        } else {
            (Codec::Bincode, value.to_vec())
        };
        let envelope = Envelope { codec, payload };
        let encoded =
            bincode::serialize(&envelope).map_err(|e| Error::internal(e.to_string()))?;
        let mut out = Vec::with_capacity(MAGIC.len() + encoded.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&encoded);
        Ok(out)
    }

    fn decode(raw: Vec<u8>) -> Result<Vec<u8>> {
        if raw.len() < MAGIC.len() || &raw[..MAGIC.len()] != MAGIC {
            // Not an encoded shape: pass through untouched (backward
            // compatibility with un-encoded historical data).
            return Ok(raw);
        }
        let envelope: Envelope =
            bincode::deserialize(&raw[MAGIC.len()..]).map_err(|e| Error::internal(e.to_string()))?;
        match envelope.codec {
            Codec::Bincode => Ok(envelope.payload),
            Codec::BincodeZstd => {
                zstd::decode_all(envelope.payload.as_slice()).map_err(|e| Error::internal(e.to_string()))
            }
        }
    }
}

impl<S: KvStore> KvStore for EnvelopeKvStore<S> {
    fn put_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        let encoded = self.encode(&value)?;
        self.inner.put_entry(dataset, version, table, key, encoded)
    }

    fn get_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        match self.inner.get_entry(dataset, version, table, key)? {
            Some(raw) => Ok(Some(Self::decode(raw)?)),
            None => Ok(None),
        }
    }

    fn get_entries(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
    ) -> Result<std::collections::BTreeMap<String, Vec<u8>>> {
        self.inner
            .get_entries(dataset, version, table)?
            .into_iter()
            .map(|(k, v)| Ok((k, Self::decode(v)?)))
            .collect()
    }

    fn delete_version_entries(&self, dataset: &str, version: VersionId) -> Result<()> {
        self.inner.delete_version_entries(dataset, version)
    }
}
