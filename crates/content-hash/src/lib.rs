//! Value type representing a decentralized-storage content hash, plus
//! parsing/emitting the handful of URI schemes solc embeds in a contract's
//! metadata and source `urls` lists.

use minicbor::{Decode, Decoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The IPFS multihash prefix solc embeds: sha2-256 (0x12), 32-byte digest (0x20).
const IPFS_MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentOrigin {
    Ipfs,
    SwarmBzzr0,
    SwarmBzzr1,
}

impl fmt::Display for ContentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentOrigin::Ipfs => "ipfs",
            ContentOrigin::SwarmBzzr0 => "swarm-bzzr0",
            ContentOrigin::SwarmBzzr1 => "swarm-bzzr1",
        };
        write!(f, "{s}")
    }
}

/// `(origin, hash)`. Invariant: `hash` is exactly 32 bytes, for both
/// origins — solc's ipfs references are the sha2-256 digest portion of a
/// CIDv0 multihash, and swarm's bzzr0/bzzr1 hashes are 32-byte digests.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    pub origin: ContentOrigin,
    pub hash: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentHashError {
    #[error("unrecognized storage URI scheme")]
    UnrecognizedScheme,
    #[error("malformed ipfs CID")]
    MalformedCid,
    #[error("hash is not {expected} bytes, found {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("invalid hex payload")]
    InvalidHex,
}

impl ContentHash {
    /// Parses `dweb:/ipfs/<cid>`, `ipfs://<cid>`, `bzz-raw://<hex>`,
    /// `bzzr0://<hex>`, `bzzr1://<hex>`. Returns `Err(UnrecognizedScheme)`
    /// for anything else, including `https://` (callers that want to accept
    /// `https://` explicitly must do so before calling `parse`, per their
    /// own configuration — this function never does).
    pub fn parse(uri: &str) -> Result<Self, ContentHashError> {
        if let Some(cid) = uri.strip_prefix("dweb:/ipfs/") {
            return Self::parse_ipfs_cid(cid);
        }
        if let Some(cid) = uri.strip_prefix("ipfs://") {
            return Self::parse_ipfs_cid(cid);
        }
        if let Some(hex_payload) = uri.strip_prefix("bzz-raw://") {
            // bzz-raw historically predates the bzzr1 scheme and carries the
            // same raw-hash format as bzzr0.
            return Self::parse_swarm_hex(hex_payload, ContentOrigin::SwarmBzzr0);
        }
        if let Some(hex_payload) = uri.strip_prefix("bzzr0://") {
            return Self::parse_swarm_hex(hex_payload, ContentOrigin::SwarmBzzr0);
        }
        if let Some(hex_payload) = uri.strip_prefix("bzzr1://") {
            return Self::parse_swarm_hex(hex_payload, ContentOrigin::SwarmBzzr1);
        }
        Err(ContentHashError::UnrecognizedScheme)
    }

    fn parse_ipfs_cid(cid: &str) -> Result<Self, ContentHashError> {
        let multihash = bs58::decode(cid)
            .into_vec()
            .map_err(|_| ContentHashError::MalformedCid)?;
        if multihash.len() != IPFS_MULTIHASH_PREFIX.len() + 32 {
            return Err(ContentHashError::WrongLength {
                expected: IPFS_MULTIHASH_PREFIX.len() + 32,
                found: multihash.len(),
            });
        }
        if multihash[..2] != IPFS_MULTIHASH_PREFIX {
            return Err(ContentHashError::MalformedCid);
        }
        Ok(ContentHash {
            origin: ContentOrigin::Ipfs,
            hash: multihash[2..].to_vec(),
        })
    }

    fn parse_swarm_hex(hex_payload: &str, origin: ContentOrigin) -> Result<Self, ContentHashError> {
        let hash = hex::decode(hex_payload).map_err(|_| ContentHashError::InvalidHex)?;
        if hash.len() != 32 {
            return Err(ContentHashError::WrongLength {
                expected: 32,
                found: hash.len(),
            });
        }
        Ok(ContentHash { origin, hash })
    }

    /// Inverse of [`ContentHash::parse`]: emits the canonical URI form.
    /// `dweb:/ipfs/` and `bzz-raw://` are accepted on parse but never
    /// emitted — there is no stored "original scheme" to round-trip to.
    pub fn to_uri(&self) -> String {
        match self.origin {
            ContentOrigin::Ipfs => {
                let mut multihash = Vec::with_capacity(IPFS_MULTIHASH_PREFIX.len() + self.hash.len());
                multihash.extend_from_slice(&IPFS_MULTIHASH_PREFIX);
                multihash.extend_from_slice(&self.hash);
                format!("ipfs://{}", bs58::encode(multihash).into_string())
            }
            ContentOrigin::SwarmBzzr0 => format!("bzzr0://{}", hex::encode(&self.hash)),
            ContentOrigin::SwarmBzzr1 => format!("bzzr1://{}", hex::encode(&self.hash)),
        }
    }

    /// Extracts the hash fields embedded in a contract metadata's CBOR
    /// trailer (`ipfs`, `bzzr1`, `bzzr0` keys), in that stable order.
    pub fn from_metadata_cbor_section(cbor: &[u8]) -> Result<Vec<Self>, minicbor::decode::Error> {
        let fields: CborHashFields = minicbor::decode(cbor)?;
        let mut hashes = Vec::new();
        if let Some(hash) = fields.ipfs {
            hashes.push(ContentHash {
                origin: ContentOrigin::Ipfs,
                hash,
            });
        }
        if let Some(hash) = fields.bzzr1 {
            hashes.push(ContentHash {
                origin: ContentOrigin::SwarmBzzr1,
                hash,
            });
        }
        if let Some(hash) = fields.bzzr0 {
            hashes.push(ContentHash {
                origin: ContentOrigin::SwarmBzzr0,
                hash,
            });
        }
        Ok(hashes)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
enum ParseCborHashError {
    #[error("ipfs value is not a valid 34-byte multihash")]
    InvalidIpfsMultihash,
    #[error("{0} key met more than once")]
    DuplicateKey(&'static str),
}

#[derive(Default)]
struct CborHashFields {
    ipfs: Option<Vec<u8>>,
    bzzr0: Option<Vec<u8>>,
    bzzr1: Option<Vec<u8>>,
}

impl<'b> Decode<'b, ()> for CborHashFields {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, minicbor::decode::Error> {
        use minicbor::decode::Error;

        let number_of_elements = d.map()?.unwrap_or(u64::MAX);
        let mut fields = CborHashFields::default();
        for _ in 0..number_of_elements {
            let key = d.str()?;
            match key {
                "ipfs" => {
                    if fields.ipfs.is_some() {
                        return Err(Error::custom(ParseCborHashError::DuplicateKey("ipfs")));
                    }
                    let bytes = d.bytes()?;
                    if bytes.len() != IPFS_MULTIHASH_PREFIX.len() + 32
                        || bytes[..2] != IPFS_MULTIHASH_PREFIX
                    {
                        return Err(Error::custom(ParseCborHashError::InvalidIpfsMultihash));
                    }
                    fields.ipfs = Some(bytes[2..].to_vec());
                }
                "bzzr0" => {
                    if fields.bzzr0.is_some() {
                        return Err(Error::custom(ParseCborHashError::DuplicateKey("bzzr0")));
                    }
                    fields.bzzr0 = Some(d.bytes()?.to_vec());
                }
                "bzzr1" => {
                    if fields.bzzr1.is_some() {
                        return Err(Error::custom(ParseCborHashError::DuplicateKey("bzzr1")));
                    }
                    fields.bzzr1 = Some(d.bytes()?.to_vec());
                }
                _ => {
                    d.skip()?;
                }
            }
        }
        Ok(fields)
    }

    fn nil() -> Option<Self> {
        Some(Self::default())
    }
}
