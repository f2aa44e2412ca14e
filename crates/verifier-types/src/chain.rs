use serde::{Deserialize, Serialize};
use std::fmt;

/// EVM chain identifier, as used in `eth_chainId` and every verification request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A 20-byte contract address, displayed as an EIP-55 checksummed `0x` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "address_hex")] pub [u8; 20]);

impl Address {
    pub fn checksummed(&self) -> String {
        blockscout_display_bytes::Bytes::from(self.0.to_vec()).to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.checksummed())
    }
}

mod address_hex {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&blockscout_display_bytes::Bytes::from(value.to_vec()).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 20], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = blockscout_display_bytes::Bytes::from_str(&s).map_err(D::Error::custom)?;
        <[u8; 20]>::try_from(bytes.to_vec().as_slice())
            .map_err(|_| D::Error::custom("address must be exactly 20 bytes"))
    }
}
