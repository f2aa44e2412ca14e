//! `serde(with = "...")` helpers for hex fields that, unlike
//! `serde_with::hex::Hex`, tolerate an optional `0x` prefix on
//! deserialization — the form solc's own metadata JSON and most JSON-RPC
//! payloads actually use. Always serializes with the prefix.

pub mod array32 {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        <[u8; 32]>::try_from(bytes.as_slice())
            .map_err(|_| D::Error::custom("expected a 32-byte hex string"))
    }
}

pub mod vec {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)
    }
}

pub mod map_vec {
    use super::vec as hex_vec;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        value: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wrapper(#[serde(with = "hex_vec")] Vec<u8>);
        value
            .iter()
            .map(|(k, v)| (k.clone(), Wrapper(v.clone())))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "hex_vec")] Vec<u8>);
        let raw: BTreeMap<String, Wrapper> = BTreeMap::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(k, w)| (k, w.0)).collect())
    }

    pub mod option {
        use super::hex_vec;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            #[derive(Serialize)]
            struct Wrapper(#[serde(with = "hex_vec")] Vec<u8>);
            value.clone().map(Wrapper).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "hex_vec")] Vec<u8>);
            let raw: Option<Wrapper> = Option::deserialize(deserializer)?;
            Ok(raw.map(|w| w.0))
        }
    }
}
