use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum TransformationType {
    Insert,
    Replace,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum TransformationReason {
    Auxdata,
    Constructor,
    Immutable,
    Library,
}

/// One byte-range where compiled code was replaced or extended with an
/// on-chain value before comparison, recorded for the caller's audit trail.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    r#type: TransformationType,
    reason: TransformationReason,
    offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl Transformation {
    pub fn auxdata(offset: usize) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::Auxdata,
            offset,
            id: None,
        }
    }

    pub fn constructor(offset: usize) -> Self {
        Self {
            r#type: TransformationType::Insert,
            reason: TransformationReason::Constructor,
            offset,
            id: None,
        }
    }

    pub fn immutable(offset: usize, id: impl Into<String>) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::Immutable,
            offset,
            id: Some(id.into()),
        }
    }

    pub fn library(offset: usize, id: impl Into<String>) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::Library,
            offset,
            id: Some(id.into()),
        }
    }
}

/// Values recovered from on-chain bytes during matching, reported back so
/// the caller can populate `Match::library_map`/`immutable_references`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchValues {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libraries: BTreeMap<String, Vec<u8>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub immutables: BTreeMap<String, Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor_arguments: Option<Vec<u8>>,
}

impl MatchValues {
    pub fn add_library(&mut self, id: impl Into<String>, value: Vec<u8>) {
        self.libraries.insert(id.into(), value);
    }

    pub fn add_immutable(&mut self, id: impl Into<String>, value: Vec<u8>) {
        self.immutables.insert(id.into(), value);
    }

    pub fn set_constructor_arguments(&mut self, value: Vec<u8>) {
        self.constructor_arguments = Some(value);
    }
}
