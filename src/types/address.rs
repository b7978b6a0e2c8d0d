//! Custody address records as stored on the ledger
//!
//! Every generated multisig address is written to the ledger as an account
//! detail: the key is the address itself, the value is a JSON-encoded
//! [`AddressInfo`] describing who generated it and with which notary keys.

use crate::errors::{CustodyError, CustodyResult};
use serde::{Deserialize, Serialize};

/// Metadata recorded when an address is generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// Owning client account, `None` for free and change addresses
    #[serde(rename = "irohaClient")]
    pub client: Option<String>,
    /// Public keys of the signatory set active at generation time
    #[serde(rename = "notaryKeys")]
    pub notary_keys: Vec<String>,
    /// Node that generated the address
    #[serde(rename = "nodeId")]
    pub node_id: String,
    /// Generation time in milliseconds since the Unix epoch
    #[serde(rename = "generationTime")]
    pub generation_time: Option<i64>,
}

impl AddressInfo {
    pub fn free(notary_keys: Vec<String>, node_id: impl Into<String>, generation_time: i64) -> Self {
        Self {
            client: None,
            notary_keys,
            node_id: node_id.into(),
            generation_time: Some(generation_time),
        }
    }

    pub fn change(notary_keys: Vec<String>, node_id: impl Into<String>, generation_time: i64) -> Self {
        Self::free(notary_keys, node_id, generation_time)
    }

    /// Decode a ledger detail value; `key` identifies the entry in the error
    pub fn from_json(key: &str, json: &str) -> CustodyResult<Self> {
        serde_json::from_str(json).map_err(|e| CustodyError::decode(key, e))
    }

    pub fn to_json(&self) -> CustodyResult<String> {
        serde_json::to_string(self).map_err(|e| CustodyError::decode("address-info", e))
    }
}

/// A generated Bitcoin address together with its creation context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub value: String,
    pub info: AddressInfo,
}

impl Address {
    pub fn new(value: impl Into<String>, info: AddressInfo) -> Self {
        Self {
            value: value.into(),
            info,
        }
    }

    /// True when the address was generated at or before `timestamp_ms`.
    /// Addresses without a recorded generation time never qualify.
    pub fn generated_before(&self, timestamp_ms: i64) -> bool {
        self.info
            .generation_time
            .map(|time| time <= timestamp_ms)
            .unwrap_or(false)
    }
}
