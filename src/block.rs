use alloy::primitives::{Address, Bytes, B256, B64, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// A numbered, timestamped unit of chain history. Only `number` and
/// `timestamp` participate in the search; the remaining fields are carried
/// through untouched for callers that want the full block.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub number: u64,
    /// Unix seconds.
    pub timestamp: u64,
    pub hash: Option<B256>,
    pub parent_hash: Option<B256>,
    pub nonce: Option<B64>,
    pub difficulty: Option<U256>,
    pub gas_limit: Option<u64>,
    pub gas_used: Option<u64>,
    pub miner: Option<Address>,
    pub extra_data: Option<Bytes>,
    pub base_fee_per_gas: Option<u64>,
}

impl Block {
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp as i64, 0).unwrap_or_default()
    }
}

impl From<alloy::rpc::types::Block> for Block {
    fn from(block: alloy::rpc::types::Block) -> Self {
        Self {
            number: block.header.number,
            timestamp: block.header.timestamp,
            hash: Some(block.header.hash),
            parent_hash: Some(block.header.parent_hash),
            nonce: Some(block.header.nonce),
            difficulty: Some(block.header.difficulty),
            gas_limit: Some(block.header.gas_limit),
            gas_used: Some(block.header.gas_used),
            miner: Some(block.header.beneficiary),
            extra_data: Some(block.header.extra_data.clone()),
            base_fee_per_gas: block.header.base_fee_per_gas,
        }
    }
}

// "latest" - the current head block
// "earliest" - block #1 (genesis timestamps are unreliable)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    Latest,
    Earliest,
}

serde_plain::derive_display_from_serialize!(BlockTag);
serde_plain::derive_fromstr_from_deserialize!(BlockTag);

/// A block resolved for a requested datetime. `block` is populated only when
/// the query asks for the full block.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResolvedBlock {
    pub datetime: DateTime<Utc>,
    pub number: u64,
    pub timestamp: u64,
    pub block: Option<Block>,
}
