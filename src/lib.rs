//! Find Ethereum blocks by datetime.
//!
//! The chain exposes blocks by number only, so answering "which block was
//! live at midnight on Jan 1" requires a search. [`BlockDatetime`] predicts a
//! candidate block from the chain's average block time, then corrects the
//! prediction with a locally measured block rate until the candidate is
//! provably the closest block to the target on the requested side. Every
//! fetched block is cached for the lifetime of the session.

pub mod block;
pub mod client;
pub mod error;
pub mod etherscan;
pub mod network;
pub mod query;
mod search;
pub mod source;

#[cfg(test)]
pub mod testutils;

pub use block::{Block, BlockTag, ResolvedBlock};
pub use client::{BlockDatetime, ChainBoundaries};
pub use error::{BlockDatetimeError as Error, Result};
pub use query::{BlockQuery, Closest, DatetimeInput, Interval, RangeQuery};
pub use source::{connect_http, BlockSource, RpcBlockSource};
