//! In-memory chain fixtures for exercising the search without a network.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{block::Block, source::BlockSource};

/// A simulated chain backing a [`BlockSource`]. Records every block fetch so
/// tests can assert on probe behavior.
pub struct MockChain {
    blocks: HashMap<u64, Block>,
    head: u64,
    fetch_log: Mutex<Vec<u64>>,
}

impl MockChain {
    /// Chain of blocks `0..=head` with a fixed seconds-per-block rate,
    /// genesis at `genesis_ts`.
    pub fn linear(head: u64, genesis_ts: u64, block_time: u64) -> Self {
        Self::build((0..=head).map(|number| genesis_ts + number * block_time))
    }

    /// Chain built from explicit block timestamps, numbered from 0.
    pub fn from_timestamps(timestamps: &[u64]) -> Self {
        Self::build(timestamps.iter().copied())
    }

    fn build(timestamps: impl Iterator<Item = u64>) -> Self {
        let blocks: HashMap<u64, Block> = timestamps
            .enumerate()
            .map(|(number, timestamp)| {
                let number = number as u64;
                (
                    number,
                    Block {
                        number,
                        timestamp,
                        ..Default::default()
                    },
                )
            })
            .collect();
        let head = blocks.len() as u64 - 1;
        Self {
            blocks,
            head,
            fetch_log: Mutex::new(Vec::new()),
        }
    }

    pub fn block(&self, number: u64) -> Block {
        self.blocks[&number].clone()
    }

    pub fn head(&self) -> u64 {
        self.head
    }

    /// Total block fetches served (cache misses from the session's view).
    pub fn fetch_count(&self) -> usize {
        self.fetch_log.lock().unwrap().len()
    }

    /// How often the most-fetched block number was requested.
    pub fn max_fetches_per_number(&self) -> usize {
        let log = self.fetch_log.lock().unwrap();
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for number in log.iter() {
            *counts.entry(*number).or_default() += 1;
        }
        counts.values().copied().max().unwrap_or(0)
    }
}

#[async_trait]
impl BlockSource for MockChain {
    async fn latest_block_number(&self) -> crate::Result<u64> {
        Ok(self.head)
    }

    async fn block_by_number(&self, number: u64) -> crate::Result<Option<Block>> {
        self.fetch_log.lock().unwrap().push(number);
        Ok(self.blocks.get(&number).cloned())
    }
}
