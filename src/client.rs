use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::{
    block::{Block, BlockTag, ResolvedBlock},
    etherscan::{EtherscanClient, ExplorerBlockNumber},
    network::ChainId,
    query::{BlockQuery, DatetimeInput, RangeQuery},
    source::BlockSource,
};

/// The first and last available blocks and the seconds-per-block rate
/// averaged over the whole chain history. The average is a coarse global
/// prior that seeds the first interpolation guess, not the final answer.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainBoundaries {
    pub earliest_block: Block,
    pub latest_block: Block,
    pub average_block_time: f64,
}

/// One query session against a chain. Owns the block cache, the boundary
/// snapshot and the per-timestamp search state; none of it is shared across
/// sessions.
pub struct BlockDatetime<S: BlockSource> {
    source: S,
    explorer: Option<EtherscanClient>,
    boundaries_max_age: Option<Duration>,
    /// Lazily populated, never evicted. A block number is fetched from the
    /// source at most once per session.
    blocks: RwLock<HashMap<u64, Block>>,
    /// Candidate numbers already tried per target timestamp, used to break
    /// cyclic re-visitation during refinement. Stores unclamped numbers.
    pub(crate) checked_blocks: Mutex<HashMap<i64, HashSet<i64>>>,
    boundaries: RwLock<Option<(Instant, ChainBoundaries)>>,
}

impl<S: BlockSource> BlockDatetime<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            explorer: None,
            boundaries_max_age: None,
            blocks: RwLock::new(HashMap::new()),
            checked_blocks: Mutex::new(HashMap::new()),
            boundaries: RwLock::new(None),
        }
    }

    /// Session with an Etherscan-family explorer client for single lookups.
    /// Fails for chains without a known public explorer API.
    pub fn with_explorer(source: S, chain_id: u64, api_key: &str) -> crate::Result<Self> {
        let explorer = EtherscanClient::new(ChainId::try_from(chain_id)?, api_key)?;
        let mut client = Self::new(source);
        client.explorer = Some(explorer);
        Ok(client)
    }

    /// Recompute the boundary snapshot when it is older than `max_age`. By
    /// default the snapshot is memoized for the session lifetime, so a
    /// long-lived session against a growing chain sees a stale head.
    pub fn boundaries_max_age(mut self, max_age: Duration) -> Self {
        self.boundaries_max_age = Some(max_age);
        self
    }

    /// Fetch a block through the session cache.
    pub async fn get_block(&self, number: u64) -> crate::Result<Block> {
        if let Some(block) = self.blocks.read().await.get(&number) {
            return Ok(block.clone());
        }
        let block = self
            .source
            .block_by_number(number)
            .await?
            .ok_or(crate::Error::BlockNotFound(number))?;
        self.blocks.write().await.insert(number, block.clone());
        Ok(block)
    }

    pub async fn get_block_by_tag(&self, tag: BlockTag) -> crate::Result<Block> {
        let number = match tag {
            BlockTag::Latest => self.source.latest_block_number().await?,
            BlockTag::Earliest => 1,
        };
        self.get_block(number).await
    }

    /// Boundary snapshot, memoized per the max-age rule. Recomputation is
    /// idempotent given a fixed chain state, so concurrent recomputes are
    /// harmless.
    pub async fn get_boundaries(&self) -> crate::Result<ChainBoundaries> {
        if let Some((computed_at, boundaries)) = self.boundaries.read().await.as_ref() {
            let expired = self
                .boundaries_max_age
                .map(|max_age| computed_at.elapsed() > max_age)
                .unwrap_or(false);
            if !expired {
                return Ok(boundaries.clone());
            }
        }

        let earliest_block = self.get_block_by_tag(BlockTag::Earliest).await?;
        let latest_block = self.get_block_by_tag(BlockTag::Latest).await?;
        let time_since_genesis = latest_block.timestamp.saturating_sub(earliest_block.timestamp);
        let average_block_time = time_since_genesis as f64 / latest_block.number as f64;

        tracing::debug!(
            earliest = earliest_block.number,
            latest = latest_block.number,
            average_block_time,
            "computed chain boundaries"
        );

        let boundaries = ChainBoundaries {
            earliest_block,
            latest_block,
            average_block_time,
        };
        *self.boundaries.write().await = Some((Instant::now(), boundaries.clone()));
        Ok(boundaries)
    }

    /// Resolve a single datetime to the closest block on the requested side.
    ///
    /// Timestamps before the earliest block fail with
    /// [`TimestampBeforeEarliestBlock`](crate::Error::TimestampBeforeEarliestBlock);
    /// timestamps past the chain head clamp to the latest block.
    pub async fn get_block_by_timestamp(&self, query: BlockQuery) -> crate::Result<ResolvedBlock> {
        if let DatetimeInput::Tag(tag) = query.timestamp {
            let block = self.get_block_by_tag(tag).await?;
            return Ok(format_resolved(
                block.datetime(),
                block,
                query.include_full_block,
            ));
        }

        let datetime = query.timestamp.to_utc()?;
        let target = datetime.timestamp();

        if query.use_block_explorer.unwrap_or(self.explorer.is_some()) {
            if let Some(explorer) = &self.explorer {
                let block = match explorer
                    .get_block_number_by_timestamp(target, query.closest)
                    .await?
                {
                    ExplorerBlockNumber::Number(number) => self.get_block(number).await?,
                    ExplorerBlockNumber::TooFarInFuture => {
                        self.get_boundaries().await?.latest_block
                    }
                };
                return Ok(format_resolved(datetime, block, query.include_full_block));
            }
        }

        let boundaries = self.get_boundaries().await?;
        if target < boundaries.earliest_block.timestamp as i64 {
            return Err(crate::Error::TimestampBeforeEarliestBlock(datetime));
        }
        if target > boundaries.latest_block.timestamp as i64 {
            return Ok(format_resolved(
                datetime,
                boundaries.latest_block,
                query.include_full_block,
            ));
        }

        self.checked_blocks.lock().await.insert(target, HashSet::new());

        // Interpolate the first candidate from the global average. 0 is a
        // legal prediction (genesis probe when the target sits on the
        // earliest block's timestamp).
        let elapsed = target - boundaries.earliest_block.timestamp as i64;
        let predicted = (elapsed as f64 / boundaries.average_block_time).ceil();
        let predicted = clamp_to_i64(predicted).clamp(0, boundaries.latest_block.number as i64);
        let candidate = self.get_block(predicted as u64).await?;

        let block_time = query.block_time.unwrap_or(boundaries.average_block_time);
        let block = self
            .find_closest_block(
                target,
                query.closest,
                candidate,
                block_time,
                boundaries.latest_block.number,
            )
            .await?;
        Ok(format_resolved(datetime, block, query.include_full_block))
    }

    /// Resolve a series of timestamps stepped from `start` to `end`.
    ///
    /// The first and last timestamps are resolved individually, the rate
    /// measured between their blocks then seeds every interior search. The
    /// interior resolutions are independent and run concurrently.
    pub async fn get_blocks_by_range(
        &self,
        query: RangeQuery,
    ) -> crate::Result<Vec<ResolvedBlock>> {
        if query.duration == 0 {
            return Err(crate::Error::InvalidRangeDuration);
        }

        let start = self.normalize(&query.start).await?;
        let end = match &query.end {
            Some(end) => self.normalize(end).await?,
            None => Utc::now(),
        };

        let mut timestamps = Vec::new();
        let mut current = start;
        while current <= end {
            timestamps.push(current);
            current = query.interval.advance(current, query.duration)?;
        }
        let Some((&first, &last)) = timestamps.first().zip(timestamps.last()) else {
            return Ok(Vec::new());
        };

        let first_block = self
            .get_block_by_timestamp(BlockQuery::new(first).closest(query.closest))
            .await?;
        let last_block = self
            .get_block_by_timestamp(BlockQuery::new(last).closest(query.closest))
            .await?;

        // Rate over the requested span. Falls back to the session average
        // when the endpoints land on the same block.
        let block_time = if last_block.number > first_block.number
            && last_block.timestamp > first_block.timestamp
        {
            (last_block.timestamp - first_block.timestamp) as f64
                / (last_block.number - first_block.number) as f64
        } else {
            self.get_boundaries().await?.average_block_time
        };

        tracing::debug!(
            samples = timestamps.len(),
            block_time,
            "resolving timestamp range"
        );

        futures::future::try_join_all(timestamps.into_iter().map(|timestamp| {
            self.get_block_by_timestamp(
                BlockQuery::new(timestamp)
                    .closest(query.closest)
                    .block_time(block_time)
                    .use_block_explorer(false)
                    .include_full_block(query.include_full_block),
            )
        }))
        .await
    }

    async fn normalize(&self, input: &DatetimeInput) -> crate::Result<DateTime<Utc>> {
        match input {
            DatetimeInput::Tag(tag) => {
                let boundaries = self.get_boundaries().await?;
                let block = match tag {
                    BlockTag::Earliest => boundaries.earliest_block,
                    BlockTag::Latest => boundaries.latest_block,
                };
                Ok(block.datetime())
            }
            input => input.to_utc(),
        }
    }
}

fn format_resolved(
    datetime: DateTime<Utc>,
    block: Block,
    include_full_block: bool,
) -> ResolvedBlock {
    ResolvedBlock {
        datetime,
        number: block.number,
        timestamp: block.timestamp,
        block: include_full_block.then_some(block),
    }
}

/// Convert a possibly non-finite f64 into i64. NaN maps to 0, infinities
/// saturate to a magnitude that still survives candidate arithmetic.
pub(crate) fn clamp_to_i64(value: f64) -> i64 {
    // exactly representable in f64, far beyond any chain height
    const LIMIT: f64 = 9.0e15;
    if value.is_nan() {
        return 0;
    }
    value.clamp(-LIMIT, LIMIT) as i64
}
