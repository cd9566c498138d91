use std::sync::Arc;

use crate::{
    block::ResolvedBlock, testutils::MockChain, BlockDatetime, BlockQuery, Closest,
};

// 2020-09-13 12:26:40 UTC
const GENESIS_TS: u64 = 1_600_000_000;

fn linear_session(head: u64, block_time: u64) -> (Arc<MockChain>, BlockDatetime<Arc<MockChain>>) {
    let chain = Arc::new(MockChain::linear(head, GENESIS_TS, block_time));
    let session = BlockDatetime::new(chain.clone());
    (chain, session)
}

async fn resolve(
    session: &BlockDatetime<Arc<MockChain>>,
    timestamp: u64,
    closest: Closest,
) -> crate::Result<ResolvedBlock> {
    session
        .get_block_by_timestamp(BlockQuery::new(timestamp as i64 * 1000).closest(closest))
        .await
}

// ============================================================================
// Termination predicate: after is inclusive, before is exclusive
// ============================================================================

#[tokio::test]
async fn after_returns_first_block_at_or_after_target() {
    let (_, session) = linear_session(1000, 10);

    // between blocks 499 (t+4990) and 500 (t+5000)
    let resolved = resolve(&session, GENESIS_TS + 4995, Closest::After)
        .await
        .unwrap();
    assert_eq!(resolved.number, 500);
    assert_eq!(resolved.timestamp, GENESIS_TS + 5000);
}

#[tokio::test]
async fn before_returns_last_block_strictly_before_target() {
    let (_, session) = linear_session(1000, 10);

    let resolved = resolve(&session, GENESIS_TS + 4995, Closest::Before)
        .await
        .unwrap();
    assert_eq!(resolved.number, 499);
    assert_eq!(resolved.timestamp, GENESIS_TS + 4990);
}

#[tokio::test]
async fn exact_timestamp_hit_is_asymmetric() {
    let (_, session) = linear_session(1000, 10);
    let target = GENESIS_TS + 5000; // block 500's own timestamp

    let after = resolve(&session, target, Closest::After).await.unwrap();
    assert_eq!(after.number, 500);

    let before = resolve(&session, target, Closest::Before).await.unwrap();
    assert_eq!(before.number, 499);
}

#[tokio::test]
async fn exact_timestamp_on_the_head_block() {
    let (chain, session) = linear_session(1000, 10);
    let latest_ts = chain.block(chain.head()).timestamp;

    let after = resolve(&session, latest_ts, Closest::After).await.unwrap();
    assert_eq!(after.number, chain.head());

    // the refinement starts at the head with a zero time difference and has
    // to walk down instead of oscillating against the head clamp
    let before = resolve(&session, latest_ts, Closest::Before).await.unwrap();
    assert_eq!(before.number, chain.head() - 1);
}

#[tokio::test]
async fn midpoint_of_chain_resolves_to_smallest_timestamp_at_or_after() {
    let (chain, session) = linear_session(2000, 13);
    let latest_ts = chain.block(chain.head()).timestamp;
    let target = GENESIS_TS + (latest_ts - GENESIS_TS) / 2;

    let resolved = resolve(&session, target, Closest::After).await.unwrap();
    assert!(resolved.timestamp >= target);
    assert!(chain.block(resolved.number - 1).timestamp < target);
}

// ============================================================================
// Chain boundary policy
// ============================================================================

#[tokio::test]
async fn timestamp_before_earliest_block_fails() {
    let (_, session) = linear_session(1000, 10);

    // earliest block is #1 at GENESIS_TS + 10; one second earlier must fail
    let result = resolve(&session, GENESIS_TS + 9, Closest::After).await;
    assert!(matches!(
        result,
        Err(crate::Error::TimestampBeforeEarliestBlock(_))
    ));
}

#[tokio::test]
async fn timestamp_on_earliest_block_resolves() {
    let (_, session) = linear_session(1000, 10);
    let earliest_ts = GENESIS_TS + 10;

    let after = resolve(&session, earliest_ts, Closest::After).await.unwrap();
    assert_eq!(after.number, 1);

    // the only block strictly before #1 is genesis
    let before = resolve(&session, earliest_ts, Closest::Before).await.unwrap();
    assert_eq!(before.number, 0);
}

#[tokio::test]
async fn future_timestamp_clamps_to_latest_block() {
    let (chain, session) = linear_session(1000, 10);
    let hundred_years = 100 * 365 * 24 * 3600;

    let resolved = resolve(&session, GENESIS_TS + hundred_years, Closest::After)
        .await
        .unwrap();
    assert_eq!(resolved.number, chain.head());
    assert_eq!(resolved.timestamp, chain.block(chain.head()).timestamp);
}

// ============================================================================
// Irregular block times
// ============================================================================

fn irregular_session() -> (Arc<MockChain>, BlockDatetime<Arc<MockChain>>) {
    // a burst of fast blocks, a long stall, another burst
    let chain = Arc::new(MockChain::from_timestamps(&[
        0, 100, 110, 115, 200, 900, 905, 910, 1000,
    ]));
    let session = BlockDatetime::new(chain.clone());
    (chain, session)
}

#[tokio::test]
async fn search_crosses_a_long_block_gap() {
    let (_, session) = irregular_session();

    // target falls inside the 200 -> 900 stall
    let after = resolve(&session, 500, Closest::After).await.unwrap();
    assert_eq!(after.number, 5);
    assert_eq!(after.timestamp, 900);

    let before = resolve(&session, 500, Closest::Before).await.unwrap();
    assert_eq!(before.number, 4);
    assert_eq!(before.timestamp, 200);
}

#[tokio::test]
async fn search_inside_a_fast_burst() {
    let (_, session) = irregular_session();

    let after = resolve(&session, 113, Closest::After).await.unwrap();
    assert_eq!(after.number, 3);

    let before = resolve(&session, 113, Closest::Before).await.unwrap();
    assert_eq!(before.number, 2);
}

#[tokio::test]
async fn coarse_seed_estimate_still_converges() {
    let (_, session) = irregular_session();

    // a wildly wrong seed overshoots past the head and forces candidate
    // revisits; the visited set must keep the refinement moving
    let resolved = session
        .get_block_by_timestamp(
            BlockQuery::new(500_000i64) // 500s in millis
                .closest(Closest::After)
                .block_time(0.001),
        )
        .await
        .unwrap();
    assert_eq!(resolved.number, 5);
}

#[tokio::test]
async fn duplicate_timestamps_at_the_head() {
    // chain stalls on one timestamp for its last three blocks
    let chain = Arc::new(MockChain::from_timestamps(&[0, 100, 200, 300, 300, 300]));
    let session = BlockDatetime::new(chain.clone());

    // first block of the run, proven by its predecessor
    let after = resolve(&session, 300, Closest::After).await.unwrap();
    assert_eq!(after.number, 3);

    let before = resolve(&session, 300, Closest::Before).await.unwrap();
    assert_eq!(before.number, 2);
}

// ============================================================================
// Session cache behavior
// ============================================================================

#[tokio::test]
async fn each_block_is_fetched_at_most_once_per_session() {
    let (chain, session) = linear_session(1000, 10);

    resolve(&session, GENESIS_TS + 4995, Closest::After)
        .await
        .unwrap();
    assert_eq!(chain.max_fetches_per_number(), 1);
}

#[tokio::test]
async fn repeated_resolution_is_idempotent_and_cached() {
    let (chain, session) = linear_session(1000, 10);
    let target = GENESIS_TS + 7777;

    let first = resolve(&session, target, Closest::After).await.unwrap();
    let fetches = chain.fetch_count();

    let second = resolve(&session, target, Closest::After).await.unwrap();
    assert_eq!(first, second);
    // the re-run walks the same probes, all served from the session cache
    assert_eq!(chain.fetch_count(), fetches);
}
