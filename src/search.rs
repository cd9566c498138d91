//! The interpolation search. A candidate block is accepted only once a probe
//! of its neighbor proves it is the closest block to the target on the
//! requested side; until then the candidate is moved by the time difference
//! divided by the current seconds-per-block estimate, and the estimate is
//! replaced with the secant slope between the two most recent probes. A
//! visited set per target guarantees every refinement lands on a fresh block
//! number, so the loop terminates even with pathological estimates.

use crate::{
    block::Block,
    client::{clamp_to_i64, BlockDatetime},
    query::Closest,
    source::BlockSource,
};

impl<S: BlockSource> BlockDatetime<S> {
    /// Converge on the block closest to `target` (Unix seconds) from the
    /// given starting candidate. `latest_number` bounds the probes; callers
    /// have already clamped the target into the chain's timestamp span.
    pub(crate) async fn find_closest_block(
        &self,
        target: i64,
        closest: Closest,
        mut candidate: Block,
        mut block_time: f64,
        latest_number: u64,
    ) -> crate::Result<Block> {
        loop {
            if self.is_closest_block(target, &candidate, closest).await? {
                return Ok(candidate);
            }

            let difference = target - candidate.timestamp as i64;
            let mut skip = clamp_to_i64((difference as f64 / block_time).ceil());
            if skip == 0 {
                // Zero skip means the target sits at or just below the
                // candidate's timestamp, and a failed predicate there puts
                // the answer below the candidate on either side (on the
                // after side the predecessor already reached the target).
                // The forced step must walk down: walking up from the
                // latest block would pin against the head clamp.
                skip = if difference <= 0 { -1 } else { 1 };
            }

            let next_number = self
                .next_unchecked_number(target, candidate.number as i64, skip)
                .await;
            let next_number = next_number.clamp(1, latest_number as i64) as u64;

            tracing::trace!(
                candidate = candidate.number,
                next = next_number,
                block_time,
                "refining candidate"
            );

            let next = self.get_block(next_number).await?;
            // Secant slope between the two latest probes. Skipped when the
            // clamp collapsed the step or the slope would be zero.
            if next.number != candidate.number && next.timestamp != candidate.timestamp {
                block_time = ((candidate.timestamp as f64 - next.timestamp as f64)
                    / (candidate.number as f64 - next.number as f64))
                    .abs();
            }
            candidate = next;
        }
    }

    /// One neighbor probe proves closeness: `After` wants the first block
    /// at/after the target, `Before` the last block strictly before it.
    async fn is_closest_block(
        &self,
        target: i64,
        candidate: &Block,
        closest: Closest,
    ) -> crate::Result<bool> {
        let candidate_ts = candidate.timestamp as i64;
        match closest {
            Closest::After => {
                if candidate_ts < target {
                    return Ok(false);
                }
                // genesis has no predecessor to disprove it
                if candidate.number == 0 {
                    return Ok(true);
                }
                let previous = self.get_block(candidate.number - 1).await?;
                Ok((previous.timestamp as i64) < target)
            }
            Closest::Before => {
                if candidate_ts >= target {
                    return Ok(false);
                }
                let next = self.get_block(candidate.number + 1).await?;
                Ok(next.timestamp as i64 >= target)
            }
        }
    }

    /// Apply `skip` to `current`, walking the skip away from zero while the
    /// resulting number was already tried for this target. The chosen number
    /// is recorded unclamped, so a later clamp collision cannot re-trigger
    /// the same walk.
    async fn next_unchecked_number(&self, target: i64, current: i64, mut skip: i64) -> i64 {
        let mut checked = self.checked_blocks.lock().await;
        let visited = checked.entry(target).or_default();
        let mut next = current.saturating_add(skip);
        while visited.contains(&next) {
            skip = skip.saturating_add(if skip < 0 { -1 } else { 1 });
            next = current.saturating_add(skip);
        }
        visited.insert(next);
        next
    }
}
