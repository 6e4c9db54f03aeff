//! Strategies for assigning chunks to worker groups.
//!
//! Assignment only affects load balance and which of several true matches is
//! reported first; every chunk lands in exactly one group either way.

use crate::partition::Chunk;
use std::collections::VecDeque;

/// Splits chunks into at most `groups` non-empty groups, one per task.
pub trait ChunkDistributor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Distributes `chunks`; returns no empty groups.
    fn distribute(&self, chunks: Vec<Chunk>, groups: usize) -> Vec<Vec<Chunk>>;
}

/// Deals chunks round-robin, alternately from the front and the back of the
/// row-major chunk list.
///
/// Neighbouring chunks end up in different groups, so a region dense with
/// near-matches is spread across workers.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlternatingEnds;

impl ChunkDistributor for AlternatingEnds {
    fn name(&self) -> &'static str {
        "alternating_ends"
    }

    fn distribute(&self, chunks: Vec<Chunk>, groups: usize) -> Vec<Vec<Chunk>> {
        let count = groups.max(1).min(chunks.len());
        let mut out: Vec<Vec<Chunk>> = (0..count).map(|_| Vec::new()).collect();
        let mut queue: VecDeque<Chunk> = chunks.into();
        let mut turn = 0usize;
        loop {
            let next = if turn % 2 == 0 {
                queue.pop_front()
            } else {
                queue.pop_back()
            };
            let Some(chunk) = next else {
                break;
            };
            out[turn % count].push(chunk);
            turn += 1;
        }
        out
    }
}

/// Deals chunks round-robin in row-major order and reverses every second
/// group, so odd groups scan bottom-up.
#[derive(Clone, Copy, Debug, Default)]
pub struct Striped;

impl ChunkDistributor for Striped {
    fn name(&self) -> &'static str {
        "striped"
    }

    fn distribute(&self, chunks: Vec<Chunk>, groups: usize) -> Vec<Vec<Chunk>> {
        let count = groups.max(1).min(chunks.len());
        let mut out: Vec<Vec<Chunk>> = (0..count).map(|_| Vec::new()).collect();
        for (idx, chunk) in chunks.into_iter().enumerate() {
            out[idx % count].push(chunk);
        }
        for group in out.iter_mut().skip(1).step_by(2) {
            group.reverse();
        }
        out
    }
}
