//! Chunk planning: how to split a document and how much to ask per chunk

use crate::config::PlannerLimits;

/// Derived chunking plan for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub pages_per_chunk: usize,
    pub total_chunks: usize,
    pub items_per_chunk: usize,
    pub concurrency: usize,
}

impl ChunkPlan {
    /// Partition `[0, total_pages)` into ordered buckets of `pages_per_chunk`
    ///
    /// The last bucket may be shorter.
    pub fn buckets(&self, total_pages: usize) -> Vec<Vec<usize>> {
        let pages: Vec<usize> = (0..total_pages).collect();
        pages
            .chunks(self.pages_per_chunk.max(1))
            .map(|bucket| bucket.to_vec())
            .collect()
    }
}

/// Pure planner parameterised by its upper bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkPlanner {
    limits: PlannerLimits,
}

impl ChunkPlanner {
    pub fn new(limits: PlannerLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> PlannerLimits {
        self.limits
    }

    /// Compute the plan for a document of `total_pages` and a target item count
    ///
    /// Callers validate both inputs as positive; zero is treated as one so
    /// the function stays total.
    pub fn plan(&self, total_pages: usize, target_item_count: usize) -> ChunkPlan {
        let total_pages = total_pages.max(1);
        let target = target_item_count.max(1);
        let max_pages = self.limits.max_pages_per_chunk.max(1);
        let max_concurrency = self.limits.max_concurrency.max(1);

        let pages_per_chunk = total_pages.div_ceil(target).min(max_pages);
        let total_chunks = total_pages.div_ceil(pages_per_chunk);
        let items_per_chunk = target.div_ceil(total_chunks).max(1);
        let concurrency = total_chunks.min(target).min(max_concurrency);

        ChunkPlan {
            pages_per_chunk,
            total_chunks,
            items_per_chunk,
            concurrency,
        }
    }
}

/// Plan with the default limits (3 pages per chunk, 5 in flight)
pub fn plan(total_pages: usize, target_item_count: usize) -> ChunkPlan {
    ChunkPlanner::default().plan(total_pages, target_item_count)
}
