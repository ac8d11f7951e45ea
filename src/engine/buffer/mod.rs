pub mod leftover;

use std::sync::Arc;
use ringbuf::{
    traits::{Consumer, Producer, Split, Observer},
    HeapRb,
    CachingProd,
    CachingCons,
};

pub use leftover::{LeftoverBuffer, Spill};

/// Prefetch ring between the decode thread and the real-time output callback.
/// Lock-free single-producer single-consumer; holds canonical interleaved f32.
pub struct PrefetchRing;

/// Producer half, owned by the decode thread.
pub struct PrefetchProducer {
    inner: CachingProd<Arc<HeapRb<f32>>>,
}

/// Consumer half, owned by the output callback.
pub struct PrefetchConsumer {
    inner: CachingCons<Arc<HeapRb<f32>>>,
}

impl PrefetchRing {
    /// Creates a ring holding `capacity` samples and splits it.
    pub fn with_capacity(capacity: usize) -> (PrefetchProducer, PrefetchConsumer) {
        let rb = HeapRb::<f32>::new(capacity.max(1));
        let (prod, cons) = rb.split();
        (
            PrefetchProducer { inner: prod },
            PrefetchConsumer { inner: cons },
        )
    }
}

impl PrefetchProducer {
    /// Pushes as many samples as fit. Returns the number pushed.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }

    pub fn vacant_len(&self) -> usize {
        self.inner.vacant_len()
    }
}

impl PrefetchConsumer {
    pub fn pop(&mut self) -> Option<f32> {
        self.inner.try_pop()
    }

    /// Pops samples into the provided slice.
    /// Returns the number of samples popped.
    pub fn pop_slice(&mut self, samples: &mut [f32]) -> usize {
        self.inner.pop_slice(samples)
    }

    pub fn occupied_len(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Drops everything queued, e.g. audio from before a seek.
    pub fn clear(&mut self) -> usize {
        self.inner.clear()
    }
}
