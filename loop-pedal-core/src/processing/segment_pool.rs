//! Pre-allocated capture segments handed from the control thread to the audio callback.
//!
//! The control thread allocates [`Segment`]s and pushes them through a lock-free SPSC ring
//! ([`SegmentFeeder`]); the capture callback pops them ([`SegmentSupply`]) when its current
//! segment fills up. Allocation therefore never happens on the audio thread.

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

/// Fixed-capacity block of interleaved samples. Never reallocates after creation.
#[derive(Debug)]
pub struct Segment {
    samples: Vec<f32>,
    capacity: usize,
}

impl Segment {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Copy as many of `samples` as fit. Returns the number copied.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let count = samples.len().min(self.room());
        self.samples.extend_from_slice(&samples[..count]);
        count
    }

    /// Remaining free samples.
    pub fn room(&self) -> usize {
        self.capacity - self.samples.len()
    }

    pub fn is_full(&self) -> bool {
        self.room() == 0
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Create a matched feeder/supply pair.
///
/// - `segment_samples`: samples per segment (frames per segment × channels).
/// - `spare_capacity`: how many spare segments may wait in the ring at once.
/// - `budget`: total segments the feeder may ever allocate.
///
/// The ring is filled before this returns.
pub fn segment_pool(segment_samples: usize, spare_capacity: usize, budget: usize) -> (SegmentFeeder, SegmentSupply) {
    let rb = HeapRb::<Segment>::new(spare_capacity.max(1));
    let (prod, cons) = rb.split();
    let mut feeder = SegmentFeeder {
        inner: prod,
        segment_samples,
        remaining_budget: budget,
    };
    feeder.replenish();
    (
        feeder,
        SegmentSupply {
            inner: cons,
            segment_samples,
        },
    )
}

/// Producer half. Lives on the control thread and is the only place segments are allocated.
pub struct SegmentFeeder {
    inner: ringbuf::HeapProd<Segment>,
    segment_samples: usize,
    remaining_budget: usize,
}

impl SegmentFeeder {
    /// Top the ring back up. Returns the number of segments allocated.
    pub fn replenish(&mut self) -> usize {
        let mut added = 0;
        while self.remaining_budget > 0 && self.inner.vacant_len() > 0 {
            if self.inner.try_push(Segment::with_capacity(self.segment_samples)).is_err() {
                break;
            }
            self.remaining_budget -= 1;
            added += 1;
        }
        added
    }

    /// Spare segments currently waiting for the callback.
    pub fn spare(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Segments that may still be allocated for this take.
    pub fn remaining_budget(&self) -> usize {
        self.remaining_budget
    }
}

/// Consumer half. Owned by the capture buffer on the audio thread.
pub struct SegmentSupply {
    inner: ringbuf::HeapCons<Segment>,
    segment_samples: usize,
}

impl SegmentSupply {
    /// Pop a fresh segment, if one is waiting.
    pub fn take(&mut self) -> Option<Segment> {
        self.inner.try_pop()
    }

    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn segment_samples(&self) -> usize {
        self.segment_samples
    }
}
