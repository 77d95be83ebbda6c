//! Running aggregates for execution and minimization times.
//!
//! Counters and extrema are lock-free so the child runner can record samples
//! without contending with the stats ticker; the running mean and the
//! streaming median share one small mutex so the ticker reads a consistent
//! center.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

/// A sample type the aggregate can hold. Comparisons go through the value
/// itself; the atomic extrema store the 64-bit pattern from `to_bits64`.
pub trait StatSample: Copy + PartialOrd {
    const MAX: Self;
    const MIN: Self;
    const ZERO: Self;

    fn to_bits64(self) -> u64;
    fn from_bits64(bits: u64) -> Self;
    fn as_f64(self) -> f64;
}

impl StatSample for f64 {
    const MAX: Self = f64::MAX;
    const MIN: Self = f64::MIN;
    const ZERO: Self = 0.0;

    fn to_bits64(self) -> u64 {
        self.to_bits()
    }

    fn from_bits64(bits: u64) -> Self {
        f64::from_bits(bits)
    }

    fn as_f64(self) -> f64 {
        self
    }
}

impl StatSample for u32 {
    const MAX: Self = u32::MAX;
    const MIN: Self = u32::MIN;
    const ZERO: Self = 0;

    fn to_bits64(self) -> u64 {
        u64::from(self)
    }

    fn from_bits64(bits: u64) -> Self {
        bits as u32
    }

    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

/// Heap entry with a total order derived from `PartialOrd`. Samples are
/// durations and counts, never NaN.
#[derive(Clone, Copy)]
struct HeapItem<T>(T);

impl<T: PartialOrd> PartialEq for HeapItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: PartialOrd> Eq for HeapItem<T> {}

impl<T: PartialOrd> PartialOrd for HeapItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: PartialOrd> Ord for HeapItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Exact streaming median over two heaps: a max-heap for the lower half and
/// a min-heap for the upper half, kept within one element of each other.
pub struct StreamingMedian<T: StatSample> {
    low: BinaryHeap<HeapItem<T>>,
    high: BinaryHeap<std::cmp::Reverse<HeapItem<T>>>,
}

impl<T: StatSample> Default for StreamingMedian<T> {
    fn default() -> Self {
        Self {
            low: BinaryHeap::new(),
            high: BinaryHeap::new(),
        }
    }
}

impl<T: StatSample> StreamingMedian<T> {
    pub fn add_number(&mut self, num: T) {
        let fits_low = self.low.peek().map_or(true, |top| num <= top.0);
        if fits_low {
            self.low.push(HeapItem(num));
        } else {
            self.high.push(std::cmp::Reverse(HeapItem(num)));
        }

        if self.low.len() > self.high.len() + 1 {
            if let Some(item) = self.low.pop() {
                self.high.push(std::cmp::Reverse(item));
            }
        } else if self.high.len() > self.low.len() {
            if let Some(std::cmp::Reverse(item)) = self.high.pop() {
                self.low.push(item);
            }
        }
    }

    pub fn median(&self) -> f64 {
        match (self.low.peek(), self.high.peek()) {
            (None, None) => f64::NAN,
            (Some(low), Some(high)) if self.low.len() == self.high.len() => {
                (low.0.as_f64() + high.0 .0.as_f64()) / 2.0
            }
            (Some(low), _) => low.0.as_f64(),
            (None, Some(high)) => high.0 .0.as_f64(),
        }
    }
}

struct Center<T: StatSample> {
    median: StreamingMedian<T>,
    average: f64,
}

/// Running `{count, min, max, avg, median}` aggregate. `add_number` may be
/// called from any thread.
pub struct StatisticsMemory<T: StatSample> {
    min_bits: AtomicU64,
    max_bits: AtomicU64,
    count: AtomicUsize,
    center: Mutex<Center<T>>,
}

impl<T: StatSample> Default for StatisticsMemory<T> {
    fn default() -> Self {
        Self {
            min_bits: AtomicU64::new(T::MAX.to_bits64()),
            max_bits: AtomicU64::new(T::MIN.to_bits64()),
            count: AtomicUsize::new(0),
            center: Mutex::new(Center {
                median: StreamingMedian::default(),
                average: 0.0,
            }),
        }
    }
}

fn update_extremum<T, F>(atom: &AtomicU64, val: T, outdated: F)
where
    T: StatSample,
    F: Fn(T, T) -> bool,
{
    let mut bits = atom.load(AtomicOrdering::Relaxed);
    while outdated(T::from_bits64(bits), val) {
        match atom.compare_exchange_weak(
            bits,
            val.to_bits64(),
            AtomicOrdering::Relaxed,
            AtomicOrdering::Relaxed,
        ) {
            Ok(_) => break,
            Err(seen) => bits = seen,
        }
    }
}

impl<T: StatSample> StatisticsMemory<T> {
    pub fn add_number(&self, num: T) {
        let my_count = self.count.fetch_add(1, AtomicOrdering::Relaxed) + 1;

        update_extremum(&self.max_bits, num, |current, new| current < new);
        update_extremum(&self.min_bits, num, |current, new| current > new);

        let mut center = self.center.lock().unwrap();
        center.median.add_number(num);
        center.average += (num.as_f64() - center.average) / my_count as f64;
    }

    pub fn count(&self) -> usize {
        self.count.load(AtomicOrdering::Relaxed)
    }

    pub fn min(&self) -> T {
        if self.count() == 0 {
            return T::ZERO;
        }
        T::from_bits64(self.min_bits.load(AtomicOrdering::Relaxed))
    }

    pub fn max(&self) -> T {
        if self.count() == 0 {
            return T::ZERO;
        }
        T::from_bits64(self.max_bits.load(AtomicOrdering::Relaxed))
    }

    pub fn avg(&self) -> f64 {
        if self.count() == 0 {
            return 0.0;
        }
        self.center.lock().unwrap().average
    }

    pub fn median(&self) -> f64 {
        if self.count() == 0 {
            return 0.0;
        }
        self.center.lock().unwrap().median.median()
    }
}
