//! Benchmark profiles and utilities for rawmem.
//!
//! - [`churn_sizes`]: a deterministic sequence of allocation sizes
//! - [`build_list`]: a heap-resident list of [`Sample`] elements
//! - [`churn`]: allocate a batch, then free every other block

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rawmem_heap::{define_struct, Heap, MemError, MemoryView, Struct};
use rawmem_list::List;

define_struct! {
    /// A small list element: an id and a short tag.
    pub struct Sample {
        /// Position in the generated sequence.
        id: UInt32,
        /// Free-form label.
        tag: CString(12),
    }
}

/// Generate `n` allocation sizes in `1..=max`.
///
/// Uses a simple multiplicative hash of the seed, so the same inputs give
/// the same sequence.
pub fn churn_sizes(n: usize, max: u32, seed: u64) -> Vec<u32> {
    (0..n as u64)
        .map(|i| {
            let h = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(i.wrapping_mul(1442695040888963407));
            1 + ((h >> 33) % max as u64) as u32
        })
        .collect()
}

/// Allocate a list head and `n` samples from `heap`, adding each to the list.
pub fn build_list(heap: &Heap, n: u32) -> Result<(List<Sample>, Vec<Sample>), MemError> {
    let list = List::new_in(heap)?;
    let mut samples = Vec::with_capacity(n as usize);
    for id in 0..n {
        let sample = Sample::new_in(heap)?;
        sample.id().set(id as i64);
        sample.tag().set("sample");
        list.add(&sample)?;
        samples.push(sample);
    }
    Ok((list, samples))
}

/// Allocate one block per size, then free every other one.
///
/// Leaves the heap fragmented with the surviving blocks still live; they
/// are returned so the caller can free them.
pub fn churn(heap: &Heap, sizes: &[u32]) -> Result<Vec<MemoryView>, MemError> {
    let blocks = sizes
        .iter()
        .map(|&size| heap.allocate(size))
        .collect::<Result<Vec<_>, _>>()?;
    let mut survivors = Vec::with_capacity(blocks.len() / 2 + 1);
    for (i, block) in blocks.into_iter().enumerate() {
        if i % 2 == 0 {
            heap.free_view(&block);
        } else {
            survivors.push(block);
        }
    }
    Ok(survivors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_sizes_deterministic_and_bounded() {
        let a = churn_sizes(200, 32, 42);
        let b = churn_sizes(200, 32, 42);
        assert_eq!(a, b);
        assert!(a.iter().all(|&s| (1..=32).contains(&s)));
        assert_ne!(a, churn_sizes(200, 32, 7));
    }

    #[test]
    fn build_list_links_every_sample() {
        let heap = Heap::with_capacity(4096).unwrap();
        let (list, samples) = build_list(&heap, 10).unwrap();
        assert_eq!(list.len().unwrap(), 10);
        assert_eq!(samples[9].id().get(), 9);
    }

    #[test]
    fn churn_frees_half() {
        let heap = Heap::with_capacity(4096).unwrap();
        let sizes = churn_sizes(20, 16, 1);
        let survivors = churn(&heap, &sizes).unwrap();
        assert_eq!(survivors.len(), 10);
        assert_eq!(heap.stats().live_allocations, 10);
        for block in &survivors {
            heap.free_view(block);
        }
        assert_eq!(heap.stats().live_allocations, 0);
    }
}
