//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use rand::Rng;

/// Returns random swap permutation of `0..n`
///
/// `(0 1 2 3) -> (2 3 0 1)`
/// From https://en.wikipedia.org/wiki/Fisher%E2%80%93Yates_shuffle
pub fn gen_permute_pattern<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut res_: Vec<usize> = (0..n).collect::<Vec<usize>>();

    // To shuffle an array a of n elements (indices 0..n-1):
    for i in 0..n.saturating_sub(1) {
        let j = rng.gen_range(i..n);
        res_.swap(i, j);
    }
    res_
}

/// Splits `items` into `parts` contiguous chunks whose sizes differ by at most one
///
/// The first `len % parts` chunks carry the extra element.
///
/// # Example
///
/// ```
/// use common::permutations;
/// let chunks = permutations::split_even(&[0, 1, 2, 3, 4], 2);
/// assert_eq!(chunks, vec![vec![0, 1, 2], vec![3, 4]]);
/// ```
pub fn split_even<T: Clone>(items: &[T], parts: usize) -> Vec<Vec<T>> {
    assert!(parts > 0, "cannot split into zero parts");
    let base = items.len() / parts;
    let extra = items.len() % parts;

    let mut res = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        res.push(items[start..start + len].to_vec());
        start += len;
    }
    res
}

/// Shuffles the row indices `0..n` and cuts them into `max(1, n / batch_size)` batches
pub fn gen_batches<R: Rng + ?Sized>(n: usize, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
    assert!(batch_size > 0, "batch size must be positive");
    let permutation = gen_permute_pattern(n, rng);
    let n_batches = std::cmp::max(1, n / batch_size);
    split_even(&permutation, n_batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const NUM_TEST_ITERATIONS: usize = 50;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn permutation_is_complete() {
        let mut rng = SmallRng::seed_from_u64(7);
        for n in [0, 1, 2, 17, 100] {
            let p = gen_permute_pattern(n, &mut rng);
            assert_eq!(sorted(p), (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn same_seed_same_permutation() {
        let a = gen_permute_pattern(40, &mut SmallRng::seed_from_u64(3));
        let b = gen_permute_pattern(40, &mut SmallRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn split_even_sizes() {
        let items: Vec<usize> = (0..10).collect();
        let chunks = split_even(&items, 3);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(chunks.concat(), items);
    }

    #[test]
    fn batches_cover_every_row_once() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..NUM_TEST_ITERATIONS {
            for (n, batch_size) in [(4, 4), (10, 3), (101, 10), (3, 8)] {
                let batches = gen_batches(n, batch_size, &mut rng);
                assert_eq!(batches.len(), std::cmp::max(1, n / batch_size));
                assert_eq!(sorted(batches.concat()), (0..n).collect::<Vec<_>>());
            }
        }
    }
}
