//! Bounded top-k candidate sets
//!
//! Candidates are ranked by descending kernel value, equal values by ascending
//! index. Since that is a total order, the k entries a set retains do not depend
//! on the order in which points were offered.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A reference point together with its kernel value against the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub kernel: f64,
}

impl Candidate {
    pub fn new(index: usize, kernel: f64) -> Self {
        Self { index, kernel }
    }

    /// Ranking order: `Less` means `self` is the better candidate
    pub fn rank(&self, other: &Candidate) -> Ordering {
        other
            .kernel
            .partial_cmp(&self.kernel)
            .unwrap_or(Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }

    /// Whether `self` ranks strictly before `other`
    pub fn beats(&self, other: &Candidate) -> bool {
        self.rank(other) == Ordering::Less
    }
}

/// Heap entry whose maximum is the worst-ranked candidate
#[derive(Debug, Clone, Copy)]
struct Worst(Candidate);

impl PartialEq for Worst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Worst {}

impl PartialOrd for Worst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Worst {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank(&other.0)
    }
}

/// Whether a subtree might still hold a candidate ranking before `worst`.
///
/// `bound` is an upper bound on every kernel value in the subtree and
/// `min_index` its smallest point index; `worst` is the threshold candidate
/// (`None` while fewer than k candidates are known). A subtree whose bound
/// equals the threshold value is kept only if it could win the tie by index.
pub fn admits(worst: Option<&Candidate>, bound: f64, min_index: usize) -> bool {
    match worst {
        None => true,
        Some(w) => bound > w.kernel || (bound == w.kernel && min_index < w.index),
    }
}

/// The worse-ranked of two thresholds; `None` (not yet full) dominates
pub fn looser(a: Option<Candidate>, b: Option<Candidate>) -> Option<Candidate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a.beats(&b) { b } else { a }),
        _ => None,
    }
}

/// The best `k` candidates seen so far for one query
#[derive(Debug, Clone)]
pub struct CandidateSet {
    heap: BinaryHeap<Worst>,
    k: usize,
}

impl CandidateSet {
    /// Create an empty set keeping at most `k` candidates
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    /// Capacity of the set
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of candidates currently held
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether the set holds k candidates
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// The kth best candidate, or `None` while the set is not full
    pub fn worst(&self) -> Option<&Candidate> {
        if self.is_full() {
            self.heap.peek().map(|w| &w.0)
        } else {
            None
        }
    }

    /// Offer a candidate; returns true if it was accepted
    pub fn insert(&mut self, index: usize, kernel: f64) -> bool {
        let candidate = Candidate::new(index, kernel);
        if self.k == 0 {
            return false;
        }
        if !self.is_full() {
            self.heap.push(Worst(candidate));
            return true;
        }
        match self.heap.peek() {
            Some(worst) if candidate.beats(&worst.0) => {
                self.heap.pop();
                self.heap.push(Worst(candidate));
                true
            }
            _ => false,
        }
    }

    /// Whether a subtree with this bound and minimum index could improve the set
    pub fn admits(&self, bound: f64, min_index: usize) -> bool {
        admits(self.worst(), bound, min_index)
    }

    /// Consume the set, returning candidates best first
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec().into_iter().map(|w| w.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order() {
        let high = Candidate::new(5, 2.0);
        let low = Candidate::new(1, 1.0);
        assert!(high.beats(&low));
        assert!(!low.beats(&high));

        // Equal values: the smaller index wins
        let a = Candidate::new(3, 1.0);
        let b = Candidate::new(7, 1.0);
        assert!(a.beats(&b));
        assert!(!b.beats(&a));
        assert!(!a.beats(&a));
    }

    #[test]
    fn test_candidate_set_keeps_best_k() {
        let mut set = CandidateSet::new(3);
        for (i, v) in [0.5, 3.0, -1.0, 2.0, 4.0, 1.0].iter().enumerate() {
            set.insert(i, *v);
        }
        assert!(set.is_full());
        assert_eq!(set.worst().map(|c| c.index), Some(3));

        let sorted = set.into_sorted_vec();
        let indices: Vec<usize> = sorted.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![4, 1, 3]);
        assert_eq!(sorted[0].kernel, 4.0);
    }

    #[test]
    fn test_insert_order_independent() {
        let values = [(0, 1.0), (1, 5.0), (2, 1.0), (3, 5.0), (4, 1.0), (5, 2.0)];

        let mut forward = CandidateSet::new(4);
        for &(i, v) in &values {
            forward.insert(i, v);
        }
        let mut backward = CandidateSet::new(4);
        for &(i, v) in values.iter().rev() {
            backward.insert(i, v);
        }

        let forward = forward.into_sorted_vec();
        assert_eq!(forward, backward.into_sorted_vec());
        let indices: Vec<usize> = forward.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 3, 5, 0]);
    }

    #[test]
    fn test_worst_and_admits() {
        let mut set = CandidateSet::new(2);
        assert!(set.worst().is_none());
        assert!(set.admits(f64::NEG_INFINITY, 100));

        assert!(set.insert(4, 3.0));
        assert!(set.insert(6, 2.0));
        assert_eq!(set.worst(), Some(&Candidate::new(6, 2.0)));

        assert!(set.admits(2.5, 0));
        assert!(!set.admits(1.5, 0));
        // Tied bound: only smaller indices could still enter
        assert!(set.admits(2.0, 5));
        assert!(!set.admits(2.0, 6));
        assert!(!set.admits(2.0, 9));

        // Strictly worse or tied-but-larger candidates are rejected
        assert!(!set.insert(9, 2.0));
        assert!(!set.insert(1, 1.0));
        assert!(set.insert(5, 2.0));
        assert_eq!(set.worst(), Some(&Candidate::new(5, 2.0)));
    }

    #[test]
    fn test_looser() {
        let a = Some(Candidate::new(1, 2.0));
        let b = Some(Candidate::new(2, 1.0));
        assert_eq!(looser(a, b), b);
        assert_eq!(looser(b, a), b);
        assert_eq!(looser(a, None), None);
        assert_eq!(looser(None, None), None);

        // Same value: the larger index is the looser threshold
        let c = Some(Candidate::new(9, 1.0));
        assert_eq!(looser(b, c), c);
    }

    #[test]
    fn test_zero_capacity() {
        let mut set = CandidateSet::new(0);
        assert!(!set.insert(0, 1.0));
        assert!(set.is_empty());
        assert_eq!(set.k(), 0);
    }
}
