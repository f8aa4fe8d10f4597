//! Combinatorics.
//!
//! Selections are generated lazily as ordinal vectors into a slice of candidate horses. Each
//! generator is a small `Copy` description of the sequence; iterating it again restarts the
//! sequence from the beginning.

/// Decomposes `permutation` into a mixed-radix number over the given `cardinalities`, writing one
/// ordinal per position. The first position varies fastest.
pub fn pick(cardinalities: &[usize], permutation: u64, ordinals: &mut [usize]) {
    let mut residual = permutation;
    for (index, &cardinality) in cardinalities.iter().enumerate() {
        let cardinality = cardinality as u64;
        let (quotient, remainder) = (residual / cardinality, residual % cardinality);
        residual = quotient;
        ordinals[index] = remainder as usize;
    }
}

pub fn count_picks(cardinalities: &[usize]) -> u64 {
    cardinalities.iter().map(|&cardinality| cardinality as u64).product()
}

/// Number of `k`-subsets of `n` items.
pub fn count_combinations(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = usize::min(k, n - k) as u64;
    let n = n as u64;
    let mut count = 1u64;
    for i in 0..k {
        count = count * (n - i) / (i + 1);
    }
    count
}

/// Number of ordered `k`-arrangements of `n` items.
pub fn count_permutations(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    (0..k as u64).map(|i| (n as u64) - i).product()
}

pub fn is_unique_linear(elements: &[usize], bitmap: &mut [bool]) -> bool {
    bitmap.fill(false);
    for &element in elements {
        if bitmap[element] {
            return false;
        }
        bitmap[element] = true;
    }
    true
}

/// All `k`-subsets of `n` ordinals in lexicographic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combinations {
    n: usize,
    k: usize,
}
impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self { n, k }
    }

    pub fn count(&self) -> u64 {
        count_combinations(self.n, self.k)
    }

    pub fn iter(&self) -> CombinationIter {
        CombinationIter {
            n: self.n,
            ordinals: (0..self.k).collect(),
            exhausted: self.k > self.n,
        }
    }
}

impl IntoIterator for Combinations {
    type Item = Vec<usize>;
    type IntoIter = CombinationIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct CombinationIter {
    n: usize,
    ordinals: Vec<usize>,
    exhausted: bool,
}
impl Iterator for CombinationIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self.ordinals.clone();

        // advance to the next subset: bump the rightmost ordinal that has headroom, then reset its tail
        let k = self.ordinals.len();
        let mut position = k;
        loop {
            if position == 0 {
                self.exhausted = true;
                break;
            }
            position -= 1;
            if self.ordinals[position] < self.n - k + position {
                self.ordinals[position] += 1;
                for tail in position + 1..k {
                    self.ordinals[tail] = self.ordinals[tail - 1] + 1;
                }
                break;
            }
        }
        Some(current)
    }
}

/// All ordered `k`-arrangements of `n` distinct ordinals. Candidates are drawn from the mixed-radix
/// sequence of [pick] and those with repeated ordinals are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutations {
    n: usize,
    k: usize,
}
impl Permutations {
    pub fn new(n: usize, k: usize) -> Self {
        Self { n, k }
    }

    pub fn count(&self) -> u64 {
        count_permutations(self.n, self.k)
    }

    pub fn iter(&self) -> PermutationIter {
        let cardinalities = vec![self.n; self.k];
        let picks = if self.k > self.n {
            0
        } else {
            count_picks(&cardinalities)
        };
        PermutationIter {
            cardinalities,
            picks,
            next_pick: 0,
            bitmap: vec![false; self.n],
        }
    }
}

impl IntoIterator for Permutations {
    type Item = Vec<usize>;
    type IntoIter = PermutationIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct PermutationIter {
    cardinalities: Vec<usize>,
    picks: u64,
    next_pick: u64,
    bitmap: Vec<bool>,
}
impl Iterator for PermutationIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut ordinals = vec![0; self.cardinalities.len()];
        while self.next_pick != self.picks {
            pick(&self.cardinalities, self.next_pick, &mut ordinals);
            self.next_pick += 1;
            if is_unique_linear(&ordinals, &mut self.bitmap) {
                return Some(ordinals);
            }
        }
        None
    }
}
