//! Neighborhood expansion: the set of k-mers scoring at least a threshold
//! against a query k-mer under a substitution matrix.

use crate::error::IndexError;

/// Produces the dense indices of all k-mers similar to a query k-mer.
///
/// Implementations keep their own output buffer, so expansion is
/// allocation-free after warm-up; one generator instance belongs to one
/// worker thread.
pub trait KmerGenerator {
    /// Expand `kmer` into similar k-mer indices. The slice is valid until
    /// the next call. The query itself is included exactly when its
    /// self-score clears the threshold.
    fn expand(&mut self, kmer: &[u8]) -> &[u32];

    /// Estimate of the list size a single call yields, used to presize
    /// scratch buffers.
    fn fanout_hint(&self) -> usize {
        1
    }
}

/// Substitution-matrix neighborhood: depth-first enumeration over the k
/// positions, pruned with the best attainable score of the remaining suffix.
/// Indices come out in ascending order, matching [`crate::Indexer`]'s
/// positional encoding.
#[derive(Clone)]
pub struct SubstitutionGenerator {
    alphabet_size: usize,
    kmer_size: usize,
    /// Row-major `alphabet_size * alphabet_size` scores; row = query symbol.
    matrix: Box<[i8]>,
    threshold: i32,
    suffix_best: Vec<i32>,
    out: Vec<u32>,
    peak: usize,
}

impl SubstitutionGenerator {
    pub fn new(
        alphabet_size: usize,
        kmer_size: usize,
        matrix: Vec<i8>,
        threshold: i32,
    ) -> Result<Self, IndexError> {
        crate::table::table_size(alphabet_size, kmer_size)?;
        if matrix.len() != alphabet_size * alphabet_size {
            return Err(IndexError::ContractViolation(format!(
                "substitution matrix has {} cells, alphabet size {} needs {}",
                matrix.len(),
                alphabet_size,
                alphabet_size * alphabet_size
            )));
        }
        Ok(Self {
            alphabet_size,
            kmer_size,
            matrix: matrix.into_boxed_slice(),
            threshold,
            suffix_best: Vec::new(),
            out: Vec::new(),
            peak: 1,
        })
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }
}

impl KmerGenerator for SubstitutionGenerator {
    fn expand(&mut self, kmer: &[u8]) -> &[u32] {
        debug_assert_eq!(kmer.len(), self.kmer_size);
        let a = self.alphabet_size;

        // suffix_best[p] = best attainable score over positions p.., used to
        // cut branches that cannot reach the threshold anymore.
        self.suffix_best.clear();
        self.suffix_best.resize(self.kmer_size + 1, 0);
        for p in (0..self.kmer_size).rev() {
            let row = kmer[p] as usize * a;
            let best = self.matrix[row..row + a]
                .iter()
                .map(|&s| s as i32)
                .max()
                .unwrap_or(0);
            self.suffix_best[p] = self.suffix_best[p + 1] + best;
        }

        self.out.clear();
        descend(
            &self.matrix,
            a,
            kmer,
            &self.suffix_best,
            self.threshold,
            0,
            0,
            &mut self.out,
        );
        self.peak = self.peak.max(self.out.len());
        &self.out
    }

    fn fanout_hint(&self) -> usize {
        self.peak
    }
}

/// `remaining` is the score positions `pos..` still have to contribute.
/// A branch survives iff its score plus the best possible suffix completion
/// reaches it.
#[allow(clippy::too_many_arguments)]
fn descend(
    matrix: &[i8],
    a: usize,
    kmer: &[u8],
    suffix_best: &[i32],
    remaining: i32,
    pos: usize,
    prefix: u64,
    out: &mut Vec<u32>,
) {
    if pos == kmer.len() {
        out.push(prefix as u32);
        return;
    }
    let row = kmer[pos] as usize * a;
    for c in 0..a {
        let s = matrix[row + c] as i32;
        if s + suffix_best[pos + 1] >= remaining {
            descend(
                matrix,
                a,
                kmer,
                suffix_best,
                remaining - s,
                pos + 1,
                prefix * a as u64 + c as u64,
                out,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// match = 2, mismatch = 0 over a binary alphabet.
    fn binary_matrix() -> Vec<i8> {
        vec![2, 0, 0, 2]
    }

    #[test]
    fn exact_only_at_full_threshold() {
        let mut g = SubstitutionGenerator::new(2, 2, binary_matrix(), 4).unwrap();
        assert_eq!(g.expand(&[1, 0]), &[2]);
    }

    #[test]
    fn one_substitution_neighborhood() {
        let mut g = SubstitutionGenerator::new(2, 2, binary_matrix(), 2).unwrap();
        // [0,1] = 1; neighbors within one mismatch: 00, 01, 11.
        assert_eq!(g.expand(&[0, 1]), &[0, 1, 3]);
        assert!(g.fanout_hint() >= 3);
    }

    #[test]
    fn zero_threshold_spans_the_space() {
        let mut g = SubstitutionGenerator::new(2, 2, binary_matrix(), 0).unwrap();
        assert_eq!(g.expand(&[0, 0]), &[0, 1, 2, 3]);
    }

    #[test]
    fn rejects_misshapen_matrix() {
        assert!(SubstitutionGenerator::new(3, 2, vec![0; 4], 1).is_err());
    }
}
