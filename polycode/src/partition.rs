//! Block geometry for the polynomial code.
//!
//! A (s×r) and B (s×t) are cut into `p` row bands; A's columns into `m`
//! bands and B's columns into `n` bands. Block `(j, k)` of A becomes the
//! coefficient of `x^(j + k·p)` in Ã, block `(j, k1)` of B the coefficient
//! of `x^(p−1−j + k1·p·m)` in B̃. In the product Ãᵀ·B̃ the output block
//! `(k, k1)` of Aᵀ·B is the coefficient of `x^(p−1 + k·p + k1·p·m)`.

use crate::error::ConfigError;

/// Matrix dimensions: A is `s × r`, B is `s × t`, C = Aᵀ·B is `r × t`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub r: usize,
    pub s: usize,
    pub t: usize,
}

/// Requested block counts along the shared (`p`), A-column (`m`) and
/// B-column (`n`) dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockCounts {
    pub p: usize,
    pub m: usize,
    pub n: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockGeometry {
    pub dims: Dimensions,
    pub blocks: BlockCounts,
    /// Rows per block of both A and B (`s / p`).
    pub subrow: usize,
    /// Columns per block of A (`r / m`).
    pub subcol_a: usize,
    /// Columns per block of B (`t / n`).
    pub subcol_b: usize,
}

impl BlockGeometry {
    /// Partitions the matrices, refusing any split that is not exact.
    pub fn new(dims: Dimensions, blocks: BlockCounts) -> Result<Self, ConfigError> {
        for (name, value) in [("r", dims.r), ("s", dims.s), ("t", dims.t)] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        for (name, value) in [("p", blocks.p), ("m", blocks.m), ("n", blocks.n)] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        Ok(Self {
            dims,
            blocks,
            subrow: exact_div("s", dims.s, "p", blocks.p)?,
            subcol_a: exact_div("r", dims.r, "m", blocks.m)?,
            subcol_b: exact_div("t", dims.t, "n", blocks.n)?,
        })
    }

    /// Number of distinct evaluations needed to interpolate the product: `p·m·n + p − 1`.
    pub fn quorum_size(&self) -> usize {
        self.max_degree() + 1
    }

    /// Highest degree of Ã(x)ᵀ·B̃(x): `p·m·n + p − 2`.
    pub fn max_degree(&self) -> usize {
        let BlockCounts { p, m, n } = self.blocks;
        p * m * n + p - 2
    }

    pub fn a_exponent(&self, j: usize, k: usize) -> usize {
        j + k * self.blocks.p
    }

    pub fn b_exponent(&self, j: usize, k1: usize) -> usize {
        let BlockCounts { p, m, .. } = self.blocks;
        p - 1 - j + k1 * p * m
    }

    /// Degree whose coefficient holds output block `(k, k1)`.
    pub fn output_degree(&self, k: usize, k1: usize) -> usize {
        let BlockCounts { p, m, .. } = self.blocks;
        p - 1 + k * p + k1 * p * m
    }

    /// Shape of one encoded A block.
    pub fn a_block_shape(&self) -> (usize, usize) {
        (self.subrow, self.subcol_a)
    }

    /// Shape of one encoded B block.
    pub fn b_block_shape(&self) -> (usize, usize) {
        (self.subrow, self.subcol_b)
    }

    /// Shape of every worker's partial result.
    pub fn partial_shape(&self) -> (usize, usize) {
        (self.subcol_a, self.subcol_b)
    }
}

fn exact_div(
    dimension: &'static str,
    value: usize,
    blocks: &'static str,
    count: usize,
) -> Result<usize, ConfigError> {
    if value % count != 0 {
        return Err(ConfigError::NotDivisible {
            dimension,
            value,
            blocks,
            count,
        });
    }
    Ok(value / count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(r: usize, s: usize, t: usize, p: usize, m: usize, n: usize) -> BlockGeometry {
        BlockGeometry::new(Dimensions { r, s, t }, BlockCounts { p, m, n }).unwrap()
    }

    #[test]
    fn splits_exactly() {
        let g = geometry(6, 4, 9, 2, 3, 3);
        assert_eq!(g.subrow, 2);
        assert_eq!(g.subcol_a, 2);
        assert_eq!(g.subcol_b, 3);
        assert_eq!(g.partial_shape(), (2, 3));
    }

    #[test]
    fn rejects_inexact_split() {
        let err = BlockGeometry::new(
            Dimensions { r: 4, s: 3, t: 4 },
            BlockCounts { p: 2, m: 2, n: 2 },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotDivisible {
                dimension: "s",
                value: 3,
                blocks: "p",
                count: 2
            }
        );

        let err = BlockGeometry::new(
            Dimensions { r: 5, s: 2, t: 4 },
            BlockCounts { p: 2, m: 2, n: 2 },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotDivisible { dimension: "r", .. }));

        let err = BlockGeometry::new(
            Dimensions { r: 4, s: 2, t: 7 },
            BlockCounts { p: 2, m: 2, n: 2 },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotDivisible { dimension: "t", .. }));
    }

    #[test]
    fn rejects_zero_block_count() {
        let err = BlockGeometry::new(
            Dimensions { r: 4, s: 2, t: 4 },
            BlockCounts { p: 0, m: 2, n: 2 },
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::Zero("p"));
    }

    #[test]
    fn concrete_quorum_size() {
        let g = geometry(4, 2, 4, 2, 2, 2);
        assert_eq!(g.quorum_size(), 9);
    }

    #[test]
    fn degree_bound_is_tight() {
        for p in 1..=3 {
            for m in 1..=3 {
                for n in 1..=3 {
                    let g = geometry(m, p, n, p, m, n);
                    let deg_a = (0..p)
                        .flat_map(|j| (0..m).map(move |k| (j, k)))
                        .map(|(j, k)| g.a_exponent(j, k))
                        .max()
                        .unwrap();
                    let deg_b = (0..p)
                        .flat_map(|j| (0..n).map(move |k1| (j, k1)))
                        .map(|(j, k1)| g.b_exponent(j, k1))
                        .max()
                        .unwrap();

                    assert_eq!(deg_a + deg_b, g.max_degree());
                    assert_eq!(g.quorum_size(), p * m * n + p - 1);
                    assert_eq!(g.output_degree(m - 1, n - 1), g.max_degree() + 1 - p);
                }
            }
        }
    }

    #[test]
    fn output_degrees_are_distinct() {
        let g = geometry(6, 6, 6, 3, 2, 3);
        let mut degrees: Vec<_> = (0..2)
            .flat_map(|k| (0..3).map(move |k1| (k, k1)))
            .map(|(k, k1)| g.output_degree(k, k1))
            .collect();
        degrees.sort_unstable();
        degrees.dedup();
        assert_eq!(degrees.len(), 6);
    }
}
