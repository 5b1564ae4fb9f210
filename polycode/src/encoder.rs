//! Polynomial encoding of the input blocks.

use tracing::{debug, warn};

use crate::error::{ConfigError, Error};
use crate::matrix::Matrix;
use crate::partition::BlockGeometry;
use crate::types::{EncodedPair, EvaluationPoint};

/// Builds each worker's encoded block pair `(Ã(x), B̃(x))`.
pub struct PolynomialEncoder {
    geometry: BlockGeometry,
    world_size: usize,
}

impl PolynomialEncoder {
    /// Fails fast when `world_size − 1` workers can never form a quorum.
    pub fn new(geometry: BlockGeometry, world_size: usize) -> Result<Self, ConfigError> {
        let needed = geometry.quorum_size();
        if world_size < needed + 1 {
            return Err(ConfigError::InsufficientWorkers { world_size, needed });
        }
        Ok(Self {
            geometry,
            world_size,
        })
    }

    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Encodes A (s×r) and B (s×t) for every worker ordinal `1..world_size`.
    ///
    /// Ordinal 0 is the coordinator and gets nothing.
    ///
    /// Fails with `Overflow("block multiply")` when some worker's product
    /// could leave the `i64` range, so no worker is handed a pair it cannot
    /// multiply.
    pub fn encode(&self, a: &Matrix, b: &Matrix) -> Result<Vec<EncodedPair>, Error> {
        let blocks = self.split(a, b)?;
        let pairs = (1..self.world_size as u32)
            .map(|ordinal| {
                let point = EvaluationPoint::new(ordinal)?;
                self.encode_blocks(&blocks, point)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        for pair in &pairs {
            check_product_bound(pair, self.geometry.subrow)?;
        }
        Ok(pairs)
    }

    /// Encodes A and B at a single evaluation point.
    pub fn encode_at(&self, a: &Matrix, b: &Matrix, point: EvaluationPoint) -> Result<EncodedPair, Error> {
        let blocks = self.split(a, b)?;
        self.encode_blocks(&blocks, point)
    }

    fn split(&self, a: &Matrix, b: &Matrix) -> Result<Blocks, Error> {
        let g = &self.geometry;
        check_shape("A", a, g.dims.s, g.dims.r)?;
        check_shape("B", b, g.dims.s, g.dims.t)?;

        let mut a_blocks = Vec::with_capacity(g.blocks.p * g.blocks.m);
        let mut b_blocks = Vec::with_capacity(g.blocks.p * g.blocks.n);
        for j in 0..g.blocks.p {
            let row = j * g.subrow;
            for k in 0..g.blocks.m {
                let block = a.block(row, k * g.subcol_a, g.subrow, g.subcol_a);
                a_blocks.push((g.a_exponent(j, k), block));
            }
            for k1 in 0..g.blocks.n {
                let block = b.block(row, k1 * g.subcol_b, g.subrow, g.subcol_b);
                b_blocks.push((g.b_exponent(j, k1), block));
            }
        }
        Ok(Blocks { a_blocks, b_blocks })
    }

    fn encode_blocks(&self, blocks: &Blocks, point: EvaluationPoint) -> Result<EncodedPair, Error> {
        let (rows_a, cols_a) = self.geometry.a_block_shape();
        let (rows_b, cols_b) = self.geometry.b_block_shape();

        let mut a = Matrix::zeros(rows_a, cols_a);
        for (exponent, block) in &blocks.a_blocks {
            a.add_scaled(block, power(point, *exponent)?)?;
        }

        let mut b = Matrix::zeros(rows_b, cols_b);
        for (exponent, block) in &blocks.b_blocks {
            b.add_scaled(block, power(point, *exponent)?)?;
        }

        debug!(point = point.get(), "encoded block pair");
        Ok(EncodedPair { point, a, b })
    }
}

/// Input blocks tagged with the exponent they are weighted by.
struct Blocks {
    a_blocks: Vec<(usize, Matrix)>,
    b_blocks: Vec<(usize, Matrix)>,
}

fn power(point: EvaluationPoint, exponent: usize) -> Result<i64, Error> {
    let exponent = u32::try_from(exponent).map_err(|_| Error::Overflow("encoding"))?;
    i64::from(point.get())
        .checked_pow(exponent)
        .ok_or(Error::Overflow("encoding"))
}

/// Bounds every entry of `pairᵀ.a · pair.b` by `max|a| · max|b| · inner`.
fn check_product_bound(pair: &EncodedPair, inner: usize) -> Result<(), Error> {
    let largest = |m: &Matrix| {
        m.as_slice()
            .iter()
            .map(|v| u128::from(v.unsigned_abs()))
            .max()
            .unwrap_or(0)
    };
    let bound = largest(&pair.a)
        .checked_mul(largest(&pair.b))
        .and_then(|product| product.checked_mul(inner as u128));
    match bound {
        Some(bound) if bound <= i64::MAX as u128 => Ok(()),
        _ => {
            warn!(point = pair.point.get(), "worker product would overflow i64");
            Err(Error::Overflow("block multiply"))
        }
    }
}

fn check_shape(name: &'static str, m: &Matrix, rows: usize, cols: usize) -> Result<(), ConfigError> {
    if m.shape() != (rows, cols) {
        return Err(ConfigError::ShapeMismatch {
            name,
            rows: m.rows(),
            cols: m.cols(),
            expected_rows: rows,
            expected_cols: cols,
        });
    }
    Ok(())
}
