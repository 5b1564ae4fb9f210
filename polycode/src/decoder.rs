//! Reconstruction of Aᵀ·B from a quorum of partial results.
//!
//! Every cell `(a, b)` of the partial results is an evaluation of a
//! polynomial of degree `p·m·n + p − 2` with integer coefficients. Newton
//! interpolation through the quorum's points recovers those coefficients
//! exactly; cell `(a, b)` of output block `(k, k1)` is the coefficient at
//! its output degree.
//!
//! Divided differences of an integer polynomial at integer points are
//! integers, so every division is exact. A remainder means the replies do
//! not lie on one such polynomial.

use crate::error::Error;
use crate::matrix::Matrix;
use crate::partition::BlockGeometry;
use crate::quorum::ResultQuorum;

pub struct PolynomialDecoder {
    geometry: BlockGeometry,
}

impl PolynomialDecoder {
    pub fn new(geometry: BlockGeometry) -> Self {
        Self { geometry }
    }

    /// Decodes the full `r × t` product.
    pub fn decode(&self, quorum: &ResultQuorum) -> Result<Matrix, Error> {
        let g = &self.geometry;
        let replies = quorum.replies();
        let needed = g.quorum_size();
        if replies.len() != needed {
            return Err(Error::InsufficientQuorum {
                received: replies.len(),
                needed,
            });
        }
        let (rows, cols) = g.partial_shape();
        if let Some(reply) = replies.iter().find(|r| r.value.shape() != (rows, cols)) {
            return Err(Error::MalformedReply {
                point: reply.point.get(),
                rows: reply.value.rows(),
                cols: reply.value.cols(),
                expected_rows: rows,
                expected_cols: cols,
            });
        }

        let points: Vec<i128> = replies.iter().map(|r| i128::from(r.point.get())).collect();
        let mut out = Matrix::zeros(g.dims.r, g.dims.t);
        let mut samples = vec![0i128; needed];
        for a in 0..g.subcol_a {
            for b in 0..g.subcol_b {
                for (sample, reply) in samples.iter_mut().zip(replies) {
                    *sample = i128::from(reply.value[(a, b)]);
                }
                let coeffs = interpolate(&points, &samples, a, b)?;

                for k in 0..g.blocks.m {
                    for k1 in 0..g.blocks.n {
                        let value = coeffs[g.output_degree(k, k1)];
                        out.set(k * g.subcol_a + a, k1 * g.subcol_b + b, value);
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Integer coefficients (ascending degree) of the polynomial through `(points, samples)`.
fn interpolate(points: &[i128], samples: &[i128], row: usize, col: usize) -> Result<Vec<i64>, Error> {
    let overflow = || Error::Overflow("decoding");
    let len = samples.len();

    // Divided differences in place: newton[i] becomes f[x_0, ..., x_i].
    let mut newton = samples.to_vec();
    for level in 1..len {
        for i in (level..len).rev() {
            let numerator = newton[i].checked_sub(newton[i - 1]).ok_or_else(overflow)?;
            let denominator = points[i] - points[i - level];
            if numerator % denominator != 0 {
                return Err(Error::NumericReconstruction {
                    row,
                    col,
                    detail: format!(
                        "divided difference {numerator}/{denominator} over points {}..={} is not an integer",
                        points[i - level],
                        points[i]
                    ),
                });
            }
            newton[i] = numerator / denominator;
        }
    }

    // Expand the Newton form into monomials, innermost factor first.
    let mut poly = vec![0i128; len];
    let mut degree = 0;
    if let Some(&last) = newton.last() {
        poly[0] = last;
    }
    for k in (0..len.saturating_sub(1)).rev() {
        let x = points[k];
        degree += 1;
        poly[degree] = poly[degree - 1];
        for d in (1..degree).rev() {
            poly[d] = x
                .checked_mul(poly[d])
                .and_then(|shifted| poly[d - 1].checked_sub(shifted))
                .ok_or_else(overflow)?;
        }
        poly[0] = x
            .checked_mul(poly[0])
            .and_then(|shifted| newton[k].checked_sub(shifted))
            .ok_or_else(overflow)?;
    }

    poly.into_iter()
        .map(|c| i64::try_from(c).map_err(|_| overflow()))
        .collect()
}
