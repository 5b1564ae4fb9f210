//! Conversions between wire messages and domain values.

use std::time::Duration;

use polycode::{EncodedPair, EvaluationPoint, Matrix, PartialResult, StragglerPlan, StragglerPolicy};
use polycode_types::coded;
use polycode_types::coded::{directive, straggle_policy};

use crate::error::Error;

pub fn matrix_to_proto(matrix: Matrix) -> coded::Matrix {
    let (rows, cols) = matrix.shape();
    coded::Matrix {
        rows: rows as u32,
        cols: cols as u32,
        data: matrix.into_vec(),
    }
}

pub fn matrix_from_proto(matrix: Option<coded::Matrix>, field: &str) -> Result<Matrix, Error> {
    let matrix = matrix.ok_or_else(|| Error::Malformed(format!("missing {field}")))?;
    let (rows, cols, len) = (matrix.rows, matrix.cols, matrix.data.len());
    Matrix::from_vec(rows as usize, cols as usize, matrix.data)
        .ok_or_else(|| Error::Malformed(format!("{field} is {rows}x{cols} but carries {len} values")))
}

fn point_from_proto(point: u32) -> Result<EvaluationPoint, Error> {
    EvaluationPoint::new(point).map_err(|e| Error::Malformed(e.to_string()))
}

pub fn plan_to_proto(plan: &StragglerPlan) -> coded::StragglerPlan {
    let kind = match plan.policy {
        StragglerPolicy::Sleep(duration) => {
            straggle_policy::Kind::SleepMillis(duration.as_millis() as u64)
        }
        StragglerPolicy::Repeat(count) => straggle_policy::Kind::Repeat(count),
    };
    coded::StragglerPlan {
        policy: Some(coded::StragglePolicy { kind: Some(kind) }),
        stragglers: plan.stragglers.iter().map(|p| p.get()).collect(),
    }
}

pub fn plan_from_proto(plan: coded::StragglerPlan) -> Result<StragglerPlan, Error> {
    let kind = plan
        .policy
        .and_then(|policy| policy.kind)
        .ok_or_else(|| Error::Malformed("missing straggler policy".to_string()))?;
    let policy = match kind {
        straggle_policy::Kind::SleepMillis(ms) => StragglerPolicy::Sleep(Duration::from_millis(ms)),
        straggle_policy::Kind::Repeat(count) => StragglerPolicy::Repeat(count),
    };
    let stragglers = plan
        .stragglers
        .into_iter()
        .map(point_from_proto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StragglerPlan::new(policy, stragglers))
}

pub fn plan_directive(plan: &StragglerPlan) -> coded::Directive {
    coded::Directive {
        kind: Some(directive::Kind::Plan(plan_to_proto(plan))),
    }
}

pub fn blocks_directive(pair: EncodedPair) -> coded::Directive {
    coded::Directive {
        kind: Some(directive::Kind::Blocks(coded::EncodedPair {
            point: pair.point.get(),
            a: Some(matrix_to_proto(pair.a)),
            b: Some(matrix_to_proto(pair.b)),
        })),
    }
}

pub fn pair_from_proto(pair: coded::EncodedPair) -> Result<EncodedPair, Error> {
    Ok(EncodedPair {
        point: point_from_proto(pair.point)?,
        a: matrix_from_proto(pair.a, "block a")?,
        b: matrix_from_proto(pair.b, "block b")?,
    })
}

pub fn partial_to_proto(result: PartialResult) -> coded::PartialResult {
    coded::PartialResult {
        point: result.point.get(),
        value: Some(matrix_to_proto(result.value)),
    }
}

pub fn partial_from_proto(result: coded::PartialResult) -> Result<PartialResult, Error> {
    Ok(PartialResult {
        point: point_from_proto(result.point)?,
        value: matrix_from_proto(result.value, "partial result")?,
    })
}
