use std::collections::BTreeSet;
use std::time::Duration;

use polycode::{
    BlockCounts, ConfigError, Coordinator, Dimensions, Error, EvaluationPoint, Matrix, RunConfig,
    RunOutcome, StragglerPlan, StragglerPolicy, WorkerTransport, local_network, run_worker,
};

fn concrete_config() -> RunConfig {
    RunConfig::new(
        Dimensions { r: 4, s: 2, t: 4 },
        BlockCounts { p: 2, m: 2, n: 2 },
        10,
    )
}

/// A 4x4 · 4x4 run split as p = 2, m = 2, n = 1 (quorum of 5) over 8 workers.
fn spare_config() -> RunConfig {
    RunConfig::new(
        Dimensions { r: 4, s: 4, t: 4 },
        BlockCounts { p: 2, m: 2, n: 1 },
        9,
    )
}

fn inputs(s: usize, r: usize, t: usize) -> (Matrix, Matrix) {
    let a = Matrix::from_fn(s, r, |i, j| ((3 * i + 5 * j + 1) % 10) as i64);
    let b = Matrix::from_fn(s, t, |i, j| ((7 * i + 2 * j) % 10) as i64);
    (a, b)
}

fn points(ordinals: impl IntoIterator<Item = u32>) -> Vec<EvaluationPoint> {
    ordinals
        .into_iter()
        .map(|o| EvaluationPoint::new(o).unwrap())
        .collect()
}

enum Absent {
    /// Connected but never computing.
    Idle,
    /// Gone before the run starts.
    Crashed,
}

async fn run(
    config: RunConfig,
    a: &Matrix,
    b: &Matrix,
    plan: StragglerPlan,
    absent: &[u32],
    how: Absent,
) -> Result<RunOutcome, Error> {
    let coordinator = Coordinator::new(config.clone())?;
    let (mut transport, workers) = local_network(config.world_size);

    let mut idle = Vec::new();
    let mut handles = Vec::new();
    for mut worker in workers {
        if absent.contains(&worker.ordinal()) {
            if let Absent::Idle = how {
                idle.push(worker);
            }
            continue;
        }
        handles.push(tokio::spawn(async move { run_worker(&mut worker).await }));
    }

    let outcome = coordinator.run(&mut transport, a, b, &plan).await;
    for handle in handles {
        handle.abort();
    }
    drop(idle);
    outcome
}

#[tokio::test]
async fn decodes_all_ones_with_ten_processes() {
    let a = Matrix::filled(2, 4, 1);
    let b = Matrix::filled(2, 4, 1);

    let outcome = run(concrete_config(), &a, &b, StragglerPlan::default(), &[], Absent::Idle)
        .await
        .unwrap();

    assert_eq!(outcome.product, a.transpose_mul(&b).unwrap());
    assert_eq!(outcome.product, Matrix::filled(4, 4, 2));
    assert_eq!(outcome.report.quorum.len(), 9);
}

#[tokio::test]
async fn sleeping_stragglers_are_left_out() {
    let (a, b) = inputs(4, 4, 4);
    let stragglers = points([2, 5, 7]);
    let plan = StragglerPlan::new(
        StragglerPolicy::Sleep(Duration::from_secs(30)),
        stragglers.clone(),
    );

    let outcome = run(spare_config(), &a, &b, plan, &[], Absent::Idle)
        .await
        .unwrap();

    assert_eq!(outcome.product, a.transpose_mul(&b).unwrap());
    let quorum: BTreeSet<_> = outcome.report.quorum.into_iter().collect();
    assert_eq!(quorum.len(), 5);
    assert!(stragglers.iter().all(|s| !quorum.contains(s)));
}

#[tokio::test]
async fn repeating_stragglers_do_not_change_the_product() {
    let (a, b) = inputs(4, 4, 4);
    let plan = StragglerPlan::new(StragglerPolicy::Repeat(50), points([1, 2, 3]));

    let outcome = run(spare_config(), &a, &b, plan, &[], Absent::Idle)
        .await
        .unwrap();

    assert_eq!(outcome.product, a.transpose_mul(&b).unwrap());
}

#[tokio::test]
async fn idle_workers_trip_the_deadline() {
    let mut config = concrete_config();
    config.deadline = Some(Duration::from_millis(200));
    let a = Matrix::filled(2, 4, 1);
    let b = Matrix::filled(2, 4, 1);

    let err = run(config, &a, &b, StragglerPlan::default(), &[1, 2, 3], Absent::Idle)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::InsufficientQuorum {
            received: 6,
            needed: 9
        }
    ));
}

#[tokio::test]
async fn crashed_workers_fail_instead_of_hanging() {
    let (a, b) = inputs(4, 4, 4);

    let err = run(spare_config(), &a, &b, StragglerPlan::default(), &[1, 3, 5, 7], Absent::Crashed)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::InsufficientQuorum {
            received: 4,
            needed: 5
        }
    ));
}

#[tokio::test]
async fn non_divisible_partition_is_rejected_up_front() {
    let config = RunConfig::new(
        Dimensions { r: 4, s: 3, t: 4 },
        BlockCounts { p: 2, m: 2, n: 2 },
        10,
    );
    assert!(matches!(
        Coordinator::new(config),
        Err(Error::Configuration(ConfigError::NotDivisible {
            dimension: "s",
            ..
        }))
    ));
}

#[tokio::test]
async fn too_few_workers_is_rejected_up_front() {
    let mut config = concrete_config();
    config.world_size = 9;
    assert!(matches!(
        Coordinator::new(config),
        Err(Error::Configuration(ConfigError::InsufficientWorkers {
            world_size: 9,
            needed: 9
        }))
    ));
}

#[tokio::test]
async fn transport_size_must_match_configuration() {
    let coordinator = Coordinator::new(concrete_config()).unwrap();
    let (mut transport, _workers) = local_network(11);
    let a = Matrix::filled(2, 4, 1);

    let err = coordinator
        .run(&mut transport, &a, &a, &StragglerPlan::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn plan_naming_a_non_worker_is_rejected() {
    let coordinator = Coordinator::new(concrete_config()).unwrap();
    let (mut transport, _workers) = local_network(10);
    let a = Matrix::filled(2, 4, 1);
    let plan = StragglerPlan::new(StragglerPolicy::default(), points([3, 10]));

    let err = coordinator
        .run(&mut transport, &a, &a, &plan)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigError::InvalidStraggler(10))
    ));
}

#[tokio::test]
async fn overflowing_worker_products_fail_before_distribution() {
    // p = 2, m = 3, n = 3: quorum of 19, so points reach 19 and B̃ reaches degree 13.
    let config = RunConfig::new(
        Dimensions { r: 3, s: 2, t: 3 },
        BlockCounts { p: 2, m: 3, n: 3 },
        20,
    );
    let coordinator = Coordinator::new(config).unwrap();
    let (mut transport, mut workers) = local_network(20);
    let (a, b) = inputs(2, 3, 3);

    let err = coordinator
        .run(&mut transport, &a, &b, &StragglerPlan::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Overflow("block multiply")), "{err}");

    drop(transport);
    assert!(workers[0].receive_broadcast().await.is_err());
}
