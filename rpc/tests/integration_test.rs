use std::net::SocketAddr;
use std::time::Duration;

use polycode::{
    BlockCounts, Coordinator, CoordinatorTransport, Dimensions, EvaluationPoint, Matrix, RunConfig,
    StragglerPlan, StragglerPolicy, run_worker,
};
use polycode_rpc::{Error, GrpcCoordinator, GrpcWorker};
use polycode_types::coded;
use polycode_types::coded::coded_compute_client::CodedComputeClient;
use tokio::net::TcpListener;
use tonic::Code;
use tonic::transport::Channel;

async fn start_test_coordinator(world_size: usize) -> (SocketAddr, GrpcCoordinator) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let coordinator = GrpcCoordinator::from_listener(listener, world_size)
        .unwrap()
        .with_join_timeout(Duration::from_secs(10));
    (coordinator.local_addr(), coordinator)
}

async fn raw_client(addr: SocketAddr) -> CodedComputeClient<Channel> {
    CodedComputeClient::connect(format!("http://{}", addr))
        .await
        .unwrap()
}

fn wire_matrix(value: i64) -> coded::Matrix {
    coded::Matrix {
        rows: 1,
        cols: 1,
        data: vec![value],
    }
}

#[tokio::test]
async fn test_decodes_over_grpc() {
    let config = RunConfig::new(
        Dimensions { r: 4, s: 4, t: 4 },
        BlockCounts { p: 2, m: 2, n: 1 },
        8,
    );
    let (addr, mut transport) = start_test_coordinator(config.world_size).await;

    let mut handles = Vec::new();
    for ordinal in 1..config.world_size as u32 {
        handles.push(tokio::spawn(async move {
            let mut worker = GrpcWorker::connect(addr, ordinal).await.unwrap();
            run_worker(&mut worker).await
        }));
    }

    let a = Matrix::from_fn(4, 4, |i, j| ((3 * i + j) % 10) as i64);
    let b = Matrix::from_fn(4, 4, |i, j| ((i + 7 * j) % 10) as i64);
    let plan = StragglerPlan::new(
        StragglerPolicy::Sleep(Duration::from_secs(30)),
        [EvaluationPoint::new(4).unwrap()],
    );

    let outcome = Coordinator::new(config)
        .unwrap()
        .run(&mut transport, &a, &b, &plan)
        .await
        .unwrap();

    assert_eq!(outcome.product, a.transpose_mul(&b).unwrap());
    assert_eq!(outcome.report.quorum.len(), 5);
    assert!(!outcome.report.quorum.contains(&EvaluationPoint::new(4).unwrap()));

    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn test_join_rejects_reserved_and_out_of_range_ordinals() {
    let (addr, _transport) = start_test_coordinator(4).await;
    let mut client = raw_client(addr).await;

    for ordinal in [0, 4, 17] {
        let status = client
            .join(coded::JoinRequest { ordinal })
            .await
            .err()
            .unwrap();
        assert_eq!(status.code(), Code::InvalidArgument);
    }
}

#[tokio::test]
async fn test_join_rejects_duplicates() {
    let (addr, transport) = start_test_coordinator(4).await;
    let mut client = raw_client(addr).await;

    let _first = client
        .join(coded::JoinRequest { ordinal: 2 })
        .await
        .unwrap()
        .into_inner();
    let status = client
        .join(coded::JoinRequest { ordinal: 2 })
        .await
        .err()
        .unwrap();

    assert_eq!(status.code(), Code::AlreadyExists);
    assert_eq!(transport.members().into_iter().collect::<Vec<_>>(), vec![2]);
}

#[tokio::test]
async fn test_join_refused_once_plan_is_broadcast() {
    let (addr, mut transport) = start_test_coordinator(3).await;
    let mut client = raw_client(addr).await;

    let mut first = client
        .join(coded::JoinRequest { ordinal: 1 })
        .await
        .unwrap()
        .into_inner();
    let second = client
        .join(coded::JoinRequest { ordinal: 2 })
        .await
        .unwrap()
        .into_inner();

    transport.broadcast(&StragglerPlan::default()).await.unwrap();
    assert!(first.message().await.unwrap().is_some());

    // A worker that lost its stream after the plan went out cannot rejoin.
    drop(second);
    let status = client
        .join(coded::JoinRequest { ordinal: 2 })
        .await
        .err()
        .unwrap();
    assert_eq!(status.code(), Code::FailedPrecondition);
    assert_eq!(status.message(), "plan already broadcast");
}

#[tokio::test]
async fn test_broadcast_times_out_without_all_workers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut transport = GrpcCoordinator::from_listener(listener, 4)
        .unwrap()
        .with_join_timeout(Duration::from_millis(200));
    let _worker = GrpcWorker::connect(transport.local_addr(), 1).await.unwrap();

    let err = transport
        .broadcast(&StragglerPlan::default())
        .await
        .unwrap_err();

    let source = match err {
        polycode::Error::Transport(source) => source,
        other => panic!("expected a transport error, got {other:?}"),
    };
    assert!(matches!(
        source.downcast_ref::<Error>(),
        Some(Error::JoinTimeout {
            joined: 1,
            expected: 3
        })
    ));
}

#[tokio::test]
async fn test_submit_after_close_is_not_accepted() {
    let (addr, mut transport) = start_test_coordinator(3).await;
    let mut client = raw_client(addr).await;
    let _directives = client
        .join(coded::JoinRequest { ordinal: 1 })
        .await
        .unwrap()
        .into_inner();

    let ack = client
        .submit(coded::PartialResult {
            point: 1,
            value: Some(wire_matrix(5)),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(ack.accepted);
    let reply = transport.receive_any().await.unwrap().unwrap();
    assert_eq!(reply.point.get(), 1);
    assert_eq!(reply.value, Matrix::filled(1, 1, 5));

    transport.close();
    let ack = client
        .submit(coded::PartialResult {
            point: 1,
            value: Some(wire_matrix(5)),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(!ack.accepted);
    assert_eq!(ack.error, "quorum already complete");
}

#[tokio::test]
async fn test_submit_requires_join() {
    let (addr, _transport) = start_test_coordinator(3).await;
    let mut client = raw_client(addr).await;

    let status = client
        .submit(coded::PartialResult {
            point: 2,
            value: Some(wire_matrix(1)),
        })
        .await
        .err()
        .unwrap();
    assert_eq!(status.code(), Code::PermissionDenied);
}

#[tokio::test]
async fn test_worker_gives_up_on_missing_coordinator() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = GrpcWorker::connect(addr, 1).await;
    assert!(matches!(result, Err(Error::Unreachable(8))));
}
