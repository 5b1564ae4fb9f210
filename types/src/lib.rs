//! Protobuf messages and tonic stubs shared by the coordinator and workers.

pub mod coded {
    tonic::include_proto!("coded");
}
