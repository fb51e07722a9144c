mod grpc_transport;

pub use grpc_transport::*;
