pub mod remote;

pub use remote::{ActRequest, ActResponse, RemotePolicy, RemotePolicyClient, RemotePolicyFactory};
