//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server exposing report trigger/poll and admin methods.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
