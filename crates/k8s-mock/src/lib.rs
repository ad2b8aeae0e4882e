//! Mock Kubernetes API server for testing.
//!
//! Provides an HTTP server that can be used with kubeconfig-based connections.
//! It keeps objects in memory and implements create, get, list (with
//! pagination) and delete for the kinds in its [`MockCatalog`].

pub mod catalog;
mod helpers;
pub mod http;

pub use catalog::{MockApiResource, MockCatalog};
pub use http::{HttpMockK8sServer, RunningHttpMockK8sServer};
