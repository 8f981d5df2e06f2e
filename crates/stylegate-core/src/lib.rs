//! stylegate-core - Core traits and types for the stylegate gateway
//!
//! This crate provides the abstractions shared by every layer of the gateway:
//! the closed set of capabilities, the request/result shapes exchanged with a
//! remote inference service, and the `InferenceClient` trait that the HTTP
//! layer depends on instead of any concrete transport.

pub mod capability;
pub mod client;
pub mod error;

pub use capability::{Capability, ServiceStatus};
pub use client::{ClientConnector, InferenceClient, InferenceRequest, InferenceResult};
pub use error::{BackendError, BackendResult};
