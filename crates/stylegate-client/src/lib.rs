//! Remote inference client library
//!
//! Provides a typed HTTP client for Gradio-style inference services: the
//! app config probe used to decide whether an endpoint is alive, file
//! uploads, the `run/<api_name>` predict call, and download of file outputs.
//!
//! # Example
//!
//! ```rust,no_run
//! use stylegate_client::{ClientOptions, SpaceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SpaceClient::connect("owner/fashion-chatbot", &ClientOptions::default()).await?;
//!     let data = client
//!         .predict("/predict", vec![serde_json::json!("what goes with red?")])
//!         .await?;
//!     println!("{:?}", data);
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module spins up an axum router on an ephemeral port, which
//! is how both fake inference services and the gateway itself are exercised
//! in integration tests.

mod client;
mod error;
pub mod testing;
mod types;

pub use client::{resolve_endpoint, ClientOptions, SpaceClient};
pub use error::{ClientError, Result};
pub use types::*;
