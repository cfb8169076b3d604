//! contractfuzz - Contract-driven fuzzing for HTTP APIs
//!
//! Reads an OpenAPI-style contract, mutates each operation's baseline
//! request one field or header at a time, sends it, and checks the response
//! status against the family the contract says a well-behaved service must
//! return.
//!
//! # Modules
//!
//! - `contract` - Contract loading, schema descriptors and baseline payloads
//! - `fuzzer` - Field paths, mutation strategies, planning and execution
//! - `transport` - HTTP transport seam (reqwest and mock)
//! - `reporter` - Verdict channel and JUnit export
//! - `errors` - Fatal diagnostics
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use contractfuzz::contract::Contract;
//! use contractfuzz::fuzzer::{FuzzConfig, FuzzEngine};
//! use contractfuzz::transport::ReqwestTransport;
//!
//! let contract = Contract::load("openapi.json")?;
//! let transport = Arc::new(ReqwestTransport::new("http://localhost:8080")?);
//! let results = FuzzEngine::new(contract, transport, FuzzConfig::default())
//!     .run()
//!     .await?;
//! results.print_text();
//! ```

pub mod contract;
pub mod errors;
pub mod fuzzer;
pub mod reporter;
pub mod transport;

// Re-export commonly used types
pub use contract::Contract;
pub use fuzzer::{FuzzConfig, FuzzEngine, FuzzResults};
