//! Certificate chain construction (AIA fetch) and validation.

pub mod builder;
pub mod validator;

pub use builder::{ChainBuildResult, ChainBuilder, HttpChainBuilder};
pub use validator::{ChainValidationResult, ChainValidator};
