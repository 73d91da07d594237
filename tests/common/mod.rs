//! Common test utilities for catalog-harvest integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod fetchers;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use fetchers::*;
#[allow(unused_imports)]
pub use fixtures::*;
