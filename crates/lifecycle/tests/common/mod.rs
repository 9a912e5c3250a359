//! Common test utilities and fixtures.

pub mod harness;
pub mod mocks;

#[allow(unused_imports)]
pub use harness::*;
#[allow(unused_imports)]
pub use mocks::*;
