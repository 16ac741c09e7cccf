pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{message, FailingRepository, MockMessageSource};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder, CHANNEL_ID};
