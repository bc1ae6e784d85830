//! Support for the `mysql-test-connection` and `mysql-validate-setup` binaries.

pub mod probe;
pub mod report;
pub mod setup;

pub use probe::{ProbeReport, QueryCheck, ServerFacts};
pub use report::{Category, CheckResult, CheckStatus, ValidationReport};
pub use setup::SetupValidator;
