//! Integration test crate for the UJB settlement ledger.
//!
//! This crate has no library code. It only contains integration tests that
//! exercise settlement flows across the workspace crates against real
//! SQLite databases.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p ujb-integration-tests
//! ```
