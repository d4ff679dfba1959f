// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![warn(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Test modules build mocks and fixtures freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Halldyll Queues
//!
//! A declarative, idempotent reconciler for AWS SQS queues.
//!
//! ## Overview
//!
//! Each queue is described once in `halldyll.queues.yaml`. A reconciliation
//! pass then brings the account in line with that description through one of
//! three targets:
//!
//! - **AWS**: creates missing queues through the SQS API
//! - **Dry run**: reads the account and records what would change
//! - **Terraform**: writes an `aws_sqs_queue` resource per queue to `main.tf.json`
//!
//! ## Architecture
//!
//! Every queue goes through the same steps:
//!
//! 1. **Find**: look the queue up by name and read its attributes and tags
//! 2. **Diff**: compute the field-level delta against the desired state
//! 3. **Validate**: reject deltas that touch immutable fields
//! 4. **Render**: hand the desired state to the selected target
//!
//! Policy documents are compared after normalization, so whitespace, key
//! order and single-element arrays never show up as a difference.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`queue`]: Queue tasks with find, diff and render
//! - [`policy`]: Policy normalization and fingerprints
//! - [`aws`]: SQS client seam and direct-apply target
//! - [`terraform`]: Terraform JSON export
//! - [`state`]: Identity storage backends (local, S3)
//! - [`reconciler`]: Reconciliation pass over every queue
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: c1
//!   region: eu-west-1
//!
//! queues:
//!   - name: c1-events
//!     message_retention_period: 345600
//!     policy_file: policies/events.json
//!     tags:
//!       team: platform
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod aws;
pub mod cli;
pub mod config;
pub mod error;
pub mod policy;
pub mod queue;
pub mod reconciler;
pub mod resource;
pub mod state;
pub mod target;
pub mod terraform;

// ============================================================================
// Re-exports
// ============================================================================

pub use aws::{AwsApiTarget, QueueApi, SqsClient};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, QueuesConfig};
pub use error::{HalldyllError, Result};
pub use policy::NormalizedPolicy;
pub use queue::{FindOutcome, IdentityUpdate, Lifecycle, QueueChanges, QueueTask};
pub use reconciler::{QueueAction, ReconciliationResult, Reconciler};
pub use state::{IdentityState, LocalStateStore, S3StateStore, StateStore};
pub use target::{DryRunTarget, PendingChange, Target};
pub use terraform::TerraformTarget;
