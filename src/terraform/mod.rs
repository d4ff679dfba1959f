//! Terraform export module.
//!
//! Instead of calling the provider, tasks can describe themselves as
//! Terraform resources. Output is written in Terraform's JSON syntax, with
//! large bodies such as policies kept in side files under `data/`.

mod literal;
mod target;

pub use literal::{sanitize_name, Literal};
pub use target::{DeclarativeSink, TerraformTarget, DATA_DIR, MAIN_FILE};
