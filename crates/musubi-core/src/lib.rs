//! Specification-driven development engine: EARS requirements, C4/ADR
//! design documents, task breakdowns, and change deltas as Markdown
//! artifacts on disk, with trace, coverage, impact, planning, and
//! cost-tracking analyses over them.

pub mod change;
pub mod cost;
pub mod coverage;
pub mod ears;
pub mod error;
pub mod generate;
pub mod id;
pub mod impact;
pub mod io;
pub mod parser;
pub mod paths;
pub mod planner;
pub mod store;
pub mod templates;
pub mod trace;
pub mod types;
pub mod validate;

pub use error::{MusubiError, Result};
