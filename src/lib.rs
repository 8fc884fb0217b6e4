//! vclrt — Fastly VCL runtime semantics.
//!
//! The value model and the operator/assignment engines behind a
//! VCL-compatible interpreter, reproducing the production runtime's
//! arithmetic, comparison, matching, and rate-limiting behavior — including
//! its saturating overflow, sticky NaN/Inf poisoning, and per-operator
//! literal restrictions. Parsing, HTTP handling, and variable resolution
//! live outside this crate.

pub mod assign;
pub mod context;
pub mod decl;
pub mod error;
pub mod operator;
pub mod ratelimit;
pub mod value;
