//! Token extraction and staged substitution.
//!
//! This module is the *core* of the crate. Resolving a configuration is a
//! pipeline over every string value:
//!
//! ```text
//! template ── DelimiterMask::scan ──┐  (lexer.rs)  nothing to do? pass through
//!                                   v
//!                     variable stage   {name}    -> input map
//!                                   │
//!                                   v
//!                     data stage       [path]    -> enriched data  (lookup.rs)
//!                                   │             (variables in the path bound first)
//!                                   v
//!                     expression stage $[expr]   -> sandboxed evaluator (crate::expr)
//!                                      $ui...()  -> fixed call table (legacy.rs)
//!                                   │
//!                                   v
//!                              resolved string
//! ```
//!
//! Each stage re-scans the output of the previous one, so the order is
//! observable: a variable inside a data path is bound from the *input map*
//! before the path is looked up, and a value inserted by the data stage may
//! still carry an expression for the last stage.
//!
//! ## Responsibilities by module
//!
//! - `lexer.rs`: the three delimiter scanners and `DelimiterMask`.
//! - `extract.rs`: collects bracketed `Token`s, deduplicated by original text.
//! - `lookup.rs`: data-stage key lookup with its fallbacks, plus variable
//!   binding inside paths.
//! - `legacy.rs`: the deprecated `$ui.pageContext.*()` call table.
//! - `substitute.rs`: runs the three stages and records diagnostics.
//! - `metrics.rs`: counters, timings and the `Diagnostic` record.
//!
//! ## Failure model
//!
//! Nothing in here fails a run. A variable that is not in the input map stays
//! as `{name}`; a data path that is not found stays as `[path]` (and yields a
//! warning diagnostic); an expression that fails stays as `$[expr]` (and
//! yields an error diagnostic).
//!
//! ## Debugging
//!
//! All stages emit `tracing` events; run the CLI with `BLADECONF_LOG=trace` to
//! see every lookup.

#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/legacy.rs"]
mod legacy;
#[path = "engine/lexer.rs"]
mod lexer;
#[path = "engine/lookup.rs"]
mod lookup;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/substitute.rs"]
mod substitute;

pub(crate) use extract::extract;
pub use lexer::DelimiterMask;
pub(crate) use lookup::bind_variables;
pub use metrics::{Diagnostic, ProcessMetrics, Stage, StageCounts};
pub(crate) use substitute::Substitution;
