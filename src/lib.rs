//! Cakeinstr: Reversible CakePHP Tree Instrumentation
//!
//! Instruments an on-disk CakePHP application tree with a fixed set of
//! reversible modifications (content overrides, unified-diff patches, file
//! copies, annotation removals) so that the tree becomes suitable for
//! dynamic analysis and fuzzing. The engine can report which modifications
//! are currently applied, apply the missing ones, and revert all of them
//! back to the original tree state.

pub mod error;
pub mod logging;
pub mod ops;
pub mod orchestrator;
pub mod resolver;
pub mod set;
pub mod settings;
pub mod target;
