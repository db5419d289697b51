//! This crate provides the core logic for the TurTaL tape-rewriting language.
//! It includes modules for parsing TurTaL programs, executing them step by step,
//! analyzing them for likely mistakes, rendering them back to source, and loading
//! programs from files or the bundled collection.

pub mod analyzer;
pub mod encoder;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod types;

/// Re-exports the `pest` grammar rules of the rule line parser.
pub use crate::parser::Rule as GrammarRule;
/// Re-exports the `analyze` function and `AnalysisWarning` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisWarning};
/// Re-exports the encoding function from the encoder module.
pub use encoder::encode;
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `Machine` struct and the `run` entry point from the machine module.
pub use machine::{run, Machine};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the types describing programs, rules, execution results and errors.
pub use types::{
    Direction, Halt, NextState, Pattern, Program, Rule, RuleKey, Snapshot, Step, Transition,
    TurtalError, Write, BLANK_SYMBOL, WILDCARD,
};
