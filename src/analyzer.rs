//! This module provides functions for analyzing TurTaL programs to spot likely mistakes
//! before execution, such as a missing halt rule, states that no rule can handle, or an
//! initial state reset by a stray blank line.
//!
//! Analysis is advisory: every program accepted by the parser is a valid program, so
//! findings are reported as warnings and never stop a run.

use crate::types::{NextState, Pattern, Program, Rule};
use std::collections::BTreeSet;
use std::fmt;

/// Represents the findings of analyzing a TurTaL program.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisWarning {
    /// The initial state is the empty string, usually caused by a trailing blank line.
    EmptyInitialState,
    /// No rule has an empty body, so the program can only stop by failing.
    NoHaltRule,
    /// No rule key can match the initial state.
    UnhandledInitialState(String),
    /// Rules move into states that no rule key can match.
    UndefinedNextStates(Vec<String>),
    /// States with rules of their own that are never entered from the initial state.
    UnreachableStates(Vec<String>),
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::EmptyInitialState => {
                write!(f, "Initial state is empty (is there a trailing blank line?)")
            }
            AnalysisWarning::NoHaltRule => write!(f, "Program has no halt rule"),
            AnalysisWarning::UnhandledInitialState(state) => {
                write!(f, "No rule handles the initial state '{}'", state)
            }
            AnalysisWarning::UndefinedNextStates(states) => {
                write!(f, "Rules move into states without rules: {:?}", states)
            }
            AnalysisWarning::UnreachableStates(states) => {
                write!(f, "Unreachable states detected: {:?}", states)
            }
        }
    }
}

/// Analyzes a `Program` and returns every warning found, in a fixed order.
pub fn analyze(program: &Program) -> Vec<AnalysisWarning> {
    [
        check_initial_state,
        check_halt_rule,
        check_handled_initial_state,
        check_undefined_next_states,
        check_unreachable_states,
    ]
    .iter()
    .filter_map(|f| f(program))
    .collect()
}

/// States named by literal rule keys.
fn keyed_states(program: &Program) -> BTreeSet<&str> {
    program
        .rules
        .keys()
        .filter_map(|key| match &key.state {
            Pattern::Literal(state) => Some(state.as_str()),
            Pattern::Any => None,
        })
        .collect()
}

/// Literal next states of the rules that can fire in `state`.
fn next_states<'a>(program: &'a Program, state: &str) -> Vec<&'a str> {
    program
        .rules
        .iter()
        .filter(|(key, _)| key.state.matches(state))
        .filter_map(|(_, rule)| match rule {
            Rule::Transition(t) => match &t.next_state {
                NextState::Literal(next) => Some(next.as_str()),
                NextState::Keep => None,
            },
            Rule::Halt => None,
        })
        .collect()
}

/// Returns `true` if some rule key can match `state`.
fn is_handled(program: &Program, state: &str) -> bool {
    program.rules.keys().any(|key| key.state.matches(state))
}

fn check_initial_state(program: &Program) -> Option<AnalysisWarning> {
    program
        .state
        .is_empty()
        .then_some(AnalysisWarning::EmptyInitialState)
}

fn check_halt_rule(program: &Program) -> Option<AnalysisWarning> {
    (!program.has_halt_rule()).then_some(AnalysisWarning::NoHaltRule)
}

fn check_handled_initial_state(program: &Program) -> Option<AnalysisWarning> {
    (!is_handled(program, &program.state))
        .then(|| AnalysisWarning::UnhandledInitialState(program.state.clone()))
}

/// Checks that every literal next state can be matched by at least one rule key.
fn check_undefined_next_states(program: &Program) -> Option<AnalysisWarning> {
    let undefined: BTreeSet<&str> = program
        .rules
        .values()
        .filter_map(|rule| match rule {
            Rule::Transition(t) => match &t.next_state {
                NextState::Literal(state) => Some(state.as_str()),
                NextState::Keep => None,
            },
            Rule::Halt => None,
        })
        .filter(|state| !is_handled(program, state))
        .collect();

    (!undefined.is_empty()).then(|| {
        AnalysisWarning::UndefinedNextStates(undefined.into_iter().map(String::from).collect())
    })
}

/// Checks for keyed states that can't be reached from the initial state, following
/// literal next states with a depth-first traversal.
///
/// Rules keyed on the wildcard state apply in every state, so their next states are
/// reachable from anywhere reachable.
fn check_unreachable_states(program: &Program) -> Option<AnalysisWarning> {
    let mut visited = BTreeSet::new();
    let mut stack = vec![program.state.as_str()];

    while let Some(state) = stack.pop() {
        if !visited.insert(state) {
            continue;
        }

        stack.extend(
            next_states(program, state)
                .into_iter()
                .filter(|s| !visited.contains(s)),
        );
    }

    let unreachable: Vec<String> = keyed_states(program)
        .difference(&visited)
        .map(|s| s.to_string())
        .collect();

    (!unreachable.is_empty()).then_some(AnalysisWarning::UnreachableStates(unreachable))
}
