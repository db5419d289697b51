//! This module provides the parser for TurTaL programs.
//!
//! Program text is read line by line. Whitespace is never significant, so every
//! whitespace character is removed before a line is classified as a rule, the tape or
//! the initial state. Rule lines are matched against the `pest` grammar in
//! `grammar.pest`.

use crate::types::{Program, Rule as TapeRule, RuleKey, TurtalError};
use pest::Parser as PestParser;
use pest_derive::Parser as PestParser;
use tracing::debug;

/// Derives a `PestParser` for the rule line grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct TurtalParser;

/// The kind of a classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Rule(RuleKey, TapeRule),
    Tape(Vec<String>),
    State(String),
}

/// Parses the given program text into a `Program`.
///
/// Lines are classified independently of their order. Later rules with the same key
/// replace earlier ones, and the last tape and state lines win. A blank line is a state
/// line and sets the initial state to the empty string.
///
/// # Arguments
///
/// * `input` - The TurTaL program text.
///
/// # Returns
///
/// * `Ok(Program)` with the head at index 0.
/// * `Err(TurtalError)` for the first malformed line; nothing is recovered.
pub fn parse(input: &str) -> Result<Program, TurtalError> {
    let mut program = Program::default();

    for (index, raw) in input.split('\n').enumerate() {
        match parse_line(index + 1, raw)? {
            Line::Rule(key, rule) => {
                if let Some(previous) = program.rules.insert(key.clone(), rule) {
                    debug!(line = index + 1, %key, %previous, "rule overwritten");
                }
            }
            Line::Tape(tape) => {
                debug!(line = index + 1, cells = tape.len(), "tape line");
                program.tape = tape;
            }
            Line::State(state) => {
                debug!(line = index + 1, %state, "state line");
                program.state = state;
            }
        }
    }

    Ok(program)
}

/// Classifies a single source line.
fn parse_line(number: usize, raw: &str) -> Result<Line, TurtalError> {
    let line = strip_whitespace(raw);
    let commas = line.matches(',').count();

    // One or two commas can't be told apart from a truncated rule.
    if (1..3).contains(&commas) {
        return Err(TurtalError::InvalidSyntax { line: number, text: line });
    }

    if line.contains("=>") {
        let (key, rule) = parse_rule(number, &line)?;
        Ok(Line::Rule(key, rule))
    } else if line.contains(',') {
        Ok(Line::Tape(line.split(',').map(str::to_string).collect()))
    } else {
        Ok(Line::State(line))
    }
}

/// Parses a whitespace-free rule line into its key and body.
fn parse_rule(number: usize, line: &str) -> Result<(RuleKey, TapeRule), TurtalError> {
    let root = TurtalParser::parse(Rule::rule_line, line)
        .map_err(|e| TurtalError::InvalidRule {
            line: number,
            reason: e.variant.message().into_owned(),
        })?
        .next()
        .ok_or_else(|| TurtalError::InvalidRule {
            line: number,
            reason: "empty rule".to_string(),
        })?;

    let mut symbol = "";
    let mut state = "";
    let mut write = "";
    let mut next_state = "";
    let mut direction = "";

    for field in root.into_inner() {
        let text = field.as_str();
        match field.as_rule() {
            Rule::symbol => symbol = text,
            Rule::state => state = text,
            Rule::write => write = text,
            Rule::next_state => next_state = text,
            Rule::direction => direction = text,
            _ => {} // SOI / EOI
        }
    }

    let rule = TapeRule::from_fields(write, next_state, direction)
        .ok_or_else(|| TurtalError::InvalidDirection {
            line: number,
            direction: direction.to_string(),
        })?;

    Ok((RuleKey::from_fields(symbol, state), rule))
}

/// Removes every whitespace character, including a trailing `\r`.
fn strip_whitespace(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}
