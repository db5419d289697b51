//! This module renders a `Program` back into canonical TurTaL source text.
//!
//! Canonical form lists the rules sorted by key, then the tape line, then the state
//! line. The state line comes last so that an empty state is written as a trailing
//! blank line, which the parser reads back as the empty state.

use crate::types::{Direction, NextState, Pattern, Program, Rule, TurtalError, Write, WILDCARD};

/// Encodes a program as TurTaL source.
///
/// Format:
/// - one `symbol, state => write, next, move` line per rule, sorted by key
/// - the tape as a comma-separated line
/// - the state on the last line
///
/// # Returns
///
/// * `Ok(String)` - The encoded program.
/// * `Err(TurtalError::ValidationError)` if the program can't be expressed as source:
///   a tape of one to three cells, or a symbol or state containing a comma, whitespace or
///   `=>`.
pub fn encode(program: &Program) -> Result<String, TurtalError> {
    let mut lines = encode_rules(program)?;

    if let Some(tape) = encode_tape(&program.tape)? {
        lines.push(tape);
    }

    check_token(&program.state, "state")?;
    if program.state.is_empty() {
        // An empty last line is the empty state; without a line the state is also empty.
        lines.push(String::new());
    } else {
        lines.push(program.state.clone());
    }

    Ok(lines.join("\n"))
}

/// Encodes the rules section, one line per rule.
fn encode_rules(program: &Program) -> Result<Vec<String>, TurtalError> {
    // Sort rules for consistent output
    let mut rules: Vec<_> = program.rules.iter().collect();
    rules.sort_by(|a, b| a.0.cmp(b.0));

    rules
        .into_iter()
        .map(|(key, rule)| {
            let symbol = key.symbol.to_string();
            let state = key.state.to_string();
            check_token(&symbol, "symbol")?;
            check_token(&state, "state")?;
            for pattern in [&key.symbol, &key.state] {
                if let Pattern::Literal(literal) = pattern {
                    check_literal(literal, &[WILDCARD])?;
                }
            }

            let body = match rule {
                Rule::Halt => ", ,".to_string(),
                Rule::Transition(t) => {
                    if let Write::Literal(literal) = &t.write {
                        check_literal(literal, &[WILDCARD, "+", "-"])?;
                    }
                    if let NextState::Literal(literal) = &t.next_state {
                        check_literal(literal, &[WILDCARD])?;
                    }
                    if t.write == Write::Literal(String::new())
                        && t.next_state == NextState::Literal(String::new())
                        && t.direction == Direction::Stay
                    {
                        return Err(TurtalError::ValidationError(
                            "An empty transition would be read back as a halt rule".to_string(),
                        ));
                    }

                    let write = t.write.to_string();
                    let next_state = t.next_state.to_string();
                    check_token(&write, "symbol")?;
                    check_token(&next_state, "state")?;

                    format!("{}, {}, {}", write, next_state, t.direction)
                }
            };

            Ok(format!("{}, {} => {}", symbol, state, body).trim_end().to_string())
        })
        .collect()
}

/// Encodes the tape as comma-separated symbols, or `None` for an empty tape.
fn encode_tape(tape: &[String]) -> Result<Option<String>, TurtalError> {
    match tape.len() {
        0 => Ok(None),
        1..=3 => Err(TurtalError::ValidationError(format!(
            "A tape of {} cells can't be written as a tape line",
            tape.len()
        ))),
        _ => {
            for cell in tape {
                check_token(cell, "symbol")?;
            }
            Ok(Some(tape.join(",")))
        }
    }
}

/// Checks that a symbol or state survives being written and parsed again.
fn check_token(token: &str, what: &str) -> Result<(), TurtalError> {
    if token.contains(',') || token.contains("=>") || token.chars().any(char::is_whitespace) {
        return Err(TurtalError::ValidationError(format!(
            "The {} '{}' can't be written as TurTaL source",
            what, token
        )));
    }

    Ok(())
}

/// Checks that a literal doesn't read back as one of the action markers.
fn check_literal(literal: &str, reserved: &[&str]) -> Result<(), TurtalError> {
    if reserved.contains(&literal) {
        return Err(TurtalError::ValidationError(format!(
            "The literal '{}' would be read back as an action",
            literal
        )));
    }

    Ok(())
}
