//! This module defines the core data structures and types used throughout the TurTaL
//! interpreter, including program representation, rules, execution results, and error types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The symbol written into tape cells created by extending the tape.
pub const BLANK_SYMBOL: &str = ".";
/// The placeholder meaning "match anything" in a pattern or "leave unchanged" in an action.
pub const WILDCARD: &str = "*";

/// A TurTaL program: the tape, the current control state, the head position and the
/// rule table.
///
/// A program is built once by the parser and then mutated in place by the machine on
/// every step. The head may temporarily sit outside the tape; the machine extends the
/// tape before reading from it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    /// The tape cells, left to right.
    pub tape: Vec<String>,
    /// The current control state.
    pub state: String,
    /// The head position. May be negative or past the end before normalization.
    pub head: isize,
    /// The rule table, keyed by (symbol pattern, state pattern).
    pub rules: HashMap<RuleKey, Rule>,
}

impl Program {
    /// Looks up the rule applying to `symbol` in the current state.
    ///
    /// Candidates are tried from most to least specific: exact key, wildcard symbol,
    /// wildcard state, then full wildcard. The first key present in the table wins.
    pub fn resolve(&self, symbol: &str) -> Option<(&RuleKey, &Rule)> {
        RuleKey::candidates(symbol, &self.state)
            .iter()
            .find_map(|key| self.rules.get_key_value(key))
    }

    /// Returns `true` if the table contains at least one halt rule.
    pub fn has_halt_rule(&self) -> bool {
        self.rules.values().any(Rule::is_halt)
    }
}

/// One half of a rule key: either a literal symbol/state or the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pattern {
    /// Matches any symbol or state (`*`).
    Any,
    /// Matches exactly this symbol or state.
    Literal(String),
}

impl Pattern {
    /// Decodes a pattern field; `*` becomes [`Pattern::Any`].
    pub fn from_field(field: &str) -> Self {
        if field == WILDCARD {
            Pattern::Any
        } else {
            Pattern::Literal(field.to_string())
        }
    }

    /// Returns `true` if this pattern accepts `value`.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Literal(literal) => literal == value,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str(WILDCARD),
            Pattern::Literal(literal) => f.write_str(literal),
        }
    }
}

/// The composite key of a rule: which symbol and which state it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleKey {
    pub symbol: Pattern,
    pub state: Pattern,
}

impl RuleKey {
    pub fn new(symbol: Pattern, state: Pattern) -> Self {
        Self { symbol, state }
    }

    /// Builds a key from the raw text of its two fields.
    pub fn from_fields(symbol: &str, state: &str) -> Self {
        Self::new(Pattern::from_field(symbol), Pattern::from_field(state))
    }

    /// The four lookup candidates for a (symbol, state) pair, in precedence order.
    pub fn candidates(symbol: &str, state: &str) -> [RuleKey; 4] {
        let symbol = Pattern::Literal(symbol.to_string());
        let state = Pattern::Literal(state.to_string());

        [
            RuleKey::new(symbol.clone(), state.clone()),
            RuleKey::new(Pattern::Any, state),
            RuleKey::new(symbol, Pattern::Any),
            RuleKey::new(Pattern::Any, Pattern::Any),
        ]
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.symbol, self.state)
    }
}

/// What a rule writes into the current cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Write {
    /// Replace the cell with this symbol.
    Literal(String),
    /// Add one to the numeric cell (`+`).
    Increment,
    /// Subtract one from the numeric cell (`-`).
    Decrement,
    /// Leave the cell unchanged (`*`).
    Keep,
}

impl Write {
    pub fn from_field(field: &str) -> Self {
        match field {
            "+" => Write::Increment,
            "-" => Write::Decrement,
            WILDCARD => Write::Keep,
            literal => Write::Literal(literal.to_string()),
        }
    }
}

impl fmt::Display for Write {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Write::Literal(literal) => f.write_str(literal),
            Write::Increment => f.write_str("+"),
            Write::Decrement => f.write_str("-"),
            Write::Keep => f.write_str(WILDCARD),
        }
    }
}

/// Which state a rule moves the machine into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextState {
    Literal(String),
    /// Stay in the current state (`*`).
    Keep,
}

impl NextState {
    pub fn from_field(field: &str) -> Self {
        if field == WILDCARD {
            NextState::Keep
        } else {
            NextState::Literal(field.to_string())
        }
    }
}

impl fmt::Display for NextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextState::Literal(literal) => f.write_str(literal),
            NextState::Keep => f.write_str(WILDCARD),
        }
    }
}

/// Represents the possible directions the head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Decodes a move field. Only `<`, `>` and the empty string are valid.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "<" => Some(Direction::Left),
            ">" => Some(Direction::Right),
            "" => Some(Direction::Stay),
            _ => None,
        }
    }

    /// The head offset this direction applies.
    pub fn offset(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => f.write_str("<"),
            Direction::Right => f.write_str(">"),
            Direction::Stay => Ok(()),
        }
    }
}

/// The body of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// Stop successfully (`,,` body).
    Halt,
    /// Rewrite the cell, change state and move.
    Transition(Transition),
}

impl Rule {
    /// Decodes the three body fields. A body whose fields are all empty is the halt
    /// rule; returns `None` if the move field is invalid.
    pub fn from_fields(write: &str, next_state: &str, direction: &str) -> Option<Self> {
        if write.is_empty() && next_state.is_empty() && direction.is_empty() {
            return Some(Rule::Halt);
        }

        Some(Rule::Transition(Transition {
            write: Write::from_field(write),
            next_state: NextState::from_field(next_state),
            direction: Direction::from_field(direction)?,
        }))
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Rule::Halt)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Halt => f.write_str(",,"),
            Rule::Transition(t) => write!(f, "{},{},{}", t.write, t.next_state, t.direction),
        }
    }
}

/// A non-halting rule body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub write: Write,
    pub next_state: NextState,
    pub direction: Direction,
}

/// A serializable view of a program in the middle of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of steps executed so far.
    pub step: usize,
    pub state: String,
    pub head: isize,
    pub tape: Vec<String>,
}

impl Snapshot {
    pub fn new(step: usize, program: &Program) -> Self {
        Self {
            step,
            state: program.state.clone(),
            head: program.head,
            tape: program.tape.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The machine applied a rule and continues execution.
    Continue,
    /// The machine stopped.
    Halt(Halt),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// A halt rule was matched.
    Ok,

    Err(TurtalError),
}

/// Represents the errors that can occur while parsing or running a TurTaL program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurtalError {
    /// A line of one or two commas only, which is neither a tape nor a rule.
    #[error("Invalid code on line {line}: {text}")]
    InvalidSyntax { line: usize, text: String },
    /// A rule whose move field is not `<`, `>` or empty.
    #[error("Invalid rule direction '{direction}' on line {line}")]
    InvalidDirection { line: usize, direction: String },
    /// A rule line that does not have the `symbol,state => write,state,move` shape.
    #[error("Invalid rule on line {line}: {reason}")]
    InvalidRule { line: usize, reason: String },
    /// No rule matches the symbol under the head in the current state.
    #[error("Missing rule {symbol},{state} at index {index}")]
    MissingRule {
        symbol: String,
        state: String,
        index: usize,
    },
    #[error("Symbol {symbol} is non-numeric and can't be incremented with rule {rule} at index {index}")]
    NonNumericIncrement {
        symbol: String,
        rule: RuleKey,
        index: usize,
    },
    #[error("Symbol {symbol} is non-numeric and can't be decremented with rule {rule} at index {index}")]
    NonNumericDecrement {
        symbol: String,
        rule: RuleKey,
        index: usize,
    },
    /// Incrementing or decrementing left the supported integer range.
    #[error("Symbol {symbol} overflows when applying rule {rule} at index {index}")]
    NumericOverflow {
        symbol: String,
        rule: RuleKey,
        index: usize,
    },
    /// The run was cancelled by its caller.
    #[error("Execution cancelled after {steps} steps")]
    Cancelled { steps: usize },
    /// A program that cannot be expressed as TurTaL source.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to reading program files.
    #[error("File error: {0}")]
    FileError(String),
}

impl TurtalError {
    /// Returns `true` for errors raised while parsing source text.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            TurtalError::InvalidSyntax { .. }
                | TurtalError::InvalidDirection { .. }
                | TurtalError::InvalidRule { .. }
        )
    }

    /// Returns `true` for errors raised while running a program.
    pub fn is_runtime_error(&self) -> bool {
        matches!(
            self,
            TurtalError::MissingRule { .. }
                | TurtalError::NonNumericIncrement { .. }
                | TurtalError::NonNumericDecrement { .. }
                | TurtalError::NumericOverflow { .. }
                | TurtalError::Cancelled { .. }
        )
    }
}
