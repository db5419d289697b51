//! This module defines the `Machine` struct, which executes a TurTaL `Program`.
//! It handles tape extension, rule resolution, numeric rewriting and head movement,
//! one step at a time.

use crate::types::{
    Halt, NextState, Program, Rule, RuleKey, Step, TurtalError, Write, BLANK_SYMBOL,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Runs `program` to completion, calling `observer` after every step.
///
/// Returns the final tape once a halt rule matches. A program that never halts runs
/// forever.
pub fn run<F>(program: Program, observer: F) -> Result<Vec<String>, TurtalError>
where
    F: FnMut(&Program),
{
    Machine::new(program).run_with(observer)
}

/// Executes a single TurTaL program.
///
/// The machine owns its program exclusively and mutates it in place, so each run is
/// strictly sequential.
#[derive(Debug, Clone)]
pub struct Machine {
    program: Program,
    initial: Program,
    step_count: usize,
}

impl Machine {
    /// Creates a new `Machine` from a parsed `Program`.
    pub fn new(program: Program) -> Self {
        Self {
            initial: program.clone(),
            program,
            step_count: 0,
        }
    }

    /// Executes a single step.
    ///
    /// The tape is extended until the head is in range, the rule for the current symbol
    /// and state is resolved, and its write, state and move actions are applied in that
    /// order. A halt rule leaves the program untouched.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if a transition was applied.
    /// * `Step::Halt(Halt::Ok)` if a halt rule matched.
    /// * `Step::Halt(Halt::Err(_))` if no rule applies or a numeric write fails.
    pub fn step(&mut self) -> Step {
        let index = self.normalize();
        let symbol = self.program.tape[index].clone();

        let (key, transition) = match self.program.resolve(&symbol) {
            Some((_, Rule::Halt)) => {
                debug!(steps = self.step_count, index, "halted");
                return Step::Halt(Halt::Ok);
            }
            Some((key, Rule::Transition(transition))) => (key.clone(), transition.clone()),
            None => {
                let error = TurtalError::MissingRule {
                    symbol,
                    state: self.program.state.clone(),
                    index,
                };
                debug!(steps = self.step_count, %error, "no rule");
                return Step::Halt(Halt::Err(error));
            }
        };

        trace!(
            step = self.step_count,
            state = %self.program.state,
            index,
            %symbol,
            rule = %key,
            "applying rule"
        );

        match rewrite(&symbol, &transition.write, &key, index) {
            Ok(Some(cell)) => self.program.tape[index] = cell,
            Ok(None) => {}
            Err(error) => {
                debug!(steps = self.step_count, %error, "write failed");
                return Step::Halt(Halt::Err(error));
            }
        }

        if let NextState::Literal(state) = &transition.next_state {
            self.program.state.clone_from(state);
        }

        self.program.head += transition.direction.offset();
        self.step_count += 1;

        Step::Continue
    }

    /// Runs the machine until it halts or fails.
    pub fn run(&mut self) -> Result<Vec<String>, TurtalError> {
        self.run_with(|_| {})
    }

    /// Runs the machine until it halts or fails, calling `observer` with the program after
    /// every applied transition. The observer returns before the next step starts.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<Vec<String>, TurtalError>
    where
        F: FnMut(&Program),
    {
        loop {
            match self.step() {
                Step::Continue => observer(&self.program),
                Step::Halt(Halt::Ok) => return Ok(self.program.tape.clone()),
                Step::Halt(Halt::Err(error)) => return Err(error),
            }
        }
    }

    /// Like [`Machine::run_with`], but checks `cancel` before every step and stops with
    /// `TurtalError::Cancelled` once it is set.
    pub fn run_until<F>(
        &mut self,
        cancel: &AtomicBool,
        mut observer: F,
    ) -> Result<Vec<String>, TurtalError>
    where
        F: FnMut(&Program),
    {
        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!(steps = self.step_count, "cancelled");
                return Err(TurtalError::Cancelled {
                    steps: self.step_count,
                });
            }

            match self.step() {
                Step::Continue => observer(&self.program),
                Step::Halt(Halt::Ok) => return Ok(self.program.tape.clone()),
                Step::Halt(Halt::Err(error)) => return Err(error),
            }
        }
    }

    /// Extends the tape with blanks until the head is in range and returns the head index.
    ///
    /// Prepending shifts every cell right, so the head moves with them.
    fn normalize(&mut self) -> usize {
        let program = &mut self.program;

        while program.head < 0 {
            program.tape.insert(0, BLANK_SYMBOL.to_string());
            program.head += 1;
        }

        // The head is non-negative here.
        let index = program.head.unsigned_abs();
        while index >= program.tape.len() {
            program.tape.push(BLANK_SYMBOL.to_string());
        }

        index
    }

    /// Returns the program in its current state.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Consumes the machine and returns the program in its current state.
    pub fn into_program(self) -> Program {
        self.program
    }

    /// Returns the current tape.
    pub fn tape(&self) -> &[String] {
        &self.program.tape
    }

    /// Returns the current state.
    pub fn state(&self) -> &str {
        &self.program.state
    }

    /// Returns the current head position, which may be outside the tape between steps.
    pub fn head(&self) -> isize {
        self.program.head
    }

    /// Returns the total number of transitions applied.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Returns the matching rule for the symbol under the head, if the head is on the tape.
    pub fn rule(&self) -> Option<(&RuleKey, &Rule)> {
        let index = usize::try_from(self.program.head).ok()?;
        let symbol = self.program.tape.get(index)?;
        self.program.resolve(symbol)
    }

    /// Replaces the tape and moves the head back to index 0.
    pub fn set_tape<S: AsRef<str>>(&mut self, cells: &[S]) {
        self.program.tape = cells.iter().map(|c| c.as_ref().to_string()).collect();
        self.program.head = 0;
    }

    /// Replaces the current state.
    pub fn set_state(&mut self, state: &str) {
        self.program.state = state.to_string();
    }

    /// Resets the machine to the program it was created with.
    pub fn reset(&mut self) {
        self.program = self.initial.clone();
        self.step_count = 0;
    }
}

/// Computes the new content of the cell under the head, or `None` to leave it alone.
fn rewrite(
    symbol: &str,
    write: &Write,
    rule: &RuleKey,
    index: usize,
) -> Result<Option<String>, TurtalError> {
    let delta = match write {
        Write::Keep => return Ok(None),
        Write::Literal(literal) => return Ok(Some(literal.clone())),
        Write::Increment => 1,
        Write::Decrement => -1,
    };

    let value = symbol.parse::<i64>().map_err(|_| {
        let (symbol, rule) = (symbol.to_string(), rule.clone());
        if delta > 0 {
            TurtalError::NonNumericIncrement { symbol, rule, index }
        } else {
            TurtalError::NonNumericDecrement { symbol, rule, index }
        }
    })?;

    value
        .checked_add(delta)
        .map(|v| Some(v.to_string()))
        .ok_or_else(|| TurtalError::NumericOverflow {
            symbol: symbol.to_string(),
            rule: rule.clone(),
            index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::Snapshot;
    use proptest::prelude::*;

    fn machine(source: &str) -> Machine {
        Machine::new(parse(source).unwrap())
    }

    #[test]
    fn test_machine_creation() {
        let machine = machine("a,S=>b,T,>\na,b,c,d\nS");

        assert_eq!(machine.state(), "S");
        assert_eq!(machine.tape(), ["a", "b", "c", "d"]);
        assert_eq!(machine.head(), 0);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_single_step() {
        let mut machine = machine("a,S=>b,T,>\na,b,c,d\nS");

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.state(), "T");
        assert_eq!(machine.tape(), ["b", "b", "c", "d"]);
        assert_eq!(machine.head(), 1);
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_missing_rule() {
        let mut machine = machine("a,S=>b,T,>\na,b,c,d\nS");

        machine.step();
        let result = machine.step();

        assert_eq!(
            result,
            Step::Halt(Halt::Err(TurtalError::MissingRule {
                symbol: "b".into(),
                state: "T".into(),
                index: 1,
            }))
        );
    }

    #[test]
    fn test_rule_precedence() {
        let source = "a,S=>exact,*,\n*,S=>any_symbol,*,\na,*=>any_state,*,\n*,*=>any,*,\na,.,.,.\nS";
        let expected = ["exact", "any_symbol", "any_state", "any"];

        let mut program = parse(source).unwrap();
        for (candidate, expected) in RuleKey::candidates("a", "S").iter().zip(expected) {
            let mut machine = Machine::new(program.clone());
            assert_eq!(machine.step(), Step::Continue);
            assert_eq!(machine.tape()[0], expected);

            program.rules.remove(candidate);
        }

        let mut machine = Machine::new(program);
        assert!(matches!(
            machine.step(),
            Step::Halt(Halt::Err(TurtalError::MissingRule { .. }))
        ));
    }

    #[test]
    fn test_step_left_from_start_prepends_blank() {
        let mut machine = machine("a,S=>*,L,<\n*,L=>,,\na,b,c,d\nS");

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.head(), -1);
        assert_eq!(machine.step(), Step::Halt(Halt::Ok));
        assert_eq!(machine.tape(), [".", "a", "b", "c", "d"]);
        assert_eq!(machine.head(), 0);
    }

    #[test]
    fn test_step_right_past_end_appends_blank() {
        let mut program = parse("*,S=>*,*,>\n.,S=>,,\na,b,c,d\nS").unwrap();
        program.head = 3;
        let mut machine = Machine::new(program);

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.step(), Step::Halt(Halt::Ok));
        assert_eq!(machine.tape(), ["a", "b", "c", "d", "."]);
        assert_eq!(machine.head(), 4);
    }

    #[test]
    fn test_empty_tape_gets_one_cell() {
        let mut machine = machine(".,S=>x,,\nS");

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.tape(), ["x"]);
        assert_eq!(machine.state(), "");
    }

    #[test]
    fn test_halt_does_not_mutate() {
        let mut machine = machine("*,S=>,,\n1,2,3,4\nS");
        let before = machine.program().clone();

        assert_eq!(machine.run(), Ok(vec!["1".into(), "2".into(), "3".into(), "4".into()]));
        assert_eq!(machine.program(), &before);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut machine = machine("*,S=>+,T,\n*,T=>-,U,\n*,U=>-,V,\n*,V=>,,\n9,.,.,.\nS");

        machine.step();
        assert_eq!(machine.tape()[0], "10");
        machine.step();
        assert_eq!(machine.tape()[0], "9");
        machine.step();
        assert_eq!(machine.tape()[0], "8");
        assert_eq!(machine.step(), Step::Halt(Halt::Ok));
    }

    #[test]
    fn test_decrement_below_zero() {
        let mut machine = machine("*,S=>-,*,>\n0,-1,x,x\nS");

        machine.step();
        machine.step();
        assert_eq!(machine.tape()[..2], ["-1", "-2"]);
    }

    #[test]
    fn test_non_numeric_increment() {
        let result = run(parse("*,S=>+,*,>\n.,x,x,x\nS").unwrap(), |_| {});

        assert_eq!(
            result,
            Err(TurtalError::NonNumericIncrement {
                symbol: ".".into(),
                rule: RuleKey::from_fields("*", "S"),
                index: 0,
            })
        );
    }

    #[test]
    fn test_non_numeric_decrement() {
        let mut machine = machine("*,S=>*,*,>\nx,S=>-,*,>\n1,x,.,.\nS");

        machine.step();
        assert_eq!(
            machine.step(),
            Step::Halt(Halt::Err(TurtalError::NonNumericDecrement {
                symbol: "x".into(),
                rule: RuleKey::from_fields("x", "S"),
                index: 1,
            }))
        );
        // The failed step leaves the cell untouched.
        assert_eq!(machine.tape()[1], "x");
    }

    #[test]
    fn test_increment_overflow() {
        let source = format!("*,S=>+,*,\n{},.,.,.\nS", i64::MAX);
        let result = machine(&source).run();

        assert!(matches!(result, Err(TurtalError::NumericOverflow { index: 0, .. })));
    }

    #[test]
    fn test_observer_sees_every_step_in_order() {
        let mut snapshots = Vec::new();
        let mut step = 0;

        let result = run(parse("*,S=>+,T,>\n*,T=>+,U,<\n*,U=>,,\n1,2,.,.\nS").unwrap(), |p| {
            step += 1;
            snapshots.push(Snapshot::new(step, p));
        });

        assert_eq!(result, Ok(vec!["2".into(), "3".into(), ".".into(), ".".into()]));
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].state, "T");
        assert_eq!(snapshots[0].head, 1);
        assert_eq!(snapshots[1].state, "U");
        assert_eq!(snapshots[1].head, 0);
    }

    #[test]
    fn test_cancellation() {
        let cancel = AtomicBool::new(false);
        let mut machine = machine("*,*=>*,*,>\n.,.,.,.\nLOOP");
        let mut seen = 0;

        let result = machine.run_until(&cancel, |_| {
            seen += 1;
            if seen == 10 {
                cancel.store(true, Ordering::Relaxed);
            }
        });

        assert_eq!(result, Err(TurtalError::Cancelled { steps: 10 }));
        assert_eq!(machine.tape().len(), 10);
    }

    #[test]
    fn test_run_until_without_cancel_matches_run() {
        let source = "*,S=>+,*,>\n.,S=>,,\n1,2,3,4\nS";
        let cancel = AtomicBool::new(false);

        let plain = machine(source).run();
        let cancellable = machine(source).run_until(&cancel, |_| {});

        assert_eq!(plain, cancellable);
    }

    #[test]
    fn test_long_run_does_not_grow_stack() {
        let mut machine = machine("*,S=>+,*,\n0,.,.,.\nS");
        let cancel = AtomicBool::new(false);

        let result = machine.run_until(&cancel, |p| {
            if p.tape[0] == "200000" {
                cancel.store(true, Ordering::Relaxed);
            }
        });

        assert_eq!(result, Err(TurtalError::Cancelled { steps: 200_000 }));
    }

    #[test]
    fn test_reset() {
        let mut machine = machine("a,S=>b,T,>\na,b,c,d\nS");

        machine.step();
        machine.reset();

        assert_eq!(machine.state(), "S");
        assert_eq!(machine.tape(), ["a", "b", "c", "d"]);
        assert_eq!(machine.head(), 0);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_set_tape_and_state() {
        let mut machine = machine("x,T=>,,\na,b,c,d\nS");

        machine.set_tape(&["x", "y"]);
        machine.set_state("T");

        assert_eq!(machine.run(), Ok(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn test_current_rule() {
        let machine = machine("*,S=>,,\na,b,c,d\nS");
        let (key, rule) = machine.rule().unwrap();

        assert_eq!(key, &RuleKey::from_fields("*", "S"));
        assert!(rule.is_halt());
    }

    proptest! {
        #[test]
        fn prop_increment_then_decrement_restores(value in -1_000_000i64..1_000_000) {
            let source = format!("*,S=>+,T,\n*,T=>-,U,\n*,U=>,,\n{value},.,.,.\nS");
            let tape = machine(&source).run().unwrap();
            prop_assert_eq!(&tape[0], &value.to_string());
        }

        #[test]
        fn prop_runs_are_deterministic(
            tape in prop::collection::vec("[0-9]{1,3}|\\.", 4..12),
            steps in 1usize..64,
        ) {
            let source = format!(
                "*,A=>+,B,>\n*,B=>*,A,>\n.,A=>0,B,<\n.,B=>1,A,<\n{}\nA",
                tape.join(",")
            );
            let program = parse(&source).unwrap();

            let trace = |program: Program| {
                let mut machine = Machine::new(program);
                let mut snapshots = Vec::new();
                for step in 0..steps {
                    if machine.step() != Step::Continue {
                        break;
                    }
                    snapshots.push(Snapshot::new(step, machine.program()));
                }
                snapshots
            };

            prop_assert_eq!(trace(program.clone()), trace(program));
        }
    }
}
