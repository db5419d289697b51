use crate::loader::strip_final_newline;
use crate::parser::parse;
use crate::types::{Program, TurtalError};

// Default embedded programs
const PROGRAM_TEXTS: [(&str, &str); 3] = [
    ("adder", include_str!("../programs/adder.ttl")),
    ("subtractor", include_str!("../programs/subtractor.ttl")),
    ("comparator", include_str!("../programs/comparator.ttl")),
];

/// A bundled program with its name and source text.
#[derive(Debug, Clone)]
pub struct BundledProgram {
    pub name: &'static str,
    pub text: &'static str,
    pub program: Program,
}

lazy_static::lazy_static! {
    pub static ref PROGRAMS: Vec<BundledProgram> = PROGRAM_TEXTS
        .iter()
        .filter_map(|&(name, text)| match parse(strip_final_newline(text)) {
            Ok(program) => Some(BundledProgram { name, text, program }),
            Err(e) => {
                tracing::error!(name, error = %e, "failed to parse bundled program");
                None
            }
        })
        .collect();
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        PROGRAMS.len()
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        PROGRAMS.iter().map(|p| p.name.to_string()).collect()
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<Program, TurtalError> {
        Self::find(name).map(|p| p.program.clone())
    }

    /// Get the original text of a program by its name
    pub fn get_program_text_by_name(name: &str) -> Result<&'static str, TurtalError> {
        Self::find(name).map(|p| p.text)
    }

    /// Get information about a program by its name
    pub fn get_program_info(name: &str) -> Result<ProgramInfo, TurtalError> {
        let bundled = Self::find(name)?;

        Ok(ProgramInfo {
            name: bundled.name.to_string(),
            initial_state: bundled.program.state.clone(),
            initial_tape: bundled.program.tape.clone(),
            rule_count: bundled.program.rules.len(),
        })
    }

    fn find(name: &str) -> Result<&'static BundledProgram, TurtalError> {
        PROGRAMS
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| TurtalError::ValidationError(format!("Program '{}' not found", name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub name: String,
    pub initial_state: String,
    pub initial_tape: Vec<String>,
    pub rule_count: usize,
}
