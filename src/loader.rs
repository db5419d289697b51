//! This module provides the `ProgramLoader` struct, responsible for loading TurTaL
//! programs from files, directories and strings.

use crate::parser::parse;
use crate::types::{Program, TurtalError};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extension of TurTaL program files.
pub const PROGRAM_EXTENSION: &str = "ttl";

/// `ProgramLoader` is a utility struct for loading TurTaL programs.
/// It provides methods to load programs from individual files, from string content,
/// and to discover and load all `.ttl` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single TurTaL program from the specified file path.
    ///
    /// The newline that ends the file's last line is not a blank line of its own, so it
    /// is removed before parsing.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed into a `Program`.
    /// * `Err(TurtalError::FileError)` if the file cannot be read.
    /// * A syntax error if the file content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, TurtalError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TurtalError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), bytes = content.len(), "loading program");
        parse(strip_final_newline(&content))
    }

    /// Loads a single TurTaL program from a reader such as stdin, treating the content
    /// like a file.
    pub fn load_program_from_reader<R: Read>(mut reader: R) -> Result<Program, TurtalError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| TurtalError::FileError(format!("Failed to read program: {}", e)))?;

        parse(strip_final_newline(&content))
    }

    /// Loads a single TurTaL program from the provided string content.
    ///
    /// The text is parsed as-is, so a trailing newline produces a final blank state line.
    pub fn load_program_from_string(content: &str) -> Result<Program, TurtalError> {
        parse(content)
    }

    /// Loads all TurTaL program files (`.ttl` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. Each element of the result
    /// is either the loaded program with its path, or the error that prevented loading it.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), TurtalError>> {
        if !directory.exists() {
            return vec![Err(TurtalError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(TurtalError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(TurtalError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                // Skip directories and non-.ttl files
                if path.is_dir()
                    || path
                        .extension()
                        .is_none_or(|ext| ext != PROGRAM_EXTENSION)
                {
                    return None;
                }

                match Self::load_program(&path) {
                    Ok(program) => Some(Ok((path, program))),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping program");
                        Some(Err(TurtalError::FileError(format!(
                            "Failed to load program from {}: {}",
                            path.display(),
                            e
                        ))))
                    }
                }
            })
            .collect();

        // Directory order is platform dependent.
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(a), Err(b)) => a.to_string().cmp(&b.to_string()),
        });

        results
    }
}

/// Removes one trailing `\n` or `\r\n`.
pub(crate) fn strip_final_newline(content: &str) -> &str {
    content
        .strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const VALID: &str = "*, S => +, *, >\n., S => ,,\n1,2,3,4\nS\n";

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_valid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.ttl");
        write_file(&file_path, VALID);

        let program = ProgramLoader::load_program(&file_path).unwrap();

        // The file's final newline doesn't reset the state.
        assert_eq!(program.state, "S");
        assert_eq!(program.tape, vec!["1", "2", "3", "4"]);
        assert_eq!(program.rules.len(), 2);
    }

    #[test]
    fn test_load_program_keeps_inner_blank_lines() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("blank.ttl");
        write_file(&file_path, "1,2,3,4\nS\n\n");

        let program = ProgramLoader::load_program(&file_path).unwrap();
        assert_eq!(program.state, "");
    }

    #[test]
    fn test_load_from_string_is_verbatim() {
        let program = ProgramLoader::load_program_from_string(VALID).unwrap();
        assert_eq!(program.state, "");
    }

    #[test]
    fn test_load_from_reader_is_like_a_file() {
        let program = ProgramLoader::load_program_from_reader(VALID.as_bytes()).unwrap();
        assert_eq!(program.state, "S");
    }

    #[test]
    fn test_load_invalid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.ttl");
        write_file(&file_path, "a,b");

        let result = ProgramLoader::load_program(&file_path);
        assert!(matches!(result, Err(TurtalError::InvalidSyntax { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = ProgramLoader::load_program(&dir.path().join("missing.ttl"));

        assert!(matches!(result, Err(TurtalError::FileError(_))));
    }

    #[test]
    fn test_load_programs_from_directory() {
        let dir = tempdir().unwrap();

        write_file(&dir.path().join("valid.ttl"), VALID);
        write_file(&dir.path().join("invalid.ttl"), "*,S=>*,*,X");
        write_file(&dir.path().join("ignored.txt"), "This file should be ignored");

        let results = ProgramLoader::load_programs(dir.path());

        // We should have 2 results: 1 success and 1 error
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_load_programs_missing_directory() {
        let dir = tempdir().unwrap();
        let results = ProgramLoader::load_programs(&dir.path().join("nope"));

        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_strip_final_newline() {
        assert_eq!(strip_final_newline("S\n"), "S");
        assert_eq!(strip_final_newline("S\r\n"), "S");
        assert_eq!(strip_final_newline("S\n\n"), "S\n");
        assert_eq!(strip_final_newline("S"), "S");
    }
}
