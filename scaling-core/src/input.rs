//! Engine input file generation

use crate::error::{HarnessError, HarnessResult};
use std::fs;
use std::path::{Path, PathBuf};

/// File name the engine reads its parameters from
pub const DEFAULT_INPUT_FILE: &str = "cats-input.txt";

/// Number of constant fields around the problem size
pub const CONSTANT_FIELD_COUNT: usize = 10;

/// Total number of fields in an input file
pub const INPUT_FIELD_COUNT: usize = CONSTANT_FIELD_COUNT + 1;

/// Constant simulation parameters, in file order with the problem size omitted
pub const DEFAULT_CONSTANT_FIELDS: [&str; CONSTANT_FIELD_COUNT] =
    ["2", "1", "6", "6", "5", "0.588", "1.0", "100", "3.904", "1"];

/// Zero-based position of the problem size in the input file
const PROBLEM_SIZE_FIELD: usize = 1;

/// Renders and writes engine input files
///
/// Only the problem-size field varies between files; every other field is
/// owned by the template.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTemplate {
    constants: Vec<String>,
    file_name: String,
}

impl Default for InputTemplate {
    fn default() -> Self {
        Self {
            constants: DEFAULT_CONSTANT_FIELDS.iter().map(|s| s.to_string()).collect(),
            file_name: DEFAULT_INPUT_FILE.to_string(),
        }
    }
}

impl InputTemplate {
    /// Build a template from explicit constant fields
    pub fn new(constants: Vec<String>, file_name: impl Into<String>) -> HarnessResult<Self> {
        if constants.len() != CONSTANT_FIELD_COUNT {
            return Err(HarnessError::Config(format!(
                "input template needs {CONSTANT_FIELD_COUNT} constant fields, got {}",
                constants.len()
            )));
        }
        if let Some(field) = constants
            .iter()
            .find(|f| f.trim().is_empty() || f.contains('\n'))
        {
            return Err(HarnessError::Config(format!(
                "input field {field:?} must be a single non-empty token"
            )));
        }

        Ok(Self {
            constants,
            file_name: file_name.into(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Render the input blob for a problem size (no trailing newline)
    pub fn render(&self, cells: u64) -> String {
        let size = cells.to_string();
        let mut fields: Vec<&str> = self.constants.iter().map(String::as_str).collect();
        fields.insert(PROBLEM_SIZE_FIELD, &size);
        fields.join("\n")
    }

    /// Write the input file for a problem size into `dir`
    pub fn write(&self, dir: &Path, cells: u64) -> HarnessResult<PathBuf> {
        let path = dir.join(&self.file_name);
        fs::write(&path, self.render(cells)).map_err(|source| HarnessError::InputWrite {
            path: path.clone(),
            source,
        })?;
        log::debug!("wrote {} for {} cells", path.display(), cells);
        Ok(path)
    }
}
