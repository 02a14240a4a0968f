//! Grading template seeded into freshly cloned submissions.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default name of the grade file inside each submission folder.
pub const DEFAULT_GRADE_FILE: &str = "GRADE.md";

/// Built-in rubric. The `Total Grade: ` line is what the extractor parses.
pub const DEFAULT_TEMPLATE: &str = r#"
# Grade Details

Total Grade: 

Below are the details of your grade:

- What the problem attempted? Effort made to start the homework assignment (1pts).
    - Grade:
- What the problem analysis thought out? Identified inputs and outputs, including sources and targets. Outlined a process which explains code flow in pseudo code – not python. (2pts)
    - Grade:
- Does the code written code execute? Program runs without error. (2pts)
    - Grade: 
- Does the code solve the problem? In addition does it does it handle edge cases and bad input when explicitly directed to do so? (1pt)
    - Grade:
- Is the code well written? Easy to understand, modular uses functions for code reuse and readability? Are python objects aptly named? No unnecessary code, or code not pertinent to the problem at hand? (1pt)
    - Grade:
- Are the questions answered at the bottom of the challenge? Are the answers well thought out and correct? (3pts)

"#;

/// Load the template text: a custom file if configured, the built-in otherwise.
pub fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read grading template: {}", path.display())),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// Write the grading template into a submission folder, replacing any
/// existing grade file.
pub fn seed_grade_file(folder: &Path, file_name: &str, template: &str) -> Result<PathBuf> {
    let path = folder.join(file_name);
    fs::write(&path, template)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Added {} to {}", file_name, folder.display());
    Ok(path)
}
