//! Grade file handling.
//!
//! The template seeds a `Total Grade:` line into every freshly cloned
//! submission; the extractor reads it back at export time.

pub mod extractor;
pub mod template;

pub use extractor::extract_score;
pub use template::{seed_grade_file, DEFAULT_GRADE_FILE};
