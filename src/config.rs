//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.classgrader.toml` files.

use crate::report::ExportFormat;
use crate::scanner::AmbiguityPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".classgrader.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub settings.
    #[serde(default)]
    pub forge: ForgeConfig,

    /// Grading workspace settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Grade export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// GitHub organization and API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// GitHub REST API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Organization hosting the student repositories.
    #[serde(default)]
    pub organization: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            organization: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Where submissions are cloned and how they are prepared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding the cloned submissions.
    /// Defaults to `~/<default_dir>`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Folder name under the home directory used when `path` is unset.
    #[serde(default = "default_dir")]
    pub default_dir: String,

    /// Branch created for grading and pushed back.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Grade file seeded into each submission.
    #[serde(default = "default_grade_file")]
    pub grade_file: String,

    /// Custom grading template; the built-in rubric is used when unset.
    #[serde(default)]
    pub template: Option<PathBuf>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            path: None,
            default_dir: default_dir(),
            branch: default_branch(),
            grade_file: default_grade_file(),
            template: None,
        }
    }
}

fn default_dir() -> String {
    "ist256".to_string()
}

fn default_branch() -> String {
    "graded".to_string()
}

fn default_grade_file() -> String {
    crate::grading::DEFAULT_GRADE_FILE.to_string()
}

/// Grade export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Roster file, relative to the workspace unless absolute.
    #[serde(default = "default_roster")]
    pub roster: PathBuf,

    /// Output file, relative to the workspace unless absolute.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Output format.
    #[serde(default)]
    pub format: ExportFormat,

    /// What to do when a username matches several folders.
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            roster: default_roster(),
            output: default_output(),
            format: ExportFormat::default(),
            ambiguity: AmbiguityPolicy::default(),
        }
    }
}

fn default_roster() -> PathBuf {
    PathBuf::from(crate::roster::DEFAULT_ROSTER_FILE)
}

fn default_output() -> PathBuf {
    PathBuf::from("grades.csv")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        use crate::cli::Command;

        match &args.command {
            Command::Clone(clone) => {
                self.merge_forge(&clone.forge);
                self.merge_workspace(clone.workspace.as_ref(), clone.branch.as_ref());
                if let Some(ref template) = clone.template {
                    self.workspace.template = Some(template.clone());
                }
                if let Some(ref grade_file) = clone.grade_file {
                    self.workspace.grade_file = grade_file.clone();
                }
            }
            Command::Push(push) => {
                self.merge_workspace(push.workspace.as_ref(), push.branch.as_ref());
            }
            Command::Export(export) => {
                self.merge_workspace(export.base.as_ref(), None);
                if let Some(ref roster) = export.roster {
                    self.export.roster = roster.clone();
                }
                if let Some(ref output) = export.output {
                    self.export.output = output.clone();
                }
                if let Some(format) = export.format {
                    self.export.format = format;
                }
                if let Some(ambiguity) = export.ambiguity {
                    self.export.ambiguity = ambiguity;
                }
                if let Some(ref grade_file) = export.grade_file {
                    self.workspace.grade_file = grade_file.clone();
                }
            }
            Command::InitConfig => {}
        }
    }

    fn merge_forge(&mut self, forge: &crate::cli::ForgeArgs) {
        if let Some(ref org) = forge.org {
            self.forge.organization = Some(org.clone());
        }
        if let Some(ref api_url) = forge.api_url {
            self.forge.api_url = api_url.clone();
        }
    }

    fn merge_workspace(&mut self, path: Option<&PathBuf>, branch: Option<&String>) {
        if let Some(path) = path {
            self.workspace.path = Some(path.clone());
        }
        if let Some(branch) = branch {
            self.workspace.branch = branch.clone();
        }
    }

    /// Resolved workspace directory.
    pub fn workspace_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.workspace.path {
            return Ok(path.clone());
        }

        let home = dirs::home_dir().context("Could not determine the home directory")?;
        Ok(home.join(&self.workspace.default_dir))
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.forge.api_url, "https://api.github.com");
        assert_eq!(config.workspace.branch, "graded");
        assert_eq!(config.workspace.grade_file, "GRADE.md");
        assert_eq!(config.export.roster, PathBuf::from("students.csv"));
        assert_eq!(config.export.ambiguity, AmbiguityPolicy::FirstMatch);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[forge]
organization = "ist256"

[workspace]
path = "/srv/grading"
branch = "feedback"

[export]
output = "lesson1.json"
format = "json"
ambiguity = "error"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.forge.organization.as_deref(), Some("ist256"));
        assert_eq!(config.workspace.path, Some(PathBuf::from("/srv/grading")));
        assert_eq!(config.workspace.branch, "feedback");
        assert_eq!(config.workspace.grade_file, "GRADE.md");
        assert_eq!(config.export.format, ExportFormat::Json);
        assert_eq!(config.export.ambiguity, AmbiguityPolicy::Error);
    }

    #[test]
    fn test_merge_with_args_prefers_explicit_cli_values() {
        let mut config: Config = toml::from_str(
            "[workspace]\npath = \"/srv/grading\"\nbranch = \"feedback\"\n",
        )
        .unwrap();

        let args = Args::parse_from(["classgrader", "export", "--output", "out.csv"]);
        config.merge_with_args(&args);
        assert_eq!(config.workspace.path, Some(PathBuf::from("/srv/grading")));
        assert_eq!(config.export.output, PathBuf::from("out.csv"));

        let args = Args::parse_from([
            "classgrader",
            "push",
            "--message",
            "Graded",
            "--workspace",
            "/tmp/ws",
            "--branch",
            "graded-v2",
        ]);
        config.merge_with_args(&args);
        assert_eq!(config.workspace.path, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(config.workspace.branch, "graded-v2");
    }

    #[test]
    fn test_workspace_path_uses_explicit_path() {
        let mut config = Config::default();
        config.workspace.path = Some(PathBuf::from("/srv/grading"));
        assert_eq!(config.workspace_path().unwrap(), PathBuf::from("/srv/grading"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[forge]"));
        assert!(toml_str.contains("[workspace]"));
        assert!(toml_str.contains("[export]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.workspace.branch, "graded");
    }
}
