//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::forge::Credentials;
use crate::report::ExportFormat;
use crate::scanner::AmbiguityPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ClassGrader - grading helper for GitHub Classroom assignments
///
/// Clone student repositories into a grading workspace, collect the
/// scores recorded in their grade files, and push the graded branches
/// back to GitHub.
///
/// Examples:
///   classgrader clone --org ist256 --filter lesson1
///   classgrader export --base ~/ist256 --output lesson1.csv
///   classgrader push --message "Lesson 1 graded"
///   classgrader init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .classgrader.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Clone student repositories and set them up for grading
    Clone(CloneArgs),

    /// Commit and push every graded repository in the workspace
    Push(PushArgs),

    /// Collect grades from the workspace into a grade roster
    Export(ExportArgs),

    /// Generate a default .classgrader.toml configuration file
    InitConfig,
}

/// GitHub connection settings shared by commands that talk to the API.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ForgeArgs {
    /// GitHub organization hosting the assignment repositories
    #[arg(long, value_name = "ORG", env = "CLASSGRADER_ORG")]
    pub org: Option<String>,

    /// GitHub personal access token
    #[arg(long, env = "CLASSGRADER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub username (with --password, instead of a token)
    #[arg(long, env = "CLASSGRADER_USERNAME", conflicts_with = "token")]
    pub username: Option<String>,

    /// GitHub password or token for --username
    #[arg(long, env = "CLASSGRADER_PASSWORD", hide_env_values = true, requires = "username")]
    pub password: Option<String>,

    /// GitHub REST API root (for GitHub Enterprise)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

impl ForgeArgs {
    /// Credentials from the token or the username/password pair.
    pub fn credentials(&self) -> Option<Credentials> {
        if let Some(ref token) = self.token {
            return Some(Credentials::Token(token.clone()));
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct CloneArgs {
    /// Only clone repositories whose clone URL contains this text
    ///
    /// Usually the assignment prefix, e.g. "lesson1"
    #[arg(short, long, value_name = "TEXT")]
    pub filter: Option<String>,

    /// Directory to clone into (default: ~/ist256)
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Branch to create for grading
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Grading template to seed instead of the built-in rubric
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Name of the grade file seeded into each repository
    #[arg(long, value_name = "NAME")]
    pub grade_file: Option<String>,

    /// List the matching repositories without cloning
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub forge: ForgeArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PushArgs {
    /// Commit message for the graded work
    #[arg(short, long)]
    pub message: String,

    /// Directory containing the cloned repositories (default: ~/ist256)
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Branch to push
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    #[command(flatten)]
    pub forge: ForgeArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// Directory containing the submission folders (default: ~/ist256)
    #[arg(short, long, value_name = "DIR")]
    pub base: Option<PathBuf>,

    /// Roster file mapping student ids to GitHub usernames
    #[arg(short, long, value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Output file for the grade roster
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (csv, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ExportFormat>,

    /// What to do when a username matches several folders
    #[arg(long, value_name = "POLICY")]
    pub ambiguity: Option<AmbiguityPolicy>,

    /// Name of the grade file inside each submission
    #[arg(long, value_name = "NAME")]
    pub grade_file: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Clone(clone) => {
                if let Some(ref filter) = clone.filter {
                    if filter.trim().is_empty() {
                        return Err("Filter must not be empty".to_string());
                    }
                }
                if let Some(ref api_url) = clone.forge.api_url {
                    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                        return Err("API URL must start with 'http://' or 'https://'".to_string());
                    }
                }
            }
            Command::Push(push) => {
                if push.message.trim().is_empty() {
                    return Err("Commit message must not be empty".to_string());
                }
            }
            Command::Export(export) => {
                if let Some(ref base) = export.base {
                    if !base.is_dir() {
                        return Err(format!(
                            "Submissions directory does not exist: {}",
                            base.display()
                        ));
                    }
                }
            }
            Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_export() {
        let args = parse(&[
            "classgrader",
            "export",
            "--roster",
            "students.csv",
            "--format",
            "json",
            "--ambiguity",
            "error",
        ]);
        match args.command {
            Command::Export(export) => {
                assert_eq!(export.roster, Some(PathBuf::from("students.csv")));
                assert_eq!(export.format, Some(ExportFormat::Json));
                assert_eq!(export.ambiguity, Some(AmbiguityPolicy::Error));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_push_requires_message() {
        assert!(Args::try_parse_from(["classgrader", "push"]).is_err());
    }

    #[test]
    fn test_validation_empty_message() {
        let args = parse(&["classgrader", "push", "--message", "  "]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_base() {
        let args = parse(&["classgrader", "export", "--base", "/definitely/not/here"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["classgrader", "-v", "-q", "init-config"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_credentials_from_token() {
        let forge = ForgeArgs {
            token: Some("ghp_abc".to_string()),
            ..Default::default()
        };
        assert!(matches!(forge.credentials(), Some(Credentials::Token(t)) if t == "ghp_abc"));
    }

    #[test]
    fn test_credentials_from_username_password() {
        let forge = ForgeArgs {
            username: Some("prof".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            forge.credentials(),
            Some(Credentials::Basic { ref username, .. }) if username == "prof"
        ));
        assert!(ForgeArgs::default().credentials().is_none());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["classgrader", "init-config"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
