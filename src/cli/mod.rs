//! CLI module for the `persona-decide` binary.
//!
//! Commands:
//!
//! ```text
//! persona-decide decide   --spec FILE --intent LABEL [--text TEXT] [--channel owner_facing|public_facing] [--config FILE]
//! persona-decide migrate  --spec FILE
//! persona-decide validate --spec FILE
//! persona-decide check    --spec FILE --intent LABEL [--text TEXT] [--runs N] [--config FILE]
//! persona-decide version
//! ```
//!
//! Every command prints JSON on stdout.

use std::path::PathBuf;

use serde_json::json;
use thiserror::Error;

use crate::consistency;
use crate::decision::{DecisionConfig, DecisionEngine, QueryContext};
use crate::migration;
use crate::spec::error::SpecError;
use crate::spec::legacy::PersonaSpec;
use crate::spec::model::{Channel, PersonaSpecV2};
use crate::spec::validation;

/// Default thread count for `check`.
const DEFAULT_RUNS: usize = 8;

/// Available CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    /// Decide a query against a spec.
    Decide,
    /// Migrate a legacy spec to v2.
    Migrate,
    /// Validate a spec of either schema.
    Validate,
    /// Decide repeatedly on parallel threads and compare digests.
    Check,
    /// Show version information.
    Version,
}

impl std::fmt::Display for CliCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decide => write!(f, "decide"),
            Self::Migrate => write!(f, "migrate"),
            Self::Validate => write!(f, "validate"),
            Self::Check => write!(f, "check"),
            Self::Version => write!(f, "version"),
        }
    }
}

/// Parse a CLI command from a string.
pub fn parse_command(cmd: &str) -> Option<CliCommand> {
    match cmd {
        "decide" => Some(CliCommand::Decide),
        "migrate" => Some(CliCommand::Migrate),
        "validate" => Some(CliCommand::Validate),
        "check" => Some(CliCommand::Check),
        "version" | "--version" | "-v" => Some(CliCommand::Version),
        _ => None,
    }
}

/// Command-line usage errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing required option --{0}")]
    MissingOption(&'static str),

    #[error("Option {0} expects a value")]
    MissingValue(String),

    #[error("Invalid value for {option}: {value}")]
    InvalidValue { option: String, value: String },

    #[error("Unexpected argument: {0}")]
    Unexpected(String),
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: CliCommand,
    pub spec: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub intent: Option<String>,
    pub text: String,
    pub channel: Option<Channel>,
    pub runs: usize,
}

impl CliArgs {
    fn new(command: CliCommand) -> Self {
        Self {
            command,
            spec: None,
            config: None,
            intent: None,
            text: String::new(),
            channel: None,
            runs: DEFAULT_RUNS,
        }
    }

    fn require_spec(&self) -> Result<&PathBuf, CliError> {
        self.spec.as_ref().ok_or(CliError::MissingOption("spec"))
    }

    fn query(&self) -> Result<QueryContext, CliError> {
        let intent = self.intent.as_ref().ok_or(CliError::MissingOption("intent"))?;
        let mut query = QueryContext::new(intent.clone(), self.text.clone());
        query.channel = self.channel;
        Ok(query)
    }
}

fn parse_channel(value: &str) -> Option<Channel> {
    match value {
        "owner_facing" | "owner" => Some(Channel::OwnerFacing),
        "public_facing" | "public" => Some(Channel::PublicFacing),
        _ => None,
    }
}

/// Parse arguments (without the program name).
pub fn parse_args<I>(args: I) -> Result<CliArgs, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = match args.next() {
        Some(cmd) => parse_command(&cmd).ok_or(CliError::UnknownCommand(cmd))?,
        None => CliCommand::Version,
    };
    let mut parsed = CliArgs::new(command);

    while let Some(flag) = args.next() {
        let mut value = || args.next().ok_or_else(|| CliError::MissingValue(flag.clone()));
        match flag.as_str() {
            "--spec" => parsed.spec = Some(PathBuf::from(value()?)),
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--intent" => parsed.intent = Some(value()?),
            "--text" => parsed.text = value()?,
            "--channel" => {
                let raw = value()?;
                parsed.channel = Some(parse_channel(&raw).ok_or_else(|| CliError::InvalidValue {
                    option: flag.clone(),
                    value: raw.clone(),
                })?);
            }
            "--runs" => {
                let raw = value()?;
                parsed.runs = raw
                    .parse()
                    .ok()
                    .filter(|&n: &usize| n > 0)
                    .ok_or_else(|| CliError::InvalidValue {
                        option: flag.clone(),
                        value: raw.clone(),
                    })?;
            }
            _ => return Err(CliError::Unexpected(flag)),
        }
    }
    Ok(parsed)
}

/// Load a spec document and bring it to v2, migrating legacy documents.
pub fn load_current_spec(doc: &PersonaSpec) -> Result<PersonaSpecV2, SpecError> {
    let result = migration::migrate(doc)?;
    if result.migrated && !result.is_complete() {
        log::warn!(
            "legacy spec '{}' migrated with gaps: {}",
            doc.spec_id(),
            result.incomplete_fields.join(", ")
        );
    }
    Ok(result.spec)
}

fn engine_for(args: &CliArgs) -> anyhow::Result<DecisionEngine> {
    let config = match &args.config {
        Some(path) => DecisionConfig::from_yaml_file(path)?,
        None => DecisionConfig::default(),
    };
    Ok(DecisionEngine::new(config)?)
}

/// Execute a parsed command and return its JSON output.
pub fn run(args: &CliArgs) -> anyhow::Result<String> {
    let output = match args.command {
        CliCommand::Version => json!({ "version": crate::VERSION }),
        CliCommand::Migrate => {
            let doc = PersonaSpec::from_file(args.require_spec()?)?;
            serde_json::to_value(migration::migrate(&doc)?)?
        }
        CliCommand::Validate => {
            let doc = PersonaSpec::from_file(args.require_spec()?)?;
            match validation::validate_document(&doc) {
                Ok(()) => json!({ "valid": true, "schema_version": doc.schema_version() }),
                Err(SpecError::SchemaViolation { violations }) => json!({
                    "valid": false,
                    "schema_version": doc.schema_version(),
                    "violations": violations,
                }),
                Err(other) => return Err(other.into()),
            }
        }
        CliCommand::Decide => {
            let query = args.query()?;
            let engine = engine_for(args)?;
            let spec = load_current_spec(&PersonaSpec::from_file(args.require_spec()?)?)?;
            serde_json::to_value(engine.decide_validated(&spec, &query)?)?
        }
        CliCommand::Check => {
            let query = args.query()?;
            let engine = engine_for(args)?;
            let spec = load_current_spec(&PersonaSpec::from_file(args.require_spec()?)?)?;
            let report = consistency::check_concurrent(&engine, &spec, &query, args.runs)?;
            json!({
                "consistent": report.is_consistent(),
                "runs": report.runs,
                "digests": report.digests,
            })
        }
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::legacy::PersonaSpecV1;
    use crate::spec::model::tests::{fixed_time, sample_spec};

    fn args(list: &[&str]) -> Result<CliArgs, CliError> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("decide"), Some(CliCommand::Decide));
        assert_eq!(parse_command("-v"), Some(CliCommand::Version));
        assert_eq!(parse_command("train"), None);
        assert_eq!(CliCommand::Check.to_string(), "check");
    }

    #[test]
    fn test_parse_decide_args() {
        let parsed = args(&[
            "decide", "--spec", "p.yaml", "--intent", "career_advice", "--text", "hi", "--channel",
            "public",
        ])
        .unwrap();
        assert_eq!(parsed.command, CliCommand::Decide);
        assert_eq!(parsed.spec, Some(PathBuf::from("p.yaml")));
        assert_eq!(parsed.channel, Some(Channel::PublicFacing));
        assert_eq!(parsed.query().unwrap().intent, "career_advice");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(args(&["fly"]).unwrap_err(), CliError::UnknownCommand("fly".into()));
        assert_eq!(
            args(&["decide", "--spec"]).unwrap_err(),
            CliError::MissingValue("--spec".into())
        );
        assert!(matches!(
            args(&["check", "--runs", "0"]).unwrap_err(),
            CliError::InvalidValue { .. }
        ));
        assert!(matches!(
            args(&["decide", "--channel", "both"]).unwrap_err(),
            CliError::InvalidValue { .. }
        ));
        assert_eq!(args(&["decide", "extra"]).unwrap_err(), CliError::Unexpected("extra".into()));
        assert_eq!(
            args(&["decide"]).unwrap().query().unwrap_err(),
            CliError::MissingOption("intent")
        );
        assert_eq!(args(&[]).unwrap().command, CliCommand::Version);
    }

    #[test]
    fn test_decide_on_legacy_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        let v1 = PersonaSpecV1::new(
            "legacy-1",
            "tenant-a",
            "Mara",
            "I am a career coach. Pragmatic.",
            fixed_time(),
        )
        .with_specialization("coaching");
        std::fs::write(&path, serde_json::to_string(&v1).unwrap()).unwrap();

        let parsed = args(&[
            "decide",
            "--spec",
            path.to_str().unwrap(),
            "--intent",
            "career_advice",
            "--text",
            "how do I grow?",
        ])
        .unwrap();
        let out: serde_json::Value = serde_json::from_str(&run(&parsed).unwrap()).unwrap();
        assert_eq!(out["spec_id"], "legacy-1");
        assert_eq!(out["spec_version"]["patch"], 1);
        assert_eq!(out["safety"]["blocked"], false);
    }

    #[test]
    fn test_validate_reports_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        let mut spec = sample_spec();
        spec.identity.role = String::new();
        std::fs::write(&path, spec.to_yaml().unwrap()).unwrap();

        let parsed = args(&["validate", "--spec", path.to_str().unwrap()]).unwrap();
        let out: serde_json::Value = serde_json::from_str(&run(&parsed).unwrap()).unwrap();
        assert_eq!(out["valid"], false);
        assert_eq!(out["violations"][0]["field"], "identity.role");
    }

    #[test]
    fn test_check_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("spec.yaml");
        let config_path = dir.path().join("scoring.yaml");
        std::fs::write(&spec_path, sample_spec().to_yaml().unwrap()).unwrap();
        std::fs::write(&config_path, "high_floor: 20\n").unwrap();

        let parsed = args(&[
            "check",
            "--spec",
            spec_path.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
            "--intent",
            "chat",
            "--runs",
            "4",
        ])
        .unwrap();
        let out: serde_json::Value = serde_json::from_str(&run(&parsed).unwrap()).unwrap();
        assert_eq!(out["consistent"], true);
        assert_eq!(out["runs"], 4);
    }
}
