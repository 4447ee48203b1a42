use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name looked up in the project root
pub const CONFIG_FILE_NAME: &str = "stackdoc.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub diagrams: DiagramConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub description: Option<String>,
}

/// Where the infrastructure sources live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Entry file that instantiates stacks and declares dependencies
    pub entry_file: PathBuf,
    /// Directory holding one file per stack
    pub stacks_dir: PathBuf,
    /// Glob matched against file names inside `stacks_dir`
    pub stack_pattern: String,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Optional JSON export of the full analysis
    pub export_json: Option<PathBuf>,
}

/// Diagram settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub enabled: bool,
    pub direction: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Infrastructure".to_string(),
            description: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            entry_file: PathBuf::from("app.py"),
            stacks_dir: PathBuf::from("infrastructure"),
            stack_pattern: "*_stack.py".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("docs"),
            export_json: None,
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: "TB".to_string(),
        }
    }
}

const DIRECTIONS: [&str; 5] = ["TB", "TD", "BT", "LR", "RL"];

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(Error::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        output: Option<PathBuf>,
        export_json: Option<PathBuf>,
        no_diagrams: bool,
    ) {
        if let Some(out) = output {
            self.output.directory = out;
        }

        if export_json.is_some() {
            self.output.export_json = export_json;
        }

        if no_diagrams {
            self.diagrams.enabled = false;
        }
    }

    /// Anchor relative source and output paths at the project root
    pub fn resolve(mut self, root: &Path) -> Self {
        self.source.entry_file = anchor(root, &self.source.entry_file);
        self.source.stacks_dir = anchor(root, &self.source.stacks_dir);
        self.output.directory = anchor(root, &self.output.directory);
        self.output.export_json = self.output.export_json.map(|p| anchor(root, &p));
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(Error::config_validation("project name must not be empty"));
        }

        if self.source.stack_pattern.trim().is_empty() {
            return Err(Error::config_validation("stack_pattern must not be empty"));
        }

        if glob::Pattern::new(&self.source.stack_pattern).is_err() {
            return Err(Error::config_validation(format!(
                "stack_pattern is not a valid glob: {}",
                self.source.stack_pattern
            )));
        }

        if !DIRECTIONS.contains(&self.diagrams.direction.as_str()) {
            return Err(Error::config_validation(format!(
                "diagram direction must be one of {}",
                DIRECTIONS.join(", ")
            )));
        }

        Ok(())
    }
}

fn anchor(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
