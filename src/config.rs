use crate::codegen::ValidationMode;
use crate::convention::DEFAULT_SUFFIX;
use crate::template::DEFAULT_FILE_NAME;
use anyhow::{Context, Result};
use clap::Parser;
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SOURCE_ROOT: &str = "src";
const DEFAULT_OUT_DIR: &str = "generated";
const DEFAULT_INCLUDE: &[&str] = &["**/*.rs"];
const DEFAULT_EXCLUDE: &[&str] = &["**/*.g.rs", "**/target/**"];

/// A custom template and the file name pattern of its output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub path: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

#[derive(Debug, Clone)]
pub struct CodegenConfig {
    pub source_roots: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub suffix: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Replaces the built-in template when non-empty
    pub templates: Vec<TemplateConfig>,
    pub validation: ValidationMode,
    pub format: bool,
    pub clean_orphans: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            source_roots: vec![PathBuf::from(DEFAULT_SOURCE_ROOT)],
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            suffix: DEFAULT_SUFFIX.to_string(),
            include: to_strings(DEFAULT_INCLUDE),
            exclude: to_strings(DEFAULT_EXCLUDE),
            templates: Vec::new(),
            validation: ValidationMode::Off,
            format: false,
            clean_orphans: true,
        }
    }
}

impl CodegenConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            source_roots: cli_source_roots,
            out_dir: cli_out_dir,
            suffix: cli_suffix,
            include: cli_include,
            exclude: cli_exclude,
            template: cli_template,
            validation: cli_validation,
            format: cli_format,
            keep_orphans: cli_keep_orphans,
            check: _,
            list: _,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            source_roots: file_source_roots,
            out_dir: file_out_dir,
            suffix: file_suffix,
            include: file_include,
            exclude: file_exclude,
            templates: file_templates,
            validation: file_validation,
            format: file_format,
            clean_orphans: file_clean_orphans,
        } = file_config;

        let defaults = Self::default();

        let source_roots = cli_source_roots
            .filter(|roots| !roots.is_empty())
            .or(file_source_roots)
            .unwrap_or(defaults.source_roots);

        let out_dir = cli_out_dir.or(file_out_dir).unwrap_or(defaults.out_dir);

        let suffix = cli_suffix.or(file_suffix).unwrap_or(defaults.suffix);

        let include = cli_include
            .or(file_include)
            .unwrap_or(defaults.include)
            .into_iter()
            .map(|pattern| pattern.trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect::<Vec<_>>();

        let exclude = cli_exclude
            .or(file_exclude)
            .unwrap_or(defaults.exclude)
            .into_iter()
            .map(|pattern| pattern.trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect::<Vec<_>>();

        let templates = match cli_template {
            Some(path) => vec![TemplateConfig {
                path,
                file_name: default_file_name(),
            }],
            None => file_templates.unwrap_or_default(),
        };

        let validation = cli_validation
            .or(file_validation)
            .unwrap_or(defaults.validation);

        let format = cli_format || file_format.unwrap_or(defaults.format);

        let clean_orphans = !cli_keep_orphans && file_clean_orphans.unwrap_or(defaults.clean_orphans);

        Ok(Self {
            source_roots,
            out_dir,
            suffix,
            include,
            exclude,
            templates,
            validation,
            format,
            clean_orphans,
        })
    }

    /// Fail fast on settings that would make every run a no-op or an error
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.suffix.is_empty(),
            "convention suffix must not be empty"
        );
        anyhow::ensure!(
            !self.source_roots.is_empty(),
            "at least one source root must be provided"
        );
        anyhow::ensure!(
            !self.include.is_empty(),
            "at least one include pattern must be provided"
        );
        for root in &self.source_roots {
            anyhow::ensure!(root.exists(), "source root {:?} does not exist", root);
        }
        for pattern in self.include.iter().chain(&self.exclude) {
            Glob::new(pattern).with_context(|| format!("invalid glob pattern {:?}", pattern))?;
        }
        for template in &self.templates {
            anyhow::ensure!(
                template.path.is_file(),
                "template {:?} is not a file",
                template.path
            );
            anyhow::ensure!(
                !template.file_name.is_empty(),
                "template {:?} has an empty file name pattern",
                template.path
            );
        }
        if self.out_dir.exists() {
            anyhow::ensure!(
                self.out_dir.is_dir(),
                "output path {:?} is not a directory",
                self.out_dir
            );
        }
        Ok(())
    }

    /// Resolve relative paths against `base`
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };
        self.source_roots = self.source_roots.into_iter().map(resolve).collect();
        self.out_dir = resolve(self.out_dir);
        self.templates = self
            .templates
            .into_iter()
            .map(|template| TemplateConfig {
                path: resolve(template.path),
                ..template
            })
            .collect();
        self
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "aggregen",
    about = "Generate aggregate root scaffolding from naming conventions",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML, JSON or TOML)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "source-root",
        env = "AGGREGEN_SOURCE_ROOTS",
        value_name = "DIR",
        value_delimiter = ',',
        help = "Directories (or files) to scan for declarations"
    )]
    pub source_roots: Option<Vec<PathBuf>>,

    #[arg(
        long,
        env = "AGGREGEN_OUT_DIR",
        value_name = "DIR",
        help = "Directory receiving generated files"
    )]
    pub out_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "AGGREGEN_SUFFIX",
        value_name = "SUFFIX",
        help = "Type name suffix marking generation triggers"
    )]
    pub suffix: Option<String>,

    #[arg(
        long,
        env = "AGGREGEN_INCLUDE",
        value_name = "GLOB",
        value_delimiter = ',',
        help = "Source file globs, relative to each root"
    )]
    pub include: Option<Vec<String>>,

    #[arg(
        long,
        env = "AGGREGEN_EXCLUDE",
        value_name = "GLOB",
        value_delimiter = ',',
        help = "Source file globs to skip"
    )]
    pub exclude: Option<Vec<String>>,

    #[arg(
        long,
        env = "AGGREGEN_TEMPLATE",
        value_name = "FILE",
        help = "Tera template replacing the built-in one"
    )]
    pub template: Option<PathBuf>,

    #[arg(
        long,
        env = "AGGREGEN_VALIDATION",
        value_enum,
        value_name = "MODE",
        help = "Check generated code with syn before writing (off, warn, deny)"
    )]
    pub validation: Option<ValidationMode>,

    #[arg(long, help = "Pretty-print generated code")]
    pub format: bool,

    #[arg(long, help = "Keep generated files whose trigger disappeared")]
    pub keep_orphans: bool,

    #[arg(long, help = "Fail if generated files are out of date instead of writing them")]
    pub check: bool,

    #[arg(long, help = "List triggers and their feature names without writing")]
    pub list: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    source_roots: Option<Vec<PathBuf>>,
    out_dir: Option<PathBuf>,
    suffix: Option<String>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    templates: Option<Vec<TemplateConfig>>,
    validation: Option<ValidationMode>,
    format: Option<bool>,
    clean_orphans: Option<bool>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
