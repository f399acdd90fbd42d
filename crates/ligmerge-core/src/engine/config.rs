use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Where the `[ atomtypes ]` block of the merged ligand is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomTypesPlacement {
    /// A companion file with this name next to the merged topology.
    Companion(String),
    /// At the top of the merged topology itself.
    Inline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub molecule_name: String,
    pub dummy_type_prefix: String,
    pub dummy_name_marker: String,
    pub atom_types: AtomTypesPlacement,
    pub restraint_include: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            molecule_name: "MOL".to_string(),
            dummy_type_prefix: "DUM_".to_string(),
            dummy_name_marker: "D".to_string(),
            atom_types: AtomTypesPlacement::Companion("ffMOL.itp".to_string()),
            restraint_include: "posre_Ligand.itp".to_string(),
        }
    }
}

#[derive(Default)]
pub struct MergeConfigBuilder {
    molecule_name: Option<String>,
    dummy_type_prefix: Option<String>,
    dummy_name_marker: Option<String>,
    atom_types: Option<AtomTypesPlacement>,
    restraint_include: Option<String>,
}

impl MergeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn molecule_name(mut self, name: impl Into<String>) -> Self {
        self.molecule_name = Some(name.into());
        self
    }
    pub fn dummy_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dummy_type_prefix = Some(prefix.into());
        self
    }
    pub fn dummy_name_marker(mut self, marker: impl Into<String>) -> Self {
        self.dummy_name_marker = Some(marker.into());
        self
    }
    pub fn atom_types(mut self, placement: AtomTypesPlacement) -> Self {
        self.atom_types = Some(placement);
        self
    }
    pub fn restraint_include(mut self, file_name: impl Into<String>) -> Self {
        self.restraint_include = Some(file_name.into());
        self
    }

    pub fn build(self) -> Result<MergeConfig, ConfigError> {
        let defaults = MergeConfig::default();
        let config = MergeConfig {
            molecule_name: self.molecule_name.unwrap_or(defaults.molecule_name),
            dummy_type_prefix: self.dummy_type_prefix.unwrap_or(defaults.dummy_type_prefix),
            dummy_name_marker: self.dummy_name_marker.unwrap_or(defaults.dummy_name_marker),
            atom_types: self.atom_types.unwrap_or(defaults.atom_types),
            restraint_include: self.restraint_include.unwrap_or(defaults.restraint_include),
        };

        require_token("molecule_name", &config.molecule_name)?;
        require_token("dummy_type_prefix", &config.dummy_type_prefix)?;
        if config.dummy_name_marker.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidParameter {
                name: "dummy_name_marker",
                reason: "must not contain whitespace".to_string(),
            });
        }
        if let AtomTypesPlacement::Companion(name) = &config.atom_types {
            require_token("atom_types", name)?;
        }
        require_token("restraint_include", &config.restraint_include)?;
        Ok(config)
    }
}

fn require_token(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must not be empty".to_string(),
        })
    } else if value.chars().any(char::is_whitespace) {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must not contain whitespace".to_string(),
        })
    } else {
        Ok(())
    }
}

/// What the relaxation shift moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftTarget {
    /// Every atom position of the hybrid ligand.
    #[default]
    Coordinates,
    /// The diagonal of the box-vector line, leaving positions unchanged.
    BoxVectors,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationConfig {
    /// Offset in nm applied before the relaxation and removed after it.
    pub shift_nm: f64,
    pub shift_target: ShiftTarget,
    /// File stem of the engine's run artifacts (`<stem>.tpr`, `<stem>.gro`, ...).
    pub run_stem: String,
    pub max_warnings: u32,
    /// Whether the relaxed, unshifted ligand replaces the hybrid coordinate file.
    pub update_hybrid_coordinates: bool,
    pub clean_intermediates: bool,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            shift_nm: 10.0,
            shift_target: ShiftTarget::Coordinates,
            run_stem: "merged_relax".to_string(),
            max_warnings: 0,
            update_hybrid_coordinates: true,
            clean_intermediates: true,
        }
    }
}

#[derive(Default)]
pub struct RelaxationConfigBuilder {
    shift_nm: Option<f64>,
    shift_target: Option<ShiftTarget>,
    run_stem: Option<String>,
    max_warnings: Option<u32>,
    update_hybrid_coordinates: Option<bool>,
    clean_intermediates: Option<bool>,
}

impl RelaxationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shift_nm(mut self, offset: f64) -> Self {
        self.shift_nm = Some(offset);
        self
    }
    pub fn shift_target(mut self, target: ShiftTarget) -> Self {
        self.shift_target = Some(target);
        self
    }
    pub fn run_stem(mut self, stem: impl Into<String>) -> Self {
        self.run_stem = Some(stem.into());
        self
    }
    pub fn max_warnings(mut self, n: u32) -> Self {
        self.max_warnings = Some(n);
        self
    }
    pub fn update_hybrid_coordinates(mut self, update: bool) -> Self {
        self.update_hybrid_coordinates = Some(update);
        self
    }
    pub fn clean_intermediates(mut self, clean: bool) -> Self {
        self.clean_intermediates = Some(clean);
        self
    }

    pub fn build(self) -> Result<RelaxationConfig, ConfigError> {
        let defaults = RelaxationConfig::default();
        let config = RelaxationConfig {
            shift_nm: self.shift_nm.unwrap_or(defaults.shift_nm),
            shift_target: self.shift_target.unwrap_or(defaults.shift_target),
            run_stem: self.run_stem.unwrap_or(defaults.run_stem),
            max_warnings: self.max_warnings.unwrap_or(defaults.max_warnings),
            update_hybrid_coordinates: self
                .update_hybrid_coordinates
                .unwrap_or(defaults.update_hybrid_coordinates),
            clean_intermediates: self
                .clean_intermediates
                .unwrap_or(defaults.clean_intermediates),
        };
        if !config.shift_nm.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "shift_nm",
                reason: "must be a finite number".to_string(),
            });
        }
        require_token("run_stem", &config.run_stem)?;
        if config.run_stem.contains(['/', '\\']) {
            return Err(ConfigError::InvalidParameter {
                name: "run_stem",
                reason: "must be a file stem, not a path".to_string(),
            });
        }
        Ok(config)
    }
}

/// How to reach the external MD engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub binary: PathBuf,
    /// Wall-clock limit for each subprocess call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("gmx"),
            timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

#[derive(Default)]
pub struct EngineSettingsBuilder {
    binary: Option<PathBuf>,
    timeout: Option<Option<Duration>>,
}

impl EngineSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<EngineSettings, ConfigError> {
        let defaults = EngineSettings::default();
        let settings = EngineSettings {
            binary: self.binary.unwrap_or(defaults.binary),
            timeout: self.timeout.unwrap_or(defaults.timeout),
        };
        if settings.binary.as_os_str().is_empty() {
            return Err(ConfigError::MissingParameter("binary"));
        }
        if settings.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidParameter {
                name: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(settings)
    }
}
