pub mod models;

use crate::cli::{CorrespondenceOverrides, EngineOverrides, MergeOverrides, RelaxationOverrides};
use crate::error::{CliError, Result};
use ligmerge::engine::config as core_config;
use ligmerge::engine::oracle::DEFAULT_PROXIMITY_CUTOFF;
use models::OracleChoice;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const INLINE_ATOM_TYPES: &str = "inline";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialMergeConfig {
    molecule_name: Option<String>,
    dummy_type_prefix: Option<String>,
    dummy_name_marker: Option<String>,
    /// `"inline"`, or the name of the companion atom-types file.
    atom_types: Option<String>,
    restraint_include: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialCorrespondenceConfig {
    mapping: Option<PathBuf>,
    proximity_cutoff: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEngineConfig {
    binary: Option<PathBuf>,
    /// 0 disables the limit.
    timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialShiftTarget {
    Coordinates,
    BoxVectors,
}

impl From<PartialShiftTarget> for core_config::ShiftTarget {
    fn from(p: PartialShiftTarget) -> Self {
        match p {
            PartialShiftTarget::Coordinates => core_config::ShiftTarget::Coordinates,
            PartialShiftTarget::BoxVectors => core_config::ShiftTarget::BoxVectors,
        }
    }
}

impl FromStr for PartialShiftTarget {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "coordinates" => Ok(Self::Coordinates),
            "box-vectors" => Ok(Self::BoxVectors),
            _ => Err(()),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRelaxationConfig {
    shift_nm: Option<f64>,
    shift_target: Option<PartialShiftTarget>,
    run_stem: Option<String>,
    max_warnings: Option<u32>,
    update_hybrid_coordinates: Option<bool>,
    clean_intermediates: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    merge: Option<PartialMergeConfig>,
    correspondence: Option<PartialCorrespondenceConfig>,
    engine: Option<PartialEngineConfig>,
    relaxation: Option<PartialRelaxationConfig>,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if let Some(correspondence) = &mut config.correspondence {
            if correspondence.mapping.is_some() && correspondence.proximity_cutoff.is_some() {
                return Err(CliError::Config(
                    "`correspondence.mapping` and `correspondence.proximity-cutoff` are mutually exclusive."
                        .to_string(),
                ));
            }
            if let (Some(mapping), Some(base)) = (&mut correspondence.mapping, path.parent()) {
                if mapping.is_relative() {
                    *mapping = base.join(&*mapping);
                }
            }
        }
        Ok(config)
    }

    /// Loads the config file when one is given, then applies the `--set` overrides.
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_set_values(set_values)?;
        Ok(config)
    }

    pub fn merge_config(&self, cli: &MergeOverrides) -> Result<core_config::MergeConfig> {
        let file = self.merge.clone().unwrap_or_default();
        let mut builder = core_config::MergeConfigBuilder::new();

        if let Some(name) = cli.molecule_name.clone().or(file.molecule_name) {
            builder = builder.molecule_name(name);
        }
        if let Some(prefix) = file.dummy_type_prefix {
            builder = builder.dummy_type_prefix(prefix);
        }
        if let Some(marker) = file.dummy_name_marker {
            builder = builder.dummy_name_marker(marker);
        }
        if cli.inline_atom_types {
            builder = builder.atom_types(core_config::AtomTypesPlacement::Inline);
        } else if let Some(atom_types) = file.atom_types {
            builder = builder.atom_types(if atom_types == INLINE_ATOM_TYPES {
                core_config::AtomTypesPlacement::Inline
            } else {
                core_config::AtomTypesPlacement::Companion(atom_types)
            });
        }
        if let Some(include) = file.restraint_include {
            builder = builder.restraint_include(include);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn oracle_choice(&self, cli: &CorrespondenceOverrides) -> Result<OracleChoice> {
        let file = self.correspondence.clone().unwrap_or_default();
        let choice = if let Some(mapping) = &cli.mapping {
            OracleChoice::Mapping(mapping.clone())
        } else if let Some(cutoff) = cli.proximity_cutoff {
            OracleChoice::Proximity { cutoff }
        } else if let Some(mapping) = file.mapping {
            OracleChoice::Mapping(mapping)
        } else {
            OracleChoice::Proximity {
                cutoff: file.proximity_cutoff.unwrap_or(DEFAULT_PROXIMITY_CUTOFF),
            }
        };

        if let OracleChoice::Proximity { cutoff } = choice {
            if !cutoff.is_finite() || cutoff <= 0.0 {
                return Err(CliError::Config(format!(
                    "Proximity cutoff must be a positive number, got {}.",
                    cutoff
                )));
            }
        }
        Ok(choice)
    }

    pub fn relaxation_config(
        &self,
        cli: &RelaxationOverrides,
    ) -> Result<core_config::RelaxationConfig> {
        let file = self.relaxation.clone().unwrap_or_default();
        let mut builder = core_config::RelaxationConfigBuilder::new();

        if let Some(shift) = cli.shift.or(file.shift_nm) {
            builder = builder.shift_nm(shift);
        }
        if let Some(target) = file.shift_target {
            builder = builder.shift_target(target.into());
        }
        if let Some(stem) = file.run_stem {
            builder = builder.run_stem(stem);
        }
        if let Some(n) = file.max_warnings {
            builder = builder.max_warnings(n);
        }
        if cli.no_update_hybrid {
            builder = builder.update_hybrid_coordinates(false);
        } else if let Some(update) = file.update_hybrid_coordinates {
            builder = builder.update_hybrid_coordinates(update);
        }
        if cli.keep_intermediates {
            builder = builder.clean_intermediates(false);
        } else if let Some(clean) = file.clean_intermediates {
            builder = builder.clean_intermediates(clean);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn engine_settings(&self, cli: &EngineOverrides) -> Result<core_config::EngineSettings> {
        let file = self.engine.clone().unwrap_or_default();
        let mut builder = core_config::EngineSettingsBuilder::new();

        if let Some(binary) = cli.gmx.clone().or(file.binary) {
            builder = builder.binary(binary);
        }
        if let Some(seconds) = cli.timeout.or(file.timeout_seconds) {
            builder = builder.timeout((seconds > 0).then(|| Duration::from_secs(seconds)));
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "merge.molecule-name" => {
                    self.merge_mut().molecule_name = Some(value_str.to_string());
                }
                "merge.dummy-type-prefix" => {
                    self.merge_mut().dummy_type_prefix = Some(value_str.to_string());
                }
                "merge.dummy-name-marker" => {
                    self.merge_mut().dummy_name_marker = Some(value_str.to_string());
                }
                "merge.atom-types" => {
                    self.merge_mut().atom_types = Some(value_str.to_string());
                }
                "merge.restraint-include" => {
                    self.merge_mut().restraint_include = Some(value_str.to_string());
                }
                "correspondence.mapping" => {
                    let correspondence = self.correspondence_mut();
                    correspondence.mapping = Some(PathBuf::from(value_str));
                    correspondence.proximity_cutoff = None;
                }
                "correspondence.proximity-cutoff" => {
                    let cutoff: f64 = parse_value(key, value_str, "float")?;
                    let correspondence = self.correspondence_mut();
                    correspondence.proximity_cutoff = Some(cutoff);
                    correspondence.mapping = None;
                }
                "engine.binary" => {
                    self.engine_mut().binary = Some(PathBuf::from(value_str));
                }
                "engine.timeout-seconds" => {
                    self.engine_mut().timeout_seconds = Some(parse_value(key, value_str, "integer")?);
                }
                "relaxation.shift-nm" => {
                    self.relaxation_mut().shift_nm = Some(parse_value(key, value_str, "float")?);
                }
                "relaxation.shift-target" => {
                    let target: PartialShiftTarget = value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid value for {}: {}. Expected 'coordinates' or 'box-vectors'.",
                            key, value_str
                        ))
                    })?;
                    self.relaxation_mut().shift_target = Some(target);
                }
                "relaxation.run-stem" => {
                    self.relaxation_mut().run_stem = Some(value_str.to_string());
                }
                "relaxation.max-warnings" => {
                    self.relaxation_mut().max_warnings =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "relaxation.update-hybrid-coordinates" => {
                    self.relaxation_mut().update_hybrid_coordinates =
                        Some(parse_value(key, value_str, "boolean")?);
                }
                "relaxation.clean-intermediates" => {
                    self.relaxation_mut().clean_intermediates =
                        Some(parse_value(key, value_str, "boolean")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn merge_mut(&mut self) -> &mut PartialMergeConfig {
        self.merge.get_or_insert_with(Default::default)
    }

    fn correspondence_mut(&mut self) -> &mut PartialCorrespondenceConfig {
        self.correspondence.get_or_insert_with(Default::default)
    }

    fn engine_mut(&mut self) -> &mut PartialEngineConfig {
        self.engine.get_or_insert_with(Default::default)
    }

    fn relaxation_mut(&mut self) -> &mut PartialRelaxationConfig {
        self.relaxation.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ligmerge::engine::config::{AtomTypesPlacement, ShiftTarget};
    use std::fs;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
[merge]
molecule-name = "LIG"
atom-types = "inline"

[correspondence]
mapping = "maps/a-b.csv"

[engine]
binary = "/opt/gromacs/bin/gmx"
timeout-seconds = 0

[relaxation]
shift-nm = 8.0
shift-target = "box-vectors"
max-warnings = 2
clean-intermediates = false
"#;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("ligmerge.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn set(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_file_yields_library_defaults() {
        let config = PartialConfig::load(None, &[]).unwrap();

        assert_eq!(
            config.merge_config(&MergeOverrides::default()).unwrap(),
            core_config::MergeConfig::default()
        );
        assert_eq!(
            config
                .relaxation_config(&RelaxationOverrides::default())
                .unwrap(),
            core_config::RelaxationConfig::default()
        );
        assert_eq!(
            config.engine_settings(&EngineOverrides::default()).unwrap(),
            core_config::EngineSettings::default()
        );
        assert_eq!(
            config
                .oracle_choice(&CorrespondenceOverrides::default())
                .unwrap(),
            OracleChoice::Proximity {
                cutoff: DEFAULT_PROXIMITY_CUTOFF
            }
        );
    }

    #[test]
    fn file_values_are_loaded_and_paths_resolved() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), CONFIG);
        let config = PartialConfig::load(Some(&path), &[]).unwrap();

        let merge = config.merge_config(&MergeOverrides::default()).unwrap();
        assert_eq!(merge.molecule_name, "LIG");
        assert_eq!(merge.atom_types, AtomTypesPlacement::Inline);

        let relaxation = config
            .relaxation_config(&RelaxationOverrides::default())
            .unwrap();
        assert_eq!(relaxation.shift_nm, 8.0);
        assert_eq!(relaxation.shift_target, ShiftTarget::BoxVectors);
        assert_eq!(relaxation.max_warnings, 2);
        assert!(!relaxation.clean_intermediates);
        assert!(relaxation.update_hybrid_coordinates);

        let engine = config.engine_settings(&EngineOverrides::default()).unwrap();
        assert_eq!(engine.binary, PathBuf::from("/opt/gromacs/bin/gmx"));
        assert_eq!(engine.timeout, None);

        assert_eq!(
            config
                .oracle_choice(&CorrespondenceOverrides::default())
                .unwrap(),
            OracleChoice::Mapping(dir.path().join("maps/a-b.csv"))
        );
    }

    #[test]
    fn cli_beats_set_values_which_beat_the_file() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), CONFIG);
        let config = PartialConfig::load(
            Some(&path),
            &set(&["relaxation.shift-nm=12.5", "merge.molecule-name=SET"]),
        )
        .unwrap();

        let relaxation = config
            .relaxation_config(&RelaxationOverrides::default())
            .unwrap();
        assert_eq!(relaxation.shift_nm, 12.5);

        let relaxation = config
            .relaxation_config(&RelaxationOverrides {
                shift: Some(3.0),
                keep_intermediates: false,
                no_update_hybrid: true,
            })
            .unwrap();
        assert_eq!(relaxation.shift_nm, 3.0);
        assert!(!relaxation.update_hybrid_coordinates);

        let merge = config
            .merge_config(&MergeOverrides {
                molecule_name: Some("CLI".to_string()),
                inline_atom_types: false,
            })
            .unwrap();
        assert_eq!(merge.molecule_name, "CLI");
        assert_eq!(
            config
                .merge_config(&MergeOverrides::default())
                .unwrap()
                .molecule_name,
            "SET"
        );
    }

    #[test]
    fn cli_correspondence_overrides_the_file_mapping() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), CONFIG);
        let config = PartialConfig::load(Some(&path), &[]).unwrap();

        let choice = config
            .oracle_choice(&CorrespondenceOverrides {
                mapping: None,
                proximity_cutoff: Some(0.8),
            })
            .unwrap();
        assert_eq!(choice, OracleChoice::Proximity { cutoff: 0.8 });
    }

    #[test]
    fn set_proximity_cutoff_replaces_file_mapping() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), CONFIG);
        let config =
            PartialConfig::load(Some(&path), &set(&["correspondence.proximity-cutoff=0.3"]))
                .unwrap();

        assert_eq!(
            config
                .oracle_choice(&CorrespondenceOverrides::default())
                .unwrap(),
            OracleChoice::Proximity { cutoff: 0.3 }
        );
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[merge]\nmolecule = \"LIG\"\n");
        assert!(matches!(
            PartialConfig::load(Some(&path), &[]),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn both_correspondence_sources_in_file_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[correspondence]\nmapping = \"a.csv\"\nproximity-cutoff = 0.5\n",
        );
        assert!(matches!(
            PartialConfig::load(Some(&path), &[]),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in [
            "relaxation.shift-nm",
            "relaxation.shift-nm=ten",
            "relaxation.shift-target=sideways",
            "engine.colour=blue",
        ] {
            let result = PartialConfig::load(None, &set(&[bad]));
            assert!(matches!(result, Err(CliError::Config(_))), "accepted {bad}");
        }
    }

    #[test]
    fn invalid_values_surface_library_validation() {
        let config = PartialConfig::load(None, &set(&["merge.molecule-name=MY MOL"])).unwrap();
        assert!(matches!(
            config.merge_config(&MergeOverrides::default()),
            Err(CliError::Config(_))
        ));

        let config =
            PartialConfig::load(None, &set(&["correspondence.proximity-cutoff=-1"])).unwrap();
        assert!(matches!(
            config.oracle_choice(&CorrespondenceOverrides::default()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn positive_timeout_is_converted_to_a_duration() {
        let config = PartialConfig::load(None, &set(&["engine.timeout-seconds=90"])).unwrap();
        let engine = config.engine_settings(&EngineOverrides::default()).unwrap();
        assert_eq!(engine.timeout, Some(Duration::from_secs(90)));
    }
}
