use ligmerge::engine::oracle::{
    AtomCorrespondenceOracle, MappingFileCorrespondence, ProximityCorrespondence,
};
use std::path::PathBuf;

/// The correspondence oracle selected by the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleChoice {
    Mapping(PathBuf),
    Proximity { cutoff: f64 },
}

impl OracleChoice {
    pub fn build(&self) -> Box<dyn AtomCorrespondenceOracle> {
        match self {
            OracleChoice::Mapping(path) => Box::new(MappingFileCorrespondence::new(path.clone())),
            OracleChoice::Proximity { cutoff } => Box::new(ProximityCorrespondence::new(*cutoff)),
        }
    }
}

impl std::fmt::Display for OracleChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleChoice::Mapping(path) => write!(f, "mapping file {}", path.display()),
            OracleChoice::Proximity { cutoff } => write!(f, "proximity (cutoff {cutoff} A)"),
        }
    }
}
