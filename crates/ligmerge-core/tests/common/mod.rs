#![allow(dead_code)]

use ligmerge::engine::md::{CapturedOutput, EnginePhase, ExternalEngineError, MdEngine, RunRequest};
use ligmerge::workflows::merge::{LigandFiles, MergeOutputs};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Ligand A: a chloroethanol fragment, 5 atoms.
pub const TOPOLOGY_A: &str = "\
; ligand A
[ atomtypes ]
;name   bond_type     mass     charge   ptype   sigma         epsilon
 c3       c3          0.00000  0.00000   A     3.39967e-01   4.57730e-01
 oh       oh          0.00000  0.00000   A     3.06647e-01   8.80314e-01
 ho       ho          0.00000  0.00000   A     0.00000e+00   0.00000e+00
 cl       cl          0.00000  0.00000   A     3.47094e-01   1.10876e+00

[ moleculetype ]
;name            nrexcl
 LGA              3

[ atoms ]
;   nr  type  resi  res  atom  cgnr     charge      mass
     1   c3     1   LGA    C1    1    -0.0400     12.01000
     2   c3     1   LGA    C2    2     0.1200     12.01000
     3   oh     1   LGA    O1    3    -0.6000     16.00000
     4   ho     1   LGA    H1    4     0.4000      1.00800
     5   cl     1   LGA   CL1    5     0.1200     35.45000

[ bonds ]
     1     2   1    1.5350e-01    2.5363e+05
     2     3   1    1.4260e-01    2.6284e+05
     3     4   1    9.7300e-02    3.1079e+05
     1     5   1    1.7860e-01    2.1355e+05

[ pairs ]
     1     4   1

[ angles ]
     1     2     3   1    1.0883e+02    5.6819e+02
     2     3     4   1    1.0816e+02    3.9414e+02
     5     1     2   1    1.1013e+02    5.5974e+02

[ dihedrals ]
     1     2     3     4   9     0.00   0.67   3
     5     1     2     3   9     0.00   1.30   3

#ifdef POSRES
#include \"posre_LGA.itp\"
#endif
";

/// Ligand B: the amine analogue, 6 atoms. Atoms 1-4 match A's.
pub const TOPOLOGY_B: &str = "\
[ atomtypes ]
 c3       c3          0.00000  0.00000   A     3.39967e-01   4.57730e-01
 oh       oh          0.00000  0.00000   A     3.06647e-01   8.80314e-01
 ho       ho          0.00000  0.00000   A     0.00000e+00   0.00000e+00
 n3       n3          0.00000  0.00000   A     3.25000e-01   7.11280e-01
 hn       hn          0.00000  0.00000   A     1.06908e-01   6.56888e-02

[ moleculetype ]
 LGB              3

[ atoms ]
     1   c3     1   LGB    C1    1     0.0200     12.01000
     2   c3     1   LGB    C2    2     0.1200     12.01000
     3   oh     1   LGB    O1    3    -0.6000     16.00000
     4   ho     1   LGB    H1    4     0.4000      1.00800
     5   n3     1   LGB    N1    5    -0.3000     14.01000
     6   hn     1   LGB    H2    6     0.3600      1.00800

[ bonds ]
     1     2   1    1.5350e-01    2.5363e+05
     2     3   1    1.4260e-01    2.6284e+05
     3     4   1    9.7300e-02    3.1079e+05
     1     5   1    1.4700e-01    2.6276e+05
     5     6   1    1.0180e-01    3.2627e+05

[ pairs ]
     1     4   1
     2     6   1

[ angles ]
     1     2     3   1    1.0883e+02    5.6819e+02
     2     3     4   1    1.0816e+02    3.9414e+02
     5     1     2   1    1.1038e+02    5.5807e+02
     6     5     1   1    1.0911e+02    4.0300e+02

[ dihedrals ]
     1     2     3     4   9     0.00   0.67   3
     5     1     2     3   9     0.00   0.65   3
     6     5     1     2   9     0.00   0.63   3
";

pub const STRUCTURE_A: &str = "\
@<TRIPOS>MOLECULE
LGA
    5     4     1     0     0
SMALL
bcc

@<TRIPOS>ATOM
      1 C1         -0.7500    0.0000    0.0000 c3         1 LGA      -0.0400
      2 C2          0.7500    0.0000    0.0000 c3         1 LGA       0.1200
      3 O1          1.2000    1.3400    0.0000 oh         1 LGA      -0.6000
      4 H1          2.1700    1.3400    0.0000 ho         1 LGA       0.4000
      5 CL1        -1.3500   -1.6500    0.0000 cl         1 LGA       0.1200
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
     3     3     4 1
     4     1     5 1
";

pub const STRUCTURE_B: &str = "\
@<TRIPOS>MOLECULE
LGB
    6     5     1     0     0
SMALL
bcc

@<TRIPOS>ATOM
      1 C1         -0.7500    0.0000    0.0000 c3         1 LGB       0.0200
      2 C2          0.7500    0.0000    0.0000 c3         1 LGB       0.1200
      3 O1          1.2000    1.3400    0.0000 oh         1 LGB      -0.6000
      4 H1          2.1700    1.3400    0.0000 ho         1 LGB       0.4000
      5 N1         -1.2500   -1.3900    0.0000 n3         1 LGB      -0.3000
      6 H2         -2.2600   -1.3900    0.0000 hn         1 LGB       0.3600
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
     3     3     4 1
     4     1     5 1
     5     5     6 1
";

pub const COORDINATES_A: &str = "\
LGA
    5
    1LGA     C1    1  -0.075   0.000   0.000
    1LGA     C2    2   0.075   0.000   0.000
    1LGA     O1    3   0.120   0.134   0.000
    1LGA     H1    4   0.217   0.134   0.000
    1LGA    CL1    5  -0.135  -0.165   0.000
   3.00000   3.00000   3.00000
";

pub const COORDINATES_B: &str = "\
LGB
    6
    1LGB     C1    1  -0.075   0.000   0.000
    1LGB     C2    2   0.075   0.000   0.000
    1LGB     O1    3   0.120   0.134   0.000
    1LGB     H1    4   0.217   0.134   0.000
    1LGB     N1    5  -0.125  -0.139   0.000
    1LGB     H2    6  -0.226  -0.139   0.000
   3.50000   3.50000   3.50000
";

/// Docking output for ligand B: a displaced low-scoring pose, then the aligned pose with a
/// trailing dummy atom.
pub const DOCKED_B: &str = "\
# Ligen score: -4.2
@<TRIPOS>MOLECULE
LGB
    6     5     1     0     0
SMALL
USER_CHARGES
@<TRIPOS>ATOM
      1 C1         19.2500    0.0000    0.0000 c3         1 LGB       0.0200
      2 C2         20.7500    0.0000    0.0000 c3         1 LGB       0.1200
      3 O1         21.2000    1.3400    0.0000 oh         1 LGB      -0.6000
      4 H1         22.1700    1.3400    0.0000 ho         1 LGB       0.4000
      5 N1         18.7500   -1.3900    0.0000 n3         1 LGB      -0.3000
      6 H2         17.7400   -1.3900    0.0000 hn         1 LGB       0.3600
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
     3     3     4 1
     4     1     5 1
     5     5     6 1
#ENDOFMOLECULE
# Ligen score: 6.8
@<TRIPOS>MOLECULE
LGB
    7     6     1     0     0
SMALL
USER_CHARGES
@<TRIPOS>ATOM
      1 C1         -0.7500    0.0000    0.0000 c3         1 LGB       0.0200
      2 C2          0.7500    0.0000    0.0000 c3         1 LGB       0.1200
      3 O1          1.2000    1.3400    0.0000 oh         1 LGB      -0.6000
      4 H1          2.1700    1.3400    0.0000 ho         1 LGB       0.4000
      5 N1         -1.2500   -1.3900    0.0000 n3         1 LGB      -0.3000
      6 H2         -2.2600   -1.3900    0.0000 hn         1 LGB       0.3600
      7 DU1        -3.0000   -1.3900    0.0000 Du         1 LGB       0.0000
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
     3     3     4 1
     4     1     5 1
     5     5     6 1
     6     6     7 1
#ENDOFMOLECULE
";

pub const RECEPTOR: &str = "\
Protein in water
    3
    1ALA      N    1   1.000   1.000   1.000
    1ALA     CA    2   1.100   1.000   1.000
    1ALA      C    3   1.200   1.100   1.000
   6.00000   6.00000   6.00000
";

pub const PROTEIN_TOPOLOGY: &str = "\
;	File 'topol.top' was generated
; Include forcefield parameters
#include \"amber99sb-ildn.ff/forcefield.itp\"

; Include chain topologies
#include \"topol_Protein_chain_A.itp\"

; Include water topology
#include \"amber99sb-ildn.ff/tip3p.itp\"

[ system ]
; Name
Protein

[ molecules ]
; Compound        #mols
Protein_chain_A     1
SOL               120
";

pub fn write_ligand(dir: &Path, name: &str, topology: &str, structure: &str, coordinates: &str) -> LigandFiles {
    let files = LigandFiles {
        topology: dir.join(format!("{name}.itp")),
        structure: dir.join(format!("{name}.mol2")),
        coordinates: dir.join(format!("{name}.gro")),
        pose: None,
    };
    fs::write(&files.topology, topology).unwrap();
    fs::write(&files.structure, structure).unwrap();
    fs::write(&files.coordinates, coordinates).unwrap();
    files
}

pub fn ligand_a(dir: &Path) -> LigandFiles {
    write_ligand(dir, "lga", TOPOLOGY_A, STRUCTURE_A, COORDINATES_A)
}

pub fn ligand_b(dir: &Path) -> LigandFiles {
    write_ligand(dir, "lgb", TOPOLOGY_B, STRUCTURE_B, COORDINATES_B)
}

pub fn merge_outputs(dir: &Path) -> MergeOutputs {
    fs::create_dir_all(dir).unwrap();
    MergeOutputs {
        topology: dir.join("merged.itp"),
        coordinates: dir.join("merged.gro"),
        relaxation_restraints: Some(dir.join("posre_relax.itp")),
        water_topology: None,
    }
}

/// An engine that "relaxes" by nudging every atom and records the phases it ran.
pub struct FakeEngine {
    pub fail_execute: bool,
    pub nudge_nm: f64,
    pub calls: Mutex<Vec<EnginePhase>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            fail_execute: false,
            nudge_nm: 0.0,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_execute: true,
            ..Self::new()
        }
    }

    pub fn phases(&self) -> Vec<EnginePhase> {
        self.calls.lock().unwrap().clone()
    }
}

impl MdEngine for FakeEngine {
    fn prepare(&self, request: &RunRequest) -> Result<CapturedOutput, ExternalEngineError> {
        self.calls.lock().unwrap().push(EnginePhase::Prepare);
        assert!(request.coordinates.is_file(), "shifted input must exist before prepare");
        fs::write(request.run_spec(), "run spec").unwrap();
        fs::write(request.work_dir.join("mdout.mdp"), "; processed").unwrap();
        Ok(CapturedOutput::default())
    }

    fn execute(&self, request: &RunRequest) -> Result<CapturedOutput, ExternalEngineError> {
        self.calls.lock().unwrap().push(EnginePhase::Execute);
        if self.fail_execute {
            return Err(ExternalEngineError::NonZeroExit {
                phase: EnginePhase::Execute,
                command: format!("gmx mdrun -deffnm {}", request.stem),
                code: Some(1),
                output: CapturedOutput {
                    stdout: String::new(),
                    stderr: "Fatal error: segmentation fault".to_string(),
                },
            });
        }
        use ligmerge::core::io::gro::GroFile;
        use ligmerge::core::io::traits::{TextFile, WriteText};
        let mut gro = GroFile::read_from_path(&request.coordinates).unwrap();
        gro.translate(&nalgebra::Vector3::repeat(self.nudge_nm));
        fs::write(request.final_coordinates(), gro.render()).unwrap();
        for ext in ["trr", "edr", "log"] {
            fs::write(request.artifact(ext), ext).unwrap();
        }
        Ok(CapturedOutput::default())
    }
}
