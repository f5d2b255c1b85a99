use approx::assert_abs_diff_eq;
use mopac_driver::calculation::{CalculationSpec, EV_TO_KCAL_MOL};
use mopac_driver::geometry::{Coordinates, Molecule};
use mopac_driver::runner::{MopacRunner, QmRunner};
use mopac_driver::RunnerError;
use std::fs;
use std::path::Path;

const WATER_OPT: &str = "tests/data/water_opt.out";
const WATER_TRUST_RADIUS: &str = "tests/data/water_trust_radius.out";

fn water() -> (Molecule, Coordinates) {
    let mol = Molecule::new(vec!["O".to_string(), "H".to_string(), "H".to_string()]);
    let coords = Coordinates::from_flat(vec![
        0.0, 0.0, 0.1173, //
        0.0, 0.7572, -0.4692, //
        0.0, -0.7572, -0.4692,
    ])
    .unwrap();
    (mol, coords)
}

fn runner_for(dir: &Path, job: &str) -> MopacRunner {
    let mut runner = MopacRunner::new();
    runner.set_name(dir.join(job).to_str().unwrap());
    runner
}

#[test]
fn test_build_input_writes_deck() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "water");
    let (mol, coords) = water();
    let calc = CalculationSpec {
        method: "PM7".to_string(),
        optimize: true,
        constrained_atoms: vec![0],
        ..Default::default()
    };

    runner.build_input(&mol, &coords, &calc).unwrap();

    let deck = fs::read_to_string(dir.path().join("water.mop")).unwrap();
    let lines: Vec<&str> = deck.lines().collect();
    assert_eq!(lines[3], "RHF PM7 CHARGE=0 Singlet BONDS AUX");
    assert_eq!(lines[6], "O    0.00000 0  0.00000 0  0.11730 0");
    assert_eq!(lines[7], "H    0.00000 1  0.75720 1 -0.46920 1");
    assert_eq!(lines[8], "H    0.00000 1 -0.75720 1 -0.46920 1");
}

#[test]
fn test_decks_are_byte_identical_across_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let (mol, coords) = water();
    let calc = CalculationSpec {
        method: "unknown-method".to_string(),
        dielectric: 78.4,
        extra_options: "PRECISE".to_string(),
        ..Default::default()
    };

    let mut runner = runner_for(dir.path(), "first");
    runner.build_input(&mol, &coords, &calc).unwrap();
    runner.set_name(dir.path().join("second").to_str().unwrap());
    runner.build_input(&mol, &coords, &calc).unwrap();

    let first = fs::read(dir.path().join("first.mop")).unwrap();
    let second = fs::read(dir.path().join("second.mop")).unwrap();
    assert_eq!(first, second);

    let text = String::from_utf8(first).unwrap();
    assert!(text.contains("RHF PM6-D3H4 1SCF EPS=78.4 RSOLV=1.3 LET DDMIN=0.0 CHARGE=0 Singlet PRECISE BONDS AUX"));
}

#[test]
fn test_build_input_rejects_mismatched_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "bad");
    let (mol, _) = water();
    let coords = Coordinates::from_flat(vec![0.0, 0.0, 0.0]).unwrap();

    let err = runner
        .build_input(&mol, &coords, &CalculationSpec::default())
        .unwrap_err();
    assert!(matches!(err, RunnerError::Input(_)));
    assert!(!dir.path().join("bad.mop").exists());
}

#[test]
fn test_reads_clean_optimization() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "water");
    fs::copy(WATER_OPT, runner.naming().log()).unwrap();
    let (mol, _) = water();

    let energy = runner.energy().unwrap();
    assert!(!energy.is_suspect());
    assert_abs_diff_eq!(*energy.value(), -348.48178 * EV_TO_KCAL_MOL, epsilon = 1e-9);

    let geometry = runner.geometry(&mol).unwrap().into_strict().unwrap();
    assert_eq!(geometry.len(), 3);
    assert_eq!(geometry.get_atom_coords(0), [0.0, 0.0, 0.0592]);
    assert_eq!(geometry.get_atom_coords(1), [0.0, 0.7615, -0.4727]);
    assert_eq!(geometry.get_atom_coords(2), [0.0, -0.7615, -0.4727]);
}

#[test]
fn test_trust_radius_results_carry_warning() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "water_tr");
    fs::copy(WATER_TRUST_RADIUS, runner.naming().log()).unwrap();
    let (mol, _) = water();

    let energy = runner.energy().unwrap();
    assert!(energy.is_suspect());
    assert_abs_diff_eq!(*energy.value(), -348.47911 * EV_TO_KCAL_MOL, epsilon = 1e-9);

    let geometry = runner.geometry(&mol).unwrap();
    let warning = geometry.warning().unwrap();
    assert!(warning.job.ends_with("water_tr"));
    assert_eq!(geometry.value().len(), 3);

    assert!(matches!(
        geometry.into_strict(),
        Err(RunnerError::Convergence(_))
    ));
}

#[test]
fn test_geometry_reads_only_requested_atoms() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "prefix");
    fs::copy(WATER_OPT, runner.naming().log()).unwrap();

    let first_two = vec!["O", "H"];
    let outcome = runner.geometry(&first_two).unwrap();
    assert_eq!(outcome.value().len(), 2);
}

#[test]
fn test_too_many_atoms_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "short");
    fs::copy(WATER_OPT, runner.naming().log()).unwrap();

    let four = vec!["O", "H", "H", "H"];
    let err = runner.geometry(&four).unwrap_err();
    assert!(matches!(err, RunnerError::NotFound { what: "geometry", .. }));
}

#[test]
fn test_single_point_log_has_no_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path(), "sp");
    fs::write(
        runner.naming().log(),
        "          TOTAL ENERGY            =       -348.40000 EV\n == MOPAC DONE ==\n",
    )
    .unwrap();
    let (mol, _) = water();

    assert!(runner.energy().is_ok());
    assert!(matches!(
        runner.geometry(&mol),
        Err(RunnerError::NotFound { .. })
    ));
}
