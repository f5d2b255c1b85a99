//! The MOPAC runner: one object that writes decks, starts the engine and
//! reads the results back.
//!
//! A [`MopacRunner`] is built once with defaults and reused for many jobs; the
//! job name decides which files it touches:
//!
//! ```text
//! <job>.mop  --engine-->  <job>.out  --parsers-->  energy / geometry
//! ```
//!
//! # Usage Pattern
//!
//! ```no_run
//! use mopac_driver::calculation::CalculationSpec;
//! use mopac_driver::geometry::{Coordinates, Molecule};
//! use mopac_driver::runner::{MopacRunner, QmRunner};
//!
//! let mol = Molecule::new(vec!["O".into(), "H".into(), "H".into()]);
//! let coords = Coordinates::from_flat(vec![
//!     0.0, 0.0, 0.0, 0.96, 0.0, 0.0, -0.24, 0.93, 0.0,
//! ])?;
//! let calc = CalculationSpec { method: "PM7".into(), optimize: true, ..Default::default() };
//!
//! let mut runner = MopacRunner::new();
//! runner.set_name("water");
//! runner.build_input(&mol, &coords, &calc)?;
//! runner.run(true)?;
//!
//! let energy = runner.energy()?;
//! if let Some(warning) = energy.warning() {
//!     eprintln!("{}", warning);
//! }
//! println!("E = {:.3} kcal/mol", energy.value());
//! let geometry = runner.geometry(&mol)?;
//! # Ok::<(), mopac_driver::error::RunnerError>(())
//! ```
//!
//! # Warnings
//!
//! [`QmRunner::energy`] and [`QmRunner::geometry`] return an [`Outcome`]. A
//! trust-radius termination leaves the value in place and attaches a
//! [`crate::error::ConvergenceWarning`]; callers must inspect both.

use crate::calculation::CalculationSpec;
use crate::deck::{write_deck, DeckOptions};
use crate::error::{Result, RunnerError};
use crate::geometry::{AtomSource, ChargeSource, Coordinates};
use crate::launcher::{default_launcher, LaunchMode, Launcher};
use crate::naming::JobNaming;
use crate::output::{scan_file, EnergyScanner, GeometryScanner, Outcome};
use crate::settings::{EngineSettings, SettingsManager};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Operations every engine runner provides.
///
/// Energies are in kcal/mol and coordinates in Angstroms regardless of what
/// the engine prints.
pub trait QmRunner {
    /// Sets the job base name used for the input and output files.
    fn set_name(&mut self, name: &str);

    /// Sets the command that runs the engine.
    fn set_command(&mut self, command: &str);

    /// Sets how many CPUs the engine may use.
    fn set_ncpu(&mut self, ncpu: usize);

    /// Writes the input file for the current job.
    fn build_input<M>(&self, mol: &M, coords: &Coordinates, calc: &CalculationSpec) -> Result<()>
    where
        M: AtomSource + ChargeSource + ?Sized;

    /// Runs the engine on the current job, blocking if `wait`.
    fn run(&self, wait: bool) -> Result<()>;

    /// Reads the final energy of the current job.
    fn energy(&self) -> Result<Outcome<f64>>;

    /// Reads the final geometry of the current job.
    fn geometry<A: AtomSource + ?Sized>(&self, atoms: &A) -> Result<Outcome<Coordinates>>;
}

/// Runner for MOPAC 2009/2012 and compatible versions.
#[derive(Debug)]
pub struct MopacRunner {
    command: String,
    default_method: String,
    naming: JobNaming,
    ncpu: Option<usize>,
    launcher: Box<dyn Launcher>,
}

impl MopacRunner {
    /// Creates a runner with built-in defaults.
    ///
    /// The command is `$MOPAC_LICENSE/MOPAC2012.exe`, the default method
    /// `PM6-D3H4` and the job name `input`.
    pub fn new() -> Self {
        Self::from_engine_settings(&EngineSettings::default())
    }

    /// Creates a runner from loaded settings.
    pub fn from_settings(settings: &SettingsManager) -> Self {
        Self::from_engine_settings(settings.engine())
    }

    /// Creates a runner from engine settings.
    pub fn from_engine_settings(engine: &EngineSettings) -> Self {
        let command = engine.resolve_command();
        debug!("MOPAC runner using command {}", command);
        Self {
            command,
            default_method: engine.default_method.clone(),
            naming: JobNaming::new(&engine.job_name),
            ncpu: None,
            launcher: default_launcher(),
        }
    }

    /// Replaces the launch strategy.
    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Sets the method used when a calculation names an unrecognized one.
    pub fn set_default_method(&mut self, method: &str) {
        self.default_method = method.to_string();
    }

    /// Engine command
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Default method
    pub fn default_method(&self) -> &str {
        &self.default_method
    }

    /// File names of the current job
    pub fn naming(&self) -> &JobNaming {
        &self.naming
    }

    /// Runs the engine in an explicit mode.
    pub fn run_with(&self, mode: LaunchMode) -> Result<()> {
        let deck = self.naming.deck();
        if !Path::new(&deck).is_file() {
            return Err(RunnerError::Input(format!(
                "input deck {} does not exist; build the input first",
                deck
            )));
        }
        self.launcher.launch(&self.command, Path::new(&deck), mode)
    }

    /// Deletes the files the current job produced.
    ///
    /// Files that do not exist are skipped. With `keep_log` the `.out` file is
    /// left in place. Returns how many files were removed.
    pub fn clean_job_files(&self, keep_log: bool) -> Result<usize> {
        let log = self.naming.log();
        let mut removed = 0;
        for path in self.naming.associated_files() {
            if keep_log && path == Path::new(&log) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(RunnerError::io(path, e)),
            }
        }
        Ok(removed)
    }
}

impl Default for MopacRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl QmRunner for MopacRunner {
    fn set_name(&mut self, name: &str) {
        self.naming = JobNaming::new(name);
    }

    fn set_command(&mut self, command: &str) {
        self.command = command.to_string();
    }

    fn set_ncpu(&mut self, ncpu: usize) {
        self.ncpu = (ncpu > 0).then_some(ncpu);
    }

    fn build_input<M>(&self, mol: &M, coords: &Coordinates, calc: &CalculationSpec) -> Result<()>
    where
        M: AtomSource + ChargeSource + ?Sized,
    {
        let options = DeckOptions {
            default_method: &self.default_method,
            threads: self.ncpu,
        };
        let deck = self.naming.deck();
        write_deck(Path::new(&deck), mol, coords, calc, &options)?;
        info!("MOPAC input written to {}", deck);
        Ok(())
    }

    fn run(&self, wait: bool) -> Result<()> {
        self.run_with(LaunchMode::from_wait(wait))
    }

    fn energy(&self) -> Result<Outcome<f64>> {
        let log = self.naming.log();
        scan_file(EnergyScanner::new(), Path::new(&log), self.naming.basename())
    }

    fn geometry<A: AtomSource + ?Sized>(&self, atoms: &A) -> Result<Outcome<Coordinates>> {
        let log = self.naming.log();
        scan_file(
            GeometryScanner::new(atoms.len()),
            Path::new(&log),
            self.naming.basename(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Molecule;
    use crate::launcher::DirectLauncher;

    fn runner_in(dir: &Path, job: &str) -> MopacRunner {
        let mut runner = MopacRunner::new().with_launcher(Box::new(DirectLauncher));
        runner.set_name(dir.join(job).to_str().unwrap());
        runner
    }

    #[test]
    fn test_defaults() {
        let runner = MopacRunner::new();
        assert_eq!(runner.default_method(), "PM6-D3H4");
        assert_eq!(runner.naming().deck(), "input.mop");
        assert!(runner.command().ends_with("MOPAC2012.exe"));
    }

    #[test]
    fn test_setters() {
        let mut runner = MopacRunner::new();
        runner.set_command("/opt/mopac/MOPAC2016.exe");
        runner.set_default_method("PM7");
        runner.set_name("benzene");
        assert_eq!(runner.command(), "/opt/mopac/MOPAC2016.exe");
        assert_eq!(runner.default_method(), "PM7");
        assert_eq!(runner.naming().log(), "benzene.out");
    }

    #[test]
    fn test_threads_keyword_follows_ncpu() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path(), "threads");
        let mol = Molecule::new(vec!["He".to_string()]);
        let coords = Coordinates::from_flat(vec![0.0, 0.0, 0.0]).unwrap();
        let calc = CalculationSpec::default();

        runner.set_ncpu(8);
        runner.build_input(&mol, &coords, &calc).unwrap();
        let deck = fs::read_to_string(runner.naming().deck()).unwrap();
        assert!(deck.contains(" THREADS=8 "));

        runner.set_ncpu(0);
        runner.build_input(&mol, &coords, &calc).unwrap();
        let deck = fs::read_to_string(runner.naming().deck()).unwrap();
        assert!(!deck.contains("THREADS"));
    }

    #[test]
    fn test_run_without_deck_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), "missing");
        assert!(matches!(runner.run(true), Err(RunnerError::Input(_))));
    }

    #[test]
    fn test_results_without_log_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), "nolog");
        assert!(matches!(runner.energy(), Err(RunnerError::Io { .. })));
        assert!(matches!(
            runner.geometry(&vec!["C"]),
            Err(RunnerError::Io { .. })
        ));
    }

    #[test]
    fn test_clean_job_files() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path(), "tidy");
        fs::write(runner.naming().deck(), "deck").unwrap();
        fs::write(runner.naming().log(), "log").unwrap();
        fs::write(runner.naming().aux(), "aux").unwrap();

        assert_eq!(runner.clean_job_files(true).unwrap(), 2);
        assert!(Path::new(&runner.naming().log()).exists());
        assert!(!Path::new(&runner.naming().deck()).exists());

        assert_eq!(runner.clean_job_files(false).unwrap(), 1);
        assert_eq!(runner.clean_job_files(false).unwrap(), 0);
    }
}
