//! Parsing of MOPAC text output.
//!
//! MOPAC output has no grammar, only recognizable markers. Results are
//! extracted by small state machines that see the log one line at a time:
//!
//! - [`EnergyScanner`]: the `TOTAL ENERGY` line, converted to kcal/mol
//! - [`GeometryScanner`]: the Cartesian block printed after an optimization
//!
//! Both watch for the trust-radius termination message. When it appears the
//! parsed value is still returned, wrapped in an [`Outcome`] that carries a
//! [`ConvergenceWarning`]. Callers must check both.
//!
//! # Usage Pattern
//!
//! ```
//! use mopac_driver::output::{scan_log, EnergyScanner};
//!
//! let log = "          TOTAL ENERGY            =       -100.12345600 EV\n";
//! let outcome = scan_log(EnergyScanner::new(), log.as_bytes(), "job").unwrap();
//! assert!(!outcome.is_suspect());
//! assert!((outcome.value() - -100.123456 * 23.061).abs() < 1e-9);
//! ```

use crate::calculation::EV_TO_KCAL_MOL;
use crate::error::{ConvergenceWarning, Result, RunnerError};
use crate::geometry::Coordinates;
use log::{debug, warn};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Range;
use std::path::Path;

/// Printed when the optimizer gives up because its steps became too small
pub const TRUST_RADIUS_MARKER: &str =
    "TRUST RADIUS NOW LESS THAN 0.00010 OPTIMIZATION TERMINATING";
/// Line carrying the total energy in eV
pub const ENERGY_MARKER: &str = "TOTAL ENERGY";
/// Header of the final geometry after a gradient-converged run
pub const FINAL_POINT_MARKER: &str = "FINAL  POINT  AND  DERIVATIVES";
/// Header of the final geometry after a normal optimization
pub const GEOMETRY_OPTIMISED_MARKER: &str = "GEOMETRY OPTIMISED";
/// Units row above the Cartesian coordinate table
pub const COORDINATE_LABEL_MARKER: &str = "(ANGSTROMS)     (ANGSTROMS)     (ANGSTROMS)";

/// A parsed value together with the engine's warning, if any.
///
/// A warned outcome is neither a plain success nor a failure: the value is
/// usable, the calculation is suspect.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    value: T,
    warning: Option<ConvergenceWarning>,
}

impl<T> Outcome<T> {
    /// A value without warning
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// A value produced by a suspect calculation
    pub fn suspect(value: T, warning: ConvergenceWarning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    /// The parsed value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The warning, if the calculation is suspect
    pub fn warning(&self) -> Option<&ConvergenceWarning> {
        self.warning.as_ref()
    }

    /// Returns true if a warning is attached
    pub fn is_suspect(&self) -> bool {
        self.warning.is_some()
    }

    /// Splits into value and warning
    pub fn into_parts(self) -> (T, Option<ConvergenceWarning>) {
        (self.value, self.warning)
    }

    /// Discards the value of a suspect outcome and reports the warning as an
    /// error instead.
    pub fn into_strict(self) -> Result<T> {
        match self.warning {
            Some(warning) => Err(RunnerError::Convergence(warning)),
            None => Ok(self.value),
        }
    }

    /// Transforms the value, keeping the warning.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warning: self.warning,
        }
    }
}

/// Fixed character columns of a three-value row.
///
/// MOPAC prints coordinates in fixed-width fields that can run into each
/// other for large or negative values, so rows are sliced by column rather
/// than split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: [Range<usize>; 3],
}

/// Columns of the `(ANGSTROMS)` table in MOPAC 2009/2012 output
pub const MOPAC_CARTESIAN_LAYOUT: ColumnLayout = ColumnLayout {
    columns: [22..35, 38..51, 54..67],
};

impl ColumnLayout {
    /// Creates a layout from three column ranges.
    pub const fn new(columns: [Range<usize>; 3]) -> Self {
        Self { columns }
    }

    /// Decodes the three values of `line`.
    ///
    /// Returns the first error: a [`RunnerError::Format`] if a column cannot be
    /// sliced out of the line or holds an out-of-range value, a
    /// [`RunnerError::Parse`] if a field is not a number.
    pub fn decode(&self, line: &str) -> Result<[f64; 3]> {
        let mut values = [0.0; 3];
        for (value, range) in values.iter_mut().zip(self.columns.iter()) {
            let field = line.get(range.clone()).ok_or_else(|| {
                let problem = if line.len() < range.end {
                    "line too short for"
                } else {
                    "cannot slice"
                };
                RunnerError::Format(format!(
                    "{} columns {}..{}: {:?}",
                    problem,
                    range.start,
                    range.end,
                    line.trim_end()
                ))
            })?;
            *value = parse_number(field.trim())?;
        }
        Ok(values)
    }
}

/// A line-at-a-time log parser.
pub trait LogScanner {
    /// What the scanner extracts
    type Output;

    /// Feeds one line (without line terminator).
    ///
    /// An error aborts the scan.
    fn feed(&mut self, line: &str) -> Result<()>;

    /// Returns true once no further input can change the result
    fn is_done(&self) -> bool;

    /// Signals end of input and produces the result.
    fn finish(self, job: &str) -> Result<Outcome<Self::Output>>;
}

/// Runs `scanner` over `reader` until it is done or input runs out.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected; MOPAC
/// occasionally prints stray characters in sections nobody parses.
pub fn scan_log<S, R>(scanner: S, reader: R, job: &str) -> Result<Outcome<S::Output>>
where
    S: LogScanner,
    R: BufRead,
{
    scan_lines(scanner, reader, job, |source| RunnerError::Read {
        job: job.to_string(),
        source,
    })
}

/// Opens `path` and runs `scanner` over it.
///
/// Read failures name `path`.
pub fn scan_file<S: LogScanner>(scanner: S, path: &Path, job: &str) -> Result<Outcome<S::Output>> {
    let file = File::open(path).map_err(|e| RunnerError::io(path, e))?;
    debug!("Parsing MOPAC output {}", path.display());
    scan_lines(scanner, BufReader::new(file), job, |e| RunnerError::io(path, e))
}

fn scan_lines<S, R, F>(
    mut scanner: S,
    mut reader: R,
    job: &str,
    read_error: F,
) -> Result<Outcome<S::Output>>
where
    S: LogScanner,
    R: BufRead,
    F: Fn(io::Error) -> RunnerError,
{
    let mut buf = Vec::new();
    while !scanner.is_done() {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(&read_error)?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        scanner.feed(line.trim_end_matches(&['\n', '\r'][..]))?;
    }
    scanner.finish(job)
}

fn convergence_warning(job: &str) -> ConvergenceWarning {
    warn!(
        "MOPAC reported a trust radius termination for job {}; results may not be converged",
        job
    );
    ConvergenceWarning {
        job: job.to_string(),
        reason: "trust radius fell below 0.00010, optimization terminated".to_string(),
    }
}

/// States of [`EnergyScanner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyState {
    /// Looking for the energy line
    Scanning,
    /// Energy found, in kcal/mol
    Found(f64),
    /// Input ended without an energy line
    NotFound,
}

/// Extracts the total energy (kcal/mol) from a MOPAC log.
#[derive(Debug, Clone)]
pub struct EnergyScanner {
    state: EnergyState,
    suspect: bool,
}

impl EnergyScanner {
    /// Creates a scanner in the [`EnergyState::Scanning`] state.
    pub fn new() -> Self {
        Self {
            state: EnergyState::Scanning,
            suspect: false,
        }
    }

    /// Current state
    pub fn state(&self) -> EnergyState {
        self.state
    }

    /// Returns true once a trust-radius warning has been seen
    pub fn is_suspect(&self) -> bool {
        self.suspect
    }
}

impl Default for EnergyScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the energy in eV from a `TOTAL ENERGY = <value> EV` line.
fn parse_energy_line(line: &str) -> Result<f64> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(RunnerError::Format(format!(
            "cannot read energy from MOPAC output line {:?}",
            line.trim()
        )));
    }
    parse_number(fields[3])
}

/// Parses a finite number; overflow to infinity is a format error.
fn parse_number(text: &str) -> Result<f64> {
    let value: f64 = text.parse().map_err(|source| RunnerError::Parse {
        text: text.to_string(),
        source,
    })?;
    if !value.is_finite() {
        return Err(RunnerError::Format(format!(
            "value {:?} is out of range",
            text
        )));
    }
    Ok(value)
}

impl LogScanner for EnergyScanner {
    type Output = f64;

    fn feed(&mut self, line: &str) -> Result<()> {
        if self.state != EnergyState::Scanning {
            return Ok(());
        }
        if line.contains(TRUST_RADIUS_MARKER) {
            self.suspect = true;
        } else if line.contains(ENERGY_MARKER) {
            let ev = parse_energy_line(line)?;
            self.state = EnergyState::Found(ev * EV_TO_KCAL_MOL);
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        !matches!(self.state, EnergyState::Scanning)
    }

    fn finish(mut self, job: &str) -> Result<Outcome<f64>> {
        if self.state == EnergyState::Scanning {
            self.state = EnergyState::NotFound;
        }
        match self.state {
            EnergyState::Found(energy) if self.suspect => {
                Ok(Outcome::suspect(energy, convergence_warning(job)))
            }
            EnergyState::Found(energy) => Ok(Outcome::clean(energy)),
            _ => Err(RunnerError::NotFound {
                what: "energy",
                job: job.to_string(),
            }),
        }
    }
}

/// States of [`GeometryScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryState {
    /// Looking for the final-geometry header
    ScanningHeader,
    /// Header seen, looking for the `(ANGSTROMS)` units row
    AwaitLabel,
    /// Units row seen, the next line is a separator
    SkipSeparator,
    /// Reading coordinate rows
    ReadingRows,
    /// All expected rows read
    Done,
}

/// Extracts the optimized Cartesian geometry from a MOPAC log.
///
/// Only the first `expected_atoms` rows of the table are read.
#[derive(Debug, Clone)]
pub struct GeometryScanner {
    state: GeometryState,
    suspect: bool,
    expected_atoms: usize,
    layout: ColumnLayout,
    coords: Coordinates,
}

impl GeometryScanner {
    /// Creates a scanner for a molecule with `expected_atoms` atoms using the
    /// standard MOPAC column layout.
    pub fn new(expected_atoms: usize) -> Self {
        Self::with_layout(expected_atoms, MOPAC_CARTESIAN_LAYOUT)
    }

    /// Creates a scanner with a custom column layout.
    pub fn with_layout(expected_atoms: usize, layout: ColumnLayout) -> Self {
        Self {
            state: GeometryState::ScanningHeader,
            suspect: false,
            expected_atoms,
            layout,
            coords: Coordinates::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> GeometryState {
        self.state
    }

    /// Returns true once a trust-radius warning has been seen
    pub fn is_suspect(&self) -> bool {
        self.suspect
    }

    fn rows_complete(&self) -> bool {
        self.coords.len() >= self.expected_atoms
    }
}

impl LogScanner for GeometryScanner {
    type Output = Coordinates;

    fn feed(&mut self, line: &str) -> Result<()> {
        match self.state {
            GeometryState::ScanningHeader | GeometryState::AwaitLabel
                if line.contains(TRUST_RADIUS_MARKER) =>
            {
                self.suspect = true;
            }
            GeometryState::ScanningHeader => {
                if line.contains(FINAL_POINT_MARKER) || line.contains(GEOMETRY_OPTIMISED_MARKER) {
                    self.state = GeometryState::AwaitLabel;
                }
            }
            GeometryState::AwaitLabel => {
                if line.contains(COORDINATE_LABEL_MARKER) {
                    self.state = GeometryState::SkipSeparator;
                }
            }
            GeometryState::SkipSeparator => {
                self.state = if self.rows_complete() {
                    GeometryState::Done
                } else {
                    GeometryState::ReadingRows
                };
            }
            GeometryState::ReadingRows => {
                let [x, y, z] = self.layout.decode(line)?;
                self.coords.push(Point3::new(x, y, z));
                if self.rows_complete() {
                    self.state = GeometryState::Done;
                }
            }
            GeometryState::Done => {}
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.state == GeometryState::Done
    }

    fn finish(self, job: &str) -> Result<Outcome<Coordinates>> {
        if self.state != GeometryState::Done {
            return Err(RunnerError::NotFound {
                what: "geometry",
                job: job.to_string(),
            });
        }
        if self.suspect {
            Ok(Outcome::suspect(self.coords, convergence_warning(job)))
        } else {
            Ok(Outcome::clean(self.coords))
        }
    }
}
