//! Calculation settings and the fixed MOPAC lookup tables.
//!
//! [`CalculationSpec`] is a passive record describing what to compute. It is
//! engine-neutral: fields such as basis sets or dispersion tags matter to
//! ab-initio engines and are ignored when a semi-empirical deck is written.
//!
//! The tables here never change at runtime:
//! - [`VALID_METHODS`]: method prefixes MOPAC accepts
//! - [`MULTIPLICITY_KEYWORDS`]: spin keyword by multiplicity
//! - [`EV_TO_KCAL_MOL`]: unit conversion for the total energy

use crate::error::{Result, RunnerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Method prefixes recognized by MOPAC (e.g. `PM6-D3H4` starts with `PM6`).
pub const VALID_METHODS: [&str; 4] = ["PM3", "PM6", "PM7", "AM1"];

/// Method used when a calculation does not name a recognized one
pub const DEFAULT_METHOD: &str = "PM6-D3H4";

/// MOPAC spin keywords indexed by multiplicity - 1.
pub const MULTIPLICITY_KEYWORDS: [&str; 9] = [
    "Singlet", "Doublet", "Triplet", "Quartet", "Quintet", "Sextet", "Heptet", "Octet", "Nonet",
];

/// kcal/mol per eV
pub const EV_TO_KCAL_MOL: f64 = 23.061;

/// Returns the MOPAC keyword for a multiplicity (2S+1).
///
/// Only multiplicities 1 to 9 have a keyword.
///
/// # Examples
///
/// ```
/// use mopac_driver::calculation::multiplicity_keyword;
///
/// assert_eq!(multiplicity_keyword(1).unwrap(), "Singlet");
/// assert_eq!(multiplicity_keyword(3).unwrap(), "Triplet");
/// assert!(multiplicity_keyword(10).is_err());
/// ```
pub fn multiplicity_keyword(multiplicity: u32) -> Result<&'static str> {
    usize::try_from(multiplicity)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|idx| MULTIPLICITY_KEYWORDS.get(idx).copied())
        .ok_or_else(|| {
            RunnerError::Input(format!(
                "multiplicity {} has no MOPAC keyword (supported: 1 to {})",
                multiplicity,
                MULTIPLICITY_KEYWORDS.len()
            ))
        })
}

/// Returns true if `method` starts with one of [`VALID_METHODS`].
///
/// The comparison ignores case, as MOPAC keywords do.
pub fn is_valid_method(method: &str) -> bool {
    let upper = method.trim().to_ascii_uppercase();
    VALID_METHODS.iter().any(|prefix| upper.starts_with(prefix))
}

/// Description of a single calculation.
///
/// All fields default, so a JSON file only needs the values it changes.
///
/// # Examples
///
/// ```
/// use mopac_driver::calculation::CalculationSpec;
///
/// let calc = CalculationSpec {
///     method: "PM7".to_string(),
///     optimize: true,
///     dielectric: 78.4,
///     constrained_atoms: vec![0, 1],
///     ..Default::default()
/// };
/// assert!(calc.has_solvent());
/// assert!(calc.is_constrained(1));
/// assert!(!calc.is_constrained(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CalculationSpec {
    /// Method keyword, e.g. "PM6-D3H4" or "AM1"
    pub method: String,
    /// Optimize the geometry (true) or run a single point (false)
    pub optimize: bool,
    /// SCF convergence tightness level (engine specific, 0 = engine default)
    pub scf_tightness: u32,
    /// Dielectric constant of the implicit solvent; 0 or less means gas phase
    pub dielectric: f64,
    /// Basis set name
    pub basis: String,
    /// Basis set for the heavy atoms listed in `heavy_basis_atoms`
    pub high_basis: String,
    /// Auxiliary basis set name
    pub aux_basis: String,
    /// Dispersion correction tag
    pub dispersion: String,
    /// Indices of atoms that get `high_basis`
    pub heavy_basis_atoms: Vec<usize>,
    /// Element symbols that get `high_basis`
    pub heavy_basis_elements: Vec<String>,
    /// Zero-based indices of atoms kept fixed during optimization
    pub constrained_atoms: Vec<usize>,
    /// Free-form keywords appended to the keyword line
    pub extra_options: String,
}

impl CalculationSpec {
    /// Loads a calculation from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RunnerError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            RunnerError::Input(format!(
                "invalid calculation file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Returns true if an implicit solvent is requested
    pub fn has_solvent(&self) -> bool {
        self.dielectric > 0.0
    }

    /// Returns true if atom `index` is frozen
    pub fn is_constrained(&self, index: usize) -> bool {
        self.constrained_atoms.contains(&index)
    }

    /// Names of the set fields that a semi-empirical engine cannot use.
    pub fn ab_initio_only_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.scf_tightness != 0 {
            fields.push("scf_tightness");
        }
        if !self.basis.is_empty() {
            fields.push("basis");
        }
        if !self.high_basis.is_empty() {
            fields.push("high_basis");
        }
        if !self.aux_basis.is_empty() {
            fields.push("aux_basis");
        }
        if !self.dispersion.is_empty() {
            fields.push("dispersion");
        }
        if !self.heavy_basis_atoms.is_empty() || !self.heavy_basis_elements.is_empty() {
            fields.push("heavy_basis");
        }
        fields
    }
}
