//! MOPAC input deck generation.
//!
//! A deck is plain text:
//!
//! ```text
//! * ===============================
//! * Input file for Mopac
//! * ===============================
//! RHF PM6-D3H4 CHARGE=0 Singlet BONDS AUX
//!
//! Mopac file generated by mopac-driver
//! C    0.00000 1  0.00000 1  0.00000 1
//! H    1.09000 1  0.00000 1  0.00000 1
//!
//! ```
//!
//! The keyword line is assembled from the calculation and the molecule; every
//! coordinate is followed by an optimization flag (`1` = free, `0` = frozen).
//! The whole deck is rendered in memory first and written in one call, so a
//! rendering failure never leaves a half-written file.

use crate::calculation::{is_valid_method, multiplicity_keyword, CalculationSpec};
use crate::error::{Result, RunnerError};
use crate::geometry::{AtomSource, ChargeSource, Coordinates};
use log::{debug, warn};
use std::fs;
use std::path::Path;

const BANNER: &str = "* ===============================\n* Input file for Mopac\n* ===============================\n";
const GENERATOR_LINE: &str = "Mopac file generated by mopac-driver";
const TRAILING_KEYWORDS: &str = "BONDS AUX";

/// Options that come from the runner rather than from the calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckOptions<'a> {
    /// Method used when the calculation names an unrecognized one
    pub default_method: &'a str,
    /// Thread count for MOPAC, emitted as `THREADS=n`
    pub threads: Option<usize>,
}

/// Picks the method keyword, falling back to `default_method` with a warning.
pub fn resolve_method<'a>(requested: &'a str, default_method: &'a str) -> &'a str {
    if is_valid_method(requested) {
        requested.trim()
    } else {
        warn!(
            "No valid method assigned for MOPAC calculation ({:?}), will use the default {}",
            requested, default_method
        );
        default_method
    }
}

/// Implicit solvent (COSMO) clause, empty in gas phase.
///
/// `LET DDMIN=0.0` keeps the optimizer going when COSMO makes the gradient
/// noisy.
pub fn solvent_clause(dielectric: f64) -> String {
    if dielectric > 0.0 {
        format!("EPS={:.1} RSOLV=1.3 LET DDMIN=0.0", dielectric)
    } else {
        String::new()
    }
}

/// Normalizes the free-form extra keywords.
///
/// A resolution-of-identity `RI` token belongs to ab-initio engines; when it
/// shows up the extras were written for one of those and are dropped.
pub fn clean_extra_options(extra: &str) -> String {
    let tokens: Vec<&str> = extra.split_whitespace().collect();
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("RI")) {
        warn!(
            "Extra options {:?} contain RI, which MOPAC does not understand; ignoring them",
            extra
        );
        return String::new();
    }
    tokens.join(" ")
}

/// Builds the keyword line (without trailing newline).
pub fn keyword_line<M>(mol: &M, calc: &CalculationSpec, options: &DeckOptions) -> Result<String>
where
    M: ChargeSource + ?Sized,
{
    let method = resolve_method(&calc.method, options.default_method);
    let reference = if mol.unpaired() != 0 { "UHF" } else { "RHF" };
    let run_type = if calc.optimize { "" } else { "1SCF" };
    let solvent = solvent_clause(calc.dielectric);
    let charge = format!("CHARGE={}", mol.charge());
    let multiplicity = mol
        .unpaired()
        .checked_add(1)
        .ok_or_else(|| {
            RunnerError::Input(format!(
                "{} unpaired electrons have no MOPAC multiplicity keyword",
                mol.unpaired()
            ))
        })
        .and_then(multiplicity_keyword)?;
    let threads = options
        .threads
        .map(|n| format!("THREADS={}", n))
        .unwrap_or_default();
    let extras = clean_extra_options(&calc.extra_options);

    let tokens = [
        reference,
        method,
        run_type,
        solvent.as_str(),
        charge.as_str(),
        multiplicity,
        threads.as_str(),
        extras.as_str(),
        TRAILING_KEYWORDS,
    ];
    Ok(tokens
        .iter()
        .filter(|t| !t.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" "))
}

/// Formats one atom line with its optimization flags.
pub fn atom_line(symbol: &str, xyz: [f64; 3], frozen: bool) -> String {
    let flag = if frozen { 0 } else { 1 };
    format!(
        "{:<2}  {:8.5} {} {:8.5} {} {:8.5} {}",
        symbol, xyz[0], flag, xyz[1], flag, xyz[2], flag
    )
}

/// Renders the complete deck text.
///
/// # Errors
///
/// Returns [`RunnerError::Input`] if there are no atoms, no coordinates, the
/// two counts differ, or the spin state has no MOPAC keyword.
pub fn render_deck<M>(
    mol: &M,
    coords: &Coordinates,
    calc: &CalculationSpec,
    options: &DeckOptions,
) -> Result<String>
where
    M: AtomSource + ChargeSource + ?Sized,
{
    if mol.is_empty() || coords.is_empty() {
        return Err(RunnerError::Input(
            "missing atoms or coordinates".to_string(),
        ));
    }
    if mol.len() != coords.len() {
        return Err(RunnerError::Input(format!(
            "molecule has {} atoms but {} coordinate rows were given",
            mol.len(),
            coords.len()
        )));
    }

    let ignored = calc.ab_initio_only_fields();
    if !ignored.is_empty() {
        debug!(
            "Ignoring settings not used by semi-empirical methods: {}",
            ignored.join(", ")
        );
    }

    let mut content = String::from(BANNER);
    content.push_str(&keyword_line(mol, calc, options)?);
    content.push_str("\n\n");
    content.push_str(GENERATOR_LINE);
    content.push('\n');

    for i in 0..mol.len() {
        content.push_str(&atom_line(
            mol.symbol(i),
            coords.get_atom_coords(i),
            calc.is_constrained(i),
        ));
        content.push('\n');
    }
    content.push('\n');

    Ok(content)
}

/// Renders the deck and writes it to `path`.
pub fn write_deck<M>(
    path: &Path,
    mol: &M,
    coords: &Coordinates,
    calc: &CalculationSpec,
    options: &DeckOptions,
) -> Result<()>
where
    M: AtomSource + ChargeSource + ?Sized,
{
    let content = render_deck(mol, coords, calc, options)?;
    fs::write(path, content).map_err(|e| RunnerError::io(path, e))?;
    debug!("Wrote MOPAC deck {}", path.display());
    Ok(())
}
