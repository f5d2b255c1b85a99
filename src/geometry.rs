//! Molecular data consumed by the deck composer and the log parsers.
//!
//! The runner never owns a molecule. It reads what it needs through two narrow
//! capability traits, so callers can plug in their own containers:
//!
//! - [`AtomSource`]: ordered atoms with element symbols
//! - [`ChargeSource`]: net charge and number of unpaired electrons
//!
//! Writing a deck needs both; reading an optimized geometry back only needs
//! the atom count. [`Molecule`] is a minimal container implementing both, and
//! [`Coordinates`] holds one Cartesian point per atom in Angstroms.

use crate::error::{Result, RunnerError};
use nalgebra::Point3;

/// Read access to an ordered list of atoms.
pub trait AtomSource {
    /// Number of atoms
    fn len(&self) -> usize;

    /// Element symbol of the atom at `index` (zero-based)
    fn symbol(&self, index: usize) -> &str;

    /// Returns true when there are no atoms
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read access to the electronic bookkeeping of a molecule.
pub trait ChargeSource {
    /// Net charge
    fn charge(&self) -> i32;

    /// Number of unpaired electrons (multiplicity - 1)
    fn unpaired(&self) -> u32;
}

impl<S: AsRef<str>> AtomSource for [S] {
    fn len(&self) -> usize {
        <[S]>::len(self)
    }

    fn symbol(&self, index: usize) -> &str {
        self[index].as_ref()
    }
}

impl<S: AsRef<str>> AtomSource for Vec<S> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn symbol(&self, index: usize) -> &str {
        self[index].as_ref()
    }
}

/// A molecule as seen by the runner: element symbols, charge and spin.
///
/// # Examples
///
/// ```
/// use mopac_driver::geometry::{AtomSource, ChargeSource, Molecule};
///
/// let water = Molecule::new(vec!["O".to_string(), "H".to_string(), "H".to_string()]);
/// assert_eq!(water.len(), 3);
/// assert_eq!(water.charge(), 0);
///
/// let radical = Molecule::new(vec!["O".to_string(), "H".to_string()]).with_unpaired(1);
/// assert_eq!(radical.multiplicity(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Molecule {
    /// Element symbols in atom order
    pub elements: Vec<String>,
    /// Net charge
    pub charge: i32,
    /// Number of unpaired electrons
    pub unpaired: u32,
}

impl Molecule {
    /// Creates a neutral closed-shell molecule from its element symbols.
    pub fn new(elements: Vec<String>) -> Self {
        Self {
            elements,
            charge: 0,
            unpaired: 0,
        }
    }

    /// Sets the net charge.
    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = charge;
        self
    }

    /// Sets the number of unpaired electrons.
    pub fn with_unpaired(mut self, unpaired: u32) -> Self {
        self.unpaired = unpaired;
        self
    }

    /// Spin multiplicity 2S+1
    pub fn multiplicity(&self) -> u32 {
        self.unpaired + 1
    }
}

impl AtomSource for Molecule {
    fn len(&self) -> usize {
        self.elements.len()
    }

    fn symbol(&self, index: usize) -> &str {
        &self.elements[index]
    }
}

impl ChargeSource for Molecule {
    fn charge(&self) -> i32 {
        self.charge
    }

    fn unpaired(&self) -> u32 {
        self.unpaired
    }
}

/// Cartesian coordinates, one point per atom, in Angstroms.
///
/// # Examples
///
/// ```
/// use mopac_driver::geometry::Coordinates;
///
/// let coords = Coordinates::from_flat(vec![0.0, 0.0, 0.0, 0.96, 0.0, 0.0]).unwrap();
/// assert_eq!(coords.len(), 2);
/// assert_eq!(coords.get_atom_coords(1), [0.96, 0.0, 0.0]);
///
/// assert!(Coordinates::from_flat(vec![1.0, 2.0]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coordinates {
    points: Vec<Point3<f64>>,
}

impl Coordinates {
    /// Wraps a list of points.
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Builds coordinates from a flat `[x1, y1, z1, x2, ...]` vector.
    ///
    /// Fails if the length is not a multiple of three.
    pub fn from_flat(flat: Vec<f64>) -> Result<Self> {
        if flat.len() % 3 != 0 {
            return Err(RunnerError::Input(format!(
                "flat coordinate vector has {} values, not a multiple of 3",
                flat.len()
            )));
        }
        let points = flat
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { points })
    }

    /// Number of points (atoms)
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true when no points are stored
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends one point.
    pub fn push(&mut self, point: Point3<f64>) {
        self.points.push(point);
    }

    /// Coordinates of atom `atom_idx` as `[x, y, z]`.
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let p = &self.points[atom_idx];
        [p.x, p.y, p.z]
    }

    /// All points in atom order
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Consumes the container and returns the points
    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }
}

impl From<Vec<Point3<f64>>> for Coordinates {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}
