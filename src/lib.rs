#![deny(missing_docs)]

//! mopac-driver - run the MOPAC semi-empirical engine from Rust
//!
//! This crate drives MOPAC as an external program. It turns a molecule and a
//! calculation description into an input deck, starts the engine (blocking or
//! in the background) and recovers the total energy and optimized geometry
//! from the engine's text output.
//!
//! # Overview
//!
//! ```text
//! CalculationSpec + Molecule ──► deck (<job>.mop) ──► MOPAC ──► log (<job>.out)
//!                                                                │
//!                                         energy / geometry ◄────┘
//! ```
//!
//! MOPAC output has no stable grammar. Results are located by textual
//! markers and fixed-width columns, and a run that MOPAC stopped early
//! ("TRUST RADIUS NOW LESS THAN 0.00010") still yields numbers. Such results
//! come back as an [`output::Outcome`] carrying a
//! [`error::ConvergenceWarning`] next to the value.
//!
//! # Quick Start
//!
//! ```no_run
//! use mopac_driver::calculation::CalculationSpec;
//! use mopac_driver::geometry::{Coordinates, Molecule};
//! use mopac_driver::runner::{MopacRunner, QmRunner};
//! use mopac_driver::settings::{init_logging, SettingsManager};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SettingsManager::load()?;
//!     init_logging(settings.logging());
//!
//!     let mol = Molecule::new(vec!["N".into(), "N".into()]);
//!     let coords = Coordinates::from_flat(vec![0.0, 0.0, 0.0, 1.10, 0.0, 0.0])?;
//!     let calc = CalculationSpec { method: "PM7".into(), optimize: true, ..Default::default() };
//!
//!     let mut runner = MopacRunner::from_settings(&settings);
//!     runner.set_name("n2");
//!     runner.build_input(&mol, &coords, &calc)?;
//!     runner.run(true)?;
//!
//!     let energy = runner.energy()?.into_strict()?;
//!     println!("N2: {:.4} kcal/mol", energy);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`calculation`] - Calculation settings and MOPAC lookup tables
//! - [`geometry`] - Molecule capabilities and coordinates
//! - [`deck`] - Input deck generation
//! - [`launcher`] - Attached and detached process launch
//! - [`output`] - Log parsing state machines
//! - [`runner`] - The stateful MOPAC runner
//! - [`settings`] - Layered INI configuration and logging setup
//! - [`naming`] - Job file names
//! - [`error`] - Error types

pub mod calculation;
pub mod deck;
pub mod error;
pub mod geometry;
pub mod launcher;
/// Job file names derived from the job base name
pub mod naming;
pub mod output;
pub mod runner;
/// Configuration management system
pub mod settings;

pub use calculation::CalculationSpec;
pub use error::{ConvergenceWarning, RunnerError};
pub use geometry::{AtomSource, ChargeSource, Coordinates, Molecule};
pub use output::Outcome;
pub use runner::{MopacRunner, QmRunner};
