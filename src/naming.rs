//! File names derived from a job base name.
//!
//! MOPAC names every file after the input deck: `job.mop` produces
//! `job.out`, `job.arc` and `job.aux` next to it. The base name may contain
//! a directory part.
//!
//! # Example
//!
//! ```
//! use mopac_driver::naming::JobNaming;
//!
//! let naming = JobNaming::new("runs/ethane");
//! assert_eq!(naming.deck(), "runs/ethane.mop");
//! assert_eq!(naming.log(), "runs/ethane.out");
//! ```

use std::path::PathBuf;

/// Base name used when a runner was never given one
pub const DEFAULT_JOB_NAME: &str = "input";

/// Input deck extension
pub const DECK_EXTENSION: &str = "mop";
/// Main output extension
pub const LOG_EXTENSION: &str = "out";
/// Archive (final geometry) extension
pub const ARCHIVE_EXTENSION: &str = "arc";
/// Auxiliary output extension, written because decks request `AUX`
pub const AUX_EXTENSION: &str = "aux";

/// Generates the file names belonging to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNaming {
    basename: String,
}

impl JobNaming {
    /// Creates the naming for `basename`; an empty name becomes
    /// [`DEFAULT_JOB_NAME`].
    pub fn new(basename: &str) -> Self {
        let basename = if basename.trim().is_empty() {
            DEFAULT_JOB_NAME.to_string()
        } else {
            basename.to_string()
        };
        Self { basename }
    }

    /// Returns the base name
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// `{basename}.mop`
    pub fn deck(&self) -> String {
        self.with_extension(DECK_EXTENSION)
    }

    /// `{basename}.out`
    pub fn log(&self) -> String {
        self.with_extension(LOG_EXTENSION)
    }

    /// `{basename}.arc`
    pub fn archive(&self) -> String {
        self.with_extension(ARCHIVE_EXTENSION)
    }

    /// `{basename}.aux`
    pub fn aux(&self) -> String {
        self.with_extension(AUX_EXTENSION)
    }

    /// Every file a job may leave behind, deck first.
    pub fn associated_files(&self) -> Vec<PathBuf> {
        [self.deck(), self.log(), self.archive(), self.aux()]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    fn with_extension(&self, ext: &str) -> String {
        format!("{}.{}", self.basename, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_file_names() {
        let naming = JobNaming::new("water_opt");
        assert_eq!(naming.basename(), "water_opt");
        assert_eq!(naming.deck(), "water_opt.mop");
        assert_eq!(naming.log(), "water_opt.out");
        assert_eq!(naming.archive(), "water_opt.arc");
        assert_eq!(naming.aux(), "water_opt.aux");
    }

    #[test]
    fn test_empty_name_falls_back() {
        assert_eq!(JobNaming::new("").deck(), "input.mop");
        assert_eq!(JobNaming::new("   ").log(), "input.out");
    }

    #[test]
    fn test_dotted_names_keep_their_dots() {
        // "conf.1" must not lose ".1" the way Path::with_extension would.
        let naming = JobNaming::new("conf.1");
        assert_eq!(naming.deck(), "conf.1.mop");
        assert_eq!(naming.associated_files().len(), 4);
        assert_eq!(naming.associated_files()[0], PathBuf::from("conf.1.mop"));
    }
}
