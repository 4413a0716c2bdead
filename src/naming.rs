use std::path::Path;

use crate::error::{ExtractError, Result};

/// Naming conventions coupled to one dataset: which channel stands in for a
/// missing one, and how a patient identifier is spelled inside a file name.
///
/// Both rules are brittle string conventions, so they live behind this trait
/// instead of being hardcoded in the extraction pipeline. Implement it to
/// adapt the crate to another institution's naming scheme.
pub trait NamingPolicy {
    /// Alternative channel name to try when the requested one is absent
    /// from a store. Returns `None` when there is no substitute.
    fn fallback_channel(&self, requested: &str) -> Option<&str>;

    /// Derives the patient identifier from a signal file path.
    ///
    /// Fails with [`ExtractError::PatternMismatch`] when the file name does
    /// not follow the expected convention.
    fn patient_id(&self, path: &Path) -> Result<String>;
}

/// Default naming rules of the traumatic-brain-injury dataset this crate
/// was written against.
///
/// * Arterial pressure is stored as either `abp` or `art` depending on the
///   recording monitor; a request for `abp` falls back to `art`.
/// * File names carry the patient id right after a literal `TBI_` prefix,
///   e.g. `TBI_2044B_part2.hdf5` belongs to patient `2044B`.
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use artiseg::{NamingPolicy, TbiNaming};
///
/// let naming = TbiNaming;
/// assert_eq!(naming.fallback_channel("abp"), Some("art"));
/// assert_eq!(naming.fallback_channel("icp"), None);
///
/// let id = naming.patient_id(Path::new("TBI_2044B_part2.hdf5")).unwrap();
/// assert_eq!(id, "2044B");
///
/// assert!(naming.patient_id(Path::new("recording_01.hdf5")).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TbiNaming;

impl NamingPolicy for TbiNaming {
    fn fallback_channel(&self, requested: &str) -> Option<&str> {
        match requested {
            "abp" => Some("art"),
            _ => None,
        }
    }

    fn patient_id(&self, path: &Path) -> Result<String> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let rest = name
            .split("TBI_")
            .nth(1)
            .ok_or_else(|| ExtractError::PatternMismatch(name.to_string()))?;

        // The id is the first `_`-separated token of the word following the prefix.
        let token: &str = rest
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .next()
            .unwrap_or("");
        let id = token.split('_').next().unwrap_or("");
        if id.is_empty() {
            return Err(ExtractError::PatternMismatch(name.to_string()));
        }
        Ok(id.to_string())
    }
}
