//! FHIR release selection

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FHIR releases a view can declare
///
/// The release is resolved once, when a view is loaded, and decides which
/// evaluator the applicator is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FhirVersion {
    /// STU3 (3.0.x)
    Dstu3,
    /// R4 (4.0.x)
    #[default]
    R4,
    /// R5 (5.0.x)
    R5,
}

impl FhirVersion {
    /// Canonical version string of the release
    pub const fn version_string(&self) -> &'static str {
        match self {
            FhirVersion::Dstu3 => "3.0.2",
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R5 => "5.0.0",
        }
    }

    /// Whether the release defines the named data type
    ///
    /// Only types added or removed across STU3, R4 and R5 are listed; any
    /// other name is taken to exist in every release.
    pub fn has_type(&self, type_name: &str) -> bool {
        match self {
            FhirVersion::R5 => !R4_ONLY_TYPES.contains(&type_name),
            FhirVersion::Dstu3 | FhirVersion::R4 => !R5_ONLY_TYPES.contains(&type_name),
        }
    }
}

/// Data types introduced in R5
const R5_ONLY_TYPES: &[&str] = &[
    "integer64",
    "Availability",
    "CodeableReference",
    "ExtendedContactDetail",
    "RatioRange",
];

/// Data types dropped in R5
const R4_ONLY_TYPES: &[&str] = &["Contributor"];

impl FromStr for FhirVersion {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "STU3" | "DSTU3" | "R3" => return Ok(FhirVersion::Dstu3),
            "R4" => return Ok(FhirVersion::R4),
            "R5" => return Ok(FhirVersion::R5),
            _ => {}
        }

        // Numeric release strings: only major.minor decides the release
        let mut parts = trimmed.split('.');
        let major = parts.next().unwrap_or_default();
        let minor = parts.next().unwrap_or("0");
        match (major, minor) {
            ("3", "0") => Ok(FhirVersion::Dstu3),
            ("4", "0") => Ok(FhirVersion::R4),
            ("5", "0") => Ok(FhirVersion::R5),
            _ => Err(PathError::UnsupportedVersion {
                version: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FhirVersion::Dstu3 => write!(f, "STU3"),
            FhirVersion::R4 => write!(f, "R4"),
            FhirVersion::R5 => write!(f, "R5"),
        }
    }
}
