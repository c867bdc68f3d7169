//! Schema revisions of the pricing document format.

use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// A supported schema version. Declaration order is the upgrade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V1_0,
    V1_1,
    V1_2,
    V2_0,
}

impl Version {
    pub const LATEST: Version = Version::V2_0;

    pub const ALL: [Version; 4] = [Version::V1_0, Version::V1_1, Version::V1_2, Version::V2_0];

    pub fn major(self) -> u32 {
        match self {
            Version::V1_0 | Version::V1_1 | Version::V1_2 => 1,
            Version::V2_0 => 2,
        }
    }

    pub fn minor(self) -> u32 {
        match self {
            Version::V1_0 | Version::V2_0 => 0,
            Version::V1_1 => 1,
            Version::V1_2 => 2,
        }
    }

    /// The version one upgrade step above this one.
    pub fn next(self) -> Option<Version> {
        match self {
            Version::V1_0 => Some(Version::V1_1),
            Version::V1_1 => Some(Version::V1_2),
            Version::V1_2 => Some(Version::V2_0),
            Version::V2_0 => None,
        }
    }

    fn from_parts(major: u32, minor: u32) -> Option<Version> {
        Version::ALL
            .into_iter()
            .find(|v| v.major() == major && v.minor() == minor)
    }

    /// Read the `version` field of a raw document. YAML authors write both
    /// `version: "1.1"` and `version: 1.1`; the second arrives as a float.
    pub fn of_document(doc: &serde_yaml::Value) -> Result<Version, VersionError> {
        match doc.get("version") {
            None | Some(serde_yaml::Value::Null) => Err(VersionError::Missing),
            Some(serde_yaml::Value::String(s)) => s.parse(),
            Some(serde_yaml::Value::Number(n)) => match n.as_f64() {
                Some(f) if n.is_f64() => format!("{:?}", f).parse(),
                _ => Err(VersionError::Malformed(n.to_string())),
            },
            Some(other) => Err(VersionError::Malformed(format!("{:?}", other))),
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::Malformed(s.to_owned());
        let (major, minor) = s.split_once('.').ok_or_else(malformed)?;
        let well_formed = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !well_formed(major) || !well_formed(minor) {
            return Err(malformed());
        }
        let major: u32 = major.parse().map_err(|_| VersionError::Overflow {
            component: "major",
            raw: major.to_owned(),
        })?;
        let minor: u32 = minor.parse().map_err(|_| VersionError::Overflow {
            component: "minor",
            raw: minor.to_owned(),
        })?;
        Version::from_parts(major, minor).ok_or_else(|| VersionError::Unsupported(s.to_owned()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
