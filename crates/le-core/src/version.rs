//! Four-field semantic version algebra (C7)
//!
//! Deliberately not the `semver` crate: that crate's `Version` carries
//! string pre-release/build metadata, while this spec's version is a
//! total-order 4-tuple of unsigned integers with no string component.
//! Pre-release status is tracked separately, by the registry entry that
//! carries a version, not by the version value itself (see
//! `le-plugin::PluginMetadata::prerelease`).

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A `(major, minor, patch, build)` version, totally ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub build: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64, build: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Parse `"M.m.p"` or `"M.m.p.b"`. Any other shape is `InvalidArgument`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(CoreError::InvalidArgument(format!(
                "version must have 3 or 4 dot-separated fields, got {:?}",
                s
            )));
        }

        let mut fields = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            fields[i] = part.parse::<u64>().map_err(|_| {
                CoreError::InvalidArgument(format!("invalid version field {:?} in {:?}", part, s))
            })?;
        }

        Ok(Self::new(fields[0], fields[1], fields[2], fields[3]))
    }

    /// Render symmetric to `parse`: omit `.build` when it is zero.
    pub fn render(&self) -> String {
        if self.build == 0 {
            format!("{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            format!("{}.{}.{}.{}", self.major, self.minor, self.patch, self.build)
        }
    }

    /// `min <= self && (max.is_none() || self <= max)`
    pub fn satisfies(&self, min: &Version, max: Option<&Version>) -> bool {
        min <= self && max.is_none_or(|max| self <= max)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_three_field() {
        let v = Version::parse("1.0.0").unwrap();
        assert_eq!(v, Version::new(1, 0, 0, 0));
        assert_eq!(v.render(), "1.0.0");
    }

    #[test]
    fn parse_four_field_round_trips() {
        let v = Version::parse("1.0.0.123").unwrap();
        assert_eq!(v.render(), "1.0.0.123");
    }

    #[test]
    fn parse_rejects_two_field() {
        assert!(Version::parse("1.0").is_err());
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!(Version::parse("1.a.0").is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(Version::parse("1.0.0").unwrap() < Version::parse("1.0.1").unwrap());
        assert!(Version::parse("1.0.1").unwrap() < Version::parse("1.1.0").unwrap());
        assert!(Version::parse("1.1.0").unwrap() < Version::parse("2.0.0").unwrap());
    }

    #[test]
    fn compare_is_antisymmetric_and_reflexive() {
        let a = Version::parse("1.2.3").unwrap();
        let b = Version::parse("1.2.4").unwrap();
        assert_eq!(a.cmp(&a), std::cmp::Ordering::Equal);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn satisfies_range() {
        let v = Version::parse("1.5.0").unwrap();
        let min = Version::parse("1.0.0").unwrap();
        let max = Version::parse("1.9.9.9").unwrap();
        assert!(v.satisfies(&min, Some(&max)));
        assert!(v.satisfies(&min, None));

        let too_high = Version::parse("2.0.0").unwrap();
        assert!(!too_high.satisfies(&min, Some(&max)));
    }

    #[test]
    fn parse_render_round_trip_property() {
        let cases = [
            Version::new(0, 0, 0, 0),
            Version::new(1, 2, 3, 0),
            Version::new(9, 8, 7, 6),
            Version::new(u64::MAX, 0, 0, 0),
        ];
        for v in cases {
            assert_eq!(Version::parse(&v.render()).unwrap(), v);
        }
    }
}
