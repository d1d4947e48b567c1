//! Tug capability classes and the requirement-coverage law.
//!
//! Classes form a total order (`T117 < T118 < T119 < T120 < T130`).  A set of
//! assigned tugs *covers* a requirement list when both have the same length
//! and, after sorting each ascending, every requirement is at most the
//! paired assigned class.

use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Ordered tug capability class.  Higher classes subsume lower requirements.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapabilityClass {
    T117,
    T118,
    T119,
    T120,
    /// The largest class ("type 0" in harbour billing).
    T130,
}

impl CapabilityClass {
    pub const ALL: [CapabilityClass; 5] = [
        CapabilityClass::T117,
        CapabilityClass::T118,
        CapabilityClass::T119,
        CapabilityClass::T120,
        CapabilityClass::T130,
    ];

    /// Numeric billing code.
    pub fn code(self) -> u16 {
        match self {
            CapabilityClass::T117 => 117,
            CapabilityClass::T118 => 118,
            CapabilityClass::T119 => 119,
            CapabilityClass::T120 => 120,
            CapabilityClass::T130 => 130,
        }
    }

    pub fn from_code(code: u16) -> CoreResult<Self> {
        match code {
            117 => Ok(CapabilityClass::T117),
            118 => Ok(CapabilityClass::T118),
            119 => Ok(CapabilityClass::T119),
            120 => Ok(CapabilityClass::T120),
            // 121 is the legacy code of the largest class.
            121 | 130 => Ok(CapabilityClass::T130),
            other => Err(CoreError::UnknownClass(other)),
        }
    }

    /// Billing rate for one unit (one hour) of service at this class.
    pub fn hourly_rate(self) -> f64 {
        match self {
            CapabilityClass::T117 => 7_395.0,
            CapabilityClass::T118 => 10_846.0,
            CapabilityClass::T119 => 19_720.0,
            CapabilityClass::T120 => 22_310.0,
            CapabilityClass::T130 => 32_000.0,
        }
    }

    /// The next larger class, or `None` for the largest.
    pub fn next_up(self) -> Option<CapabilityClass> {
        match self {
            CapabilityClass::T117 => Some(CapabilityClass::T118),
            CapabilityClass::T118 => Some(CapabilityClass::T119),
            CapabilityClass::T119 => Some(CapabilityClass::T120),
            CapabilityClass::T120 => Some(CapabilityClass::T130),
            CapabilityClass::T130 => None,
        }
    }
}

impl fmt::Display for CapabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for CapabilityClass {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let code = s
            .trim()
            .parse::<u16>()
            .map_err(|_| CoreError::Parse(format!("invalid capability class {s:?}")))?;
        CapabilityClass::from_code(code)
    }
}

/// Parse a `;`-separated class list such as `"117;119"`.  Empty input gives
/// an empty list.
pub fn parse_class_list(s: &str) -> CoreResult<Vec<CapabilityClass>> {
    s.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect()
}

/// Format a class list the way [`parse_class_list`] reads it.
pub fn format_class_list(classes: &[CapabilityClass]) -> String {
    classes
        .iter()
        .map(|c| c.code().to_string())
        .collect::<Vec<_>>()
        .join(";")
}

// ── Coverage ──────────────────────────────────────────────────────────────────

/// `true` when `assigned` covers `required` pairwise after sorting.
pub fn covers(assigned: &[CapabilityClass], required: &[CapabilityClass]) -> bool {
    if assigned.len() != required.len() {
        return false;
    }
    let mut a = assigned.to_vec();
    let mut r = required.to_vec();
    a.sort_unstable();
    r.sort_unstable();
    r.iter().zip(&a).all(|(req, got)| req <= got)
}

/// How well one assigned class matches one required class.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchGrade {
    Exact,
    Over,
    Under,
}

impl MatchGrade {
    pub fn of(required: CapabilityClass, assigned: CapabilityClass) -> Self {
        match assigned.cmp(&required) {
            std::cmp::Ordering::Equal => MatchGrade::Exact,
            std::cmp::Ordering::Greater => MatchGrade::Over,
            std::cmp::Ordering::Less => MatchGrade::Under,
        }
    }
}

// ── Requirements ──────────────────────────────────────────────────────────────

/// Required classes for a ship of `weight` tonnes served by `count` tugs.
///
/// Ships of 100 000 t and above always need two of the largest class,
/// whatever `count` says.  Only `count` of 1 or 2 is defined.
pub fn required_classes(weight: f64, count: usize) -> CoreResult<Vec<CapabilityClass>> {
    use CapabilityClass::*;

    if !(1..=2).contains(&count) {
        return Err(CoreError::UnsupportedTugCount { count });
    }
    let one = count == 1;
    let classes = if weight < 5_000.0 {
        if one { vec![T117] } else { vec![T117, T117] }
    } else if weight < 10_000.0 {
        if one { vec![T118] } else { vec![T117, T117] }
    } else if weight < 15_000.0 {
        if one { vec![T118] } else { vec![T117, T118] }
    } else if weight < 30_000.0 {
        if one { vec![T119] } else { vec![T118, T119] }
    } else if weight < 45_000.0 {
        if one { vec![T119] } else { vec![T119, T119] }
    } else if weight < 60_000.0 {
        if one { vec![T120] } else { vec![T120, T120] }
    } else if weight < 100_000.0 {
        if one { vec![T130] } else { vec![T130, T130] }
    } else {
        vec![T130, T130]
    };
    Ok(classes)
}

/// Beaufort-style wind level (1–7) from wind speed in m/s.
pub fn wind_level(speed_ms: f64) -> u8 {
    const BRACKETS: [f64; 6] = [1.5, 3.3, 5.4, 7.9, 10.7, 13.8];
    BRACKETS
        .iter()
        .position(|&upper| speed_ms <= upper)
        .map_or(7, |i| i as u8 + 1)
}
