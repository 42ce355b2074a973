//! Shared primitive types used across the entire analysis.

use crate::error::{IdentityError, IdentityResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque institution identifier, trimmed. Never empty.
pub type InstitutionNumber = String;

/// The canonical analysis run identifier.
pub type RunId = String;

/// A calendar year-month. The ordering axis of every timeline.
///
/// Field order matters: the derived `Ord` sorts by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Rejects months outside 1..=12 and years outside the calendar range.
    pub fn new(year: i32, month: u32) -> IdentityResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(IdentityError::InvalidPeriod {
                year: year as i64,
                month: month as i64,
            });
        }
        Ok(Self { year, month })
    }

    /// Build from the raw integer columns of the source table.
    pub fn from_raw(year: i64, month: i64) -> IdentityResult<Self> {
        let y = i32::try_from(year).map_err(|_| IdentityError::InvalidPeriod { year, month })?;
        let m = u32::try_from(month).map_err(|_| IdentityError::InvalidPeriod { year, month })?;
        Self::new(y, m).map_err(|_| IdentityError::InvalidPeriod { year, month })
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Validated on construction, day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Inclusive range of calendar months from `self` to `end`.
    pub fn range_to(&self, end: Period) -> Vec<Period> {
        let mut out = Vec::new();
        let mut p = *self;
        while p <= end {
            out.push(p);
            p = p.next();
        }
        out
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The two entity roles an institution number can be reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Originator,
    Sponsor,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Originator, Role::Sponsor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Originator => "Originator",
            Self::Sponsor => "Sponsor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
