//! Child cardinality written as `min..max`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permitted number of occurrences of a child, `max == None` meaning
/// unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: Option<u32>,
}

impl Cardinality {
    /// `1..1`
    pub const EXACTLY_ONE: Self = Self {
        min: 1,
        max: Some(1),
    };

    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn is_required(self) -> bool {
        self.min >= 1
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

fn parse_bound(value: &str, text: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_cardinality(text, format!("'{value}' is not a number")))
}

impl FromStr for Cardinality {
    type Err = Error;

    /// Accepts `min..max`, `min..*` (also `n` or `unbounded`) and a single
    /// number meaning exactly that many.
    fn from_str(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_cardinality(text, "empty"));
        }
        let Some((min, max)) = trimmed.split_once("..") else {
            let exact = parse_bound(trimmed, text)?;
            return Ok(Self::new(exact, Some(exact)));
        };

        let min = parse_bound(min, text)?;
        let max = match max.trim() {
            "*" | "n" | "unbounded" => None,
            bound => Some(parse_bound(bound, text)?),
        };
        if let Some(max) = max {
            if max < min {
                return Err(Error::invalid_cardinality(
                    text,
                    "maximum is lower than minimum",
                ));
            }
        }
        Ok(Self::new(min, max))
    }
}
