use std::str::FromStr;

use nom::combinator::all_consuming;
use serde::Serialize;

use crate::grammar;

/// The repetition suffix written after a triple constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardinalityMarker {
    #[default]
    None,
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `{m}`, `{m,}`, `{m,*}` or `{m,n}`; `max` is `None` when unbounded.
    Range { min: u32, max: Option<u32> },
}

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum CardinalityError {
    #[display("invalid cardinality `{_0}`")]
    Malformed(#[error(not(source))] String),

    #[display("invalid cardinality: maximum {max} is smaller than minimum {min}")]
    Inverted { min: u32, max: u32 },
}

impl FromStr for CardinalityMarker {
    type Err = CardinalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(CardinalityMarker::None);
        }

        all_consuming(grammar::cardinality)(s)
            .map(|(_, marker)| marker)
            .map_err(|_| CardinalityError::Malformed(s.to_string()))
    }
}

/// How many values a property expects. `max == -1` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: i64,
}

impl Cardinality {
    pub const UNBOUNDED: i64 = -1;

    pub const EXACTLY_ONE: Cardinality = Cardinality { min: 1, max: 1 };

    pub fn resolve(marker: CardinalityMarker) -> Result<Self, CardinalityError> {
        let (min, max) = match marker {
            CardinalityMarker::None => (1, 1),
            CardinalityMarker::Optional => (0, 1),
            CardinalityMarker::ZeroOrMore => (0, Self::UNBOUNDED),
            CardinalityMarker::OneOrMore => (1, Self::UNBOUNDED),
            CardinalityMarker::Range { min, max: None } => (min, Self::UNBOUNDED),
            CardinalityMarker::Range { min, max: Some(max) } => {
                if max < min {
                    return Err(CardinalityError::Inverted { min, max });
                }
                (min, i64::from(max))
            }
        };

        Ok(Cardinality { min, max })
    }

    /// A property is required exactly when at least one value must be present.
    pub fn is_required(&self) -> bool {
        self.min >= 1
    }

    pub fn is_unbounded(&self) -> bool {
        self.max == Self::UNBOUNDED
    }

    pub fn max_bound(&self) -> Option<u32> {
        u32::try_from(self.max).ok()
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::EXACTLY_ONE
    }
}

impl FromStr for Cardinality {
    type Err = CardinalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cardinality::resolve(s.parse()?)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max_bound() {
            Some(max) => write!(f, "{{{},{max}}}", self.min),
            None => write!(f, "{{{},*}}", self.min),
        }
    }
}
