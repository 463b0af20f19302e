use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed field value from a parsed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Classifies an already trimmed field.
    ///
    /// Numbers must parse in full and be finite; anything else is kept as text.
    pub fn infer(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Null;
        }
        if raw.contains('.') {
            // Overflow to infinity stays text.
            if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
                return Self::Float(f);
            }
        } else if let Ok(i) = raw.parse::<i64>() {
            return Self::Integer(i);
        }
        Self::Text(raw.to_owned())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// The form used as a frequency key. `Null` renders empty but is never counted.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
