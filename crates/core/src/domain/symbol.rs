use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange qualifiers that model output and users sometimes put in front of a ticker.
const EXCHANGE_PREFIXES: &[&str] = &[
    "NASDAQ:",
    "NYSE:",
    "NYSEARCA:",
    "NYSEAMERICAN:",
    "AMEX:",
    "ARCA:",
    "BATS:",
    "OTC:",
    "US:",
];

/// Uppercases, strips exchange qualifiers and converts share-class dots to dashes.
///
/// Total: every input maps to some string, possibly empty.
pub fn normalize(raw: &str) -> String {
    let mut s = raw.trim().to_uppercase();
    while let Some(rest) = EXCHANGE_PREFIXES
        .iter()
        .find_map(|prefix| s.strip_prefix(*prefix))
    {
        s = rest.trim_start().to_string();
    }
    s.trim().replace('.', "-")
}

/// A normalized, non-empty security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Returns `None` when nothing is left after normalization.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = normalize(raw);
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
