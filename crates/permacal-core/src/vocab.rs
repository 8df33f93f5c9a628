//! Controlled vocabularies: free-text attribute values to stable tokens.
//!
//! `"Plein soleil"` becomes `SUN_FULL`, `"Modéré"` becomes `WATER_MEDIUM`, so the
//! app can localize the label itself. Lookup ignores case, accents and
//! hyphen/space differences. Values that are already tokens are kept.

use crate::months::fold;

/// Result of mapping one free-text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tokenized {
    /// Exact vocabulary match, or already a token.
    Exact(String),
    /// Built from a range phrase whose ends both matched (`"Modéré à élevé"`).
    Approximate(String),
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    pub field: &'static str,
    /// Prefix shared by every token, if any.
    prefix: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

pub const SUN_EXPOSURE: Vocabulary = Vocabulary {
    field: "sunExposure",
    prefix: "SUN_",
    entries: &[
        ("plein soleil", "SUN_FULL"),
        ("full sun", "SUN_FULL"),
        ("mi soleil", "SUN_PARTIAL"),
        ("partial sun", "SUN_PARTIAL"),
        ("mi ombre", "SUN_PARTIAL_SHADE"),
        ("partial shade", "SUN_PARTIAL_SHADE"),
        ("ombre", "SUN_SHADE"),
        ("shade", "SUN_SHADE"),
    ],
};

pub const WATER_NEEDS: Vocabulary = Vocabulary {
    field: "waterNeeds",
    prefix: "WATER_",
    entries: &[
        ("faible", "WATER_LOW"),
        ("low", "WATER_LOW"),
        ("moyen", "WATER_MEDIUM"),
        ("modere", "WATER_MEDIUM"),
        ("medium", "WATER_MEDIUM"),
        ("moderate", "WATER_MEDIUM"),
        ("eleve", "WATER_HIGH"),
        ("high", "WATER_HIGH"),
    ],
};

pub const SEASONS: Vocabulary = Vocabulary {
    field: "season",
    prefix: "",
    entries: &[
        ("printemps", "SPRING"),
        ("spring", "SPRING"),
        ("ete", "SUMMER"),
        ("summer", "SUMMER"),
        ("automne", "AUTUMN"),
        ("autumn", "AUTUMN"),
        ("fall", "AUTUMN"),
        ("hiver", "WINTER"),
        ("winter", "WINTER"),
    ],
};

/// Scalar fields tokenized to a single value.
pub const SCALAR_VOCABULARIES: [Vocabulary; 2] = [SUN_EXPOSURE, WATER_NEEDS];

/// Season fields, tokenized to a list.
pub const SEASON_FIELDS: &[&str] = &["plantingSeason", "harvestSeason"];

pub const UNKNOWN_TOKEN: &str = "UNKNOWN";

const RANGE_WORDS: &[&str] = &[" a ", " to ", " - ", " au "];

impl Vocabulary {
    pub fn tokenize(&self, raw: &str) -> Tokenized {
        let raw = raw.trim();
        if self.is_token(raw) {
            return Tokenized::Exact(raw.to_string());
        }
        let key = simplify(raw);
        if let Some(token) = self.lookup(&key) {
            return Tokenized::Exact(token.to_string());
        }
        for word in RANGE_WORDS {
            if let Some((low, high)) = key.split_once(word)
                && let (Some(low), Some(high)) = (self.lookup(low.trim()), self.lookup(high.trim()))
            {
                let token = if low == high {
                    low.to_string()
                } else {
                    format!("{low}_{}", high.trim_start_matches(self.prefix))
                };
                return Tokenized::Approximate(token);
            }
        }
        Tokenized::Unknown
    }

    fn lookup(&self, key: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(text, _)| *text == key)
            .map(|(_, token)| *token)
    }

    fn is_token(&self, raw: &str) -> bool {
        if raw == UNKNOWN_TOKEN {
            return true;
        }
        let shaped = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_')
            && !raw.starts_with('_')
            && !raw.ends_with('_');
        if !shaped {
            return false;
        }
        if self.prefix.is_empty() {
            // Composite tokens join member tokens: `SPRING_SUMMER`.
            raw.split('_').all(|part| self.is_member(part))
        } else {
            // Known token, or a range composite `WATER_MEDIUM_HIGH`.
            self.is_member(raw)
                || self.tokens().any(|low| {
                    raw.strip_prefix(low)
                        .and_then(|rest| rest.strip_prefix('_'))
                        .is_some_and(|high| self.is_member(&format!("{}{high}", self.prefix)))
                })
        }
    }

    fn tokens(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(_, token)| *token)
    }

    fn is_member(&self, raw: &str) -> bool {
        self.tokens().any(|token| token == raw)
    }
}

/// Folded, hyphens as spaces, single-spaced.
fn simplify(raw: &str) -> String {
    fold(raw)
        .replace(['-', '\u{2013}'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_ignore_case_and_accents() {
        assert_eq!(
            SUN_EXPOSURE.tokenize("Plein soleil"),
            Tokenized::Exact("SUN_FULL".into())
        );
        assert_eq!(
            SUN_EXPOSURE.tokenize("mi-ombre"),
            Tokenized::Exact("SUN_PARTIAL_SHADE".into())
        );
        assert_eq!(
            WATER_NEEDS.tokenize("ÉLEVÉ"),
            Tokenized::Exact("WATER_HIGH".into())
        );
        assert_eq!(SEASONS.tokenize("Été"), Tokenized::Exact("SUMMER".into()));
    }

    #[test]
    fn range_phrase_is_approximated() {
        assert_eq!(
            WATER_NEEDS.tokenize("Modéré à élevé"),
            Tokenized::Approximate("WATER_MEDIUM_HIGH".into())
        );
        assert_eq!(
            WATER_NEEDS.tokenize("faible - moyen"),
            Tokenized::Approximate("WATER_LOW_MEDIUM".into())
        );
    }

    #[test]
    fn tokens_are_fixed_points() {
        for raw in ["WATER_MEDIUM_HIGH", "WATER_LOW", "UNKNOWN"] {
            assert_eq!(WATER_NEEDS.tokenize(raw), Tokenized::Exact(raw.into()));
        }
        assert_eq!(SEASONS.tokenize("SPRING"), Tokenized::Exact("SPRING".into()));
        assert_eq!(
            SEASONS.tokenize("printemps à été"),
            Tokenized::Approximate("SPRING_SUMMER".into())
        );
        assert_eq!(
            SEASONS.tokenize("SPRING_SUMMER"),
            Tokenized::Exact("SPRING_SUMMER".into())
        );
        assert_eq!(SEASONS.tokenize("WATER_LOW"), Tokenized::Unknown);
        assert_eq!(
            SUN_EXPOSURE.tokenize("SUN_FULL_PARTIAL_SHADE"),
            Tokenized::Exact("SUN_FULL_PARTIAL_SHADE".into())
        );
    }

    #[test]
    fn misspelled_tokens_are_not_kept() {
        assert_eq!(SUN_EXPOSURE.tokenize("SUN_FULLL"), Tokenized::Unknown);
        assert_eq!(WATER_NEEDS.tokenize("WATER_MEDIUM_HIHG"), Tokenized::Unknown);
        assert_eq!(WATER_NEEDS.tokenize("WATER_"), Tokenized::Unknown);
    }

    #[test]
    fn unmatched_values_are_unknown() {
        assert_eq!(WATER_NEEDS.tokenize("Selon la météo"), Tokenized::Unknown);
        assert_eq!(SUN_EXPOSURE.tokenize(""), Tokenized::Unknown);
    }
}
