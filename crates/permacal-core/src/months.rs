//! Month canonicalization.
//!
//! Source files spell months every way imaginable: `"F"`, `"Feb"`, `"février"`,
//! `3`, `"mar-jun"`, `"oct-nov, fév-avr"`. Everything is mapped onto the twelve
//! canonical 3-letter codes, stored as a calendar-ordered [`MonthSet`].
//!
//! Single letters are lossy (`J` is January, June or July). They go through a
//! [`MonthPolicy`]: a candidate table plus optional per-token overrides loaded
//! from a month-map file.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// 1-based month number.
    pub fn from_number(n: u64) -> Option<Self> {
        (1..=12).contains(&n).then(|| Self::ALL[(n - 1) as usize])
    }

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn code(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// Letter written to legacy single-letter lists.
    ///
    /// Fixed lookup rather than truncation of [`code`](Self::code), so the
    /// legacy alphabet is pinned independently of the canonical spelling.
    pub fn legacy_letter(self) -> &'static str {
        match self {
            Month::Jan | Month::Jun | Month::Jul => "J",
            Month::Feb => "F",
            Month::Mar | Month::May => "M",
            Month::Apr | Month::Aug => "A",
            Month::Sep => "S",
            Month::Oct => "O",
            Month::Nov => "N",
            Month::Dec => "D",
        }
    }

    /// Parse a full or abbreviated English or French month name, or a
    /// canonical code, ignoring case, accents and a trailing dot.
    pub fn from_name(token: &str) -> Option<Self> {
        let folded = fold(token.trim().trim_end_matches('.'));
        let month = match folded.as_str() {
            "jan" | "janv" | "january" | "janvier" => Month::Jan,
            "feb" | "fev" | "fevr" | "february" | "fevrier" => Month::Feb,
            "mar" | "mars" | "march" => Month::Mar,
            "apr" | "avr" | "april" | "avril" => Month::Apr,
            "may" | "mai" => Month::May,
            "jun" | "june" | "juin" => Month::Jun,
            "jul" | "juil" | "july" | "juillet" => Month::Jul,
            "aug" | "aou" | "august" | "aout" => Month::Aug,
            "sep" | "sept" | "september" | "septembre" => Month::Sep,
            "oct" | "october" | "octobre" => Month::Oct,
            "nov" | "november" | "novembre" => Month::Nov,
            "dec" | "december" | "decembre" => Month::Dec,
            _ => return None,
        };
        Some(month)
    }

    /// Months from `self` to `end` inclusive, wrapping past December.
    pub fn range_to(self, end: Month) -> Vec<Month> {
        let start = self as usize;
        let len = (end as usize + 12 - start) % 12 + 1;
        (0..len).map(|i| Self::ALL[(start + i) % 12]).collect()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lowercase and strip the French diacritics found in month names.
pub(crate) fn fold(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'û' | 'ù' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Calendar-ordered, duplicate-free set of months.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthSet(BTreeSet<Month>);

impl MonthSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, month: Month) {
        self.0.insert(month);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Month> + '_ {
        self.0.iter().copied()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.iter().map(Month::code).collect()
    }

    pub fn legacy_letters(&self) -> Vec<&'static str> {
        self.iter().map(Month::legacy_letter).collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.iter()
                .map(|m| Value::String(m.code().to_string()))
                .collect(),
        )
    }
}

impl FromIterator<Month> for MonthSet {
    fn from_iter<I: IntoIterator<Item = Month>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A month field, as actually found in the data.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthField {
    Missing,
    Tokens(Vec<Value>),
    FreeText(String),
}

impl MonthField {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(items)) => Self::Tokens(items.clone()),
            Some(Value::String(s)) => Self::FreeText(s.clone()),
            Some(other) => Self::Tokens(vec![other.clone()]),
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Tokens(items) => items.is_empty(),
            Self::FreeText(text) => text.trim().is_empty(),
        }
    }
}

/// Outcome of canonicalizing one month field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthResolution {
    pub months: MonthSet,
    /// Tokens that matched nothing.
    pub unknown: Vec<String>,
    /// Single letters resolved among several candidates, with the pick.
    pub ambiguous: Vec<(String, Month)>,
}

/// How single-letter and otherwise unrecognised tokens map to months.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthPolicy {
    /// Candidates per uppercase letter, earliest first.
    letters: BTreeMap<char, Vec<Month>>,
    /// Explicit token mappings; every listed month is included.
    overrides: BTreeMap<String, Vec<Month>>,
}

impl Default for MonthPolicy {
    fn default() -> Self {
        use Month::*;
        let letters = BTreeMap::from([
            ('J', vec![Jan, Jun, Jul]),
            ('F', vec![Feb]),
            ('M', vec![Mar, May]),
            ('A', vec![Apr, Aug]),
            ('S', vec![Sep]),
            ('O', vec![Oct]),
            ('N', vec![Nov]),
            ('D', vec![Dec]),
        ]);
        Self {
            letters,
            overrides: BTreeMap::new(),
        }
    }
}

impl MonthPolicy {
    /// Default letter table plus overrides from a month-map object
    /// (`token -> month | [month, ...]`, months as codes, names or numbers).
    ///
    /// Every invalid entry is collected before failing.
    pub fn from_month_map(value: &Value) -> Result<Self, CoreError> {
        let Value::Object(map) = value else {
            return Err(CoreError::MonthMapNotObject);
        };
        let mut policy = Self::default();
        let mut bad = Vec::new();
        for (token, target) in map {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let items: Vec<&Value> = match target {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            let mut months = Vec::new();
            for item in items {
                match month_from_value(item) {
                    Some(m) => {
                        if !months.contains(&m) {
                            months.push(m);
                        }
                    }
                    None => bad.push(format!("{token} -> {item}")),
                }
            }
            policy.overrides.insert(token.to_string(), months);
        }
        if bad.is_empty() {
            Ok(policy)
        } else {
            Err(CoreError::InvalidMonthMap(bad))
        }
    }

    pub fn overrides(&self) -> &BTreeMap<String, Vec<Month>> {
        &self.overrides
    }

    /// The effective mapping for every single letter and override, for
    /// recording in output metadata.
    pub fn to_month_map(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (letter, months) in &self.letters {
            let resolved = self.overrides.get(&letter.to_string()).unwrap_or(months);
            out.insert(letter.to_string(), codes_value(resolved));
        }
        for (token, months) in &self.overrides {
            out.insert(token.clone(), codes_value(months));
        }
        out
    }

    /// Canonicalize a month field.
    ///
    /// Ambiguous letters pick the earliest candidate after the previously
    /// resolved month in the same field (so `["M","J","J","A"]` reads as a run),
    /// falling back to the earliest candidate.
    pub fn resolve(&self, field: &MonthField) -> MonthResolution {
        let mut resolution = MonthResolution::default();
        let pieces: Vec<Piece> = match field {
            MonthField::Missing => return resolution,
            MonthField::Tokens(items) => items.iter().flat_map(pieces_of_value).collect(),
            MonthField::FreeText(text) => pieces_of_text(text),
        };

        let mut previous: Option<Month> = None;
        for piece in pieces {
            match piece {
                Piece::Single(token) => {
                    let months = self.resolve_token(&token, previous, &mut resolution);
                    if let Some(last) = months.last() {
                        previous = Some(*last);
                    }
                    for m in months {
                        resolution.months.insert(m);
                    }
                }
                Piece::Range(start, end) => {
                    let s = self.resolve_token(&start, previous, &mut resolution);
                    let e = self.resolve_token(&end, s.first().copied(), &mut resolution);
                    match (s.first(), e.last()) {
                        (Some(&s), Some(&e)) => {
                            for m in s.range_to(e) {
                                resolution.months.insert(m);
                            }
                            previous = Some(e);
                        }
                        // Half a range is still a month.
                        (Some(&m), None) | (None, Some(&m)) => {
                            resolution.months.insert(m);
                            previous = Some(m);
                        }
                        (None, None) => {}
                    }
                }
            }
        }
        resolution
    }

    fn resolve_token(
        &self,
        token: &str,
        previous: Option<Month>,
        resolution: &mut MonthResolution,
    ) -> Vec<Month> {
        let token = token.trim();
        if token.is_empty() {
            return Vec::new();
        }
        if let Some(months) = self
            .overrides
            .get(token)
            .or_else(|| self.overrides.get(&token.to_uppercase()))
        {
            return months.clone();
        }
        if let Ok(n) = token.parse::<u64>() {
            return match Month::from_number(n) {
                Some(m) => vec![m],
                None => {
                    resolution.unknown.push(token.to_string());
                    Vec::new()
                }
            };
        }
        if let Some(m) = Month::from_name(token) {
            return vec![m];
        }
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && let Some(candidates) = self.letters.get(&c.to_ascii_uppercase())
            && let Some(&first) = candidates.first()
        {
            if candidates.len() == 1 {
                return vec![first];
            }
            let pick = previous
                .and_then(|p| candidates.iter().copied().find(|&m| m > p))
                .unwrap_or(first);
            resolution.ambiguous.push((token.to_string(), pick));
            return vec![pick];
        }
        resolution.unknown.push(token.to_string());
        Vec::new()
    }
}

fn codes_value(months: &[Month]) -> Value {
    Value::Array(
        months
            .iter()
            .map(|m| Value::String(m.code().to_string()))
            .collect(),
    )
}

fn month_from_value(value: &Value) -> Option<Month> {
    match value {
        Value::Number(n) => n.as_u64().and_then(Month::from_number),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(Month::from_number)
            .or_else(|| Month::from_name(s)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Single(String),
    Range(String, String),
}

fn pieces_of_value(value: &Value) -> Vec<Piece> {
    match value {
        Value::String(s) => pieces_of_text(s),
        Value::Number(n) => vec![Piece::Single(n.to_string())],
        Value::Null => Vec::new(),
        other => vec![Piece::Single(other.to_string())],
    }
}

const DASHES: &[char] = &['-', '\u{2013}', '\u{2014}'];

/// Split `"oct-nov, fév-avr"` into ranges and single tokens.
fn pieces_of_text(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    for part in text.split([',', ';', '/']) {
        let part = part.trim();
        // A lone dash means "none".
        if part.is_empty() || part.chars().all(|c| DASHES.contains(&c)) {
            continue;
        }
        if let Some((start, end)) = part.split_once(DASHES) {
            pieces.push(Piece::Range(start.trim().to_string(), end.trim().to_string()));
            continue;
        }
        pieces.extend(
            part.split_whitespace()
                .map(|token| Piece::Single(token.to_string())),
        );
    }
    pieces
}
