//! User property name formatting.
//!
//! Splits names at underscores, whitespace and camel-case boundaries, then
//! re-joins the words with single spaces in the configured case.

use serde::{Deserialize, Serialize};

/// How user property names are rewritten before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFormat {
    /// Names are sent exactly as given.
    #[default]
    None,
    /// `"PropP"` becomes `"Prop p"`.
    SentenceCase,
    /// `"PropP"` becomes `"Prop P"`.
    TitleCase,
    /// `"PropP"` becomes `"prop p"`.
    LowerCase,
}

impl std::fmt::Display for NameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::SentenceCase => write!(f, "sentence_case"),
            Self::TitleCase => write!(f, "title_case"),
            Self::LowerCase => write!(f, "lower_case"),
        }
    }
}

impl std::str::FromStr for NameFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" | "" => Ok(Self::None),
            "sentence_case" | "sentence" => Ok(Self::SentenceCase),
            "title_case" | "title" => Ok(Self::TitleCase),
            "lower_case" | "lower" => Ok(Self::LowerCase),
            other => Err(format!("unknown name format: {other}")),
        }
    }
}

impl NameFormat {
    /// Apply this format to a property name.
    pub fn apply(self, name: &str) -> String {
        if self == Self::None {
            return name.to_string();
        }

        let words = split_words(name);
        if words.is_empty() {
            return name.to_string();
        }
        let formatted: Vec<String> = words
            .iter()
            .enumerate()
            .map(|(i, word)| match self {
                Self::TitleCase => capitalize(word),
                Self::SentenceCase if i == 0 => capitalize(&word.to_lowercase()),
                Self::SentenceCase | Self::LowerCase => word.to_lowercase(),
                Self::None => word.to_string(),
            })
            .collect();
        formatted.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Break a name into words.
///
/// A new word starts after `_`/whitespace, at a lower-to-upper transition
/// (`propP`), and before the last capital of an acronym run (`HTTPServer`).
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}
