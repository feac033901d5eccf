//! # Subject-Area Mapping
//!
//! Resolves a subject-area label, as read off a historical acta, to one of
//! the institution's known area codes.
//!
//! ## Matching
//!
//! Labels and catalog entries are normalized (uppercased, accents folded,
//! punctuation dropped, whitespace collapsed) and then scored:
//!
//! | Condition                                  | Score |
//! |--------------------------------------------|-------|
//! | equal to the area code or the area name    | 100   |
//! | one contains the other                     | 80    |
//! | otherwise: shared words / max word count   | 0–100 |
//!
//! The best candidate at or above the configured threshold wins. A score of
//! 100 is an exact match; anything lower is approximate and surfaced as a
//! warning with suggestions.

use serde::{Deserialize, Serialize};

/// An area code recognized by the institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownArea {
    pub code: String,
    pub name: String,
}

impl KnownArea {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Outcome of mapping one detected label.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaMatch {
    Exact {
        code: String,
    },
    Approximate {
        code: String,
        score: u8,
        suggestions: Vec<String>,
    },
    Unmapped {
        suggestions: Vec<String>,
    },
}

impl AreaMatch {
    /// The mapped code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Exact { code } | Self::Approximate { code, .. } => Some(code),
            Self::Unmapped { .. } => None,
        }
    }
}

/// The set of known areas for an institution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaCatalog {
    areas: Vec<KnownArea>,
}

const MAX_SUGGESTIONS: usize = 3;

impl AreaCatalog {
    pub fn new(areas: Vec<KnownArea>) -> Self {
        Self { areas }
    }

    /// Secondary-level curriculum areas used on actas from 1985 to 2012.
    pub fn standard() -> Self {
        Self::new(vec![
            KnownArea::new("MAT", "Matemática"),
            KnownArea::new("COM", "Comunicación"),
            KnownArea::new("ING", "Inglés"),
            KnownArea::new("ART", "Arte"),
            KnownArea::new("HGE", "Historia, Geografía y Economía"),
            KnownArea::new("CCSS", "Ciencias Sociales"),
            KnownArea::new("FCC", "Formación Ciudadana y Cívica"),
            KnownArea::new("PFRH", "Persona, Familia y Relaciones Humanas"),
            KnownArea::new("EFI", "Educación Física"),
            KnownArea::new("ERE", "Educación Religiosa"),
            KnownArea::new("CTA", "Ciencia, Tecnología y Ambiente"),
            KnownArea::new("EPT", "Educación para el Trabajo"),
            KnownArea::new("COMP", "Computación e Informática"),
        ])
    }

    pub fn areas(&self) -> &[KnownArea] {
        &self.areas
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Map a detected label against the catalog.
    pub fn map(&self, label: &str, threshold: u8) -> AreaMatch {
        let needle = normalize(label);
        if needle.is_empty() {
            return AreaMatch::Unmapped {
                suggestions: Vec::new(),
            };
        }

        let mut scored: Vec<(u8, &KnownArea)> = self
            .areas
            .iter()
            .map(|area| (score(&needle, area), area))
            .filter(|(s, _)| *s > 0)
            .collect();
        // Highest score first; ties broken by catalog code for stable output.
        scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.code.cmp(&b.code)));

        let suggestions: Vec<String> = scored
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, area)| area.code.clone())
            .collect();

        match scored.first() {
            Some((100, area)) => AreaMatch::Exact {
                code: area.code.clone(),
            },
            Some((s, area)) if *s >= threshold => AreaMatch::Approximate {
                code: area.code.clone(),
                score: *s,
                suggestions,
            },
            _ => AreaMatch::Unmapped { suggestions },
        }
    }
}

fn score(needle: &str, area: &KnownArea) -> u8 {
    let code = normalize(&area.code);
    let name = normalize(&area.name);
    if needle == code || needle == name {
        return 100;
    }
    // Containment is only meaningful for labels longer than an abbreviation.
    if needle.len() >= 3
        && !name.is_empty()
        && (name.contains(needle) || needle.contains(name.as_str()))
    {
        return 80;
    }
    let label_words: Vec<&str> = needle.split(' ').collect();
    let name_words: Vec<&str> = name.split(' ').collect();
    let shared = label_words
        .iter()
        .filter(|w| name_words.contains(w))
        .count();
    let denom = label_words.len().max(name_words.len());
    if denom == 0 {
        return 0;
    }
    ((shared * 100) / denom) as u8
}

/// Uppercase, fold Spanish accents, drop punctuation, collapse whitespace.
pub fn normalize(label: &str) -> String {
    let folded: String = label
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'A',
            'é' | 'É' => 'E',
            'í' | 'Í' => 'I',
            'ó' | 'Ó' => 'O',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'U',
            'ñ' | 'Ñ' => 'N',
            c if c.is_alphanumeric() => c.to_ascii_uppercase(),
            _ => ' ',
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
