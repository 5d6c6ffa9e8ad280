//! Tolerant INI reader for car physics files.
//!
//! Section and key names keep their original case for output, but every
//! lookup is case-insensitive. Bytes before the first `[` and lines that
//! are neither blank, comments, section headers nor `key=value` pairs are
//! dropped, so partially corrupt or binary-prefixed files still parse.
//! Repeated section names merge into the first occurrence and are
//! reported through [`ConfigDocument::duplicate_sections`].

use crate::error::{read_text_lossy, Result};
use std::path::Path;

/// `(section, key)` pair used by alias tables.
pub type KeyPath = (&'static str, &'static str);

#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    sections: Vec<Section>,
    duplicate_sections: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: &str, value: &str) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            slot.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }
}

impl ConfigDocument {
    /// Parses the file at `path`. Only a missing or unreadable file is an error.
    pub fn parse(path: &Path) -> Result<Self> {
        let text = read_text_lossy(path)?;
        Ok(Self::parse_str(&text))
    }

    pub fn parse_str(text: &str) -> Self {
        let mut doc = ConfigDocument::default();
        let body = match text.find('[') {
            Some(idx) => &text[idx..],
            None => return doc,
        };

        let mut current: Option<usize> = None;
        for line in body.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') {
                if let Some(name) = parse_header(trimmed) {
                    current = Some(doc.open_section(name));
                }
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if let Some(idx) = current {
                doc.sections[idx].insert(key, strip_inline_comment(value).trim());
            }
        }
        doc
    }

    fn open_section(&mut self, name: &str) -> usize {
        if let Some(idx) = self
            .sections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            self.duplicate_sections.push(name.to_string());
            return idx;
        }
        self.sections.push(Section::new(name));
        self.sections.len() - 1
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Names of sections that appeared more than once, in encounter order.
    pub fn duplicate_sections(&self) -> &[String] {
        &self.duplicate_sections
    }

    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    pub fn get_float(&self, section: &str, key: &str) -> Option<f64> {
        parse_f64(self.get_str(section, key)?)
    }

    pub fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        self.get_str(section, key)?.trim().parse().ok()
    }

    /// Comma-separated floats. Any malformed element makes the whole value absent.
    pub fn get_tuple_of_floats(&self, section: &str, key: &str) -> Option<Vec<f64>> {
        let raw = self.get_str(section, key)?;
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(parse_f64)
            .collect()
    }

    pub fn get_vec3(&self, section: &str, key: &str) -> Option<[f64; 3]> {
        match self.get_tuple_of_floats(section, key)?.as_slice() {
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    /// First candidate that yields a float wins.
    pub fn first_float(&self, candidates: &[KeyPath]) -> Option<f64> {
        candidates
            .iter()
            .find_map(|(section, key)| self.get_float(section, key))
    }

    pub fn first_str(&self, candidates: &[KeyPath]) -> Option<&str> {
        candidates
            .iter()
            .find_map(|(section, key)| self.get_str(section, key))
    }
}

fn parse_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?;
    let end = inner.rfind(']')?;
    let name = inner[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Drops a `;` comment that starts the value or follows whitespace.
fn strip_inline_comment(value: &str) -> &str {
    let mut prev_ws = true;
    for (idx, ch) in value.char_indices() {
        if ch == ';' && prev_ws {
            return &value[..idx];
        }
        prev_ws = ch.is_whitespace();
    }
    value
}

pub(crate) fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::ConfigDocument;

    #[test]
    fn strips_leading_garbage_and_corrupt_lines() {
        let doc = ConfigDocument::parse_str(
            "\u{1}\u{2}PK junk\n[BASIC]\nTOTALMASS=1200 ; kg\n\u{7}binary fragment\nINERTIA=1.1,1.2,3.5\n",
        );
        assert_eq!(doc.get_float("basic", "totalmass"), Some(1200.0));
        assert_eq!(
            doc.get_tuple_of_floats("BASIC", "INERTIA"),
            Some(vec![1.1, 1.2, 3.5])
        );
        assert_eq!(doc.section("BASIC").map(|s| s.entries().count()), Some(2));
    }

    #[test]
    fn duplicate_sections_merge_and_warn() {
        let doc = ConfigDocument::parse_str("[GEARS]\nCOUNT=6\n[gears]\nFINAL=3.9\n");
        assert_eq!(doc.duplicate_sections(), ["gears".to_string()]);
        assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["GEARS"]);
        assert_eq!(doc.get_int("GEARS", "COUNT"), Some(6));
        assert_eq!(doc.get_float("GEARS", "FINAL"), Some(3.9));
    }

    #[test]
    fn malformed_values_are_absent_not_errors() {
        let doc = ConfigDocument::parse_str("[CONTROLS]\nSTEER_LOCK=abc\nSTEER_RATIO=\nPOS=1,x,3\n");
        assert_eq!(doc.get_float("CONTROLS", "STEER_LOCK"), None);
        assert_eq!(doc.get_float("CONTROLS", "STEER_RATIO"), None);
        assert_eq!(doc.get_tuple_of_floats("CONTROLS", "POS"), None);
        assert_eq!(doc.get_float("MISSING", "KEY"), None);
    }

    #[test]
    fn first_float_follows_candidate_order() {
        let doc = ConfigDocument::parse_str("[FINAL]\nRATIO=4.1\nFINAL=3.2\n");
        let candidates = [("GEARS", "FINAL"), ("FINAL", "RATIO"), ("FINAL", "FINAL")];
        assert_eq!(doc.first_float(&candidates), Some(4.1));
    }

    #[test]
    fn inline_comment_requires_leading_whitespace() {
        let doc = ConfigDocument::parse_str("[INFO]\nSCREEN_NAME=EFVD;Drift ; trailing\n");
        assert_eq!(doc.get_str("INFO", "SCREEN_NAME"), Some("EFVD;Drift"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ConfigDocument::parse(std::path::Path::new("/definitely/not/here.ini"))
            .expect_err("missing file");
        assert!(err.is_not_found());
    }
}
