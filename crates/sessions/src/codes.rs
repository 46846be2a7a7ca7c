use std::collections::HashMap;

use {rand::Rng, tracing::info};

const CODE_LENGTH: usize = 5;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Login codes mapping a short code to the display name it signs in as.
///
/// Lets people join without an external identity provider. Codes are
/// reusable and matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CodeBook {
    codes: HashMap<String, String>,
}

impl CodeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(codes: &HashMap<String, String>) -> Self {
        let mut book = Self::new();
        for (code, name) in codes {
            book.insert(code, name);
        }
        book
    }

    /// Display name for a presented code.
    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.codes.get(&normalize(code)).map(String::as_str)
    }

    /// Returns false (and stores nothing) if either side is blank.
    pub fn insert(&mut self, code: &str, display_name: &str) -> bool {
        let code = normalize(code);
        let display_name = display_name.trim();
        if code.is_empty() || display_name.is_empty() {
            return false;
        }
        self.codes.insert(code, display_name.to_string());
        true
    }

    /// Mint a new code for `display_name` that is not already in use.
    pub fn generate(&mut self, display_name: &str) -> Option<String> {
        if display_name.trim().is_empty() {
            return None;
        }
        let mut rng = rand::rng();
        let code = loop {
            let candidate: String = (0..CODE_LENGTH)
                .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.codes.contains_key(&candidate) {
                break candidate;
            }
        };
        self.insert(&code, display_name);
        info!(code = %code, display_name, "login code created");
        Some(code)
    }

    /// Codes sorted alphabetically.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .codes
            .iter()
            .map(|(c, n)| (c.as_str(), n.as_str()))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_trimmed() {
        let mut book = CodeBook::new();
        assert!(book.insert("abcde", "ann"));
        assert_eq!(book.lookup(" ABCDE "), Some("ann"));
        assert_eq!(book.lookup("abcde"), Some("ann"));
        assert_eq!(book.lookup("zzzzz"), None);
    }

    #[test]
    fn blank_entries_are_refused() {
        let mut book = CodeBook::new();
        assert!(!book.insert("  ", "ann"));
        assert!(!book.insert("ABCDE", "  "));
        assert!(book.is_empty());
        assert!(book.generate(" ").is_none());
    }

    #[test]
    fn generated_codes_are_unique_and_well_formed() {
        let mut book = CodeBook::new();
        for i in 0..50 {
            let code = book.generate(&format!("user{i}")).unwrap();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_uppercase()));
        }
        assert_eq!(book.len(), 50);
    }

    #[test]
    fn from_map_normalizes_keys() {
        let map = HashMap::from([("qwert".to_string(), "bob".to_string())]);
        let book = CodeBook::from_map(&map);
        assert_eq!(book.entries(), vec![("QWERT", "bob")]);
    }
}
