use std::collections::HashSet;

use sha2::{Digest, Sha256};

/// SHA-256 of `text`. Lowercase hex string.
pub fn fingerprint(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Fingerprints of code already seen during this session.
#[derive(Debug, Default)]
pub struct KnownCode {
    hashes: HashSet<String>,
}

impl KnownCode {
    pub fn seed<'a>(&mut self, texts: impl IntoIterator<Item = &'a str>) {
        self.hashes.extend(texts.into_iter().map(fingerprint));
    }

    /// Returns `true` the first time `text` is seen, and remembers it.
    pub fn observe(&mut self, text: &str) -> bool {
        self.hashes.insert(fingerprint(text))
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint("abc").len(), 64);
    }

    #[test]
    fn observe_reports_new_once() {
        let mut known = KnownCode::default();
        assert!(known.observe("fn main() {}"));
        assert!(!known.observe("fn main() {}"));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn seeded_text_is_not_new() {
        let mut known = KnownCode::default();
        known.seed(["let x = 1;", "let y = 2;"]);
        assert!(!known.observe("let y = 2;"));
        assert!(known.observe("let z = 3;"));
    }
}
