//! Lookup key normalization.
//!
//! Stores compare normalized names only; callers produce them with a
//! [`LookupNormalizer`] before calling `find_by_name` and friends.

use unicode_normalization::UnicodeNormalization;

/// Canonicalizes names and emails for case-insensitive lookups.
pub trait LookupNormalizer: Send + Sync {
    fn normalize_name(&self, name: &str) -> String;

    fn normalize_email(&self, email: &str) -> String {
        self.normalize_name(email)
    }
}

/// NFC composition followed by uppercasing.
///
/// ```
/// use idstore_core::{LookupNormalizer, UpperInvariantNormalizer};
///
/// assert_eq!(UpperInvariantNormalizer.normalize_name("alice"), "ALICE");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UpperInvariantNormalizer;

impl LookupNormalizer for UpperInvariantNormalizer {
    fn normalize_name(&self, name: &str) -> String {
        name.nfc().collect::<String>().to_uppercase()
    }
}
