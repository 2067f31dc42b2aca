//! Self-check for records that claim to be PII-masked.
//!
//! Masking happens upstream; this module only verifies the claim. A record
//! passes when it is flagged as masked and its text carries nothing that
//! looks like an email address or phone number.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::MemoryRecord;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

// International numbers with a leading `+`, a parenthesised area code, or
// 3-3-4 digit groups. Bare digit runs, dates and amounts are not phone-shaped.
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\+\d{1,3}(?:[\s.-]?\d){6,}",
        r"|\(\d{1,4}\)[\s.-]?\d{2,4}[\s.-]?\d{2,4}",
        r"|\b\d{3}[\s.-]\d{3}[\s.-]\d{4}\b",
    ))
    .expect("phone pattern is valid")
});

/// Whether the text contains an email- or phone-shaped substring
pub fn contains_pii(text: &str) -> bool {
    EMAIL.is_match(text) || PHONE.is_match(text)
}

/// Whether the record may be returned by retrieval
pub fn passes_gate(record: &MemoryRecord) -> bool {
    if !record.pii_masked {
        return false;
    }
    if contains_pii(&record.text) {
        tracing::debug!(
            record_id = %record.id,
            conversation_id = %record.conversation_id,
            "Record flagged as masked still contains PII, excluding"
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Speaker;

    #[test]
    fn test_detects_email_and_phone() {
        assert!(contains_pii("write to anna.berg@example.com later"));
        assert!(contains_pii("call me on +46 70 123 45 67"));
        assert!(contains_pii("number is 555-123-4567"));
        assert!(contains_pii("(08) 123 4567"));
        assert!(contains_pii("call 555 123 4567"));
        assert!(contains_pii("or 555.123.4567 after six"));
    }

    #[test]
    fn test_ignores_ordinary_text() {
        assert!(!contains_pii("see you at 10:30 on the 3rd"));
        assert!(!contains_pii("[EMAIL] and [PHONE] were masked"));
        assert!(!contains_pii("we walked 12 km in 2024"));
        assert!(!contains_pii("we meet on 2024-05-01 at the cafe"));
        assert!(!contains_pii("the flat costs 2 500 000 kr"));
        assert!(!contains_pii("order 1234567 shipped"));
        assert!(!contains_pii("born 01-05-1990, moved 2012"));
    }

    #[test]
    fn test_dated_record_passes_gate() {
        let text = "flight on 2024-05-01, ref 88812345";
        let record = MemoryRecord::builder("c", 1, Speaker::User, text)
            .pii_masked(true)
            .build()
            .unwrap();
        assert!(passes_gate(&record));
    }

    #[test]
    fn test_gate() {
        let masked = MemoryRecord::builder("c", 1, Speaker::User, "hi [NAME]")
            .pii_masked(true)
            .build()
            .unwrap();
        let unmasked = MemoryRecord::builder("c", 1, Speaker::User, "hi there")
            .build()
            .unwrap();
        let leaky = MemoryRecord::builder("c", 1, Speaker::User, "mail me: a@b.io")
            .pii_masked(true)
            .build()
            .unwrap();

        assert!(passes_gate(&masked));
        assert!(!passes_gate(&unmasked));
        assert!(!passes_gate(&leaky));
    }
}
