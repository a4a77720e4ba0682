//! Item identifiers and alias string cleaning.

use rand::Rng;

const TIID_LEN: usize = 24;
const TIID_ALPHABET: &[u8] = b"0123456789abcdef";

/// Generates a fresh 24-character lowercase hex item id.
///
/// The core never derives a tiid from its aliases; callers that need a
/// stable id across resubmission must look one up via the item store first.
pub fn generate_tiid() -> String {
    let mut rng = rand::thread_rng();
    (0..TIID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..TIID_ALPHABET.len());
            TIID_ALPHABET[idx] as char
        })
        .collect()
}

/// Strips Unicode control characters and zero-width spaces from an alias
/// namespace or id, then trims surrounding whitespace.
pub fn clean_alias_string(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            let cp = *c as u32;
            let is_control = (0x0000..=0x001F).contains(&cp) || (0x007F..=0x009F).contains(&cp);
            let is_zero_width = cp == 0x200B;
            !is_control && !is_zero_width
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Canonicalises a namespace string: lowercase, with a small synonym table
/// mapping historical aliases to their canonical form.
pub fn canonical_namespace(raw: &str) -> String {
    let cleaned = clean_alias_string(raw).to_lowercase();
    match cleaned.as_str() {
        "digital object identifier" => "doi".to_string(),
        "iri" => "uri".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiid_has_expected_shape() {
        let tiid = generate_tiid();
        assert_eq!(tiid.len(), TIID_LEN);
        assert!(tiid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn two_tiids_differ() {
        assert_ne!(generate_tiid(), generate_tiid());
    }

    #[test]
    fn cleans_control_characters_and_trims() {
        let dirty = "\u{0007}10.1371/journal.pone.0000001\u{200B}  ";
        assert_eq!(clean_alias_string(dirty), "10.1371/journal.pone.0000001");
    }

    #[test]
    fn canonicalises_known_synonyms() {
        assert_eq!(canonical_namespace("Digital Object Identifier"), "doi");
        assert_eq!(canonical_namespace("IRI"), "uri");
        assert_eq!(canonical_namespace("DOI"), "doi");
    }
}
