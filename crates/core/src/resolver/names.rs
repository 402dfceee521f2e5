//! Name normalisation and variation generation.
//!
//! Everything here is pure: the same input always yields the same output and
//! nothing depends on the token directory.

use lazy_static::lazy_static;
use regex::Regex;

use super::tables::{ALIASES, DESCRIPTORS, STOP_WORDS, TOKENLESS_NAMES, TOKENLESS_PATTERNS};

// ============================================================================
// PATTERNS
// ============================================================================

lazy_static! {
    /// Parenthesised text, e.g. "(Arbitrum)"
    static ref PARENTHESISED: Regex =
        Regex::new(r"\([^)]*\)").expect("Invalid regex pattern");

    /// Anything that is not a lower-case letter, digit, whitespace, '-' or '.'
    static ref PUNCTUATION: Regex =
        Regex::new(r"[^a-z0-9\s.\-]").expect("Invalid regex pattern");

    /// Version marker word: v2, v3.1
    static ref VERSION_MARKER: Regex =
        Regex::new(r"^v\d+(\.\d+)*$").expect("Invalid regex pattern");

    /// Trailing "on <chain>" clause
    static ref ON_CHAIN: Regex =
        Regex::new(r"\s+on\s+\S.*$").expect("Invalid regex pattern");
}

// ============================================================================
// CLEANING
// ============================================================================

/// Lower-case and collapse whitespace.
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Reduce a protocol name to its core.
///
/// Drops parenthesised text and punctuation (except `-` and `.`), a leading
/// "the", and then repeatedly strips trailing version markers, venue
/// descriptors and "by <x>" phrases. Never strips the last remaining word.
///
/// ```
/// use protocap_core::clean_name;
///
/// assert_eq!(clean_name("Uniswap V3"), "uniswap");
/// assert_eq!(clean_name("The Graph (Arbitrum)"), "graph");
/// assert_eq!(clean_name("PancakeSwap AMM V2"), "pancakeswap");
/// ```
pub fn clean_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let without_parens = PARENTHESISED.replace_all(&lower, " ");
    let without_punct = PUNCTUATION.replace_all(&without_parens, " ");

    let mut words: Vec<&str> = without_punct
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_ascii_alphanumeric()))
        .collect();

    if words.len() > 1 && words[0] == "the" {
        words.remove(0);
    }

    while let Some(&last) = words.last() {
        if words.len() == 1 {
            break;
        }
        if VERSION_MARKER.is_match(last) || DESCRIPTORS.contains(&last) {
            words.pop();
            continue;
        }
        if words.len() > 2 && words[words.len() - 2] == "by" {
            words.truncate(words.len() - 2);
            continue;
        }
        break;
    }

    words.join(" ")
}

// ============================================================================
// VARIATIONS
// ============================================================================

/// Ordered, de-duplicated search candidates for a protocol name.
///
/// Order: raw, cleaned, cleaned without a trailing "on <chain>", first
/// significant word, raw without version markers, then alias values.
pub fn name_variations(name: &str) -> Vec<String> {
    let raw = normalize(name);
    if raw.is_empty() {
        return Vec::new();
    }
    let cleaned = clean_name(name);

    let mut variations = Vec::new();
    push_unique(&mut variations, raw.clone());
    push_unique(&mut variations, cleaned.clone());
    push_unique(
        &mut variations,
        ON_CHAIN.replace(&cleaned, "").trim().to_string(),
    );
    if let Some(word) = first_significant_word(&cleaned) {
        push_unique(&mut variations, word.to_string());
    }
    push_unique(&mut variations, strip_version_markers(&raw));

    for (key, values) in ALIASES {
        if cleaned.contains(key) || raw.contains(key) {
            for value in values.iter() {
                push_unique(&mut variations, value.to_string());
            }
        }
    }

    variations
}

/// Whether the name belongs to a protocol known to have no token.
pub fn is_known_tokenless(name: &str) -> bool {
    let raw = normalize(name);
    if raw.is_empty() {
        return false;
    }
    let cleaned = clean_name(name);
    TOKENLESS_NAMES
        .iter()
        .any(|known| *known == raw || *known == cleaned)
        || TOKENLESS_PATTERNS.iter().any(|pattern| raw.contains(pattern))
}

fn first_significant_word(cleaned: &str) -> Option<&str> {
    cleaned
        .split_whitespace()
        .find(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(w))
}

fn strip_version_markers(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|w| !VERSION_MARKER.is_match(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_unique(variations: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !variations.contains(&candidate) {
        variations.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_strips_versions_and_descriptors() {
        assert_eq!(clean_name("Uniswap V3"), "uniswap");
        assert_eq!(clean_name("Aave v3.1"), "aave");
        assert_eq!(clean_name("Curve DEX"), "curve");
        assert_eq!(clean_name("Drift Protocol Perps"), "drift");
        assert_eq!(clean_name("Maple Finance"), "maple");
    }

    #[test]
    fn test_clean_name_punctuation_and_parens() {
        assert_eq!(clean_name("GMX (Arbitrum)"), "gmx");
        assert_eq!(clean_name("Pump.fun"), "pump.fun");
        assert_eq!(clean_name("Curve - DEX"), "curve");
        assert_eq!(clean_name("Jito's  Restaking!"), "jito s restaking");
    }

    #[test]
    fn test_clean_name_connector_phrase() {
        assert_eq!(clean_name("Perps by Drift"), "perps");
        assert_eq!(clean_name("Swap by Jupiter V2"), "swap");
    }

    #[test]
    fn test_clean_name_keeps_last_word() {
        assert_eq!(clean_name("Exchange"), "exchange");
        assert_eq!(clean_name("The"), "the");
        assert_eq!(clean_name("   "), "");
    }

    #[test]
    fn test_variations_order() {
        let variations = name_variations("PancakeSwap AMM");
        assert_eq!(variations, vec!["pancakeswap amm", "pancakeswap", "cake"]);
    }

    #[test]
    fn test_variations_on_chain_and_first_word() {
        let variations = name_variations("Aave Lending on Ethereum V2");
        assert_eq!(variations[0], "aave lending on ethereum v2");
        assert_eq!(variations[1], "aave lending on ethereum");
        assert_eq!(variations[2], "aave lending");
        assert_eq!(variations[3], "aave");
        assert!(variations.contains(&"aave lending on ethereum".to_string()));
    }

    #[test]
    fn test_variations_are_unique_and_non_empty() {
        for name in ["Uniswap V3", "Lido", "  ", "The Graph", "Rocket Pool (ETH)"] {
            let variations = name_variations(name);
            let mut deduped = variations.clone();
            deduped.dedup();
            assert_eq!(deduped.len(), variations.len());
            assert!(variations.iter().all(|v| !v.is_empty()));
        }
        assert!(name_variations("   ").is_empty());
    }

    #[test]
    fn test_aliases_follow_containment() {
        let variations = name_variations("Uniswap Labs");
        assert!(variations.contains(&"uni".to_string()));
        let variations = name_variations("Rocket Pool");
        assert!(variations.ends_with(&["rocket-pool".to_string(), "rpl".to_string()]));
    }

    #[test]
    fn test_known_tokenless() {
        assert!(is_known_tokenless("Tether"));
        assert!(is_known_tokenless("Coinbase Wallet"));
        assert!(is_known_tokenless("Phantom (Solana)"));
        assert!(is_known_tokenless("BONKbot trading bot"));
        assert!(!is_known_tokenless("Aave V3"));
        assert!(!is_known_tokenless(""));
    }
}
