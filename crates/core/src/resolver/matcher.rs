//! The matching ladder over one directory snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use protocap_market_data::Coin;

use super::model::MatchMethod;

/// Minimum length of both sides of a partial (substring) match.
const MIN_PARTIAL_LEN: usize = 3;

/// Query words must be longer than this to take part in a fuzzy match.
/// Token-name words of any length are compared.
const MIN_FUZZY_WORD_LEN: usize = 2;

/// Lookup tables for one directory snapshot.
///
/// Exact rules go through hash maps; partial and fuzzy rules scan the
/// directory in its own order. Maps keep the first coin for a key so the
/// directory order also breaks ties for exact rules.
pub(crate) struct DirectoryIndex {
    coins: Arc<Vec<Coin>>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    by_symbol: HashMap<String, usize>,
    /// Lower-cased (name, id) per coin, aligned with `coins`.
    lowered: Vec<(String, String)>,
}

impl DirectoryIndex {
    pub fn build(coins: Arc<Vec<Coin>>) -> Self {
        let mut by_name = HashMap::with_capacity(coins.len());
        let mut by_id = HashMap::with_capacity(coins.len());
        let mut by_symbol = HashMap::with_capacity(coins.len());
        let mut lowered = Vec::with_capacity(coins.len());

        for (index, coin) in coins.iter().enumerate() {
            let name = coin.name.trim().to_lowercase();
            let id = coin.id.trim().to_lowercase();
            by_name.entry(name.clone()).or_insert(index);
            by_id.entry(id.clone()).or_insert(index);
            by_symbol
                .entry(coin.symbol.trim().to_lowercase())
                .or_insert(index);
            lowered.push((name, id));
        }

        Self {
            coins,
            by_name,
            by_id,
            by_symbol,
            lowered,
        }
    }

    /// Whether this index was built from `coins`.
    pub fn is_snapshot(&self, coins: &Arc<Vec<Coin>>) -> bool {
        Arc::ptr_eq(&self.coins, coins)
    }

    /// Run the ladder. The first rule that matches wins.
    ///
    /// `raw` is the whitespace-collapsed, lower-cased query; only it is
    /// compared against display names.
    pub fn find(&self, raw: &str, variations: &[String]) -> Option<(Coin, MatchMethod)> {
        if let Some(&index) = self.by_name.get(raw) {
            return Some(self.hit(index, MatchMethod::ExactName));
        }

        if let Some(index) = variations.iter().find_map(|v| self.by_id.get(v.as_str())) {
            return Some(self.hit(*index, MatchMethod::ExactId));
        }

        if let Some(index) = variations
            .iter()
            .find_map(|v| self.by_symbol.get(v.as_str()))
        {
            return Some(self.hit(*index, MatchMethod::Symbol));
        }

        for variation in variations {
            if variation.chars().count() < MIN_PARTIAL_LEN {
                continue;
            }
            if let Some(index) = self.lowered.iter().position(|(name, id)| {
                partial_match(variation, name) || partial_match(variation, id)
            }) {
                return Some(self.hit(index, MatchMethod::Partial));
            }
        }

        for variation in variations {
            let words: Vec<&str> = significant_words(variation).collect();
            if words.is_empty() {
                continue;
            }
            if let Some(index) = self
                .lowered
                .iter()
                .position(|(name, id)| fuzzy_match(&words, name, id))
            {
                return Some(self.hit(index, MatchMethod::Fuzzy));
            }
        }

        None
    }

    fn hit(&self, index: usize, method: MatchMethod) -> (Coin, MatchMethod) {
        (self.coins[index].clone(), method)
    }
}

fn partial_match(variation: &str, target: &str) -> bool {
    target.chars().count() >= MIN_PARTIAL_LEN
        && (target.contains(variation) || variation.contains(target))
}

fn fuzzy_match(words: &[&str], name: &str, id: &str) -> bool {
    words.iter().any(|word| {
        id.contains(word)
            || name
                .split_whitespace()
                .any(|name_word| name_word.contains(word) || word.contains(name_word))
    })
}

fn significant_words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > MIN_FUZZY_WORD_LEN)
}
