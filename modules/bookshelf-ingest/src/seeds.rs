// Bootstrap queries for filling an empty catalog.

const ENGLISH: &str = "abcdefghijklmnopqrstuvwxyz";
const RUSSIAN: &str = "абвгдеёжзийклмнопрстуфхцчшщьыъэюя";
const DIGITS: &str = "0123456789";

/// One single-character query per letter of the English and Russian
/// alphabets, then one per digit.
pub fn default_seed_queries() -> Vec<String> {
    [ENGLISH, RUSSIAN, DIGITS]
        .iter()
        .flat_map(|set| set.chars())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_both_alphabets_and_digits() {
        let queries = default_seed_queries();
        assert_eq!(queries.len(), 26 + 33 + 10);
        assert_eq!(queries.first().map(String::as_str), Some("a"));
        assert!(queries.iter().any(|q| q == "ё"));
        assert_eq!(queries.last().map(String::as_str), Some("9"));
    }

    #[test]
    fn queries_are_distinct() {
        let queries = default_seed_queries();
        let mut deduped = queries.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), queries.len());
    }
}
