use crate::utils::tokenizer::tokenize;

/// Extract character n-grams of a single word for sizes in `min..=max`.
///
/// Works on character boundaries, so multi-byte text never slices mid-char.
/// A word shorter than `min` characters yields nothing, matching the
/// "fragments at least min long" contract of fuzzy fields.
pub fn word_ngrams(word: &str, min: usize, max: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut grams = Vec::new();

    if min == 0 || max < min {
        return grams;
    }

    for size in min..=max.min(chars.len()) {
        for window in chars.windows(size) {
            grams.push(window.iter().collect());
        }
    }

    grams
}

/// Tokenize free text and extract the deduplicated n-grams of every word.
pub fn text_ngrams(text: &str, min: usize, max: usize) -> Vec<String> {
    let mut grams = Vec::new();
    for token in tokenize(text) {
        grams.extend(word_ngrams(&token, min, max));
    }
    grams.sort_unstable();
    grams.dedup();
    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_ngrams_range() {
        let grams = word_ngrams("delay", 3, 5);
        assert!(grams.contains(&"del".to_string()));
        assert!(grams.contains(&"elay".to_string()));
        assert!(grams.contains(&"delay".to_string()));
        // sizes 3 + 4 + 5 over 5 chars: 3 + 2 + 1
        assert_eq!(grams.len(), 6);
    }

    #[test]
    fn test_word_shorter_than_min() {
        assert!(word_ngrams("eq", 3, 5).is_empty());
    }

    #[test]
    fn test_word_ngrams_unicode() {
        let grams = word_ngrams("überdrive", 3, 3);
        assert_eq!(grams[0], "übe");
    }

    #[test]
    fn test_text_ngrams_spans_words() {
        let grams = text_ngrams("Echo Delay", 3, 5);
        assert!(grams.contains(&"echo".to_string()));
        assert!(grams.contains(&"delay".to_string()));
        // grams never cross a word boundary
        assert!(!grams.contains(&"o d".to_string()));
    }

    #[test]
    fn test_text_ngrams_dedup() {
        let grams = text_ngrams("lo lo", 2, 2);
        assert_eq!(grams, vec!["lo".to_string()]);
    }
}
