/// Maximum token length to index.
/// Longer runs are almost always pasted URLs or binary junk in descriptions.
const MAX_TOKEN_LENGTH: usize = 64;

/// Split free text into lowercase word tokens.
///
/// A token is a maximal run of alphanumeric characters. Punctuation, symbols
/// and whitespace all separate tokens, so "Echo-Delay (mono)" tokenizes to
/// ["echo", "delay", "mono"].
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                current.push(lower);
            }
        } else if !current.is_empty() {
            push_token(&mut tokens, &mut current);
        }
    }

    if !current.is_empty() {
        push_token(&mut tokens, &mut current);
    }

    tokens
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    if current.chars().count() <= MAX_TOKEN_LENGTH {
        tokens.push(std::mem::take(current));
    } else {
        current.clear();
    }
}
