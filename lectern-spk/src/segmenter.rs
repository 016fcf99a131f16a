//! Sentence segmentation
//!
//! Punctuation heuristic: a sentence is a run of text closed by one or more
//! of `.`, `!`, `?` followed by whitespace (or the end of input). Text after
//! the last terminator becomes a final sentence. Abbreviations ("Mr."),
//! decimals and quoted punctuation are not special-cased.

/// Split `text` into ordered, trimmed, non-empty sentences.
pub fn segment(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        // Swallow the whole terminator run ("?!", "...")
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminator(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }

        let closes = match chars.peek() {
            Some(&(_, next)) => next.is_whitespace(),
            None => true,
        };
        if closes {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        push_trimmed(&mut sentences, &text[start..]);
    }

    sentences
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn push_trimmed(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}
