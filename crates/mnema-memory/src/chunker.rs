//! Word-boundary text chunking with trailing overlap.

/// Split `text` into chunks of at most `max_chars` characters, never breaking
/// inside a word.
///
/// Roughly `max_chars * overlap_fraction` characters of trailing words repeat
/// at the start of the next chunk so context survives the cut. A single word
/// longer than `max_chars` is emitted as its own chunk rather than truncated.
/// The chunk start index strictly increases, so the walk always terminates.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn chunk(text: &str, max_chars: usize, overlap_fraction: f32) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let overlap_budget = (max_chars as f32 * overlap_fraction.clamp(0.0, 1.0)) as usize;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let add = words[end].chars().count() + usize::from(len > 0);
            if len > 0 && len + add > max_chars {
                break;
            }
            len += add;
            end += 1;
        }

        chunks.push(words[start..end].join(" "));

        if end >= words.len() {
            break;
        }

        // Walk back from the cut to build the overlap prefix of the next chunk.
        let mut new_start = end;
        let mut overlap_len = 0;
        while new_start > start {
            let w = words[new_start - 1].chars().count() + 1;
            if overlap_len + w > overlap_budget {
                break;
            }
            overlap_len += w;
            new_start -= 1;
        }
        // The whole chunk fit in the overlap budget; skip the overlap to keep
        // the start index strictly increasing.
        if new_start <= start {
            new_start = end;
        }
        start = new_start;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", 100, 0.2).is_empty());
        assert!(chunk("   \n\t  ", 100, 0.2).is_empty());
    }

    #[test]
    fn short_input_single_chunk() {
        let chunks = chunk("hello world", 100, 0.2);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn words_never_broken() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk(text, 12, 0.2);
        let words: Vec<&str> = text.split_whitespace().collect();
        for c in &chunks {
            for w in c.split_whitespace() {
                assert!(words.contains(&w), "chunk contains fragment {w:?}");
            }
        }
    }

    #[test]
    fn chunks_respect_max_size() {
        let text = "one two three four five six seven eight nine ten";
        for c in chunk(text, 10, 0.0) {
            assert!(c.chars().count() <= 10, "chunk too long: {c:?}");
        }
    }

    #[test]
    fn oversize_word_emitted_whole() {
        let long = "a".repeat(50);
        let text = format!("short {long} tail");
        let chunks = chunk(&text, 10, 0.0);
        assert!(chunks.iter().any(|c| c == &long));
    }

    #[test]
    fn overlap_repeats_trailing_words() {
        let text = "aa bb cc dd ee ff gg hh";
        let chunks = chunk(text, 11, 0.5);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].split_whitespace().collect();
            let next_first = pair[1].split_whitespace().next().unwrap();
            assert!(
                prev_words.contains(&next_first),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn zero_overlap_partitions_words() {
        let text = "one two three four five six seven eight";
        let chunks = chunk(text, 12, 0.0);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn deterministic() {
        let text = "some repeated input with a fair number of words in it";
        assert_eq!(chunk(text, 15, 0.3), chunk(text, 15, 0.3));
    }

    #[test]
    fn first_and_last_words_preserved() {
        let text = "first middle1 middle2 middle3 middle4 last";
        let chunks = chunk(text, 14, 0.25);
        let first_chunk = chunks.first().unwrap();
        let last_chunk = chunks.last().unwrap();
        assert!(first_chunk.starts_with("first"));
        assert!(last_chunk.ends_with("last"));
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(1000))]

            #[test]
            fn chunk_never_panics(
                text in "\\PC{0,2000}",
                max_chars in 1usize..500,
                overlap in 0.0f32..1.0,
            ) {
                let _ = chunk(&text, max_chars, overlap);
            }

            #[test]
            fn every_word_appears(
                text in "[a-z ]{1,500}",
                max_chars in 5usize..100,
                overlap in 0.0f32..0.5,
            ) {
                let chunks = chunk(&text, max_chars, overlap);
                let all: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
                for word in text.split_whitespace() {
                    prop_assert!(all.contains(&word), "missing word {word:?}");
                }
            }

            #[test]
            fn no_empty_chunks(
                text in "[a-z ]{0,500}",
                max_chars in 1usize..100,
                overlap in 0.0f32..1.0,
            ) {
                for c in chunk(&text, max_chars, overlap) {
                    prop_assert!(!c.is_empty());
                }
            }

            #[test]
            fn zero_overlap_covers_exactly(
                text in "[a-z ]{1,500}",
                max_chars in 5usize..100,
            ) {
                let chunks = chunk(&text, max_chars, 0.0);
                let rejoined: Vec<&str> =
                    chunks.iter().flat_map(|c| c.split_whitespace()).collect();
                let original: Vec<&str> = text.split_whitespace().collect();
                prop_assert_eq!(rejoined, original);
            }
        }
    }
}
