//! Reading time estimate

/// Default reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Number of whitespace-separated tokens in a text
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes needed to read `words`, rounded up
pub fn reading_minutes(words: usize, words_per_minute: usize) -> usize {
    words.div_ceil(words_per_minute.max(1))
}
