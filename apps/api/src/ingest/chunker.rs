//! Sentence-aware text chunker.
//!
//! Splits at sentence boundaries (., ?, !, newline) while packing up to
//! `CHUNK_SIZE` characters per chunk, carrying `CHUNK_OVERLAP` trailing
//! characters into the next chunk so qualification lists are not cut
//! mid-sentence. A chunk may therefore hold up to
//! `CHUNK_SIZE + CHUNK_OVERLAP` characters.

/// Target chunk size in characters. 500 keeps a full "Requirements"
/// section of a typical posting inside one chunk.
pub const CHUNK_SIZE: usize = 500;
/// Characters carried over between neighboring chunks.
pub const CHUNK_OVERLAP: usize = 50;

/// Splits `text` into overlapping chunks. Empty or whitespace-only input
/// yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        for piece in split_max(sentence, max_chars) {
            let piece_len = piece.chars().count();
            if current_len > 0 && current_len + piece_len > max_chars {
                let tail = char_tail(&current, overlap).to_string();
                chunks.push(std::mem::take(&mut current));
                current = tail;
                current_len = current.chars().count();
            }
            current.push_str(piece);
            current_len += piece_len;
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

/// Splits after runs of sentence-ending characters, keeping the punctuation
/// attached to its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_was_boundary = false;

    for (i, c) in text.char_indices() {
        let is_boundary = matches!(c, '.' | '?' | '!' | '\n');
        if prev_was_boundary && !is_boundary {
            sentences.push(&text[start..i]);
            start = i;
        }
        prev_was_boundary = is_boundary;
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Hard-splits a boundary-free span into pieces of at most `max_chars`.
fn split_max(s: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (i, _) in s.char_indices() {
        if count == max_chars {
            pieces.push(&s[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < s.len() {
        pieces.push(&s[start..]);
    }
    pieces
}

/// Last `n` characters of `s`, starting at a char boundary.
fn char_tail(s: &str, n: usize) -> &str {
    let total = s.chars().count();
    if total <= n {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
