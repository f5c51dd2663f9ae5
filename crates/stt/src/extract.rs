// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Overlap-aware incremental text extraction.
//!
//! Consecutive windows overlap by `window - stride`, so the STT re-hears most
//! of the previous window and repeats its transcript. Given everything
//! already emitted or buffered (the prior) and the STT text of the new
//! window, this module returns only the suffix that is actually new.
//!
//! All comparisons run on a normalized form (lowercase, whitespace collapsed
//! to single spaces, trimmed); the returned text is always the original-cased
//! suffix of the STT text.

const MAX_WORD_OVERLAP: usize = 50;
const MIN_WORD_OVERLAP: usize = 3;
const CHAR_TAIL: usize = 200;
const MIN_CHAR_OVERLAP: usize = 20;
const REDUNDANCY_RATIO: f32 = 0.7;

/// Lowercase, collapse whitespace runs to single spaces, trim.
pub fn normalize(text: &str) -> String {
    normalized_with_map(text).0
}

/// Normalize while keeping, for every normalized char, the byte index of the
/// original char that produced it. A collapsed space maps to the char that
/// follows the gap, so slicing at a space lands on the next word.
fn normalized_with_map(original: &str) -> (String, Vec<usize>) {
    let mut text = String::new();
    let mut map = Vec::new();
    let mut pending_space = false;
    for (idx, ch) in original.char_indices() {
        if ch.is_whitespace() {
            if !text.is_empty() {
                pending_space = true;
            }
            continue;
        }
        if pending_space {
            text.push(' ');
            map.push(idx);
            pending_space = false;
        }
        for lower in ch.to_lowercase() {
            text.push(lower);
            map.push(idx);
        }
    }
    (text, map)
}

/// Extract the new suffix of `current` relative to `prior`.
///
/// `prior` is the concatenation of emitted history and the pending sentence
/// buffer; `current` is the raw STT text of the new window. Rules are tried
/// in order and the first match wins:
///
/// 1. empty prior: everything is new
/// 2. prior already contains the text: nothing is new
/// 3. the text extends the prior verbatim: the extension is new
/// 4. word-boundary overlap between prior tail and text head
/// 5. character-tail overlap (catches mid-word window seams)
/// 6. high word redundancy: paraphrase drift near the seam, skip
/// 7. no overlap found: everything is new
pub fn extract_new_text(prior: &str, current: &str) -> String {
    let (c_norm, c_map) = normalized_with_map(current);
    if c_norm.is_empty() {
        return String::new();
    }
    let p_norm = normalize(prior);

    // Rule 1: nothing has been said yet.
    if p_norm.is_empty() {
        return current.trim().to_string();
    }

    // Rule 2: the window is entirely old news.
    if p_norm.contains(&c_norm) {
        return String::new();
    }

    // Rule 3: the window extends the prior verbatim.
    if c_norm.starts_with(&p_norm) {
        let offset = p_norm.chars().count();
        return suffix_from_norm_offset(current, &c_map, offset);
    }

    let p_words: Vec<&str> = p_norm.split_whitespace().collect();
    let c_words: Vec<&str> = c_norm.split_whitespace().collect();

    // Rule 4: the prior's last words are the window's first words.
    let c_orig_words: Vec<&str> = current.split_whitespace().collect();
    let max_overlap = p_words.len().min(c_words.len()).min(MAX_WORD_OVERLAP);
    for len in (MIN_WORD_OVERLAP..=max_overlap).rev() {
        if p_words[p_words.len() - len..] == c_words[..len] {
            return c_orig_words[len..].join(" ");
        }
    }

    // Rule 5: character-level tail overlap, for seams that cut words.
    let p_tail: Vec<char> = tail_chars(&p_norm, CHAR_TAIL);
    let c_head: Vec<char> = c_norm.chars().take(CHAR_TAIL).collect();
    let max_char_overlap = p_tail.len().min(c_head.len());
    for len in (MIN_CHAR_OVERLAP..=max_char_overlap).rev() {
        if p_tail[p_tail.len() - len..] == c_head[..len] {
            let cut = c_norm
                .chars()
                .enumerate()
                .skip(len)
                .find_map(|(i, ch)| (ch == ' ').then_some(i))
                .unwrap_or(len);
            return suffix_from_norm_offset(current, &c_map, cut);
        }
    }

    // Rule 6: mostly-repeated vocabulary in a window no longer than the
    // prior reads as re-transcription drift, not new speech.
    let mut unique: Vec<&str> = c_words.clone();
    unique.sort_unstable();
    unique.dedup();
    if !unique.is_empty() && c_words.len() <= p_words.len() {
        let known = unique.iter().filter(|w| p_words.contains(w)).count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = known as f32 / unique.len() as f32;
        if ratio > REDUNDANCY_RATIO {
            return String::new();
        }
    }

    // Rule 7: no overlap we recognize.
    current.trim().to_string()
}

fn suffix_from_norm_offset(original: &str, map: &[usize], offset: usize) -> String {
    if offset >= map.len() {
        return String::new();
    }
    original[map[offset]..].trim().to_string()
}

fn tail_chars(text: &str, n: usize) -> Vec<char> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].to_vec()
}
