// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Post-release text cleanup.
//!
//! The extractor keeps overlap out, but re-transcription still leaves
//! stutters behind: the same phrase twice in a row, doubled punctuation,
//! stray spaces before terminators. This pass collapses them before the
//! segment is emitted.

const MAX_PHRASE_WORDS: usize = 10;
const MIN_PHRASE_WORDS: usize = 2;
const PHRASE_CONFIDENCE_FLOOR: f32 = 0.5;

/// Clean released sentence text.
///
/// Phrase deduplication only runs when the effective confidence is at or
/// above 0.5 - low-confidence text genuinely can repeat itself, and cutting
/// it would invent speech the STT never heard.
pub fn cleanup_text(text: &str, confidence: f32) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let deduped = if confidence >= PHRASE_CONFIDENCE_FLOOR {
        collapse_repeated_phrases(&collapsed)
    } else {
        collapsed
    };
    normalize_punctuation(&deduped)
}

/// Collapse adjacent duplicated phrases of 2..=10 words, longest first.
fn collapse_repeated_phrases(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let remaining = words.len() - i;
        let longest = (remaining / 2).min(MAX_PHRASE_WORDS);
        let mut matched = 0;
        for phrase_len in (MIN_PHRASE_WORDS..=longest).rev() {
            let first = &words[i..i + phrase_len];
            let second = &words[i + phrase_len..i + 2 * phrase_len];
            if first
                .iter()
                .zip(second.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
            {
                matched = phrase_len;
                break;
            }
        }
        if matched > 0 {
            out.extend_from_slice(&words[i..i + matched]);
            i += 2 * matched;
        } else {
            out.push(words[i]);
            i += 1;
        }
    }
    out.join(" ")
}

/// Collapse runs of identical terminators, strip whitespace before
/// punctuation, and guarantee one space between a terminator and a following
/// uppercase letter.
fn normalize_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        // "..", "!!" etc. collapse to one occurrence.
        if matches!(ch, '.' | '!' | '?') && prev == Some(ch) {
            continue;
        }
        if matches!(ch, ',' | ';' | ':' | '.' | '!' | '?') {
            while out.ends_with(' ') {
                out.pop();
            }
            prev = Some(ch);
            out.push(ch);
            continue;
        }
        if ch.is_uppercase() && prev.is_some_and(|p| matches!(p, '.' | '!' | '?')) {
            out.push(' ');
        }
        prev = Some(ch);
        out.push(ch);
    }
    out
}
