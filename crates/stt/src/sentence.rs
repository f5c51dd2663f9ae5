// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Sentence-boundary buffering.
//!
//! Extractor output accumulates here until at least one complete sentence is
//! present and the blended confidence clears the configured threshold. Only
//! complete sentences are released; the trailing fragment stays buffered for
//! the next window.

/// Accumulated not-yet-released text plus a blended confidence scalar.
#[derive(Debug, Default)]
pub struct SentenceBuffer {
    text: String,
    confidence: f32,
    last_incoming: f32,
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self { text: String::new(), confidence: 1.0, last_incoming: 1.0 }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append extractor output with a joining space and blend its confidence
    /// into the buffer's (`c' = 0.5c + 0.5c_new`).
    pub fn push(&mut self, text: &str, confidence: f32) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
        self.last_incoming = confidence;
        self.confidence = if self.text.len() == text.len() {
            confidence
        } else {
            0.5 * self.confidence + 0.5 * confidence
        };
    }

    /// Release every complete sentence if one exists and the blended
    /// confidence clears `threshold`. The trailing incomplete fragment stays
    /// buffered; the blended confidence restarts optimistic at
    /// `blend(1, c_new)`.
    pub fn try_release(&mut self, threshold: f32) -> Option<String> {
        if self.confidence < threshold || !has_complete_sentence(&self.text) {
            return None;
        }

        let (complete, rest) = split_complete_sentences(&self.text);
        if complete.is_empty() {
            return None;
        }
        self.text = rest;
        self.confidence = 0.5f32.mul_add(self.last_incoming, 0.5);
        Some(complete)
    }

    /// Drop everything, e.g. on session reset.
    pub fn clear(&mut self) {
        self.text.clear();
        self.confidence = 1.0;
        self.last_incoming = 1.0;
    }
}

/// Whether the text contains a terminator that ends a sentence: preceded by
/// at least one non-terminator and followed by whitespace or end-of-string.
fn has_complete_sentence(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.iter().enumerate().any(|(i, &ch)| {
        is_terminator(ch)
            && chars.get(i + 1).is_none_or(|&next| next.is_whitespace())
            && chars[..i].iter().any(|&prev| !is_terminator(prev))
    })
}

const fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Split into (complete sentences, trailing fragment).
///
/// A complete sentence is a run of non-terminators followed by a run of
/// terminators that ends at whitespace or end-of-string.
fn split_complete_sentences(text: &str) -> (String, String) {
    let chars: Vec<char> = text.chars().collect();
    let mut consumed = 0; // chars covered by complete sentences
    let mut i = 0;
    while i < chars.len() {
        if is_terminator(chars[i]) {
            // Swallow the whole terminator run.
            let mut j = i;
            while j + 1 < chars.len() && is_terminator(chars[j + 1]) {
                j += 1;
            }
            // A run with nothing but terminators before it is not a
            // sentence ending.
            let preceded = chars[consumed..i].iter().any(|&prev| !is_terminator(prev));
            if preceded && chars.get(j + 1).is_none_or(|&next| next.is_whitespace()) {
                consumed = j + 1;
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }

    let complete: String = chars[..consumed].iter().collect();
    let rest: String = chars[consumed..].iter().collect();
    (complete.trim().to_string(), rest.trim().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_no_terminator_keeps_buffering() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("jumps over", 0.9);
        assert_eq!(buffer.try_release(0.45), None);
        assert_eq!(buffer.text(), "jumps over");
    }

    #[test]
    fn test_complete_sentence_is_released() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("then it rained.", 0.9);
        assert_eq!(buffer.try_release(0.45).unwrap(), "then it rained.");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragment_stays_behind() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("It rained. Then the sun came", 0.9);
        assert_eq!(buffer.try_release(0.45).unwrap(), "It rained.");
        assert_eq!(buffer.text(), "Then the sun came");
    }

    #[test]
    fn test_terminator_mid_token_does_not_release() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("the value is 3.14159", 0.9);
        assert_eq!(buffer.try_release(0.45), None);
    }

    #[test]
    fn test_multiple_sentences_released_together() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("One done. Two done! Three still going", 0.9);
        assert_eq!(buffer.try_release(0.45).unwrap(), "One done. Two done!");
        assert_eq!(buffer.text(), "Three still going");
    }

    #[test]
    fn test_terminators_alone_never_release() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("?!", 0.9);
        assert_eq!(buffer.try_release(0.45), None);
        assert_eq!(buffer.text(), "?!");
    }

    #[test]
    fn test_terminator_run_is_kept_whole() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("what?! really", 0.9);
        assert_eq!(buffer.try_release(0.45).unwrap(), "what?!");
        assert_eq!(buffer.text(), "really");
    }

    #[test]
    fn test_low_confidence_holds_release() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("sure thing.", 0.2);
        assert_eq!(buffer.try_release(0.45), None);
        // More confident speech blends the score back up: 0.5*0.2 + 0.5*0.95.
        buffer.push("absolutely.", 0.95);
        assert!((buffer.confidence() - 0.575).abs() < 1e-6);
        assert_eq!(buffer.try_release(0.45).unwrap(), "sure thing. absolutely.");
    }

    #[test]
    fn test_confidence_resets_on_release() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("done now.", 0.6);
        buffer.try_release(0.45).unwrap();
        // blend(1, 0.6) = 0.8
        assert!((buffer.confidence() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_first_push_takes_incoming_confidence() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("hello.", 0.3);
        assert_eq!(buffer.confidence(), 0.3);
    }

    #[test]
    fn test_empty_push_is_a_no_op() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("  ", 0.1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.confidence(), 1.0);
    }

    #[test]
    fn test_clear() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("something.", 0.4);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.confidence(), 1.0);
    }
}
