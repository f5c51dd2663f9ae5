// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Supported STT language codes and normalization.

/// The closed set of language codes the STT service accepts, sorted so
/// membership checks can binary-search.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "am", "ar", "as", "az", "ba", "be", "bg", "bn", "bo", "br", "bs", "ca", "cs", "cy",
    "da", "de", "el", "en", "es", "et", "eu", "fa", "fi", "fo", "fr", "gl", "gu", "ha", "haw",
    "he", "hi", "hr", "ht", "hu", "hy", "id", "is", "it", "ja", "jv", "ka", "kk", "km", "kn",
    "ko", "la", "lb", "ln", "lo", "lt", "lv", "mg", "mi", "mk", "ml", "mn", "mr", "ms", "mt",
    "my", "ne", "nl", "nn", "no", "oc", "pa", "pl", "ps", "pt", "ro", "ru", "sa", "sd", "si",
    "sk", "sl", "sn", "so", "sq", "sr", "su", "sv", "sw", "ta", "te", "tg", "th", "tk", "tl",
    "tr", "tt", "uk", "ur", "uz", "vi", "yi", "yo", "yue", "zh",
];

/// Normalize a locale tag to a supported STT language code.
///
/// Region subtags are stripped (`pt-BR` -> `pt`, `zh_TW` -> `zh`); codes
/// outside the supported set are dropped entirely.
pub fn normalize_language(tag: &str) -> Option<String> {
    let base = tag.trim().split(['-', '_']).next()?.to_lowercase();
    if base.is_empty() {
        return None;
    }
    SUPPORTED_LANGUAGES.binary_search(&base.as_str()).ok()?;
    Some(base)
}
