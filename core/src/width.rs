//! Half-width / full-width classification and conversion.
//!
//! These helpers look only at a character's own Unicode rendering, never at
//! the configured rule tables. They cover printable ASCII (including space),
//! katakana and the CJK punctuation that has a half-width counterpart.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Intrinsic width of a character or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormType {
    /// No half/full-width counterpart exists (kanji, hiragana, symbols, ...)
    #[default]
    Unknown,
    HalfWidth,
    FullWidth,
}

impl FormType {
    /// The other width; `Unknown` stays `Unknown`.
    pub fn opposite(self) -> FormType {
        match self {
            FormType::HalfWidth => FormType::FullWidth,
            FormType::FullWidth => FormType::HalfWidth,
            FormType::Unknown => FormType::Unknown,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            FormType::Unknown => 0,
            FormType::HalfWidth => 1,
            FormType::FullWidth => 2,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Option<FormType> {
        match v {
            1 => Some(FormType::HalfWidth),
            2 => Some(FormType::FullWidth),
            _ => None,
        }
    }
}

// Index-aligned: HALF_KANA[i] is the half-width rendering of FULL_KANA[i].
const HALF_KANA: &str = "｡｢｣､･ｦｧｨｩｪｫｬｭｮｯｰｱｲｳｴｵｶｷｸｹｺｻｼｽｾｿﾀﾁﾂﾃﾄﾅﾆﾇﾈﾉﾊﾋﾌﾍﾎﾏﾐﾑﾒﾓﾔﾕﾖﾗﾘﾙﾚﾛﾜﾝﾞﾟ";
const FULL_KANA: &str = "。「」、・ヲァィゥェォャュョッーアイウエオカキクケコサシスセソタチツテトナニヌネノハヒフヘホマミムメモヤユヨラリルレロワン゛゜";

const COMBINING_VOICED: char = '\u{3099}';
const COMBINING_SEMI_VOICED: char = '\u{309A}';
const HALF_VOICED: char = 'ﾞ';
const HALF_SEMI_VOICED: char = 'ﾟ';

fn half_kana_to_full(ch: char) -> Option<char> {
    let index = HALF_KANA.chars().position(|c| c == ch)?;
    FULL_KANA.chars().nth(index)
}

fn full_kana_to_half(ch: char) -> Option<char> {
    let index = FULL_KANA.chars().position(|c| c == ch)?;
    HALF_KANA.chars().nth(index)
}

/// Half-width rendering of a voiced katakana such as `ガ` (`ｶﾞ`).
fn voiced_kana_to_half(ch: char) -> Option<(char, char)> {
    if !('\u{30A1}'..='\u{30FA}').contains(&ch) {
        return None;
    }
    let mut parts = std::iter::once(ch).nfd();
    let base = full_kana_to_half(parts.next()?)?;
    let mark = match parts.next()? {
        COMBINING_VOICED => HALF_VOICED,
        COMBINING_SEMI_VOICED => HALF_SEMI_VOICED,
        _ => return None,
    };
    Some((base, mark))
}

/// Compose a full-width katakana base with a half-width voicing mark.
fn compose_voiced(base: char, mark: char) -> Option<char> {
    let combining = match mark {
        HALF_VOICED => COMBINING_VOICED,
        HALF_SEMI_VOICED => COMBINING_SEMI_VOICED,
        _ => return None,
    };
    let mut composed = [base, combining].into_iter().nfc();
    let first = composed.next()?;
    match composed.next() {
        None if first != base => Some(first),
        _ => None,
    }
}

/// Intrinsic width of a single character.
pub fn form_type_of(ch: char) -> FormType {
    match ch {
        ' '..='~' | '\u{FF61}'..='\u{FF9F}' => FormType::HalfWidth,
        '\u{FF01}'..='\u{FF5E}' | '\u{3000}' => FormType::FullWidth,
        _ if full_kana_to_half(ch).is_some() || voiced_kana_to_half(ch).is_some() => {
            FormType::FullWidth
        }
        _ => FormType::Unknown,
    }
}

/// Convert a single half-width character to full width, if it has a
/// full-width rendering.
pub fn char_to_fullwidth(ch: char) -> char {
    match ch {
        ' ' => '\u{3000}',
        '!'..='~' => char::from_u32(ch as u32 - 0x21 + 0xFF01).unwrap_or(ch),
        _ => half_kana_to_full(ch).unwrap_or(ch),
    }
}

/// Convert ASCII, half-width katakana and half-width CJK punctuation to
/// their full-width forms. Voicing marks following a half-width katakana
/// are composed (`ｶﾞ` becomes `ガ`).
///
/// Characters without a full-width form are passed through unchanged.
pub fn to_fullwidth(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        let full = char_to_fullwidth(ch);
        if full != ch && ('\u{FF66}'..='\u{FF9D}').contains(&ch) {
            if let Some(&mark) = chars.peek() {
                if let Some(voiced) = compose_voiced(full, mark) {
                    chars.next();
                    out.push(voiced);
                    continue;
                }
            }
        }
        out.push(full);
    }
    out
}

/// Convert full-width ASCII, ideographic space, katakana and CJK
/// punctuation back to their half-width forms. Voiced katakana decompose
/// into base plus voicing mark (`ガ` becomes `ｶﾞ`).
pub fn to_halfwidth(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        push_halfwidth(ch, &mut out);
    }
    out
}

pub(crate) fn push_halfwidth(ch: char, out: &mut String) {
    match ch {
        '\u{3000}' => out.push(' '),
        '\u{FF01}'..='\u{FF5E}' => out.push(char::from_u32(ch as u32 - 0xFF01 + 0x21).unwrap_or(ch)),
        _ => {
            if let Some(half) = full_kana_to_half(ch) {
                out.push(half);
            } else if let Some((base, mark)) = voiced_kana_to_half(ch) {
                out.push(base);
                out.push(mark);
            } else {
                out.push(ch);
            }
        }
    }
}

/// Convert only full-width ASCII (U+FF01–U+FF5E) and the ideographic space
/// to ASCII, leaving katakana and CJK punctuation alone.
pub fn fullwidth_ascii_to_halfwidth(s: &str) -> String {
    s.chars()
        .map(|ch| match ch {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(ch as u32 - 0xFF01 + 0x21).unwrap_or(ch),
            _ => ch,
        })
        .collect()
}

/// Render `s` in the requested width.
pub fn convert_to(s: &str, form: FormType) -> String {
    match form {
        FormType::HalfWidth => to_halfwidth(s),
        FormType::FullWidth => to_fullwidth(s),
        FormType::Unknown => s.to_string(),
    }
}
