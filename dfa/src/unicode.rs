// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

// Condensed Unicode general-category tables: the principal contiguous blocks
// of each category, inclusive bounds, plus the simple case mappings used by
// the case-insensitive lexer mode.
//
// TODO: regenerate with ucd-generate for full per-code-point coverage of the
// alternating-case Latin Extended blocks.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::range::SymbolRange;
use crate::symbol_set::SymbolSet;

pub const LETTER_UPPERCASE: &[(i32, i32)] = &[
    (0x41, 0x5a),       // A-Z
    (0xc0, 0xd6),       // Latin-1 À-Ö
    (0xd8, 0xde),       // Latin-1 Ø-Þ
    (0x189, 0x18b),     // Latin B Ɖ-Ƌ
    (0x391, 0x3a1),     // Greek Α-Ρ
    (0x3a3, 0x3ab),     // Greek Σ-Ϋ
    (0x400, 0x42f),     // Cyrillic Ѐ-Я
    (0x531, 0x556),     // Armenian Ա-Ֆ
    (0x10a0, 0x10c5),   // Georgian Ⴀ-Ⴥ
    (0x1f08, 0x1f0f),   // Greek extended
    (0x1fb8, 0x1fbb),
    (0xff21, 0xff3a),   // Fullwidth Ａ-Ｚ
    (0x10400, 0x10427), // Deseret
];

pub const LETTER_LOWERCASE: &[(i32, i32)] = &[
    (0x61, 0x7a),       // a-z
    (0xb5, 0xb5),       // micro sign
    (0xdf, 0xf6),       // Latin-1 ß-ö
    (0xf8, 0xff),       // Latin-1 ø-ÿ
    (0x3ac, 0x3ce),     // Greek ά-ώ
    (0x430, 0x45f),     // Cyrillic а-џ
    (0x561, 0x587),     // Armenian ա-և
    (0x1f00, 0x1f07),   // Greek extended
    (0x1fb0, 0x1fb4),
    (0xff41, 0xff5a),   // Fullwidth ａ-ｚ
    (0x10428, 0x1044f), // Deseret
];

pub const LETTER_TITLECASE: &[(i32, i32)] = &[
    (0x1c5, 0x1c5),
    (0x1c8, 0x1c8),
    (0x1cb, 0x1cb),
    (0x1f2, 0x1f2),
    (0x1f88, 0x1f8f),
    (0x1f98, 0x1f9f),
];

pub const LETTER_MODIFIER: &[(i32, i32)] = &[
    (0x2b0, 0x2c1),
    (0x2c6, 0x2d1),
    (0x374, 0x374),
    (0x559, 0x559),
    (0x6e5, 0x6e6),
    (0x3005, 0x3005),
    (0x30fc, 0x30fe),
];

pub const LETTER_OTHER: &[(i32, i32)] = &[
    (0xaa, 0xaa),
    (0xba, 0xba),
    (0x1bb, 0x1bb),
    (0x5d0, 0x5ea),     // Hebrew א-ת
    (0x620, 0x64a),     // Arabic
    (0x905, 0x939),     // Devanagari
    (0xe01, 0xe30),     // Thai
    (0x3041, 0x3096),   // Hiragana
    (0x30a1, 0x30fa),   // Katakana
    (0x4e00, 0x9fff),   // CJK unified ideographs
    (0xac00, 0xd7a3),   // Hangul syllables
    (0x20000, 0x2a6df), // CJK extension B
];

pub const MARK_NONSPACING: &[(i32, i32)] = &[
    (0x300, 0x36f),
    (0x483, 0x487),
    (0x591, 0x5bd),
    (0x610, 0x61a),
    (0x64b, 0x65f),
    (0x900, 0x902),
];

pub const MARK_SPACING: &[(i32, i32)] = &[(0x903, 0x903), (0x93b, 0x93b), (0x93e, 0x940)];

pub const MARK_ENCLOSING: &[(i32, i32)] = &[(0x488, 0x489), (0x20dd, 0x20e0)];

pub const NUMBER_DECIMAL: &[(i32, i32)] = &[
    (0x30, 0x39),       // 0-9
    (0x660, 0x669),     // Arabic-Indic
    (0x6f0, 0x6f9),     // Extended Arabic-Indic
    (0x966, 0x96f),     // Devanagari
    (0xe50, 0xe59),     // Thai
    (0xff10, 0xff19),   // Fullwidth
    (0x1d7ce, 0x1d7ff), // Mathematical digits
];

pub const NUMBER_LETTER: &[(i32, i32)] = &[(0x2160, 0x2182), (0x3007, 0x3007)];

pub const NUMBER_OTHER: &[(i32, i32)] = &[
    (0xb2, 0xb3),
    (0xb9, 0xb9),
    (0xbc, 0xbe),
    (0x2070, 0x2070),
    (0x2074, 0x2079),
    (0x2080, 0x2089),
];

pub const PUNCTUATION_CONNECTOR: &[(i32, i32)] = &[(0x5f, 0x5f), (0x203f, 0x2040), (0xff3f, 0xff3f)];

pub const PUNCTUATION_DASH: &[(i32, i32)] = &[(0x2d, 0x2d), (0x2010, 0x2015), (0x2e17, 0x2e17)];

pub const PUNCTUATION_OPEN: &[(i32, i32)] = &[
    (0x28, 0x28),
    (0x5b, 0x5b),
    (0x7b, 0x7b),
    (0x2045, 0x2045),
    (0x3008, 0x3008),
    (0x300a, 0x300a),
];

pub const PUNCTUATION_CLOSE: &[(i32, i32)] = &[
    (0x29, 0x29),
    (0x5d, 0x5d),
    (0x7d, 0x7d),
    (0x2046, 0x2046),
    (0x3009, 0x3009),
    (0x300b, 0x300b),
];

pub const PUNCTUATION_INITIAL: &[(i32, i32)] = &[(0xab, 0xab), (0x2018, 0x2018), (0x201c, 0x201c)];

pub const PUNCTUATION_FINAL: &[(i32, i32)] = &[(0xbb, 0xbb), (0x2019, 0x2019), (0x201d, 0x201d)];

pub const PUNCTUATION_OTHER: &[(i32, i32)] = &[
    (0x21, 0x23),
    (0x25, 0x27),
    (0x2a, 0x2a),
    (0x2c, 0x2c),
    (0x2e, 0x2f),
    (0x3a, 0x3b),
    (0x3f, 0x40),
    (0x5c, 0x5c),
    (0xa1, 0xa1),
    (0xbf, 0xbf),
    (0x2016, 0x2017),
    (0x3001, 0x3003),
];

pub const SYMBOL_MATH: &[(i32, i32)] = &[
    (0x2b, 0x2b),
    (0x3c, 0x3e),
    (0x7c, 0x7c),
    (0x7e, 0x7e),
    (0xac, 0xac),
    (0xb1, 0xb1),
    (0xd7, 0xd7),
    (0xf7, 0xf7),
    (0x2190, 0x2194),
    (0x2200, 0x22ff),
];

pub const SYMBOL_CURRENCY: &[(i32, i32)] = &[(0x24, 0x24), (0xa2, 0xa5), (0x20a0, 0x20bf)];

pub const SYMBOL_MODIFIER: &[(i32, i32)] = &[(0x5e, 0x5e), (0x60, 0x60), (0xa8, 0xa8), (0xb4, 0xb4)];

pub const SYMBOL_OTHER: &[(i32, i32)] = &[
    (0xa6, 0xa6),
    (0xa9, 0xa9),
    (0xae, 0xae),
    (0xb0, 0xb0),
    (0x2600, 0x26ff),
    (0x1f300, 0x1f5ff), // Pictographs
];

pub const SEPARATOR_SPACE: &[(i32, i32)] = &[
    (0x20, 0x20),
    (0xa0, 0xa0),
    (0x2000, 0x200a),
    (0x202f, 0x202f),
    (0x3000, 0x3000),
];

pub const SEPARATOR_LINE: &[(i32, i32)] = &[(0x2028, 0x2028)];

pub const SEPARATOR_PARAGRAPH: &[(i32, i32)] = &[(0x2029, 0x2029)];

pub const CONTROL_CONTROL: &[(i32, i32)] = &[(0x0, 0x1f), (0x7f, 0x9f)];

pub const CONTROL_FORMAT: &[(i32, i32)] = &[(0xad, 0xad), (0x200b, 0x200f), (0x2060, 0x2064)];

pub const CONTROL_SURROGATE: &[(i32, i32)] = &[(0xd800, 0xdfff)];

pub const CONTROL_PRIVATE: &[(i32, i32)] = &[(0xe000, 0xf8ff), (0xf0000, 0xffffd), (0x100000, 0x10fffd)];

/// Simple case mappings as (first, last, offset-to-other-case) over the
/// uppercase side; the alphabetic blocks where upper and lower case are a
/// fixed distance apart.
const UPPER_TO_LOWER: &[(i32, i32, i32)] = &[
    (0x41, 0x5a, 32),     // A-Z -> a-z
    (0xc0, 0xd6, 32),     // À-Ö -> à-ö
    (0xd8, 0xde, 32),     // Ø-Þ -> ø-þ
    (0x391, 0x3a1, 32),   // Α-Ρ -> α-ρ
    (0x3a3, 0x3ab, 32),   // Σ-Ϋ -> σ-ϋ
    (0x400, 0x40f, 80),   // Ѐ-Џ -> ѐ-џ
    (0x410, 0x42f, 32),   // А-Я -> а-я
    (0x531, 0x556, 48),   // Ա-Ֆ -> ա-ֆ
    (0xff21, 0xff3a, 32), // Ａ-Ｚ -> ａ-ｚ
    (0x10400, 0x10427, 40), // Deseret
];

fn table_pairs(code: &str) -> Vec<&'static [(i32, i32)]> {
    match code {
        "Lu" => vec![LETTER_UPPERCASE],
        "Ll" => vec![LETTER_LOWERCASE],
        "Lt" => vec![LETTER_TITLECASE],
        "Lm" => vec![LETTER_MODIFIER],
        "Lo" => vec![LETTER_OTHER],
        "L" => vec![
            LETTER_UPPERCASE,
            LETTER_LOWERCASE,
            LETTER_TITLECASE,
            LETTER_MODIFIER,
            LETTER_OTHER,
        ],
        "Mn" => vec![MARK_NONSPACING],
        "Mc" => vec![MARK_SPACING],
        "Me" => vec![MARK_ENCLOSING],
        "M" => vec![MARK_NONSPACING, MARK_SPACING, MARK_ENCLOSING],
        "Nd" => vec![NUMBER_DECIMAL],
        "Nl" => vec![NUMBER_LETTER],
        "No" => vec![NUMBER_OTHER],
        "N" => vec![NUMBER_DECIMAL, NUMBER_LETTER, NUMBER_OTHER],
        "Pc" => vec![PUNCTUATION_CONNECTOR],
        "Pd" => vec![PUNCTUATION_DASH],
        "Ps" => vec![PUNCTUATION_OPEN],
        "Pe" => vec![PUNCTUATION_CLOSE],
        "Pi" => vec![PUNCTUATION_INITIAL],
        "Pf" => vec![PUNCTUATION_FINAL],
        "Po" => vec![PUNCTUATION_OTHER],
        "P" => vec![
            PUNCTUATION_CONNECTOR,
            PUNCTUATION_DASH,
            PUNCTUATION_OPEN,
            PUNCTUATION_CLOSE,
            PUNCTUATION_INITIAL,
            PUNCTUATION_FINAL,
            PUNCTUATION_OTHER,
        ],
        "Sm" => vec![SYMBOL_MATH],
        "Sc" => vec![SYMBOL_CURRENCY],
        "Sk" => vec![SYMBOL_MODIFIER],
        "So" => vec![SYMBOL_OTHER],
        "S" => vec![SYMBOL_MATH, SYMBOL_CURRENCY, SYMBOL_MODIFIER, SYMBOL_OTHER],
        "Zs" => vec![SEPARATOR_SPACE],
        "Zl" => vec![SEPARATOR_LINE],
        "Zp" => vec![SEPARATOR_PARAGRAPH],
        "Z" => vec![SEPARATOR_SPACE, SEPARATOR_LINE, SEPARATOR_PARAGRAPH],
        "Cc" => vec![CONTROL_CONTROL],
        "Cf" => vec![CONTROL_FORMAT],
        "Cs" => vec![CONTROL_SURROGATE],
        "Co" => vec![CONTROL_PRIVATE],
        "C" => vec![
            CONTROL_CONTROL,
            CONTROL_FORMAT,
            CONTROL_SURROGATE,
            CONTROL_PRIVATE,
        ],
        _ => vec![],
    }
}

lazy_static! {
    static ref SYMBOLS_FOR_CATEGORY: BTreeMap<&'static str, SymbolSet> = {
        let codes = [
            "Lu", "Ll", "Lt", "Lm", "Lo", "L", "Mn", "Mc", "Me", "M", "Nd", "Nl", "No", "N",
            "Pc", "Pd", "Ps", "Pe", "Pi", "Pf", "Po", "P", "Sm", "Sc", "Sk", "So", "S", "Zs",
            "Zl", "Zp", "Z", "Cc", "Cf", "Cs", "Co", "C",
        ];
        let mut map = BTreeMap::new();
        for code in codes.iter() {
            let mut symbols = SymbolSet::new();
            for table in table_pairs(code) {
                for &(first, last) in table {
                    symbols.insert(SymbolRange::new(first, last + 1));
                }
            }
            map.insert(*code, symbols);
        }
        map
    };
}

/// The symbol set for a one- or two-letter general category code, or None if
/// the code is not recognised.
pub fn symbols_for_category(code: &str) -> Option<&'static SymbolSet> {
    SYMBOLS_FOR_CATEGORY.get(code)
}

/// Extends a symbol set with the other-case equivalents of its members.
pub fn case_fold_set(symbols: &SymbolSet) -> SymbolSet {
    let mut folded = symbols.clone();
    for range in symbols.iter() {
        for &(first, last, offset) in UPPER_TO_LOWER {
            // Uppercase members gain their lowercase equivalents
            let lower_bound = range.lower().max(first);
            let upper_bound = range.upper().min(last + 1);
            if lower_bound < upper_bound {
                folded.insert(SymbolRange::new(
                    lower_bound + offset,
                    upper_bound + offset,
                ));
            }
            // Lowercase members gain their uppercase equivalents
            let lower_bound = range.lower().max(first + offset);
            let upper_bound = range.upper().min(last + 1 + offset);
            if lower_bound < upper_bound {
                folded.insert(SymbolRange::new(
                    lower_bound - offset,
                    upper_bound - offset,
                ));
            }
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greek_letters_are_letters() {
        let letters = symbols_for_category("L").unwrap();
        for ch in ['α', 'β', 'γ'] {
            assert!(letters.contains(ch as i32), "{}", ch);
        }
        let lowercase = symbols_for_category("Ll").unwrap();
        assert!(lowercase.contains('α' as i32));
        assert!(!lowercase.contains('Α' as i32));
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(symbols_for_category("Q").is_none());
        assert!(symbols_for_category("").is_none());
    }

    #[test]
    fn case_folding_adds_both_cases() {
        let mut symbols = SymbolSet::from(SymbolRange::new('a' as i32, 'z' as i32 + 1));
        symbols.insert(SymbolRange::single('Γ' as i32));
        let folded = case_fold_set(&symbols);
        assert!(folded.contains('a' as i32));
        assert!(folded.contains('A' as i32));
        assert!(folded.contains('Z' as i32));
        assert!(folded.contains('γ' as i32));
        assert!(folded.contains('Γ' as i32));
        assert!(!folded.contains('0' as i32));
    }
}
