//! Positional grammars for Indian plate numbers and the letter/digit
//! correction applied to strings that match them.
//!
//! A position accepts a character that natively belongs to its class, or one
//! from the opposite class that OCR commonly confuses with it (`O`/`0`,
//! `B`/`8`, ...). Correction then rewrites each such character into the
//! class the position expects.

/// Number of characters in every supported plate.
pub const PLATE_LEN: usize = 10;

/// Letters that read as digits where a digit is expected.
const LETTER_TO_DIGIT: [(char, char); 8] = [
    ('O', '0'),
    ('I', '1'),
    ('J', '3'),
    ('A', '4'),
    ('G', '6'),
    ('S', '5'),
    ('B', '8'),
    ('Z', '2'),
];

/// Digits that read as letters where a letter is expected.
const DIGIT_TO_LETTER: [(char, char); 8] = [
    ('0', 'O'),
    ('1', 'I'),
    ('3', 'J'),
    ('4', 'A'),
    ('6', 'G'),
    ('5', 'S'),
    ('8', 'B'),
    ('2', 'Z'),
];

fn lookup(table: &[(char, char)], c: char) -> Option<char> {
    table.iter().find(|(from, _)| *from == c).map(|(_, to)| *to)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    Letter,
    Digit,
}

impl CharClass {
    /// Uppercase ASCII for letters, `0`-`9` for digits.
    pub fn is_native(self, c: char) -> bool {
        match self {
            CharClass::Letter => c.is_ascii_uppercase(),
            CharClass::Digit => c.is_ascii_digit(),
        }
    }

    /// Reading of an opposite-class character as a member of this class.
    pub fn from_opposite(self, c: char) -> Option<char> {
        match self {
            CharClass::Letter => lookup(&DIGIT_TO_LETTER, c),
            CharClass::Digit => lookup(&LETTER_TO_DIGIT, c),
        }
    }

    pub fn accepts(self, c: char) -> bool {
        self.is_native(c) || self.from_opposite(c).is_some()
    }

    /// Rewrite `c` into this class. Characters that are neither native nor
    /// correctable pass through unchanged.
    pub fn correct(self, c: char) -> char {
        if self.is_native(c) {
            c
        } else {
            self.from_opposite(c).unwrap_or(c)
        }
    }
}

use CharClass::{Digit, Letter};

const STANDARD_CLASSES: [CharClass; PLATE_LEN] = [
    Letter, Letter, Digit, Digit, Letter, Letter, Digit, Digit, Digit, Digit,
];

const BH_SERIES_CLASSES: [CharClass; PLATE_LEN] = [
    Digit, Digit, Letter, Letter, Digit, Digit, Digit, Digit, Letter, Letter,
];

/// Literal letters at positions 2 and 3 of a BH series plate.
const BH_MARKER: [char; 2] = ['B', 'H'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlateFormat {
    /// `LL NN LL NNNN`, e.g. `MH 20 DV 2366`.
    Standard,
    /// `NN BH NNNN LL`, e.g. `22 BH 1234 AA`.
    BhSeries,
}

impl PlateFormat {
    /// All formats in the order they are tried.
    pub const PRECEDENCE: [PlateFormat; 2] = [PlateFormat::Standard, PlateFormat::BhSeries];

    pub fn classes(self) -> &'static [CharClass; PLATE_LEN] {
        match self {
            PlateFormat::Standard => &STANDARD_CLASSES,
            PlateFormat::BhSeries => &BH_SERIES_CLASSES,
        }
    }

    /// Whether `text` matches this grammar, allowing correctable characters.
    pub fn verify(self, text: &str) -> bool {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() != PLATE_LEN {
            return false;
        }

        if self == PlateFormat::BhSeries && !has_bh_marker(&chars) {
            return false;
        }

        chars
            .iter()
            .zip(self.classes())
            .all(|(c, class)| class.accepts(*c))
    }

    /// Rewrite every position into the class this grammar expects there.
    ///
    /// Length preserving; characters past the grammar's length are copied as is.
    pub fn correct(self, text: &str) -> String {
        let classes = self.classes();
        text.chars()
            .enumerate()
            .map(|(i, c)| match classes.get(i) {
                Some(class) => class.correct(c),
                None => c,
            })
            .collect()
    }

    /// First format, in precedence order, that accepts `text`.
    pub fn detect(text: &str) -> Option<PlateFormat> {
        Self::PRECEDENCE
            .into_iter()
            .find(|format| format.verify(text))
    }
}

fn has_bh_marker(chars: &[char]) -> bool {
    chars[2..4]
        .iter()
        .zip(BH_MARKER)
        .all(|(c, expected)| Letter.correct(*c) == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_canonical(text: &str, format: PlateFormat) {
        assert_eq!(text.chars().count(), PLATE_LEN);
        for (c, class) in text.chars().zip(format.classes()) {
            assert!(class.is_native(c), "{c:?} in {text:?} is not a native {class:?}");
        }
    }

    #[test]
    fn standard_accepts_letter_read_as_digit() {
        assert!(PlateFormat::Standard.verify("MH2ODV2366"));
        assert_eq!(PlateFormat::Standard.correct("MH2ODV2366"), "MH20DV2366");
    }

    #[test]
    fn bh_series_resolves_marker_through_digit_table() {
        assert!(PlateFormat::BhSeries.verify("228H1234AA"));
        assert_eq!(PlateFormat::BhSeries.correct("228H1234AA"), "22BH1234AA");
    }

    #[test]
    fn bh_series_requires_marker() {
        assert!(!PlateFormat::BhSeries.verify("22BX1234AA"));
        assert!(!PlateFormat::BhSeries.verify("22HB1234AA"));
        assert!(PlateFormat::BhSeries.verify("22BH1234AA"));
    }

    #[test]
    fn wrong_length_is_rejected() {
        for format in PlateFormat::PRECEDENCE {
            assert!(!format.verify("MH20DV236"));
            assert!(!format.verify("MH20DV23666"));
            assert!(!format.verify(""));
        }
    }

    #[test]
    fn uncorrectable_characters_are_rejected() {
        // 'C' has no digit reading, '7' has no letter reading.
        assert!(!PlateFormat::Standard.verify("MHC0DV2366"));
        assert!(!PlateFormat::Standard.verify("7H20DV2366"));
        assert!(!PlateFormat::Standard.verify("MH20DV23-6"));
        assert!(!PlateFormat::Standard.verify("mh20dv2366"));
    }

    #[test]
    fn every_table_entry_is_accepted_in_the_opposite_class() {
        for (letter, digit) in LETTER_TO_DIGIT {
            assert_eq!(Digit.correct(letter), digit);
            assert_eq!(Letter.correct(digit), letter);
        }
        assert_eq!(LETTER_TO_DIGIT.len(), DIGIT_TO_LETTER.len());
    }

    #[test]
    fn uncorrectable_character_passes_through() {
        assert_eq!(Digit.correct('X'), 'X');
        assert_eq!(Letter.correct('7'), '7');
        assert_eq!(PlateFormat::Standard.correct("MH20DV2366XY"), "MH20DV2366XY");
    }

    #[test]
    fn correction_is_idempotent_and_canonical() {
        let samples = [
            ("MH2ODV2366", PlateFormat::Standard),
            ("0B12S0OIZB", PlateFormat::Standard),
            ("228H1234AA", PlateFormat::BhSeries),
            ("ZZBH0I5S40", PlateFormat::BhSeries),
        ];
        for (text, format) in samples {
            assert!(format.verify(text), "{text:?} should verify as {format:?}");
            let once = format.correct(text);
            assert_canonical(&once, format);
            assert_eq!(format.correct(&once), once);
            assert!(format.verify(&once));
        }
    }

    #[test]
    fn detect_tries_standard_first() {
        assert_eq!(PlateFormat::detect("MH20DV2366"), Some(PlateFormat::Standard));
        assert_eq!(PlateFormat::detect("22BH1234AA"), Some(PlateFormat::BhSeries));
        assert_eq!(PlateFormat::detect("XX-garbage"), None);
    }

    #[test]
    fn bh_plates_never_satisfy_standard() {
        // Position 3 must read as 'H', which has no digit reading, so a BH
        // plate can never be taken by the Standard grammar first.
        for text in ["22BH1234AA", "228H1234AA", "OOBHOOOOBB", "SSBHSSSS88"] {
            assert!(PlateFormat::BhSeries.verify(text));
            assert!(!PlateFormat::Standard.verify(text));
            assert_eq!(PlateFormat::detect(text), Some(PlateFormat::BhSeries));
        }
    }
}
