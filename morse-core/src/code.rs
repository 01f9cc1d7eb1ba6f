//! International Morse code table

use heapless::String;

use crate::types::PulseSymbol;
use crate::types::PulseSymbol::{Gap as G, Long as L, Short as S};

/// Longest symbol sequence in the table
pub const MAX_SYMBOLS: usize = 5;

/// Character to symbol sequence, letters, digits and the word space
pub static CODE_TABLE: [(char, &[PulseSymbol]); 37] = [
    ('A', &[S, L]),
    ('B', &[L, S, S, S]),
    ('C', &[L, S, L, S]),
    ('D', &[L, S, S]),
    ('E', &[S]),
    ('F', &[S, S, L, S]),
    ('G', &[L, L, S]),
    ('H', &[S, S, S, S]),
    ('I', &[S, S]),
    ('J', &[S, L, L, L]),
    ('K', &[L, S, L]),
    ('L', &[S, L, S, S]),
    ('M', &[L, L]),
    ('N', &[L, S]),
    ('O', &[L, L, L]),
    ('P', &[S, L, L, S]),
    ('Q', &[L, L, S, L]),
    ('R', &[S, L, S]),
    ('S', &[S, S, S]),
    ('T', &[L]),
    ('U', &[S, S, L]),
    ('V', &[S, S, S, L]),
    ('W', &[S, L, L]),
    ('X', &[L, S, S, L]),
    ('Y', &[L, S, L, L]),
    ('Z', &[L, L, S, S]),
    ('0', &[L, L, L, L, L]),
    ('1', &[S, L, L, L, L]),
    ('2', &[S, S, L, L, L]),
    ('3', &[S, S, S, L, L]),
    ('4', &[S, S, S, S, L]),
    ('5', &[S, S, S, S, S]),
    ('6', &[L, S, S, S, S]),
    ('7', &[L, L, S, S, S]),
    ('8', &[L, L, L, S, S]),
    ('9', &[L, L, L, L, S]),
    (' ', &[G]),
];

/// Look up the symbol sequence for an (uppercase) character
pub fn lookup(ch: char) -> Option<&'static [PulseSymbol]> {
    CODE_TABLE
        .iter()
        .find(|(key, _)| *key == ch)
        .map(|(_, symbols)| *symbols)
}

/// Render a character as dots and dashes, e.g. `'A'` -> `".-"`
pub fn pattern(ch: char) -> Option<String<MAX_SYMBOLS>> {
    let symbols = lookup(ch)?;
    let mut out = String::new();
    for symbol in symbols {
        out.push(symbol.glyph()).ok()?;
    }
    Some(out)
}
