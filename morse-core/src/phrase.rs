//! Phrase sanitizer

use heapless::String;

use crate::code;

/// Maximum number of characters kept from one input
pub const PHRASE_CAPACITY: usize = 256;

/// Text restricted to characters with a code table entry.
///
/// Only `sanitize` builds one, so every character is guaranteed to be
/// present in [`code::CODE_TABLE`] (and therefore ASCII).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Phrase {
    text: String<PHRASE_CAPACITY>,
    truncated: bool,
}

impl Phrase {
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Number of characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Character at `index`, counted in characters
    pub fn get(&self, index: usize) -> Option<char> {
        self.text.chars().nth(index)
    }

    /// True when table characters past [`PHRASE_CAPACITY`] were dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn chars(&self) -> core::str::Chars<'_> {
        self.text.chars()
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
        self.truncated = false;
    }

    /// Build a phrase without filtering, to exercise consistency checks
    #[cfg(any(test, feature = "test-utils"))]
    pub fn unchecked(text: &str) -> Self {
        let mut phrase = Self::default();
        for ch in text.chars() {
            if phrase.text.push(ch).is_err() {
                break;
            }
        }
        phrase
    }
}

impl core::fmt::Display for Phrase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercase `raw` and keep only characters present in the code table.
///
/// Dropped characters are not an error; the result may be empty.
/// Input beyond [`PHRASE_CAPACITY`] kept characters is ignored and the
/// phrase is flagged with [`Phrase::is_truncated`].
pub fn sanitize(raw: &str) -> Phrase {
    let mut phrase = Phrase::default();

    for ch in raw.chars() {
        let mut upper = ch.to_uppercase();
        // 'ß' -> "SS" is one input character, not two letters
        let ch = match (upper.next(), upper.next()) {
            (Some(single), None) => single,
            _ => continue,
        };
        if code::lookup(ch).is_none() {
            continue;
        }
        if phrase.text.push(ch).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("phrase truncated at {} characters", PHRASE_CAPACITY);
            phrase.truncated = true;
            break;
        }
    }

    phrase
}
