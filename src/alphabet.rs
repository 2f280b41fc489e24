//! ASCII residue letters to dense symbols and back.

use crate::error::IndexError;

const UNMAPPED: u8 = 0xFF;

/// Residue alphabet: a 256-entry ASCII lookup table paired with the reverse
/// symbol-to-letter mapping.
#[derive(Clone)]
pub struct Alphabet {
    to_symbol: [u8; 256],
    to_char: Box<[u8]>,
}

impl Alphabet {
    fn from_letters(letters: &[u8], aliases: &[(u8, u8)]) -> Self {
        let mut to_symbol = [UNMAPPED; 256];
        for (sym, &c) in letters.iter().enumerate() {
            to_symbol[c as usize] = sym as u8;
            to_symbol[c.to_ascii_lowercase() as usize] = sym as u8;
        }
        for &(from, to) in aliases {
            let sym = to_symbol[to as usize];
            to_symbol[from as usize] = sym;
            to_symbol[from.to_ascii_lowercase() as usize] = sym;
        }
        Self {
            to_symbol,
            to_char: letters.to_vec().into_boxed_slice(),
        }
    }

    /// Nucleotide alphabet `ACGT`; `U` aliases to `T`.
    pub fn dna() -> Self {
        Self::from_letters(b"ACGT", &[(b'U', b'T')])
    }

    /// Amino-acid alphabet, 20 residues plus the ambiguous `X`; the
    /// ambiguity codes `B J O U Z` and `*` alias to `X`.
    pub fn amino() -> Self {
        Self::from_letters(
            b"ACDEFGHIKLMNPQRSTVWYX",
            &[
                (b'B', b'X'),
                (b'J', b'X'),
                (b'O', b'X'),
                (b'U', b'X'),
                (b'Z', b'X'),
                (b'*', b'X'),
            ],
        )
    }

    /// Alphabet cardinality `A`.
    #[inline]
    pub fn size(&self) -> usize {
        self.to_char.len()
    }

    /// Encode ASCII residues into dense symbols.
    pub fn encode(&self, text: &[u8]) -> Result<Vec<u8>, IndexError> {
        let mut out = Vec::with_capacity(text.len());
        for &c in text {
            let sym = self.to_symbol[c as usize];
            if sym == UNMAPPED {
                return Err(IndexError::ContractViolation(format!(
                    "residue {:?} is not in the alphabet",
                    c as char
                )));
            }
            out.push(sym);
        }
        Ok(out)
    }

    /// Letter of a dense symbol.
    #[inline]
    pub fn symbol_char(&self, sym: u8) -> char {
        self.to_char[sym as usize] as char
    }

    /// Render a decoded k-mer as its residue letters.
    pub fn render(&self, symbols: &[u8]) -> String {
        symbols.iter().map(|&s| self.symbol_char(s)).collect()
    }
}
