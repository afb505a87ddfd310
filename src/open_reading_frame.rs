use thiserror::Error;

const START_CODON: [u8; 3] = [b'A', b'T', b'G'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrimError {
    #[error("no start codon")]
    NoStartCodon,
    #[error("no in-frame stop codon after the start codon at {start}")]
    NoStopCodon { start: usize },
}

/// The first forward-strand ORF: `from` is the start codon, `to` is the first
/// base of the in-frame stop codon (the stop itself is not part of the frame).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenReadingFrame {
    from: usize,
    to: usize,
}

impl OpenReadingFrame {
    pub fn new(from: usize, to: usize) -> Self {
        OpenReadingFrame { from, to }
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    fn get_codon(sequence: &[u8], pos: usize) -> Option<[u8; 3]> {
        let codon = sequence.get(pos..pos + 3)?;
        Some([
            codon[0].to_ascii_uppercase(),
            codon[1].to_ascii_uppercase(),
            codon[2].to_ascii_uppercase(),
        ])
    }

    fn is_stop_codon(codon: &[u8; 3]) -> bool {
        codon == b"TAA" || codon == b"TAG" || codon == b"TGA"
    }

    /// Finds the first `ATG` (any case) and scans non-overlapping triplets from
    /// there until the first stop codon. A trailing partial codon never counts.
    pub fn find_first(sequence: &[u8]) -> Result<Self, TrimError> {
        let start = sequence
            .windows(3)
            .position(|w| w.eq_ignore_ascii_case(&START_CODON))
            .ok_or(TrimError::NoStartCodon)?;

        let mut pos = start;
        while let Some(codon) = Self::get_codon(sequence, pos) {
            if Self::is_stop_codon(&codon) {
                return Ok(Self::new(start, pos));
            }
            pos += 3;
        }
        Err(TrimError::NoStopCodon { start })
    }

    pub fn slice<'a>(&self, sequence: &'a [u8]) -> &'a [u8] {
        &sequence[self.from..self.to]
    }

    /// Convenience wrapper returning the trimmed bases.
    pub fn trim(sequence: &[u8]) -> Result<Vec<u8>, TrimError> {
        let orf = Self::find_first(sequence)?;
        Ok(orf.slice(sequence).to_vec())
    }
}
