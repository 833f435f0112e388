//! Utility functions for file input and DNA sequences.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

//-----------------------------------------------------------------------------

// Utilities for working with files.

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let file = File::open(filename).ok();
    if file.is_none() {
        return false;
    }
    let mut reader = BufReader::new(file.unwrap());
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
pub fn open_file<P: AsRef<Path>>(filename: P) -> Result<Box<dyn BufRead>, String> {
    let file = File::open(&filename).map_err(|x| x.to_string())?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

//-----------------------------------------------------------------------------

// Utilities for working with DNA sequences.

/// Returns `true` if the base is one of `ACGTN` (uppercase).
pub fn is_canonical_base(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T' | b'N')
}

/// Replaces bases outside `ACGTN` with `N`.
pub fn sanitize_sequence(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().map(|&base| {
        if is_canonical_base(base) { base } else { b'N' }
    }).collect()
}

/// Returns the reverse complement of the sequence.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    bio::alphabets::dna::revcomp(sequence)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize() {
        assert_eq!(sanitize_sequence(b"ACGTN"), b"ACGTN".to_vec(), "Canonical bases were changed");
        assert_eq!(sanitize_sequence(b"AXGT"), b"ANGT".to_vec(), "Non-canonical base was not replaced");
        assert_eq!(sanitize_sequence(b""), Vec::<u8>::new(), "Empty sequence was changed");
    }

    #[test]
    fn revcomp() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec(), "Wrong reverse complement for a palindrome");
        assert_eq!(reverse_complement(b"GATTACA"), b"TGTAATC".to_vec(), "Wrong reverse complement");
    }
}

//-----------------------------------------------------------------------------
