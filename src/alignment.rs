//! Reads aligned to the graph, parsed from GAF lines.
//!
//! An [`Alignment`] represents the alignment of a read to a target path in
//! the graph. It corresponds to a single line in a GAF file. The genotyper
//! consumes the target path, the mapping quality, the base qualities, and
//! the difference string; augmentation turns the alignment into an embedded
//! walk of the graph.
//!
//! The GAF format is a text-based format for representing sequence
//! alignments to a graph. See
//! [the specification](https://github.com/lh3/gfatools/blob/master/doc/rGFA.md)
//! for an overview. Target paths use the oriented walk notation shared with
//! GFA and parsed in [`crate::formats`]. Base qualities are carried in the
//! `bq:Z:` field and difference strings in the `cs:Z:` field.

use crate::formats;
use crate::graph::{NodeTraversal, Orientation};

use std::fmt::Display;
use std::ops::Range;
use std::str;


//-----------------------------------------------------------------------------

/// An alignment between a read and a target path in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    /// Name of the read.
    pub name: String,
    /// Length of the read sequence.
    pub seq_len: usize,
    /// Aligned interval of the read sequence.
    pub seq_interval: Range<usize>,
    /// Target path in the orientation of the read.
    pub path: Vec<NodeTraversal>,
    /// Length of the target path in bp.
    pub path_len: usize,
    /// Aligned interval of the target path.
    pub path_interval: Range<usize>,
    /// Number of matches in the alignment.
    pub matches: usize,
    /// Number of mismatches and gaps in the alignment.
    pub edits: usize,
    /// Mapping quality.
    pub mapq: Option<usize>,
    /// Alignment score.
    pub score: Option<isize>,
    /// Base quality values (raw phred) for the read sequence.
    pub base_quality: Option<Vec<u8>>,
    /// Difference string.
    pub difference: Option<Vec<Difference>>,
}

/// Construction from a GAF line.
impl Alignment {
    // Number of mandatory fields in a GAF line.
    const MANDATORY_FIELDS: usize = 12;

    // Placeholder value for a missing mapping quality.
    const MISSING_MAPQ: usize = 255;

    // The field is empty and the value is missing; typically used with unaligned sequences.
    const MISSING_VALUE: [u8; 1] = [b'*'];

    // Offset of base quality values in the GAF `bq:Z:` field.
    const QUALITY_OFFSET: u8 = 33;

    // Parses a string field from a GAF field.
    fn parse_string(field: &[u8], field_name: &str) -> Result<String, String> {
        String::from_utf8(field.to_vec()).map_err(|err| {
            format!("Invalid {}: {}", field_name, err)
        })
    }

    // Parses an unsigned integer from a GAF field.
    // Returns `0` if the value is missing.
    fn parse_usize(field: &[u8], field_name: &str) -> Result<usize, String> {
        if field == Self::MISSING_VALUE {
            return Ok(0);
        }
        let number = str::from_utf8(field).map_err(|err| {
            format!("Invalid {}: {}", field_name, err)
        })?;
        number.parse().map_err(|err| {
            format!("Invalid {}: {}", field_name, err)
        })
    }

    // Parses an interval from two GAF fields.
    fn parse_interval(start: &[u8], end: &[u8]) -> Result<Range<usize>, String> {
        let start = Self::parse_usize(start, "interval start")?;
        let end = Self::parse_usize(end, "interval end")?;
        Ok(start..end)
    }

    // Parses an orientation from a GAF field.
    // Returns [`Orientation::Forward`] if the value is missing.
    fn parse_orientation(field: &[u8], field_name: &str) -> Result<Orientation, String> {
        if field == Self::MISSING_VALUE {
            return Ok(Orientation::Forward);
        }
        formats::parse_orientation(field).map_err(|err| {
            format!("Invalid {}: {}", field_name, err)
        })
    }

    // Parses an oriented target path from a GAF field.
    // Returns an empty path if the value is missing.
    fn parse_path(field: &[u8]) -> Result<Vec<NodeTraversal>, String> {
        if field == Self::MISSING_VALUE {
            return Ok(Vec::new());
        }
        formats::parse_oriented_walk(field)
    }

    // Reverses an oriented path in place.
    fn reverse_path(path: &mut [NodeTraversal]) {
        path.reverse();
        for traversal in path.iter_mut() {
            *traversal = traversal.reverse();
        }
    }

    /// Parses an alignment from a GAF line.
    ///
    /// Returns an error if the line cannot be parsed.
    /// The line may end with up to one endline character, which is ignored.
    /// Parsing is based on bytes rather than characters to avoid unnecessary UTF-8 validation.
    ///
    /// If a difference string is present, some numerical fields will be recalculated from it.
    /// These include interval ends on both the query and the target, as well as the number of matches and edits.
    /// This behavior is justified, because some aligners may not calculate these values correctly.
    pub fn from_gaf(line: &[u8]) -> Result<Self, String> {
        // Check for an endline character which may be present.
        let line = if line.last() == Some(&b'\n') {
            &line[..line.len() - 1]
        } else {
            line
        };

        // Split the line into fields.
        let fields = line.split(|&c| c == b'\t').collect::<Vec<_>>();
        if fields.len() < Self::MANDATORY_FIELDS {
            let line = String::from_utf8_lossy(line);
            let message = format!("GAF line with fewer than {} fields: {}", Self::MANDATORY_FIELDS, line);
            return Err(message);
        }

        // Read sequence.
        let name = Self::parse_string(fields[0], "query sequence name")?;
        let seq_len = Self::parse_usize(fields[1], "query sequence length")?;
        let mut seq_interval = Self::parse_interval(fields[2], fields[3])?;

        // Target path.
        let orientation = Self::parse_orientation(fields[4], "target orientation")?;
        let mut path = Self::parse_path(fields[5]).map_err(|err| {
            format!("Invalid target path: {}", err)
        })?;
        if orientation == Orientation::Reverse {
            Self::reverse_path(&mut path);
        }
        let path_len = Self::parse_usize(fields[6], "target path length")?;
        let path_interval = Self::parse_interval(fields[7], fields[8])?;

        // Alignment statistics.
        let mut matches = Self::parse_usize(fields[9], "matches")?;
        let alignment_len = Self::parse_usize(fields[10], "alignment length")?;
        let mut edits = if matches <= alignment_len { alignment_len - matches } else { 0 };
        let mapq = Self::parse_usize(fields[11], "mapping quality")?;
        let mapq = if mapq == Self::MISSING_MAPQ { None } else { Some(mapq) };

        // Optional fields.
        let mut score = None;
        let mut base_quality = None;
        let mut difference = None;
        for field in fields[Self::MANDATORY_FIELDS..].iter() {
            let parsed = TypedField::parse(field)?;
            match (parsed.tag, parsed.value) {
                ([b'A', b'S'], FieldValue::Int(value)) => {
                    if score.replace(value).is_some() {
                        return Err(String::from("Multiple alignment score fields"));
                    }
                },
                ([b'b', b'q'], FieldValue::String(value)) => {
                    let quality: Vec<u8> = value.iter().map(
                        |&c| c.saturating_sub(Self::QUALITY_OFFSET)
                    ).collect();
                    if base_quality.replace(quality).is_some() {
                        return Err(String::from("Multiple base quality fields"));
                    }
                },
                ([b'c', b's'], FieldValue::String(value)) => {
                    let ops = Difference::parse_normalized(&value)?;
                    if difference.replace(ops).is_some() {
                        return Err(String::from("Multiple difference fields"));
                    }
                },
                _ => {},
            }
        }

        // If we have a difference string, recalculate the redundant numerical fields.
        let mut path_interval = path_interval;
        if let Some(ops) = difference.as_ref() {
            let (query_len, target_len, num_matches, num_edits) = Difference::stats(ops);
            seq_interval.end = seq_interval.start + query_len;
            path_interval.end = path_interval.start + target_len;
            matches = num_matches;
            edits = num_edits;
        }

        // Now we have the final path interval. Flip its orientation if necessary.
        if orientation == Orientation::Reverse {
            let start = if path_interval.end < path_len { path_len - path_interval.end } else { 0 };
            let end = if path_interval.start < path_len { path_len - path_interval.start } else { 0 };
            path_interval = start..end;
        }

        Ok(Alignment {
            name, seq_len, seq_interval,
            path, path_len, path_interval,
            matches, edits, mapq, score,
            base_quality, difference,
        })
    }
}

/// Operations on the alignment.
impl Alignment {
    /// Creates an alignment that matches the given target path in full.
    ///
    /// This is a convenience constructor for reads that follow existing
    /// nodes exactly. `path_len` must be the total sequence length of the
    /// path.
    pub fn full_match(
        name: &str, path: Vec<NodeTraversal>, path_len: usize,
        base_quality: Option<Vec<u8>>, mapq: Option<usize>
    ) -> Self {
        Alignment {
            name: name.to_string(),
            seq_len: path_len,
            seq_interval: 0..path_len,
            path,
            path_len,
            path_interval: 0..path_len,
            matches: path_len,
            edits: 0,
            mapq,
            score: None,
            base_quality,
            difference: None,
        }
    }

    /// Returns `true` if the read is unaligned.
    pub fn is_unaligned(&self) -> bool {
        self.seq_interval.is_empty() || self.path.is_empty()
    }
}

//-----------------------------------------------------------------------------

/// One edit operation from a GAF difference string (the `cs:Z:` field).
///
/// A difference string is a sequence of operations, each introduced by its
/// type character:
///
/// * `=` is a match spelled out as the matching sequence.
/// * `:` is a match given as its length.
/// * `*` is a single-base mismatch given as the target base and the query base.
/// * `+` is an insertion into the query, given as the inserted sequence.
/// * `-` is a deletion from the query, given as the deleted sequence.
///
/// Only the query bases are kept, as the read sequence can be reconstructed
/// from them alone. The intron operation (`~`) is not supported. Parsing is
/// based on bytes rather than characters to avoid unnecessary UTF-8
/// validation.
///
/// # Examples
///
/// ```
/// use bubblecall::alignment::Difference;
///
/// let ops = Difference::parse_normalized(b":5*ct:3+GA:2").unwrap();
/// assert_eq!(ops.len(), 5);
/// assert_eq!(ops[1], Difference::Mismatch(b'T'));
/// assert_eq!(ops[3], Difference::Insertion(b"GA".to_vec()));
///
/// // (query length, target length, matches, edits)
/// assert_eq!(Difference::stats(&ops), (13, 11, 10, 3));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Difference {
    /// A match of the given length.
    Match(usize),
    /// Mismatch represented as the query base.
    Mismatch(u8),
    /// Insertion to the target represented as the inserted sequence.
    Insertion(Vec<u8>),
    /// Deletion from the target represented as deletion length.
    Deletion(usize),
}

impl Difference {
    // Every operation starts with one of these characters.
    fn is_op_char(c: u8) -> bool {
        matches!(c, b'=' | b':' | b'*' | b'+' | b'-')
    }

    // Builds a single operation from its type character and value bytes.
    fn from_token(kind: u8, value: &[u8]) -> Result<Self, String> {
        match kind {
            b'=' => Ok(Self::Match(value.len())),
            b':' => {
                let len = str::from_utf8(value).ok().and_then(|v| v.parse().ok());
                len.map(Self::Match).ok_or(format!(
                    "Invalid match length: {}", String::from_utf8_lossy(value)
                ))
            },
            b'*' => {
                if value.len() != 2 {
                    return Err(format!("Invalid mismatch: {}", String::from_utf8_lossy(value)));
                }
                Ok(Self::Mismatch(value[1].to_ascii_uppercase()))
            },
            b'+' => Ok(Self::Insertion(value.to_ascii_uppercase())),
            b'-' => Ok(Self::Deletion(value.len())),
            _ => Err(format!("Invalid difference string operation: {}", kind as char)),
        }
    }

    /// Parses a difference string and returns it as a vector of operations.
    ///
    /// Returns an error if the difference string is invalid.
    pub fn parse(difference_string: &[u8]) -> Result<Vec<Self>, String> {
        let mut result: Vec<Self> = Vec::new();
        let mut rest = difference_string;
        while !rest.is_empty() {
            // The value of an operation runs to the next operation character.
            let value_len = rest[1..].iter().take_while(|&&c| !Self::is_op_char(c)).count();
            result.push(Self::from_token(rest[0], &rest[1..1 + value_len])?);
            rest = &rest[1 + value_len..];
        }
        Ok(result)
    }

    /// Parses a difference string and returns it as a normalized vector of operations.
    ///
    /// The operations are merged and empty operations are removed.
    /// Returns an error if the difference string is invalid.
    pub fn parse_normalized(difference_string: &[u8]) -> Result<Vec<Self>, String> {
        Ok(Self::normalize(Self::parse(difference_string)?))
    }

    /// Normalizes the sequence of operations.
    ///
    /// This merges adjacent operations of the same kind and removes empty
    /// operations.
    pub fn normalize(ops: Vec<Self>) -> Vec<Self> {
        let mut result: Vec<Self> = Vec::with_capacity(ops.len());
        for op in ops.into_iter() {
            if op.is_empty() {
                continue;
            }
            let op = match (result.pop(), op) {
                (Some(Self::Match(head)), Self::Match(tail)) => Self::Match(head + tail),
                (Some(Self::Deletion(head)), Self::Deletion(tail)) => Self::Deletion(head + tail),
                (Some(Self::Insertion(mut head)), Self::Insertion(tail)) => {
                    head.extend_from_slice(&tail);
                    Self::Insertion(head)
                },
                (Some(previous), op) => {
                    result.push(previous);
                    op
                },
                (None, op) => op,
            };
            result.push(op);
        }
        result
    }

    /// Calculates various statistics from a sequence of operations.
    ///
    /// The return value is (query length, target length, matches, edits).
    pub fn stats(ops: &[Self]) -> (usize, usize, usize, usize) {
        let mut query_len = 0;
        let mut target_len = 0;
        let mut matches = 0;
        let mut edits = 0;
        for op in ops.iter() {
            query_len += op.query_len();
            target_len += op.target_len();
            if let Self::Match(len) = op {
                matches += len;
            } else {
                edits += op.len();
            }
        }
        (query_len, target_len, matches, edits)
    }

    /// Returns the length of the operation in the read sequence.
    pub fn query_len(&self) -> usize {
        match self {
            Self::Match(len) => *len,
            Self::Mismatch(_) => 1,
            Self::Insertion(seq) => seq.len(),
            Self::Deletion(_) => 0,
        }
    }

    /// Returns the length of the operation in the target sequence.
    pub fn target_len(&self) -> usize {
        match self {
            Self::Match(len) | Self::Deletion(len) => *len,
            Self::Mismatch(_) => 1,
            Self::Insertion(_) => 0,
        }
    }

    /// Returns the length of the operation on the longer of the two sides.
    pub fn len(&self) -> usize {
        self.query_len().max(self.target_len())
    }

    /// Returns `true` if the operation covers no bases.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//-----------------------------------------------------------------------------

/// A typed optional field used in formats such as SAM, GFA, and GAF.
///
/// The field corresponds to a TAG:TYPE:VALUE string. The two-character tag
/// identifies the field, and the type character selects the [`FieldValue`]
/// variant: A (single character), Z (string), i (integer), f (float), or
/// b (boolean). Parsing is based on bytes rather than characters to avoid
/// unnecessary UTF-8 validation.
///
/// # Examples
///
/// ```
/// use bubblecall::alignment::{FieldValue, TypedField};
///
/// let field = TypedField::parse(b"AS:i:160").unwrap();
/// assert_eq!(field.tag, [b'A', b'S']);
/// assert_eq!(field.value, FieldValue::Int(160));
/// assert_eq!(field.to_string(), "AS:i:160");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TypedField {
    /// The two-character tag.
    pub tag: [u8; 2],
    /// The typed value.
    pub value: FieldValue,
}

/// The value of a [`TypedField`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A single character.
    Char(u8),
    /// A string.
    String(Vec<u8>),
    /// An integer.
    Int(isize),
    /// A float.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl TypedField {
    /// Parses the field from a TAG:TYPE:VALUE string.
    ///
    /// Returns an error if the field cannot be parsed or the type is unsupported.
    pub fn parse(field: &[u8]) -> Result<Self, String> {
        let invalid = || format!("Invalid typed field: {}", String::from_utf8_lossy(field));
        if field.len() < 5 || field[2] != b':' || field[4] != b':' {
            return Err(invalid());
        }
        let tag = [field[0], field[1]];
        let payload = &field[5..];

        let value = match field[3] {
            b'A' => {
                if payload.len() != 1 {
                    return Err(invalid());
                }
                FieldValue::Char(payload[0])
            },
            b'Z' => FieldValue::String(payload.to_vec()),
            b'i' => {
                let number = str::from_utf8(payload).ok().and_then(|v| v.parse().ok());
                FieldValue::Int(number.ok_or_else(|| invalid())?)
            },
            b'f' => {
                let number = str::from_utf8(payload).ok().and_then(|v| v.parse().ok());
                FieldValue::Float(number.ok_or_else(|| invalid())?)
            },
            b'b' => match payload {
                b"0" => FieldValue::Bool(false),
                b"1" => FieldValue::Bool(true),
                _ => return Err(invalid()),
            },
            _ => return Err(format!("Unsupported field type: {}", field[3] as char)),
        };

        Ok(TypedField { tag, value })
    }
}

impl Display for TypedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}:", self.tag[0] as char, self.tag[1] as char)?;
        match &self.value {
            FieldValue::Char(value) => write!(f, "A:{}", *value as char),
            FieldValue::String(value) => write!(f, "Z:{}", String::from_utf8_lossy(value)),
            FieldValue::Int(value) => write!(f, "i:{}", value),
            FieldValue::Float(value) => write!(f, "f:{}", value),
            FieldValue::Bool(value) => write!(f, "b:{}", *value as u8),
        }
    }
}

//-----------------------------------------------------------------------------
