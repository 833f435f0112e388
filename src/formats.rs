//! Support for reading and writing various file formats.
//!
//! ### GFA
//!
//! The GFA format is a text-based format for representing sequence graphs.
//! See [the specification](https://github.com/GFA-spec/GFA-spec/blob/master/GFA1.md) for details.
//! [`read_gfa`] loads segments (`S`), links (`L`), paths (`P`), and walks
//! (`W`) into a [`VariationGraph`]; walk lines are registered under
//! `sample#haplotype#contig` names. [`write_gfa`] writes the graph back
//! with the embedded walks as path lines.
//!
//! ### GAF
//!
//! [`read_gaf`] parses a GAF file into [`Alignment`] objects, one per line.
//! GAF target paths and GFA walk lines share the oriented walk notation
//! parsed by [`parse_oriented_walk`].
//!
//! ### JSON
//!
//! The support for JSON output is based on building a [`JSONValue`] object
//! recursively and then writing it using the [`Display`] trait. The helper
//! [`json_locus`] builds the object for a genotyped locus.
//!
//! ### VCF
//!
//! [`write_vcf_header`] writes the VCF 4.2 header, and [`VcfRecord`]
//! renders one body record through its [`Display`] implementation.
//!
//! ### Native records
//!
//! A locus can be serialized as a length-prefixed binary message with
//! [`write_locus`] and read back with [`read_loci`]. Numbers use a
//! variable-length encoding and floats are stored as raw bits.

use crate::alignment::Alignment;
use crate::genotype::{Genotype, Locus, Support};
use crate::graph::{Edge, Mapping, NodeId, NodeTraversal, Orientation, VariationGraph};
use crate::sites::Site;
use crate::utils;

use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::str;


//-----------------------------------------------------------------------------

// Token parsing shared by the walk and path notations. GFA walk lines and
// GAF target paths use the oriented walk notation, and GFA path and link
// lines use `+`/`-` orientation tokens.

/// Parses a numerical node identifier.
pub fn parse_node_id(field: &[u8]) -> Result<NodeId, String> {
    str::from_utf8(field).map_err(|err| {
        format!("Invalid segment name: {}", err)
    })?.parse().map_err(|_| {
        String::from("Only numerical segment names are supported")
    })
}

/// Parses a `+` or `-` orientation token.
pub fn parse_orientation(field: &[u8]) -> Result<Orientation, String> {
    match field {
        b"+" => Ok(Orientation::Forward),
        b"-" => Ok(Orientation::Reverse),
        _ => Err(format!("Invalid orientation: {}", String::from_utf8_lossy(field))),
    }
}

/// Parses an oriented walk in the `>1<2` notation.
pub fn parse_oriented_walk(field: &[u8]) -> Result<Vec<NodeTraversal>, String> {
    let mut result = Vec::new();
    let mut start = 0;
    while start < field.len() {
        let orientation = match field[start] {
            b'>' => Orientation::Forward,
            b'<' => Orientation::Reverse,
            _ => return Err(format!("Invalid walk step: {}", String::from_utf8_lossy(field))),
        };
        start += 1;
        let end = field[start..].iter().position(|&c| c == b'>' || c == b'<').map_or(field.len(), |x| start + x);
        let node = parse_node_id(&field[start..end])?;
        result.push(NodeTraversal::new(node, orientation));
        start = end;
    }
    Ok(result)
}

//-----------------------------------------------------------------------------

// GFA input.

// Parses a path line segment list: `1+,2-,3+`.
fn parse_gfa_path(field: &[u8]) -> Result<Vec<NodeTraversal>, String> {
    let mut result = Vec::new();
    for part in field.split(|&c| c == b',') {
        if part.len() < 2 {
            return Err(format!("Invalid path step: {}", String::from_utf8_lossy(part)));
        }
        let node = parse_node_id(&part[..part.len() - 1])?;
        let orientation = parse_orientation(&part[part.len() - 1..])?;
        result.push(NodeTraversal::new(node, orientation));
    }
    Ok(result)
}

/// Reads a graph from a GFA file, which may be gzip-compressed.
///
/// Segments must have numerical names. Paths and walks become embedded
/// walks; a walk line is registered as `sample#haplotype#contig`. Link
/// overlaps are ignored. Returns an error if the file cannot be parsed or
/// the resulting graph is invalid.
pub fn read_gfa<P: AsRef<Path>>(filename: P) -> Result<VariationGraph, String> {
    let mut reader = utils::open_file(filename)?;
    let mut graph = VariationGraph::new();
    let mut walks: Vec<(String, Vec<NodeTraversal>)> = Vec::new();

    let mut line_num = 0;
    let mut buf: Vec<u8> = Vec::new();
    loop {
        line_num += 1;
        buf.clear();
        let len = reader.read_until(b'\n', &mut buf).map_err(|err| {
            format!("Failed to read line {}: {}", line_num, err)
        })?;
        if len == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.is_empty() {
            continue;
        }

        let fields: Vec<&[u8]> = buf.split(|&c| c == b'\t').collect();
        let mut parse_line = || -> Result<(), String> {
            match fields[0] {
                b"S" => {
                    if fields.len() < 3 {
                        return Err(String::from("Segment line with fewer than 3 fields"));
                    }
                    let id = parse_node_id(fields[1])?;
                    graph.add_node(id, fields[2].to_vec())
                },
                b"L" => {
                    if fields.len() < 5 {
                        return Err(String::from("Link line with fewer than 5 fields"));
                    }
                    let from = NodeTraversal::new(
                        parse_node_id(fields[1])?, parse_orientation(fields[2])?
                    );
                    let to = NodeTraversal::new(
                        parse_node_id(fields[3])?, parse_orientation(fields[4])?
                    );
                    graph.add_edge(Edge::new(from, to))
                },
                b"P" => {
                    if fields.len() < 3 {
                        return Err(String::from("Path line with fewer than 3 fields"));
                    }
                    let name = String::from_utf8_lossy(fields[1]).to_string();
                    walks.push((name, parse_gfa_path(fields[2])?));
                    Ok(())
                },
                b"W" => {
                    if fields.len() < 7 {
                        return Err(String::from("Walk line with fewer than 7 fields"));
                    }
                    let name = format!(
                        "{}#{}#{}",
                        String::from_utf8_lossy(fields[1]),
                        String::from_utf8_lossy(fields[2]),
                        String::from_utf8_lossy(fields[3])
                    );
                    walks.push((name, parse_oriented_walk(fields[6])?));
                    Ok(())
                },
                // Headers and unsupported record types are ignored.
                _ => Ok(()),
            }
        };
        parse_line().map_err(|err| format!("GFA line {}: {}", line_num, err))?;
    }

    // Walks may precede the links that justify them, so they are inserted last.
    for (name, traversals) in walks.into_iter() {
        let mappings: Vec<Mapping> = traversals.iter().enumerate().map(
            |(rank, traversal)| Mapping::new(traversal.node, traversal.orientation, rank + 1)
        ).collect();
        graph.insert_walk(&name, mappings)?;
    }

    graph.validate()?;
    Ok(graph)
}

//-----------------------------------------------------------------------------

// GFA output.

/// Writes the graph in the GFA format, with embedded walks as path lines.
pub fn write_gfa<T: Write>(graph: &VariationGraph, output: &mut T) -> io::Result<()> {
    output.write_all(b"H\tVN:Z:1.1\n")?;

    // Segments.
    for id in graph.node_ids() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(b"S\t");
        buffer.extend_from_slice(id.to_string().as_bytes());
        buffer.push(b'\t');
        buffer.extend_from_slice(graph.sequence(id).unwrap_or(b""));
        buffer.push(b'\n');
        output.write_all(&buffer)?;
    }

    // Links.
    for edge in graph.edges() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(b"L\t");
        buffer.extend_from_slice(edge.from.node.to_string().as_bytes());
        match edge.from.orientation {
            Orientation::Forward => buffer.extend_from_slice(b"\t+\t"),
            Orientation::Reverse => buffer.extend_from_slice(b"\t-\t"),
        }
        buffer.extend_from_slice(edge.to.node.to_string().as_bytes());
        match edge.to.orientation {
            Orientation::Forward => buffer.extend_from_slice(b"\t+\t0M\n"),
            Orientation::Reverse => buffer.extend_from_slice(b"\t-\t0M\n"),
        }
        output.write_all(&buffer)?;
    }

    // Paths.
    for (name, mappings) in graph.walks() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(b"P\t");
        buffer.extend_from_slice(name.as_bytes());
        buffer.push(b'\t');
        for (offset, mapping) in mappings.iter().enumerate() {
            if offset > 0 {
                buffer.push(b',');
            }
            buffer.extend_from_slice(mapping.node.to_string().as_bytes());
            buffer.push(if mapping.orientation.is_reverse() { b'-' } else { b'+' });
        }
        buffer.extend_from_slice(b"\t*\n");
        output.write_all(&buffer)?;
    }

    Ok(())
}

//-----------------------------------------------------------------------------

/// Reads the alignments from a GAF file, which may be gzip-compressed.
pub fn read_gaf<P: AsRef<Path>>(filename: P) -> Result<Vec<Alignment>, String> {
    let mut reader = utils::open_file(filename)?;
    let mut result = Vec::new();
    let mut line_num = 0;
    let mut buf: Vec<u8> = Vec::new();
    loop {
        line_num += 1;
        buf.clear();
        let len = reader.read_until(b'\n', &mut buf).map_err(|err| {
            format!("Failed to read line {}: {}", line_num, err)
        })?;
        if len == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.is_empty() {
            continue;
        }
        let alignment = Alignment::from_gaf(&buf).map_err(|err| {
            format!("GAF line {}: {}", line_num, err)
        })?;
        result.push(alignment);
    }
    Ok(result)
}

//-----------------------------------------------------------------------------

/// A JSON value for line-delimited textual output.
#[derive(Clone, Debug, PartialEq)]
pub enum JSONValue {
    /// A boolean value.
    Boolean(bool),

    /// A string value.
    String(String),

    /// An unsigned number value.
    Number(usize),

    /// A floating point value.
    Float(f64),

    /// A JSON array storing a list of JSON values.
    Array(Vec<JSONValue>),

    /// A JSON object storing a list of JSON values with string names.
    Object(Vec<(String, JSONValue)>),
}

impl Display for JSONValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JSONValue::Boolean(b) => write!(f, "{}", b),
            JSONValue::String(s) => write!(f, "\"{}\"", s),
            JSONValue::Number(n) => write!(f, "{}", n),
            JSONValue::Float(x) => write!(f, "{}", x),
            JSONValue::Array(v) => {
                write!(f, "[")?;
                let mut first = true;
                for value in v.iter() {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    value.fmt(f)?;
                }
                write!(f, "]")
            },
            JSONValue::Object(v) => {
                write!(f, "{{")?;
                let mut first = true;
                for (key, value) in v.iter() {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": ", key)?;
                    value.fmt(f)?;
                }
                write!(f, "}}")
            },
        }
    }
}

// Builds a JSON object for an oriented node visit.
fn json_traversal(traversal: NodeTraversal) -> JSONValue {
    JSONValue::Object(vec![
        ("id".to_string(), JSONValue::String(traversal.node.to_string())),
        ("is_reverse".to_string(), JSONValue::Boolean(traversal.orientation.is_reverse())),
    ])
}

fn json_support(support: &Support) -> JSONValue {
    JSONValue::Object(vec![
        ("forward".to_string(), JSONValue::Number(support.forward)),
        ("reverse".to_string(), JSONValue::Number(support.reverse)),
    ])
}

fn json_genotype(genotype: &Genotype) -> JSONValue {
    JSONValue::Object(vec![
        ("alleles".to_string(), JSONValue::Array(
            genotype.alleles.iter().map(|&allele| JSONValue::Number(allele)).collect()
        )),
        ("log_likelihood".to_string(), JSONValue::Float(genotype.log_likelihood)),
        ("log_prior".to_string(), JSONValue::Float(genotype.log_prior)),
        ("log_posterior".to_string(), JSONValue::Float(genotype.log_posterior)),
    ])
}

/// Builds a JSON object for a genotyped locus.
pub fn json_locus(locus: &Locus) -> JSONValue {
    let site = JSONValue::Object(vec![
        ("start".to_string(), json_traversal(locus.site.start)),
        ("end".to_string(), json_traversal(locus.site.end)),
    ]);
    let alleles = JSONValue::Array(locus.alleles.iter().map(|allele| {
        JSONValue::Object(vec![
            ("path".to_string(), JSONValue::Array(
                allele.iter().map(|&traversal| json_traversal(traversal)).collect()
            )),
        ])
    }).collect());
    let supports = JSONValue::Array(locus.supports.iter().map(json_support).collect());
    let genotypes = JSONValue::Array(locus.genotypes.iter().map(json_genotype).collect());

    JSONValue::Object(vec![
        ("site".to_string(), site),
        ("alleles".to_string(), alleles),
        ("supports".to_string(), supports),
        ("overall_support".to_string(), json_support(&locus.overall_support)),
        ("genotypes".to_string(), genotypes),
    ])
}

//-----------------------------------------------------------------------------

/// Writes the VCF 4.2 header.
///
/// The contig line is included only when a contig name is given; its length
/// is the reference length unless overridden.
pub fn write_vcf_header<T: Write>(
    output: &mut T, sample_name: &str, contig_name: Option<&str>, contig_size: usize
) -> io::Result<()> {
    writeln!(output, "##fileformat=VCFv4.2")?;
    writeln!(output, "##ALT=<ID=NON_REF,Description=\"Represents any possible alternative allele at this location\">")?;
    writeln!(output, "##INFO=<ID=XREF,Number=0,Type=Flag,Description=\"Present in original graph\">")?;
    writeln!(output, "##INFO=<ID=XSEE,Number=.,Type=String,Description=\"Original graph node:offset cross-references\">")?;
    writeln!(output, "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">")?;
    writeln!(output, "##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read Depth\">")?;
    writeln!(output, "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">")?;
    writeln!(output, "##FORMAT=<ID=AD,Number=.,Type=Integer,Description=\"Allelic depths for the ref and alt alleles in the order listed\">")?;
    writeln!(output, "##FORMAT=<ID=SB,Number=4,Type=Integer,Description=\"Forward and reverse support for ref and alt alleles.\">")?;
    // We need this field to stratify on for VCF comparison. The info is in
    // SB, but comparison tools cannot pull it out of there.
    writeln!(output, "##FORMAT=<ID=XAAD,Number=1,Type=Integer,Description=\"Alt allele read count.\">")?;
    writeln!(output, "##FORMAT=<ID=PL,Number=G,Type=Float,Description=\"Phred-scaled genotype likelihoods\">")?;
    if let Some(contig) = contig_name {
        writeln!(output, "##contig=<ID={},length={}>", contig, contig_size)?;
    }
    writeln!(output, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}", sample_name)?;
    Ok(())
}

/// One VCF body record.
#[derive(Clone, Debug, PartialEq)]
pub struct VcfRecord {
    /// The CHROM field.
    pub sequence_name: String,
    /// 1-based position.
    pub position: usize,
    /// The ID field.
    pub id: String,
    /// The REF allele.
    pub reference: String,
    /// The ALT alleles in alt-number order.
    pub alternates: Vec<String>,
    /// The QUAL field.
    pub quality: f64,
    /// The FILTER field.
    pub filter: String,
    /// INFO entries as (key, value) pairs.
    pub info: Vec<(String, String)>,
    /// FORMAT keys.
    pub format: Vec<String>,
    /// Sample values parallel to the FORMAT keys.
    pub sample: Vec<String>,
}

impl Display for VcfRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let alternates = if self.alternates.is_empty() {
            String::from(".")
        } else {
            self.alternates.join(",")
        };
        let info = if self.info.is_empty() {
            String::from(".")
        } else {
            self.info.iter().map(
                |(key, value)| format!("{}={}", key, value)
            ).collect::<Vec<String>>().join(";")
        };
        write!(
            f, "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.sequence_name, self.position, self.id, self.reference, alternates,
            self.quality, self.filter, info, self.format.join(":"), self.sample.join(":")
        )
    }
}

//-----------------------------------------------------------------------------

// Variable-length encoding for the native record stream.

// Encodes numbers with 7 bits per byte, high bit as continuation.
#[derive(Clone, Debug, Default)]
struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    fn new() -> Self {
        Encoder::default()
    }

    fn write_usize(&mut self, value: usize) {
        let mut value = value;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.bytes.push(byte);
                return;
            }
            self.bytes.push(byte | 0x80);
        }
    }

    // Small absolute values are represented as small numbers.
    fn write_i64(&mut self, value: i64) {
        let encoded = if value < 0 { (-2 * value - 1) as usize } else { 2 * value as usize };
        self.write_usize(encoded);
    }

    fn write_bool(&mut self, value: bool) {
        self.bytes.push(value as u8);
    }

    fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_bits().to_le_bytes());
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Decoder { data, offset: 0 }
    }

    fn read_usize(&mut self) -> Option<usize> {
        let mut result = 0usize;
        let mut shift = 0;
        loop {
            let byte = *self.data.get(self.offset)?;
            self.offset += 1;
            result |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                return Some(result);
            }
            shift += 7;
        }
    }

    fn read_i64(&mut self) -> Option<i64> {
        let encoded = self.read_usize()?;
        if encoded % 2 == 0 {
            Some((encoded / 2) as i64)
        } else {
            Some(-(((encoded + 1) / 2) as i64))
        }
    }

    fn read_bool(&mut self) -> Option<bool> {
        let byte = *self.data.get(self.offset)?;
        self.offset += 1;
        Some(byte != 0)
    }

    fn read_f64(&mut self) -> Option<f64> {
        let bytes = self.data.get(self.offset..self.offset + 8)?;
        self.offset += 8;
        Some(f64::from_bits(u64::from_le_bytes(bytes.try_into().unwrap())))
    }
}

//-----------------------------------------------------------------------------

// Native locus records.

fn encode_traversal(encoder: &mut Encoder, traversal: NodeTraversal) {
    encoder.write_i64(traversal.node);
    encoder.write_bool(traversal.orientation.is_reverse());
}

fn decode_traversal(decoder: &mut Decoder) -> Option<NodeTraversal> {
    let node = decoder.read_i64()?;
    let is_reverse = decoder.read_bool()?;
    let orientation = if is_reverse { Orientation::Reverse } else { Orientation::Forward };
    Some(NodeTraversal::new(node, orientation))
}

/// Encodes a locus as a binary message without the length prefix.
pub fn encode_locus(locus: &Locus) -> Vec<u8> {
    let mut encoder = Encoder::new();

    encode_traversal(&mut encoder, locus.site.start);
    encode_traversal(&mut encoder, locus.site.end);
    encoder.write_usize(locus.site.contents.len());
    for &id in locus.site.contents.iter() {
        encoder.write_i64(id);
    }

    encoder.write_usize(locus.alleles.len());
    for allele in locus.alleles.iter() {
        encoder.write_usize(allele.len());
        for &traversal in allele.iter() {
            encode_traversal(&mut encoder, traversal);
        }
    }

    encoder.write_usize(locus.supports.len());
    for support in locus.supports.iter() {
        encoder.write_usize(support.forward);
        encoder.write_usize(support.reverse);
    }
    encoder.write_usize(locus.overall_support.forward);
    encoder.write_usize(locus.overall_support.reverse);

    encoder.write_usize(locus.genotypes.len());
    for genotype in locus.genotypes.iter() {
        encoder.write_usize(genotype.alleles[0]);
        encoder.write_usize(genotype.alleles[1]);
        encoder.write_f64(genotype.log_likelihood);
        encoder.write_f64(genotype.log_prior);
        encoder.write_f64(genotype.log_posterior);
        encoder.write_bool(genotype.phased);
    }

    encoder.bytes
}

/// Writes a locus as a length-prefixed binary message.
pub fn write_locus<T: Write>(locus: &Locus, output: &mut T) -> io::Result<()> {
    let encoded = encode_locus(locus);
    let mut prefix = Encoder::new();
    prefix.write_usize(encoded.len());
    output.write_all(&prefix.bytes)?;
    output.write_all(&encoded)?;
    Ok(())
}

// Decodes one locus message.
fn decode_locus(data: &[u8]) -> Result<Locus, String> {
    let mut decoder = Decoder::new(data);
    let missing = || String::from("Truncated locus record");

    let start = decode_traversal(&mut decoder).ok_or_else(missing)?;
    let end = decode_traversal(&mut decoder).ok_or_else(missing)?;
    let content_count = decoder.read_usize().ok_or_else(missing)?;
    let mut contents = BTreeSet::new();
    for _ in 0..content_count {
        contents.insert(decoder.read_i64().ok_or_else(missing)?);
    }

    let allele_count = decoder.read_usize().ok_or_else(missing)?;
    let mut alleles = Vec::with_capacity(allele_count);
    for _ in 0..allele_count {
        let len = decoder.read_usize().ok_or_else(missing)?;
        let mut allele = Vec::with_capacity(len);
        for _ in 0..len {
            allele.push(decode_traversal(&mut decoder).ok_or_else(missing)?);
        }
        alleles.push(allele);
    }

    let support_count = decoder.read_usize().ok_or_else(missing)?;
    let mut supports = Vec::with_capacity(support_count);
    for _ in 0..support_count {
        let forward = decoder.read_usize().ok_or_else(missing)?;
        let reverse = decoder.read_usize().ok_or_else(missing)?;
        supports.push(Support { forward, reverse });
    }
    let overall_support = Support {
        forward: decoder.read_usize().ok_or_else(missing)?,
        reverse: decoder.read_usize().ok_or_else(missing)?,
    };

    let genotype_count = decoder.read_usize().ok_or_else(missing)?;
    let mut genotypes = Vec::with_capacity(genotype_count);
    for _ in 0..genotype_count {
        let first = decoder.read_usize().ok_or_else(missing)?;
        let second = decoder.read_usize().ok_or_else(missing)?;
        let log_likelihood = decoder.read_f64().ok_or_else(missing)?;
        let log_prior = decoder.read_f64().ok_or_else(missing)?;
        let log_posterior = decoder.read_f64().ok_or_else(missing)?;
        let phased = decoder.read_bool().ok_or_else(missing)?;
        genotypes.push(Genotype {
            alleles: [first, second],
            log_likelihood, log_prior, log_posterior, phased,
        });
    }

    Ok(Locus {
        site: Site { start, end, contents },
        alleles, supports, overall_support, genotypes,
    })
}

/// Reads a length-prefixed stream of locus records.
pub fn read_loci(data: &[u8]) -> Result<Vec<Locus>, String> {
    let mut result = Vec::new();
    let mut decoder = Decoder::new(data);
    while decoder.offset < data.len() {
        let len = decoder.read_usize().ok_or(String::from("Truncated length prefix"))?;
        let start = decoder.offset;
        let end = start + len;
        if end > data.len() {
            return Err(String::from("Truncated locus record"));
        }
        result.push(decode_locus(&data[start..end])?);
        decoder.offset = end;
    }
    Ok(result)
}

//-----------------------------------------------------------------------------
