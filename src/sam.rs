//! SAM text parsing and emission.
//!
//! SAM is the tab-delimited text encoding of the alignment model. Input is
//! split on line endings (`\r\n` accepted), empty lines are discarded,
//! lines starting with `@` go to the header parser and everything else is
//! parsed as an alignment.
//!
//! Emission is the inverse: header lines in `@HD`, `@SQ`, `@RG`, `@PG`,
//! `@CO` order, then one line per alignment, joined with `\n` and no
//! trailing newline.

use crate::alignment::{Alignment, SamFile};
use crate::error::{Result, SamBamError};
use crate::header::{parse_header, Header};
use crate::tags::parse_tag;
use std::path::Path;

/// Parse a whole SAM document from text.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidSamFormat`] if any alignment line is
/// malformed. Header lines never fail (see [`parse_header`]).
pub fn parse_sam_str(text: &str) -> Result<SamFile> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();

    let header_lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.starts_with('@'))
        .collect();
    let header = parse_header(&header_lines);

    let alignments = lines
        .iter()
        .filter(|line| !line.starts_with('@'))
        .map(|line| parse_alignment(line))
        .collect::<Result<Vec<_>>>()?;

    Ok(SamFile { header, alignments })
}

/// Parse a single SAM alignment line.
///
/// The eleven mandatory fields are positional; any remaining fields are
/// parsed as `TT:Y:V` tags.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidSamFormat`] if fewer than 11 tab-separated
/// fields are present, a numeric field fails to parse, or a tag field is
/// malformed.
///
/// # Example
///
/// ```
/// use samio::sam::parse_alignment;
///
/// let aln =
///     parse_alignment("read1\t0\tpstS\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\t!!!!!!!!!!").unwrap();
/// assert_eq!(aln.qname, "read1");
/// assert_eq!(aln.pos, 1);
/// assert_eq!(aln.cigar, "10M");
/// ```
pub fn parse_alignment(line: &str) -> Result<Alignment> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 11 {
        return Err(SamBamError::InvalidSamFormat {
            msg: format!(
                "expected at least 11 tab-separated fields, found {}",
                fields.len()
            ),
        });
    }

    let flag: u16 = parse_number(fields[1], "FLAG")?;
    let pos: i64 = parse_number(fields[3], "POS")?;
    let mapq: u8 = parse_number(fields[4], "MAPQ")?;
    let pnext: i64 = parse_number(fields[7], "PNEXT")?;
    let tlen: i64 = parse_number(fields[8], "TLEN")?;

    let tags = fields[11..]
        .iter()
        .map(|field| parse_tag(field))
        .collect::<Result<Vec<_>>>()?;

    Ok(Alignment {
        qname: fields[0].to_string(),
        flag,
        rname: fields[2].to_string(),
        pos,
        mapq,
        cigar: fields[5].to_string(),
        rnext: fields[6].to_string(),
        pnext,
        tlen,
        seq: fields[9].to_string(),
        qual: fields[10].to_string(),
        tags,
    })
}

fn parse_number<T: std::str::FromStr>(text: &str, field: &str) -> Result<T> {
    text.parse().map_err(|_| SamBamError::InvalidSamFormat {
        msg: format!("invalid {}: {:?}", field, text),
    })
}

/// Emit a header as SAM lines, in `@HD`, `@SQ`, `@RG`, `@PG`, `@CO` order.
fn header_lines(header: &Header) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(hd) = &header.hd {
        lines.push(record_line("@HD", hd.iter()));
    }
    for sq in &header.sq {
        lines.push(record_line("@SQ", sq.iter()));
    }
    for rg in &header.rg {
        lines.push(record_line("@RG", rg.iter()));
    }
    for pg in &header.pg {
        lines.push(record_line("@PG", pg.iter()));
    }
    for co in &header.co {
        lines.push(format!("@CO\t{}", co));
    }

    lines
}

fn record_line<'a>(record_type: &str, fields: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut line = String::from(record_type);
    for (key, value) in fields {
        line.push('\t');
        line.push_str(key);
        line.push(':');
        line.push_str(value);
    }
    line
}

/// Emit a whole document as SAM text (no trailing newline).
pub fn to_sam_string(sam: &SamFile) -> String {
    let mut lines = header_lines(&sam.header);
    lines.extend(sam.alignments.iter().map(|aln| aln.to_sam_line()));
    lines.join("\n")
}

/// Write a document to a path as SAM text.
///
/// # Errors
///
/// Returns [`SamBamError::Io`] if the file cannot be written.
pub fn write_sam<P: AsRef<Path>>(sam: &SamFile, path: P) -> Result<()> {
    std::fs::write(path, to_sam_string(sam))?;
    Ok(())
}

/// Parse a SAM file from a path.
///
/// # Errors
///
/// Returns [`SamBamError::Io`] if the file cannot be read and
/// [`SamBamError::InvalidSamFormat`] for malformed alignment lines.
pub fn parse_sam<P: AsRef<Path>>(path: P) -> Result<SamFile> {
    let text = std::fs::read_to_string(path)?;
    parse_sam_str(&text)
}
