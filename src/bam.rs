//! BAM binary parsing.
//!
//! A BAM file is a BGZF-compressed stream whose payload has a fixed layout:
//!
//! ```text
//! "BAM\1"                   (4 bytes)
//! l_text           uint32   header text length
//! text             l_text bytes (SAM-style header text)
//! n_ref            uint32
//! reference_table  n_ref × { l_name uint32, name (NUL-terminated), l_ref uint32 }
//! alignment_records*
//! ```
//!
//! Each alignment record is length-prefixed:
//!
//! ```text
//! block_size       uint32   (size of the fields that follow)
//! ref_id           int32    (-1 = unmapped)
//! pos              int32    (0-based; -1 = unset)
//! l_read_name      uint8    (includes NUL)
//! mapq             uint8
//! bin              uint16   (ignored)
//! n_cigar_op       uint16
//! flag             uint16
//! l_seq            uint32
//! next_ref_id      int32
//! next_pos         int32    (0-based)
//! tlen             int32
//! read_name        l_read_name bytes (NUL-terminated)
//! cigar            n_cigar_op × uint32 (packed)
//! seq              ceil(l_seq/2) bytes (4-bit packed)
//! qual             l_seq bytes (raw Phred, NOT +33)
//! aux              until block_size is consumed
//! ```
//!
//! On ingest, positions translate to the 1-based model, reference IDs
//! resolve to names through the reference table, and the `"*"`/`"="`
//! sentinels are applied.
//!
//! # Failure Model
//!
//! Invalid magic, a truncated header-text region, or an undecodable
//! reference table are fatal. A truncated or internally inconsistent
//! alignment block is not: parsing stops and the records decoded so far
//! are returned.

use crate::alignment::{Alignment, SamFile};
use crate::bgzf;
use crate::cigar::{decode_cigar_word, format_cigar};
use crate::error::{Result, SamBamError};
use crate::header::{parse_header, HeaderFields};
use crate::sequence::decode_sequence;
use crate::tags::decode_bam_tags;
use std::path::Path;

/// BAM magic bytes.
const BAM_MAGIC: &[u8; 4] = b"BAM\x01";

/// Size of the fixed-width field block at the start of each record.
const RECORD_PRELUDE_LEN: usize = 32;

/// Parse a BAM file from a path.
///
/// # Errors
///
/// Returns [`SamBamError::Io`] if the file cannot be read, plus the errors
/// of [`parse_bam_bytes`].
pub fn parse_bam<P: AsRef<Path>>(path: P) -> Result<SamFile> {
    let data = std::fs::read(path)?;
    parse_bam_bytes(&data)
}

/// Parse BAM data from a whole-file byte slice.
///
/// # Errors
///
/// Returns [`SamBamError::Decompression`] if no BGZF/gzip payload can be
/// recovered and [`SamBamError::InvalidBamFormat`] for a bad magic number
/// or a truncated header/reference region. Truncation within the alignment
/// stream is not an error; the successfully decoded prefix is returned.
pub fn parse_bam_bytes(data: &[u8]) -> Result<SamFile> {
    let payload = bgzf::decompress(data)?;

    if payload.len() < 4 || &payload[..4] != BAM_MAGIC {
        return Err(SamBamError::InvalidBamFormat(String::from(
            "missing BAM magic bytes",
        )));
    }

    let mut cursor = 4;
    let l_text = read_u32_le(&payload, &mut cursor, "header text length")? as usize;
    if cursor + l_text > payload.len() {
        return Err(SamBamError::InvalidBamFormat(String::from(
            "truncated header text",
        )));
    }
    let text = std::str::from_utf8(&payload[cursor..cursor + l_text])
        .map_err(|_| SamBamError::InvalidBamFormat(String::from("header text is not UTF-8")))?
        .trim_end_matches('\0')
        .to_string();
    cursor += l_text;

    let lines: Vec<&str> = text.lines().collect();
    let mut header = parse_header(&lines);

    let references = read_reference_table(&payload, &mut cursor)?;

    // Reference names missing from the parsed @SQ list are appended so
    // downstream consumers always see the full reference dictionary.
    for (name, length) in &references {
        let known = header
            .sq
            .iter()
            .any(|sq| sq.get("SN") == Some(name.as_str()));
        if !known {
            let mut fields = HeaderFields::new();
            fields.insert("SN", name);
            fields.insert("LN", &length.to_string());
            header.sq.push(fields);
        }
    }

    let mut alignments = Vec::new();
    while cursor + 4 <= payload.len() {
        let block_size = u32::from_le_bytes([
            payload[cursor],
            payload[cursor + 1],
            payload[cursor + 2],
            payload[cursor + 3],
        ]) as usize;
        let start = cursor + 4;
        let end = match start.checked_add(block_size) {
            Some(end) if end <= payload.len() => end,
            _ => break, // truncated final record
        };

        match decode_record(&payload[start..end], &references) {
            Some(alignment) => alignments.push(alignment),
            None => break,
        }
        cursor = end;
    }

    Ok(SamFile { header, alignments })
}

/// Read the reference table: count, then name/length pairs.
fn read_reference_table(payload: &[u8], cursor: &mut usize) -> Result<Vec<(String, u32)>> {
    let n_ref = read_u32_le(payload, cursor, "reference count")? as usize;
    let mut references = Vec::new();

    for _ in 0..n_ref {
        let l_name = read_u32_le(payload, cursor, "reference name length")? as usize;
        if *cursor + l_name > payload.len() {
            return Err(SamBamError::InvalidBamFormat(String::from(
                "truncated reference table",
            )));
        }
        let raw = &payload[*cursor..*cursor + l_name];
        let name_bytes = match raw.last() {
            Some(0) => &raw[..raw.len() - 1],
            _ => raw,
        };
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| {
                SamBamError::InvalidBamFormat(String::from("reference name is not UTF-8"))
            })?
            .to_string();
        *cursor += l_name;

        let length = read_u32_le(payload, cursor, "reference length")?;
        references.push((name, length));
    }

    Ok(references)
}

fn read_u32_le(payload: &[u8], cursor: &mut usize, context: &str) -> Result<u32> {
    if *cursor + 4 > payload.len() {
        return Err(SamBamError::InvalidBamFormat(format!(
            "truncated {} at offset {}",
            context, *cursor
        )));
    }
    let value = u32::from_le_bytes([
        payload[*cursor],
        payload[*cursor + 1],
        payload[*cursor + 2],
        payload[*cursor + 3],
    ]);
    *cursor += 4;
    Ok(value)
}

/// Decode one alignment block into the shared model.
///
/// Returns `None` on any internal inconsistency; the caller stops parsing
/// and keeps earlier records.
fn decode_record(block: &[u8], references: &[(String, u32)]) -> Option<Alignment> {
    if block.len() < RECORD_PRELUDE_LEN {
        return None;
    }

    let ref_id = i32::from_le_bytes([block[0], block[1], block[2], block[3]]);
    let pos = i32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    let l_read_name = block[8] as usize;
    let mapq = block[9];
    // bin (block[10..12]) is an index hint only; ignored on read
    let n_cigar_op = u16::from_le_bytes([block[12], block[13]]) as usize;
    let flag = u16::from_le_bytes([block[14], block[15]]);
    let l_seq = u32::from_le_bytes([block[16], block[17], block[18], block[19]]) as usize;
    let next_ref_id = i32::from_le_bytes([block[20], block[21], block[22], block[23]]);
    let next_pos = i32::from_le_bytes([block[24], block[25], block[26], block[27]]);
    let tlen = i32::from_le_bytes([block[28], block[29], block[30], block[31]]);

    let mut cursor = RECORD_PRELUDE_LEN;

    if l_read_name == 0 {
        return None;
    }
    let name_raw = block.get(cursor..cursor + l_read_name)?;
    let name_bytes = match name_raw.last() {
        Some(0) => &name_raw[..name_raw.len() - 1],
        _ => name_raw,
    };
    let qname = std::str::from_utf8(name_bytes).ok()?.to_string();
    cursor += l_read_name;

    let cigar_len = n_cigar_op.checked_mul(4)?;
    let cigar_raw = block.get(cursor..cursor + cigar_len)?;
    let ops: Vec<_> = cigar_raw
        .chunks_exact(4)
        .map(|chunk| decode_cigar_word(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect();
    let cigar = format_cigar(&ops);
    cursor += cigar_len;

    let seq_len = l_seq.div_ceil(2);
    let seq_raw = block.get(cursor..cursor + seq_len)?;
    let seq = if l_seq == 0 {
        String::from("*")
    } else {
        decode_sequence(seq_raw, l_seq).ok()?
    };
    cursor += seq_len;

    let qual_raw = block.get(cursor..cursor + l_seq)?;
    let qual = if l_seq == 0 || qual_raw.first() == Some(&0xFF) {
        String::from("*")
    } else {
        qual_raw
            .iter()
            .map(|&b| b.saturating_add(33) as char)
            .collect()
    };
    cursor += l_seq;

    let tags = decode_bam_tags(&block[cursor..]);

    Some(Alignment {
        qname,
        flag,
        rname: reference_name(ref_id, references),
        pos: pos as i64 + 1,
        mapq,
        cigar,
        rnext: mate_reference_name(ref_id, next_ref_id, references),
        pnext: next_pos as i64 + 1,
        tlen: tlen as i64,
        seq,
        qual,
        tags,
    })
}

/// Resolve a reference ID to its name; -1 and out-of-range map to `"*"`.
fn reference_name(ref_id: i32, references: &[(String, u32)]) -> String {
    if ref_id < 0 {
        return String::from("*");
    }
    references
        .get(ref_id as usize)
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| String::from("*"))
}

/// Resolve the mate reference: `"="` when it matches the read's own
/// (non-negative) reference ID, otherwise by name.
fn mate_reference_name(ref_id: i32, next_ref_id: i32, references: &[(String, u32)]) -> String {
    if next_ref_id < 0 {
        return String::from("*");
    }
    if next_ref_id == ref_id {
        return String::from("=");
    }
    reference_name(next_ref_id, references)
}
