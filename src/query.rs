//! Filters, coordinate queries, and alignment visualization.
//!
//! Everything here derives views from the parsed model. Filters return new
//! [`SamFile`] values (source order and tag contents preserved); the
//! CIGAR-consuming helpers are the only places where a malformed CIGAR or
//! an out-of-range reference access surfaces as an error.

use crate::alignment::{Alignment, SamFile};
use crate::cigar::{analyze_cigar, parse_cigar, CigarOp};
use crate::error::{Result, SamBamError};

/// Keep alignments mapped to the given reference name.
pub fn filter_by_reference(sam: &SamFile, name: &str) -> SamFile {
    SamFile {
        header: sam.header.clone(),
        alignments: sam
            .alignments
            .iter()
            .filter(|aln| aln.rname == name)
            .cloned()
            .collect(),
    }
}

/// Keep alignments whose start position lies in `start..=end`.
///
/// Only `pos` is compared; an alignment extending into the window from the
/// left is not selected (use [`overlaps_region`] for interval overlap).
pub fn filter_by_position(sam: &SamFile, start: i64, end: i64) -> SamFile {
    SamFile {
        header: sam.header.clone(),
        alignments: sam
            .alignments
            .iter()
            .filter(|aln| aln.pos >= start && aln.pos <= end)
            .cloned()
            .collect(),
    }
}

/// Ordered reference names (`SN`) from the header's `@SQ` list.
pub fn reference_sequences(sam: &SamFile) -> Vec<String> {
    sam.header
        .reference_names()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Convert the Phred+33 quality string to numeric scores.
///
/// The `"*"` sentinel yields an empty list.
///
/// # Example
///
/// ```
/// use samio::query::extract_quality_scores;
/// use samio::Alignment;
///
/// let mut aln = Alignment::new();
/// aln.qual = String::from("!~");
/// assert_eq!(extract_quality_scores(&aln), vec![0, 93]);
/// ```
pub fn extract_quality_scores(aln: &Alignment) -> Vec<u8> {
    if aln.qual == "*" {
        return Vec::new();
    }
    aln.qual
        .bytes()
        .map(|b| b.saturating_sub(33))
        .collect()
}

/// 1-based inclusive end position on the reference.
///
/// `pos + aligned_ref_bases - 1`, where the aligned reference bases are the
/// M/=/X/D/N operations of the CIGAR.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidCigar`] for a malformed CIGAR.
pub fn get_end_position(aln: &Alignment) -> Result<i64> {
    let stats = analyze_cigar(&aln.cigar)?;
    Ok(aln.pos + stats.aligned_ref_bases as i64 - 1)
}

/// True when the alignment's closed reference interval intersects
/// `[start, end]`.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidCigar`] for a malformed CIGAR.
pub fn overlaps_region(aln: &Alignment, start: i64, end: i64) -> Result<bool> {
    Ok(aln.pos <= end && get_end_position(aln)? >= start)
}

/// Extract the reference bases covered by an alignment.
///
/// Walks the CIGAR against `reference` starting at `pos - 1` (0-based):
/// M/=/X copy reference bases, D advances without emitting, N emits `N`
/// placeholders while advancing, and all other operations neither advance
/// nor emit.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidCigar`] for a malformed CIGAR and
/// [`SamBamError::ReferenceOutOfBounds`] when the walk starts or reads
/// past the end of `reference`.
pub fn extract_reference_sequence(aln: &Alignment, reference: &str) -> Result<String> {
    let ops = parse_cigar(&aln.cigar)?;
    let ref_bytes = reference.as_bytes();
    let mut cursor = checked_start(aln, ref_bytes.len())?;
    let mut out: Vec<u8> = Vec::new();

    for op in &ops {
        let len = op.length() as usize;
        match op {
            CigarOp::Match(_) | CigarOp::SeqMatch(_) | CigarOp::SeqMismatch(_) => {
                let bases = read_reference(ref_bytes, cursor, len)?;
                out.extend_from_slice(bases);
                cursor += len;
            }
            CigarOp::Deletion(_) => cursor += len,
            CigarOp::RefSkip(_) => {
                out.resize(out.len() + len, b'N');
                cursor += len;
            }
            _ => {}
        }
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Render a three-row alignment view (reference, match, read) under the
/// CIGAR.
///
/// Per operation: `M` shows both bases with `|` where they agree, `=`
/// forces `|`, `X` forces a space, `I` shows `-` on the reference row,
/// `D` shows `-` on the read row, `S` leaves the reference row blank above
/// the clipped bases, `H` emits nothing, and `N` shows `N` over `-`.
/// The rows carry the fixed prefixes `"Ref:  "`, six spaces, and
/// `"Read: "`.
///
/// Sentinel inputs (CIGAR or sequence `"*"`) return an advisory string
/// rather than an error.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidCigar`] when the CIGAR is malformed or
/// consumes more read bases than the sequence has, and
/// [`SamBamError::ReferenceOutOfBounds`] when it reads past the end of
/// `reference`.
pub fn create_alignment_view(aln: &Alignment, reference: &str) -> Result<String> {
    if aln.cigar == "*" || aln.seq == "*" {
        return Ok(String::from(
            "No alignment available (CIGAR or sequence is '*')",
        ));
    }

    let ops = parse_cigar(&aln.cigar)?;
    let ref_bytes = reference.as_bytes();
    let read_bytes = aln.seq.as_bytes();

    let mut ref_row: Vec<u8> = Vec::new();
    let mut match_row: Vec<u8> = Vec::new();
    let mut read_row: Vec<u8> = Vec::new();

    let mut r = checked_start(aln, ref_bytes.len())?;
    let mut q = 0usize;

    for op in &ops {
        let len = op.length() as usize;
        match op {
            CigarOp::Match(_) => {
                let ref_bases = read_reference(ref_bytes, r, len)?;
                let read_bases = read_query(read_bytes, q, len, &aln.cigar)?;
                for i in 0..len {
                    ref_row.push(ref_bases[i]);
                    read_row.push(read_bases[i]);
                    match_row.push(if ref_bases[i] == read_bases[i] {
                        b'|'
                    } else {
                        b' '
                    });
                }
                r += len;
                q += len;
            }
            CigarOp::SeqMatch(_) | CigarOp::SeqMismatch(_) => {
                let ref_bases = read_reference(ref_bytes, r, len)?;
                let read_bases = read_query(read_bytes, q, len, &aln.cigar)?;
                let marker = if matches!(op, CigarOp::SeqMatch(_)) {
                    b'|'
                } else {
                    b' '
                };
                ref_row.extend_from_slice(ref_bases);
                read_row.extend_from_slice(read_bases);
                match_row.resize(match_row.len() + len, marker);
                r += len;
                q += len;
            }
            CigarOp::Insertion(_) => {
                let read_bases = read_query(read_bytes, q, len, &aln.cigar)?;
                ref_row.resize(ref_row.len() + len, b'-');
                read_row.extend_from_slice(read_bases);
                match_row.resize(match_row.len() + len, b' ');
                q += len;
            }
            CigarOp::Deletion(_) => {
                let ref_bases = read_reference(ref_bytes, r, len)?;
                ref_row.extend_from_slice(ref_bases);
                read_row.resize(read_row.len() + len, b'-');
                match_row.resize(match_row.len() + len, b' ');
                r += len;
            }
            CigarOp::SoftClip(_) => {
                let read_bases = read_query(read_bytes, q, len, &aln.cigar)?;
                ref_row.resize(ref_row.len() + len, b' ');
                read_row.extend_from_slice(read_bases);
                match_row.resize(match_row.len() + len, b' ');
                q += len;
            }
            CigarOp::RefSkip(_) => {
                ref_row.resize(ref_row.len() + len, b'N');
                read_row.resize(read_row.len() + len, b'-');
                match_row.resize(match_row.len() + len, b' ');
                r += len;
            }
            CigarOp::HardClip(_) | CigarOp::Padding(_) | CigarOp::Unknown(_) => {}
        }
    }

    Ok(format!(
        "Ref:  {}\n      {}\nRead: {}",
        String::from_utf8_lossy(&ref_row),
        String::from_utf8_lossy(&match_row),
        String::from_utf8_lossy(&read_row)
    ))
}

/// 0-based start of the CIGAR walk, validated against the reference length.
fn checked_start(aln: &Alignment, ref_len: usize) -> Result<usize> {
    if aln.pos < 1 {
        return Err(SamBamError::ReferenceOutOfBounds(format!(
            "alignment position {} is unset or before the reference start",
            aln.pos
        )));
    }
    let start = (aln.pos - 1) as usize;
    if start > ref_len {
        return Err(SamBamError::ReferenceOutOfBounds(format!(
            "alignment starts at {} but the reference has only {} bases",
            aln.pos, ref_len
        )));
    }
    Ok(start)
}

fn read_reference(ref_bytes: &[u8], cursor: usize, len: usize) -> Result<&[u8]> {
    ref_bytes
        .get(cursor..cursor + len)
        .ok_or_else(|| {
            SamBamError::ReferenceOutOfBounds(format!(
                "CIGAR reads {} bases at offset {} but the reference has only {}",
                len,
                cursor,
                ref_bytes.len()
            ))
        })
}

fn read_query<'a>(read_bytes: &'a [u8], cursor: usize, len: usize, cigar: &str) -> Result<&'a [u8]> {
    read_bytes.get(cursor..cursor + len).ok_or_else(|| {
        SamBamError::InvalidCigar(format!(
            "CIGAR {:?} consumes more read bases than the sequence provides",
            cigar
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::parse_sam_str;
    use crate::tags::TagValue;

    fn aln(rname: &str, pos: i64, cigar: &str, seq: &str) -> Alignment {
        let mut aln = Alignment::new();
        aln.qname = String::from("read");
        aln.rname = String::from(rname);
        aln.pos = pos;
        aln.cigar = String::from(cigar);
        aln.seq = String::from(seq);
        aln
    }

    #[test]
    fn test_filter_by_reference() {
        let text = "@SQ\tSN:chr1\tLN:1000\n\
                    @SQ\tSN:chr2\tLN:1000\n\
                    r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\tNM:i:1\n\
                    r2\t0\tchr2\t20\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                    r3\t0\tchr1\t30\t60\t4M\t*\t0\t0\tACGT\tIIII";
        let sam = parse_sam_str(text).unwrap();

        let filtered = filter_by_reference(&sam, "chr1");
        assert_eq!(filtered.alignments.len(), 2);
        assert_eq!(filtered.alignments[0].qname, "r1");
        assert_eq!(filtered.alignments[1].qname, "r3");
        // Header and tags survive untouched
        assert_eq!(filtered.header, sam.header);
        assert_eq!(filtered.alignments[0].tag("NM"), Some(&TagValue::Int(1)));
    }

    #[test]
    fn test_filter_by_position() {
        let text = "r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                    r2\t0\tchr1\t20\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                    r3\t0\tchr1\t30\t60\t4M\t*\t0\t0\tACGT\tIIII";
        let sam = parse_sam_str(text).unwrap();

        let filtered = filter_by_position(&sam, 15, 25);
        assert_eq!(filtered.alignments.len(), 1);
        assert_eq!(filtered.alignments[0].qname, "r2");

        // Endpoints are inclusive and only `pos` is compared.
        let filtered = filter_by_position(&sam, 10, 30);
        assert_eq!(filtered.alignments.len(), 3);
    }

    #[test]
    fn test_reference_sequences() {
        let sam = parse_sam_str("@SQ\tSN:chrX\tLN:10\n@SQ\tSN:chrY\tLN:20").unwrap();
        assert_eq!(reference_sequences(&sam), vec!["chrX", "chrY"]);
    }

    #[test]
    fn test_extract_quality_scores() {
        let mut a = Alignment::new();
        a.qual = String::from("!~ABCDEF");
        assert_eq!(extract_quality_scores(&a), vec![0, 93, 32, 33, 34, 35, 36, 37]);

        a.qual = String::from("*");
        assert!(extract_quality_scores(&a).is_empty());
    }

    #[test]
    fn test_get_end_position() {
        let a = aln("chr1", 100, "10M5D15M", "*");
        assert_eq!(get_end_position(&a).unwrap(), 129);

        // Insertions and clips do not consume reference
        let a = aln("chr1", 100, "10M5I10S", "*");
        assert_eq!(get_end_position(&a).unwrap(), 109);
    }

    #[test]
    fn test_overlaps_region() {
        let a = aln("chr1", 100, "10M5D15M", "*");
        for (s, e) in [(90, 110), (110, 120), (120, 140), (90, 140)] {
            assert!(overlaps_region(&a, s, e).unwrap(), "({}, {})", s, e);
        }
        for (s, e) in [(50, 90), (140, 160)] {
            assert!(!overlaps_region(&a, s, e).unwrap(), "({}, {})", s, e);
        }
    }

    #[test]
    fn test_overlaps_region_malformed_cigar() {
        let a = aln("chr1", 100, "10Q", "*");
        assert!(overlaps_region(&a, 1, 200).is_err());
    }

    #[test]
    fn test_extract_reference_sequence() {
        //            123456789012345
        let reference = "AACCGGTTAACCGGT";

        let a = aln("chr1", 3, "4M", "*");
        assert_eq!(extract_reference_sequence(&a, reference).unwrap(), "CCGG");

        // Deletion advances without emitting
        let a = aln("chr1", 1, "2M2D2M", "*");
        assert_eq!(extract_reference_sequence(&a, reference).unwrap(), "AAGG");

        // Skip emits placeholder Ns
        let a = aln("chr1", 1, "2M3N2M", "*");
        assert_eq!(extract_reference_sequence(&a, reference).unwrap(), "AANNNGT");

        // Insertions and clips neither advance nor emit
        let a = aln("chr1", 1, "2M2I2M2S", "*");
        assert_eq!(extract_reference_sequence(&a, reference).unwrap(), "AACC");
    }

    #[test]
    fn test_extract_reference_sequence_out_of_bounds() {
        let a = aln("chr1", 8, "5M", "*");
        assert!(matches!(
            extract_reference_sequence(&a, "ACGTACGT"),
            Err(SamBamError::ReferenceOutOfBounds(_))
        ));

        let a = aln("chr1", 0, "5M", "*");
        assert!(extract_reference_sequence(&a, "ACGTACGT").is_err());

        let a = aln("chr1", 100, "5M", "*");
        assert!(extract_reference_sequence(&a, "ACGTACGT").is_err());
    }

    #[test]
    fn test_extract_reference_sequence_malformed_cigar() {
        let a = aln("chr1", 1, "MM", "*");
        assert!(matches!(
            extract_reference_sequence(&a, "ACGT"),
            Err(SamBamError::InvalidCigar(_))
        ));
    }

    #[test]
    fn test_alignment_view_match_and_mismatch() {
        let a = aln("chr1", 1, "4M", "ACGA");
        let view = create_alignment_view(&a, "ACGT").unwrap();
        assert_eq!(view, "Ref:  ACGT\n      ||| \nRead: ACGA");
    }

    #[test]
    fn test_alignment_view_forced_markers() {
        // '=' forces '|' and 'X' forces ' ' regardless of the bases.
        let a = aln("chr1", 1, "2=2X", "ACGT");
        let view = create_alignment_view(&a, "ACAA").unwrap();
        assert_eq!(view, "Ref:  ACAA\n      ||  \nRead: ACGT");
    }

    #[test]
    fn test_alignment_view_indels() {
        let a = aln("chr1", 1, "2M2I2M", "ACTTGT");
        let view = create_alignment_view(&a, "ACGT").unwrap();
        assert_eq!(view, "Ref:  AC--GT\n      ||  ||\nRead: ACTTGT");

        let a = aln("chr1", 1, "2M2D2M", "ACGT");
        let view = create_alignment_view(&a, "ACAAGT").unwrap();
        assert_eq!(view, "Ref:  ACAAGT\n      ||  ||\nRead: AC--GT");
    }

    #[test]
    fn test_alignment_view_clips_and_skip() {
        let a = aln("chr1", 1, "2S2M2H", "TTAC");
        let view = create_alignment_view(&a, "ACGT").unwrap();
        assert_eq!(view, "Ref:    AC\n        ||\nRead: TTAC");

        let a = aln("chr1", 1, "2M2N2M", "ACGT");
        let view = create_alignment_view(&a, "ACAAGT").unwrap();
        assert_eq!(view, "Ref:  ACNNGT\n      ||  ||\nRead: AC--GT");
    }

    #[test]
    fn test_alignment_view_sentinels_are_advisory() {
        let a = aln("chr1", 1, "*", "ACGT");
        let view = create_alignment_view(&a, "ACGT").unwrap();
        assert!(view.contains("No alignment available"));

        let a = aln("chr1", 1, "4M", "*");
        let view = create_alignment_view(&a, "ACGT").unwrap();
        assert!(view.contains("No alignment available"));
    }

    #[test]
    fn test_alignment_view_read_too_short() {
        let a = aln("chr1", 1, "6M", "ACGT");
        assert!(matches!(
            create_alignment_view(&a, "ACGTACGT"),
            Err(SamBamError::InvalidCigar(_))
        ));
    }

    #[test]
    fn test_alignment_view_reference_too_short() {
        let a = aln("chr1", 1, "6M", "ACGTAC");
        assert!(matches!(
            create_alignment_view(&a, "ACGT"),
            Err(SamBamError::ReferenceOutOfBounds(_))
        ));
    }
}
