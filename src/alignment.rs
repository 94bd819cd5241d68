//! Alignment record and file model shared by the SAM and BAM codecs.

use crate::flags;
use crate::header::Header;
use crate::tags::{Tag, TagValue};

/// A single alignment record.
///
/// Field semantics follow SAM v1.6: `pos` and `pnext` are 1-based with 0
/// meaning unset, and the string fields use the `"*"` sentinel for absent
/// values. BAM input is translated to these conventions on ingest, so one
/// model serves both encodings.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Query (read) name, or `"*"`
    pub qname: String,
    /// Bitwise FLAG
    pub flag: u16,
    /// Reference name, `"*"` if unmapped
    pub rname: String,
    /// 1-based leftmost mapping position, 0 if unset
    pub pos: i64,
    /// Mapping quality (255 = unavailable)
    pub mapq: u8,
    /// CIGAR string, `"*"` if unavailable
    pub cigar: String,
    /// Reference name of the mate/next read (`"="` = same as `rname`)
    pub rnext: String,
    /// 1-based position of the mate/next read, 0 if unset
    pub pnext: i64,
    /// Signed observed template length
    pub tlen: i64,
    /// Segment sequence, `"*"` if not stored
    pub seq: String,
    /// Phred+33 quality string, `"*"` if not stored
    pub qual: String,
    /// Optional tags in source order
    pub tags: Vec<Tag>,
}

impl Alignment {
    /// Create an empty record with sentinel fields.
    pub fn new() -> Self {
        Self {
            qname: String::from("*"),
            flag: 0,
            rname: String::from("*"),
            pos: 0,
            mapq: 0,
            cigar: String::from("*"),
            rnext: String::from("*"),
            pnext: 0,
            tlen: 0,
            seq: String::from("*"),
            qual: String::from("*"),
            tags: Vec::new(),
        }
    }

    /// Check if the read has multiple segments (0x1).
    pub fn is_paired(&self) -> bool {
        self.flag & flags::PAIRED != 0
    }

    /// Check if the read is mapped (0x4 clear).
    pub fn is_mapped(&self) -> bool {
        self.flag & flags::UNMAPPED == 0
    }

    /// Check if the read is unmapped (0x4).
    pub fn is_unmapped(&self) -> bool {
        self.flag & flags::UNMAPPED != 0
    }

    /// Check if each segment is properly aligned (0x2).
    pub fn is_properly_paired(&self) -> bool {
        self.flag & flags::PROPER_PAIR != 0
    }

    /// Check if the sequence is reverse complemented (0x10).
    pub fn is_reverse(&self) -> bool {
        self.flag & flags::REVERSED != 0
    }

    /// Check if this is a secondary alignment (0x100).
    pub fn is_secondary(&self) -> bool {
        self.flag & flags::SECONDARY != 0
    }

    /// Check if this is a supplementary alignment (0x800).
    pub fn is_supplementary(&self) -> bool {
        self.flag & flags::SUPPLEMENTARY != 0
    }

    /// Look up a tag value by its two-character name.
    pub fn tag(&self, name: &str) -> Option<&TagValue> {
        self.tags
            .iter()
            .find(|t| t.name_str() == name)
            .map(|t| &t.value)
    }

    /// Emit the record as a SAM line: the eleven mandatory fields followed
    /// by the tags, tab-separated.
    pub fn to_sam_line(&self) -> String {
        let mut fields = vec![
            self.qname.clone(),
            self.flag.to_string(),
            self.rname.clone(),
            self.pos.to_string(),
            self.mapq.to_string(),
            self.cigar.clone(),
            self.rnext.clone(),
            self.pnext.to_string(),
            self.tlen.to_string(),
            self.seq.clone(),
            self.qual.clone(),
        ];
        fields.extend(self.tags.iter().map(|tag| tag.to_string()));
        fields.join("\t")
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed SAM or BAM file: header plus alignments in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamFile {
    /// File header
    pub header: Header,
    /// Alignment records in source order
    pub alignments: Vec<Alignment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_sentinel() {
        let aln = Alignment::new();
        assert_eq!(aln.qname, "*");
        assert_eq!(aln.pos, 0);
        assert_eq!(aln.cigar, "*");
        assert!(aln.tags.is_empty());
    }

    #[test]
    fn test_flag_predicates() {
        let mut aln = Alignment::new();

        aln.flag = 0x4;
        assert!(aln.is_unmapped());
        assert!(!aln.is_mapped());
        assert!(!aln.is_paired());

        aln.flag = 0x1 | 0x2;
        assert!(aln.is_paired());
        assert!(aln.is_properly_paired());
        assert!(aln.is_mapped());

        aln.flag = 0x10 | 0x100 | 0x800;
        assert!(aln.is_reverse());
        assert!(aln.is_secondary());
        assert!(aln.is_supplementary());
    }

    #[test]
    fn test_tag_lookup() {
        let mut aln = Alignment::new();
        aln.tags.push(Tag::new(*b"NM", TagValue::Int(3)));
        assert_eq!(aln.tag("NM"), Some(&TagValue::Int(3)));
        assert_eq!(aln.tag("AS"), None);
    }

    #[test]
    fn test_to_sam_line() {
        let mut aln = Alignment::new();
        aln.qname = String::from("read1");
        aln.rname = String::from("chr1");
        aln.pos = 100;
        aln.mapq = 60;
        aln.cigar = String::from("4M");
        aln.seq = String::from("ACGT");
        aln.qual = String::from("IIII");
        aln.tags.push(Tag::new(*b"NM", TagValue::Int(0)));

        assert_eq!(
            aln.to_sam_line(),
            "read1\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII\tNM:i:0"
        );
    }
}
