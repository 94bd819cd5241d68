//! samio: a native SAM/BAM codec with one shared alignment model
//!
//! # Overview
//!
//! samio reads SAM (tab-delimited text) and BAM (BGZF-compressed binary)
//! alignment files into the same in-memory model, so the two encodings
//! round-trip through identical data. It writes SAM back out and provides
//! the query helpers that define the model's semantic contract: CIGAR
//! analysis, FLAG interpretation, region overlap, and alignment
//! visualization.
//!
//! The codec is a synchronous value transformer: whole file bytes in,
//! [`SamFile`] out. There is no streaming surface and no shared state;
//! BGZF members are decompressed in parallel internally, invisible at the
//! API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use samio::parse_file;
//!
//! # fn main() -> samio::Result<()> {
//! // Dispatches on the .sam / .bam suffix
//! let sam = parse_file("alignments.bam")?;
//!
//! println!("{} references", sam.header.reference_count());
//! for aln in sam.alignments.iter().filter(|a| a.is_mapped()) {
//!     println!("{} at {}:{}", aln.qname, aln.rname, aln.pos);
//! }
//!
//! samio::write_sam(&sam, "alignments.sam")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`bgzf`]: BGZF member discovery and decompression
//! - [`bam`]: binary BAM decoding
//! - [`sam`]: SAM text parsing and emission
//! - [`header`] / [`alignment`]: the shared data model
//! - [`cigar`], [`flags`], [`tags`], [`sequence`]: field codecs
//! - [`query`]: filters, coordinate queries, visualization

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alignment;
pub mod bam;
pub mod bgzf;
pub mod cigar;
pub mod error;
pub mod flags;
pub mod header;
pub mod query;
pub mod sam;
pub mod sequence;
pub mod tags;

pub use alignment::{Alignment, SamFile};
pub use bam::{parse_bam, parse_bam_bytes};
pub use cigar::{analyze_cigar, format_cigar, parse_cigar, CigarOp, CigarStats};
pub use error::{Result, SamBamError};
pub use flags::{build_flag, interpret_flags, Flags};
pub use header::{parse_header, Header, HeaderFields};
pub use query::{
    create_alignment_view, extract_quality_scores, extract_reference_sequence,
    filter_by_position, filter_by_reference, get_end_position, overlaps_region,
    reference_sequences,
};
pub use sam::{parse_alignment, parse_sam, parse_sam_str, to_sam_string, write_sam};
pub use tags::{
    format_tag, format_tag_value, infer_array_type, parse_tag, parse_tag_value, Tag, TagValue,
};

use std::path::Path;

/// Parse a SAM or BAM file, dispatching on the path suffix.
///
/// `.sam` and `.bam` extensions are matched case-insensitively.
///
/// # Errors
///
/// Returns [`SamBamError::UnsupportedFormat`] for any other extension, plus
/// the errors of [`parse_sam`] / [`parse_bam`].
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<SamFile> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("sam") => sam::parse_sam(path),
        Some(ext) if ext.eq_ignore_ascii_case("bam") => bam::parse_bam(path),
        _ => Err(SamBamError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
