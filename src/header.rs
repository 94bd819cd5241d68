//! SAM header model and parsing.
//!
//! The header carries `@HD`, `@SQ`, `@RG`, `@PG` records (each a set of
//! `KEY:VALUE` fields) and `@CO` comments. The codec is pass-through: field
//! keys are not validated against a schema, and the order of `@SQ`/`@RG`/
//! `@PG` entries is preserved because BAM reference IDs index the `@SQ`
//! list by position.
//!
//! Header parsing is deliberately lenient: an `@HD` line with no fields
//! yields an empty record, an `@SQ` missing `LN` keeps only the fields it
//! has, an `@CO` without a tab yields an empty comment, and unknown `@`
//! prefixes are ignored.

/// Order-preserving `KEY:VALUE` fields of one header line.
///
/// Lookups are linear; header lines carry a handful of fields at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields(Vec<(String, String)>);

impl HeaderFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append a field, preserving insertion order.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.push((key.to_string(), value.to_string()));
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parsed SAM header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// `@HD` fields, if an `@HD` line was present
    pub hd: Option<HeaderFields>,
    /// `@SQ` reference entries in source order (defines the reference-ID space)
    pub sq: Vec<HeaderFields>,
    /// `@RG` read group entries in source order
    pub rg: Vec<HeaderFields>,
    /// `@PG` program entries in source order
    pub pg: Vec<HeaderFields>,
    /// `@CO` comment lines in source order
    pub co: Vec<String>,
}

impl Header {
    /// Create an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a reference name (`SN`) by reference ID.
    ///
    /// Returns `None` if the ID is out of bounds or the entry has no `SN`.
    pub fn reference_name(&self, id: usize) -> Option<&str> {
        self.sq.get(id).and_then(|sq| sq.get("SN"))
    }

    /// Ordered reference names from the `@SQ` list.
    pub fn reference_names(&self) -> Vec<&str> {
        self.sq.iter().filter_map(|sq| sq.get("SN")).collect()
    }

    /// Number of `@SQ` entries.
    pub fn reference_count(&self) -> usize {
        self.sq.len()
    }
}

/// Parse SAM header lines.
///
/// Non-`@` lines and unknown `@` record types are ignored, so the caller
/// may pass every line of a file. Parsing never fails; malformed lines
/// degrade per the module-level policy.
///
/// # Example
///
/// ```
/// use samio::header::parse_header;
///
/// let header = parse_header(&["@HD\tVN:1.6", "@SQ\tSN:chr1\tLN:1000"]);
/// assert_eq!(header.reference_name(0), Some("chr1"));
/// assert_eq!(header.hd.unwrap().get("VN"), Some("1.6"));
/// ```
pub fn parse_header(lines: &[&str]) -> Header {
    let mut header = Header::new();

    for line in lines {
        if !line.starts_with('@') {
            continue;
        }

        let mut tokens = line.split('\t');
        let record_type = tokens.next().unwrap_or("");

        match record_type {
            "@HD" => header.hd = Some(parse_fields(tokens)),
            "@SQ" => header.sq.push(parse_fields(tokens)),
            "@RG" => header.rg.push(parse_fields(tokens)),
            "@PG" => header.pg.push(parse_fields(tokens)),
            "@CO" => {
                let comment = line.strip_prefix("@CO\t").unwrap_or("");
                header.co.push(comment.to_string());
            }
            _ => {}
        }
    }

    header
}

/// Parse `KEY:VALUE` tokens; the split is on the first `:` only, and tokens
/// without a `:` are dropped.
fn parse_fields<'a>(tokens: impl Iterator<Item = &'a str>) -> HeaderFields {
    let mut fields = HeaderFields::new();
    for token in tokens {
        if let Some((key, value)) = token.split_once(':') {
            fields.insert(key, value);
        }
    }
    fields
}
