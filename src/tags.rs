//! Optional alignment tags (auxiliary data).
//!
//! Tags attach typed auxiliary values to alignments, keyed by a two-character
//! code. They exist in two encodings sharing one decoded model:
//!
//! - **SAM text form**: `TT:Y:V` where `TT` is the key, `Y` the type code
//!   and `V` the value text.
//! - **BAM binary form**: two key bytes, one type byte, then a fixed-width
//!   payload for numeric/char types, a NUL-terminated payload for `Z`/`H`,
//!   or sub-type byte + little-endian count + elements for `B`.
//!
//! # Type Codes
//!
//! - **A**: Printable character
//! - **c, C, s, S, i, I**: Signed/unsigned 8/16/32-bit integers (all decode
//!   to [`TagValue::Int`]; SAM emission always uses `i`)
//! - **f**: IEEE 754 float (widened to f64 in the model)
//! - **Z**: Printable string
//! - **H**: Hex string (kept verbatim, not decoded to bytes)
//! - **B**: Typed array with sub-type drawn from the numeric set

use crate::error::{Result, SamBamError};
use std::fmt;

/// A decoded tag value.
///
/// Integer widths collapse to `i64` and floats widen to `f64`; `B` arrays
/// keep only their integer/float distinction. SAM emission of arrays always
/// uses sub-type `i` or `f`, so no further sub-type preservation is needed.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Single printable character (A)
    Char(char),
    /// Integer of any width (c, C, s, S, i, I)
    Int(i64),
    /// Float (f)
    Float(f64),
    /// Printable string (Z)
    String(String),
    /// Hex string (H)
    Hex(String),
    /// Integer array (B with integer sub-type)
    IntArray(Vec<i64>),
    /// Float array (B with sub-type f)
    FloatArray(Vec<f64>),
}

impl TagValue {
    /// SAM type code used when emitting this value.
    pub fn type_code(&self) -> char {
        match self {
            TagValue::Char(_) => 'A',
            TagValue::Int(_) => 'i',
            TagValue::Float(_) => 'f',
            TagValue::String(_) => 'Z',
            TagValue::Hex(_) => 'H',
            TagValue::IntArray(_) | TagValue::FloatArray(_) => 'B',
        }
    }
}

/// A single tag with its two-character name and decoded value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Two-character tag name (e.g., "NM", "AS", "RG")
    pub name: [u8; 2],
    /// Decoded value
    pub value: TagValue,
}

impl Tag {
    /// Create a tag from a two-character name.
    pub fn new(name: [u8; 2], value: TagValue) -> Self {
        Self { name, value }
    }

    /// Get the tag name as a string slice.
    pub fn name_str(&self) -> &str {
        std::str::from_utf8(&self.name).unwrap_or("??")
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.name_str(),
            self.value.type_code(),
            format_tag_value(&self.value)
        )
    }
}

/// Parse a SAM tag value from its text form.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidSamFormat`] for unknown type codes, empty
/// `A` values, or unparsable numbers.
///
/// # Example
///
/// ```
/// use samio::tags::{parse_tag_value, TagValue};
///
/// assert_eq!(parse_tag_value('i', "42").unwrap(), TagValue::Int(42));
/// assert_eq!(
///     parse_tag_value('B', "i,1,2,3").unwrap(),
///     TagValue::IntArray(vec![1, 2, 3])
/// );
/// ```
pub fn parse_tag_value(type_code: char, text: &str) -> Result<TagValue> {
    match type_code {
        'A' => match text.chars().next() {
            Some(c) => Ok(TagValue::Char(c)),
            None => Err(SamBamError::InvalidSamFormat {
                msg: String::from("empty character tag value"),
            }),
        },
        'c' | 'C' | 's' | 'S' | 'i' | 'I' => {
            let value: i64 = text.parse().map_err(|_| SamBamError::InvalidSamFormat {
                msg: format!("invalid integer tag value: {:?}", text),
            })?;
            Ok(TagValue::Int(value))
        }
        'f' => {
            let value: f64 = text.parse().map_err(|_| SamBamError::InvalidSamFormat {
                msg: format!("invalid float tag value: {:?}", text),
            })?;
            Ok(TagValue::Float(value))
        }
        'Z' => Ok(TagValue::String(text.to_string())),
        'H' => Ok(TagValue::Hex(text.to_string())),
        'B' => parse_array_value(text),
        _ => Err(SamBamError::InvalidSamFormat {
            msg: format!("unknown tag type code: {:?}", type_code),
        }),
    }
}

/// Parse the comma-separated body of a `B` array tag.
fn parse_array_value(text: &str) -> Result<TagValue> {
    let mut parts = text.split(',');
    let sub_type = parts.next().unwrap_or("");

    match sub_type {
        "f" => {
            let values = parts
                .map(|p| {
                    p.parse::<f64>().map_err(|_| SamBamError::InvalidSamFormat {
                        msg: format!("invalid float array element: {:?}", p),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TagValue::FloatArray(values))
        }
        "c" | "C" | "s" | "S" | "i" | "I" => {
            let values = parts
                .map(|p| {
                    p.parse::<i64>().map_err(|_| SamBamError::InvalidSamFormat {
                        msg: format!("invalid integer array element: {:?}", p),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TagValue::IntArray(values))
        }
        other => Err(SamBamError::InvalidSamFormat {
            msg: format!("unknown array sub-type: {:?}", other),
        }),
    }
}

/// Format a tag value to its SAM text form.
///
/// Arrays include their leading `i`/`f` sub-type, matching the emission
/// rule for `B` tags (the narrowing rule of [`infer_array_type`] is a
/// separate helper and is deliberately not applied here).
pub fn format_tag_value(value: &TagValue) -> String {
    match value {
        TagValue::Char(c) => c.to_string(),
        TagValue::Int(i) => i.to_string(),
        TagValue::Float(f) => f.to_string(),
        TagValue::String(s) => s.clone(),
        TagValue::Hex(h) => h.clone(),
        TagValue::IntArray(values) => {
            let mut out = String::from("i");
            for v in values {
                out.push(',');
                out.push_str(&v.to_string());
            }
            out
        }
        TagValue::FloatArray(values) => {
            let mut out = String::from("f");
            for v in values {
                out.push(',');
                out.push_str(&v.to_string());
            }
            out
        }
    }
}

/// Parse a full SAM tag field of the form `TT:Y:V`.
///
/// # Errors
///
/// Returns [`SamBamError::InvalidSamFormat`] if the field does not have
/// three colon-separated parts, the key is not exactly two bytes, or the
/// value fails to parse.
pub fn parse_tag(field: &str) -> Result<Tag> {
    let mut parts = field.splitn(3, ':');
    let (name, code, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(code), Some(value)) => (name, code, value),
        _ => {
            return Err(SamBamError::InvalidSamFormat {
                msg: format!("malformed tag field: {:?}", field),
            })
        }
    };

    let name_bytes = name.as_bytes();
    if name_bytes.len() != 2 {
        return Err(SamBamError::InvalidSamFormat {
            msg: format!("tag key must be exactly two characters: {:?}", name),
        });
    }

    let mut code_chars = code.chars();
    let type_code = match (code_chars.next(), code_chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(SamBamError::InvalidSamFormat {
                msg: format!("tag type must be a single character: {:?}", code),
            })
        }
    };

    Ok(Tag {
        name: [name_bytes[0], name_bytes[1]],
        value: parse_tag_value(type_code, value)?,
    })
}

/// Format a tag to its SAM field form `TT:Y:V`.
pub fn format_tag(tag: &Tag) -> String {
    tag.to_string()
}

/// Infer the narrowest BAM array sub-type from the first element.
///
/// Returns the sub-type code and a human-readable label. This is the
/// narrowing rule only; SAM emission of `B` arrays always uses `i`/`f`
/// (see [`format_tag_value`]) and the two rules must stay distinct.
pub fn infer_array_type(value: &TagValue) -> (char, &'static str) {
    match value {
        TagValue::FloatArray(_) => ('f', "float"),
        TagValue::IntArray(values) => match values.first() {
            None => ('i', "int32"),
            Some(&v) if (-128..=127).contains(&v) => ('c', "int8"),
            Some(&v) if (0..=255).contains(&v) => ('C', "uint8"),
            Some(&v) if (-32768..=32767).contains(&v) => ('s', "int16"),
            Some(&v) if (0..=65535).contains(&v) => ('S', "uint16"),
            Some(_) => ('i', "int32"),
        },
        _ => ('i', "int32"),
    }
}

/// Decode BAM auxiliary data into tags.
///
/// Decoding is deliberately lenient: an unknown type byte or a truncated
/// payload stops parsing for this record, and the tags already decoded are
/// kept. This never returns an error.
pub fn decode_bam_tags(data: &[u8]) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut cursor = 0;

    while cursor + 3 <= data.len() {
        let name = [data[cursor], data[cursor + 1]];
        let type_code = data[cursor + 2];
        cursor += 3;

        match decode_bam_value(&data[cursor..], type_code) {
            Some((value, consumed)) => {
                tags.push(Tag { name, value });
                cursor += consumed;
            }
            None => break,
        }
    }

    tags
}

/// Decode a single binary tag value; `None` on unknown type or truncation.
fn decode_bam_value(data: &[u8], type_code: u8) -> Option<(TagValue, usize)> {
    match type_code {
        b'A' => {
            let byte = *data.first()?;
            Some((TagValue::Char(byte as char), 1))
        }
        b'c' => {
            let byte = *data.first()?;
            Some((TagValue::Int(byte as i8 as i64), 1))
        }
        b'C' => {
            let byte = *data.first()?;
            Some((TagValue::Int(byte as i64), 1))
        }
        b's' => {
            let bytes = data.get(..2)?;
            let value = i16::from_le_bytes([bytes[0], bytes[1]]);
            Some((TagValue::Int(value as i64), 2))
        }
        b'S' => {
            let bytes = data.get(..2)?;
            let value = u16::from_le_bytes([bytes[0], bytes[1]]);
            Some((TagValue::Int(value as i64), 2))
        }
        b'i' => {
            let bytes = data.get(..4)?;
            let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Some((TagValue::Int(value as i64), 4))
        }
        b'I' => {
            let bytes = data.get(..4)?;
            let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Some((TagValue::Int(value as i64), 4))
        }
        b'f' => {
            let bytes = data.get(..4)?;
            let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Some((TagValue::Float(value as f64), 4))
        }
        b'Z' | b'H' => {
            let nul = data.iter().position(|&b| b == 0)?;
            let text = std::str::from_utf8(&data[..nul]).ok()?.to_string();
            let value = if type_code == b'Z' {
                TagValue::String(text)
            } else {
                TagValue::Hex(text)
            };
            Some((value, nul + 1))
        }
        b'B' => decode_bam_array(data),
        _ => None,
    }
}

/// Decode a binary `B` array: sub-type byte, LE u32 count, then elements.
fn decode_bam_array(data: &[u8]) -> Option<(TagValue, usize)> {
    let sub_type = *data.first()?;
    let count_bytes = data.get(1..5)?;
    let count = u32::from_le_bytes([
        count_bytes[0],
        count_bytes[1],
        count_bytes[2],
        count_bytes[3],
    ]);
    let count = usize::try_from(count).ok()?;
    let body = &data[5..];

    let width = match sub_type {
        b'c' | b'C' => 1,
        b's' | b'S' => 2,
        b'i' | b'I' | b'f' => 4,
        _ => return None,
    };
    let total = count.checked_mul(width)?;
    if body.len() < total {
        return None;
    }

    let value = match sub_type {
        b'c' => TagValue::IntArray(body[..count].iter().map(|&b| b as i8 as i64).collect()),
        b'C' => TagValue::IntArray(body[..count].iter().map(|&b| b as i64).collect()),
        b's' => TagValue::IntArray(
            (0..count)
                .map(|i| i16::from_le_bytes([body[i * 2], body[i * 2 + 1]]) as i64)
                .collect(),
        ),
        b'S' => TagValue::IntArray(
            (0..count)
                .map(|i| u16::from_le_bytes([body[i * 2], body[i * 2 + 1]]) as i64)
                .collect(),
        ),
        b'i' => TagValue::IntArray(
            (0..count)
                .map(|i| {
                    i32::from_le_bytes([
                        body[i * 4],
                        body[i * 4 + 1],
                        body[i * 4 + 2],
                        body[i * 4 + 3],
                    ]) as i64
                })
                .collect(),
        ),
        b'I' => TagValue::IntArray(
            (0..count)
                .map(|i| {
                    u32::from_le_bytes([
                        body[i * 4],
                        body[i * 4 + 1],
                        body[i * 4 + 2],
                        body[i * 4 + 3],
                    ]) as i64
                })
                .collect(),
        ),
        b'f' => TagValue::FloatArray(
            (0..count)
                .map(|i| {
                    f32::from_le_bytes([
                        body[i * 4],
                        body[i * 4 + 1],
                        body[i * 4 + 2],
                        body[i * 4 + 3],
                    ]) as f64
                })
                .collect(),
        ),
        _ => return None,
    };

    Some((value, 5 + total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_tag_value('i', "42").unwrap(), TagValue::Int(42));
        assert_eq!(parse_tag_value('c', "-5").unwrap(), TagValue::Int(-5));
        assert_eq!(parse_tag_value('S', "65535").unwrap(), TagValue::Int(65535));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_tag_value('f', "3.14").unwrap(), TagValue::Float(3.14));
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(
            parse_tag_value('Z', "hello").unwrap(),
            TagValue::String(String::from("hello"))
        );
        assert_eq!(
            parse_tag_value('H', "1AE301").unwrap(),
            TagValue::Hex(String::from("1AE301"))
        );
    }

    #[test]
    fn test_parse_char() {
        assert_eq!(parse_tag_value('A', "x").unwrap(), TagValue::Char('x'));
        assert!(parse_tag_value('A', "").is_err());
    }

    #[test]
    fn test_parse_arrays() {
        assert_eq!(
            parse_tag_value('B', "i,1,2,3").unwrap(),
            TagValue::IntArray(vec![1, 2, 3])
        );
        assert_eq!(
            parse_tag_value('B', "f,1.1,2.2").unwrap(),
            TagValue::FloatArray(vec![1.1, 2.2])
        );
        assert_eq!(
            parse_tag_value('B', "c,-1,127").unwrap(),
            TagValue::IntArray(vec![-1, 127])
        );
        assert_eq!(parse_tag_value('B', "i").unwrap(), TagValue::IntArray(vec![]));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_tag_value('Q', "x").is_err());
        assert!(parse_tag_value('i', "abc").is_err());
        assert!(parse_tag_value('B', "q,1").is_err());
        assert!(parse_tag_value('B', "").is_err());
    }

    #[test]
    fn test_format_values() {
        assert_eq!(format_tag_value(&TagValue::Int(42)), "42");
        assert_eq!(format_tag_value(&TagValue::Char('x')), "x");
        assert_eq!(format_tag_value(&TagValue::Float(3.14)), "3.14");
        assert_eq!(
            format_tag_value(&TagValue::IntArray(vec![1, 2, 3])),
            "i,1,2,3"
        );
        assert_eq!(
            format_tag_value(&TagValue::FloatArray(vec![1.1, 2.2])),
            "f,1.1,2.2"
        );
    }

    #[test]
    fn test_format_array_always_i_or_f() {
        // Emission ignores the narrowing rule even for byte-sized values.
        let small = TagValue::IntArray(vec![1, 2]);
        assert_eq!(format_tag_value(&small), "i,1,2");
        assert_eq!(infer_array_type(&small), ('c', "int8"));
    }

    #[test]
    fn test_parse_tag_field() {
        let tag = parse_tag("NM:i:5").unwrap();
        assert_eq!(tag.name_str(), "NM");
        assert_eq!(tag.value, TagValue::Int(5));

        // Z values may themselves contain colons
        let tag = parse_tag("SA:Z:chr1,100,+,50M,60,0;").unwrap();
        assert_eq!(
            tag.value,
            TagValue::String(String::from("chr1,100,+,50M,60,0;"))
        );
    }

    #[test]
    fn test_parse_tag_field_invalid() {
        assert!(parse_tag("NM").is_err());
        assert!(parse_tag("NM:i").is_err());
        assert!(parse_tag("NMX:i:5").is_err());
        assert!(parse_tag("NM:ii:5").is_err());
    }

    #[test]
    fn test_tag_display() {
        let tag = Tag::new(*b"NM", TagValue::Int(5));
        assert_eq!(tag.to_string(), "NM:i:5");
        assert_eq!(format_tag(&tag), "NM:i:5");

        let tag = Tag::new(*b"ZB", TagValue::IntArray(vec![9, 8]));
        assert_eq!(tag.to_string(), "ZB:B:i,9,8");
    }

    #[test]
    fn test_sam_tag_roundtrip() {
        for field in [
            "NM:i:5",
            "XX:A:x",
            "RG:Z:sample1",
            "MD:Z:10A5",
            "HX:H:1AE301",
            "ZB:B:i,1,2,3",
            "ZF:B:f,0.5,1.5",
        ] {
            let tag = parse_tag(field).unwrap();
            assert_eq!(format_tag(&tag), *field);
        }
    }

    #[test]
    fn test_infer_array_type_table() {
        assert_eq!(
            infer_array_type(&TagValue::FloatArray(vec![1.5])),
            ('f', "float")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![-128])),
            ('c', "int8")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![127])),
            ('c', "int8")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![200])),
            ('C', "uint8")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![-200])),
            ('s', "int16")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![40000])),
            ('S', "uint16")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![70000])),
            ('i', "int32")
        );
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![-70000])),
            ('i', "int32")
        );
        assert_eq!(infer_array_type(&TagValue::IntArray(vec![])), ('i', "int32"));
    }

    #[test]
    fn test_infer_uses_first_element_only() {
        assert_eq!(
            infer_array_type(&TagValue::IntArray(vec![1, 100_000])),
            ('c', "int8")
        );
    }

    #[test]
    fn test_decode_bam_int_widths() {
        let data = [
            b'N', b'M', b'c', 0xFB, // NM:c:-5
            b'A', b'S', b'C', 0xC8, // AS:C:200
            b'X', b'S', b's', 0x00, 0x80, // XS:s:-32768
            b'X', b'T', b'S', 0xFF, 0xFF, // XT:S:65535
            b'X', b'U', b'i', 0x00, 0x00, 0x00, 0x80, // XU:i:i32::MIN
            b'X', b'V', b'I', 0xFF, 0xFF, 0xFF, 0xFF, // XV:I:u32::MAX
        ];
        let tags = decode_bam_tags(&data);
        assert_eq!(tags.len(), 6);
        assert_eq!(tags[0].value, TagValue::Int(-5));
        assert_eq!(tags[1].value, TagValue::Int(200));
        assert_eq!(tags[2].value, TagValue::Int(-32768));
        assert_eq!(tags[3].value, TagValue::Int(65535));
        assert_eq!(tags[4].value, TagValue::Int(i32::MIN as i64));
        assert_eq!(tags[5].value, TagValue::Int(u32::MAX as i64));
    }

    #[test]
    fn test_decode_bam_float() {
        let mut data = vec![b'X', b'F', b'f'];
        data.extend_from_slice(&2.5f32.to_le_bytes());
        let tags = decode_bam_tags(&data);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, TagValue::Float(2.5));
    }

    #[test]
    fn test_decode_bam_strings() {
        let data = b"RGZsample1\0HXH1AE3\0";
        let tags = decode_bam_tags(data);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name_str(), "RG");
        assert_eq!(tags[0].value, TagValue::String(String::from("sample1")));
        assert_eq!(tags[1].value, TagValue::Hex(String::from("1AE3")));
    }

    #[test]
    fn test_decode_bam_char() {
        let data = [b'X', b'A', b'A', b'x'];
        let tags = decode_bam_tags(&data);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, TagValue::Char('x'));
    }

    #[test]
    fn test_decode_bam_arrays() {
        let mut data = vec![b'Z', b'B', b'B', b'c'];
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0xFF, 0x00, 0x01]); // -1, 0, 1
        data.extend_from_slice(b"ZFBf");
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&0.5f32.to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());

        let tags = decode_bam_tags(&data);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].value, TagValue::IntArray(vec![-1, 0, 1]));
        assert_eq!(tags[1].value, TagValue::FloatArray(vec![0.5, 1.5]));
    }

    #[test]
    fn test_decode_bam_unknown_type_stops() {
        let data = [
            b'N', b'M', b'i', 5, 0, 0, 0, // NM:i:5
            b'X', b'Y', b'q', 1, 2, 3, // unknown type byte 'q'
            b'A', b'S', b'i', 7, 0, 0, 0, // never reached
        ];
        let tags = decode_bam_tags(&data);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name_str(), "NM");
        assert_eq!(tags[0].value, TagValue::Int(5));
    }

    #[test]
    fn test_decode_bam_truncated_stops() {
        let mut data = vec![b'N', b'M', b'i', 5, 0, 0, 0];
        data.extend_from_slice(b"ZBBi");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes()); // only 1 of 3 elements

        let tags = decode_bam_tags(&data);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, TagValue::Int(5));
    }

    #[test]
    fn test_decode_bam_missing_nul_stops() {
        let data = b"RGZrg0";
        let tags = decode_bam_tags(data);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_decode_bam_empty() {
        assert!(decode_bam_tags(&[]).is_empty());
    }
}
