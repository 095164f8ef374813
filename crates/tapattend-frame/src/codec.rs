use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::marker::{Marker, FIELD_ORDER, MARKER_OVERHEAD};
use crate::profile::StudentProfile;

/// Default writable capacity: blocks 4.. of the reference tag layout.
pub const DEFAULT_CAPACITY: usize = 121;

/// Printable ASCII, the only bytes kept when decoding.
const PRINTABLE: std::ops::RangeInclusive<u8> = 0x20..=0x7E;

/// Configuration for the record codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordConfig {
    /// Maximum encoded record length in bytes. Default: 121.
    pub capacity: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Length of the encoded record for `profile`, in bytes.
pub fn encoded_len(profile: &StudentProfile) -> usize {
    MARKER_OVERHEAD
        + FIELD_ORDER
            .iter()
            .map(|m| profile.field(*m).len())
            .sum::<usize>()
}

/// Encode a profile into the tag record format.
///
/// Record format:
/// ```text
/// ┌───────────┬────┬───────────┬───────┬──────────┬──────┬───────┬───────┬─────┐
/// │ CinNumber │ id │ FirstName │ first │ LastName │ last │ Major │ major │ End │
/// └───────────┴────┴───────────┴───────┴──────────┴──────┴───────┴───────┴─────┘
/// ```
///
/// Values must be non-empty printable ASCII; the identifier must be all digits.
/// A value may not contain the text of the marker after it: decoding finds
/// the first occurrence, so such a record would not read back as written.
pub fn encode_record(
    profile: &StudentProfile,
    config: &RecordConfig,
    dst: &mut BytesMut,
) -> Result<()> {
    for marker in FIELD_ORDER {
        check_field(marker, profile.field(marker))?;
    }

    let size = encoded_len(profile);
    if size > config.capacity {
        return Err(FrameError::TooLong {
            size,
            max: config.capacity,
        });
    }

    dst.reserve(size);
    for marker in FIELD_ORDER {
        dst.put_slice(marker.text().as_bytes());
        dst.put_slice(profile.field(marker).as_bytes());
    }
    dst.put_slice(Marker::End.text().as_bytes());
    Ok(())
}

fn check_field(marker: Marker, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(FrameError::MalformedRecord { missing: marker });
    }
    let allowed = |ch: char| match marker {
        Marker::Identifier => ch.is_ascii_digit(),
        _ => ch.is_ascii() && PRINTABLE.contains(&(ch as u8)),
    };
    if let Some(ch) = value.chars().find(|ch| !allowed(*ch)) {
        return Err(FrameError::UnsupportedCharacter { field: marker, ch });
    }
    match marker.next() {
        Some(next) if value.contains(next.text()) => Err(FrameError::MarkerInValue {
            field: marker,
            marker: next,
        }),
        _ => Ok(()),
    }
}

/// Keep only printable ASCII bytes from raw tag memory.
///
/// Blocks are read independently, so padding can sit between any two
/// meaningful bytes, not only at the end.
pub fn printable(src: &[u8]) -> String {
    src.iter()
        .copied()
        .filter(|b| PRINTABLE.contains(b))
        .map(char::from)
        .collect()
}

/// Decode a profile from raw tag memory.
///
/// Returns [`FrameError::NoIdentifier`] when the identifier marker is absent,
/// which callers treat as a blank tag rather than a failure.
pub fn decode_record(src: &[u8]) -> Result<StudentProfile> {
    let text = printable(src);
    trace!(filtered = %text, "decoding tag record");

    let id_at = text
        .find(Marker::Identifier.text())
        .ok_or(FrameError::NoIdentifier)?;

    // Each marker is searched from the previous value start, so stale bytes
    // after an earlier, longer record never match.
    let mut values: Vec<&str> = Vec::with_capacity(FIELD_ORDER.len());
    let mut marker = Marker::Identifier;
    let mut value_start = id_at + marker.text().len();
    while let Some(next) = marker.next() {
        let len = text[value_start..]
            .find(next.text())
            .ok_or(FrameError::MalformedRecord { missing: next })?;
        values.push(&text[value_start..value_start + len]);
        value_start += len + next.text().len();
        marker = next;
    }

    let identifier: String = values[0].chars().filter(|c| c.is_ascii_digit()).collect();
    let profile = StudentProfile::new(identifier, values[1], values[2], values[3]);

    for marker in FIELD_ORDER {
        if profile.field(marker).is_empty() {
            return Err(FrameError::MalformedRecord { missing: marker });
        }
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> StudentProfile {
        StudentProfile::new("305123456", "Ada", "Lovelace", "Mathematics")
    }

    fn encode(profile: &StudentProfile) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        encode_record(profile, &RecordConfig::default(), &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn test_encode_layout() {
        let buf = encode(&ada()).unwrap();
        assert_eq!(
            buf.as_ref(),
            b"CinNumber305123456FirstNameAdaLastNameLovelaceMajorMathematicsEnd"
        );
        assert_eq!(buf.len(), encoded_len(&ada()));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let profile = StudentProfile::new("42", "Mary Jo", "O'Neil-Smith", "Computer Science");
        let buf = encode(&profile).unwrap();
        assert_eq!(decode_record(&buf).unwrap(), profile);
    }

    #[test]
    fn test_capacity_boundary() {
        // 34 bytes of markers + 87 bytes of values = 121.
        let at_capacity =
            StudentProfile::new("1".repeat(9), "F".repeat(26), "L".repeat(26), "M".repeat(26));
        assert_eq!(encoded_len(&at_capacity), DEFAULT_CAPACITY);
        let buf = encode(&at_capacity).expect("record at capacity should encode");
        assert_eq!(buf.len(), DEFAULT_CAPACITY);

        let over =
            StudentProfile::new("1".repeat(10), "F".repeat(26), "L".repeat(26), "M".repeat(26));
        assert_eq!(
            encode(&over),
            Err(FrameError::TooLong {
                size: DEFAULT_CAPACITY + 1,
                max: DEFAULT_CAPACITY
            })
        );
    }

    #[test]
    fn test_custom_capacity() {
        let mut buf = BytesMut::new();
        let result = encode_record(&ada(), &RecordConfig { capacity: 16 }, &mut buf);
        assert!(matches!(result, Err(FrameError::TooLong { max: 16, .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_rejects_unsupported_characters() {
        let accented = StudentProfile::new("7", "José", "Núñez", "Art");
        assert_eq!(
            encode(&accented),
            Err(FrameError::UnsupportedCharacter {
                field: Marker::FirstName,
                ch: 'é'
            })
        );

        let tab = StudentProfile::new("7", "Jo", "Smith", "Art\tHistory");
        assert!(matches!(
            encode(&tab),
            Err(FrameError::UnsupportedCharacter {
                field: Marker::Major,
                ..
            })
        ));

        let alpha_id = StudentProfile::new("A12", "Jo", "Smith", "Art");
        assert!(matches!(
            encode(&alpha_id),
            Err(FrameError::UnsupportedCharacter {
                field: Marker::Identifier,
                ch: 'A'
            })
        ));
    }

    #[test]
    fn test_encode_rejects_empty_field() {
        let blank = StudentProfile::new("7", "Jo", "", "Art");
        assert_eq!(
            encode(&blank),
            Err(FrameError::MalformedRecord {
                missing: Marker::LastName
            })
        );
    }

    #[test]
    fn test_encode_rejects_value_holding_next_marker() {
        let major = StudentProfile::new("7", "Jo", "Smith", "Endocrinology");
        let mut buf = BytesMut::new();
        assert_eq!(
            encode_record(&major, &RecordConfig::default(), &mut buf),
            Err(FrameError::MarkerInValue {
                field: Marker::Major,
                marker: Marker::End
            })
        );
        assert!(buf.is_empty());

        let last = StudentProfile::new("7", "Jo", "Majors", "Art");
        assert_eq!(
            encode(&last),
            Err(FrameError::MarkerInValue {
                field: Marker::LastName,
                marker: Marker::Major
            })
        );

        // Without the check these would have been written and read back wrong.
        let written = b"CinNumber7FirstNameJoLastNameSmithMajorEndocrinologyEnd";
        assert_eq!(
            decode_record(written),
            Err(FrameError::MalformedRecord {
                missing: Marker::Major
            })
        );
    }

    #[test]
    fn test_encoded_record_decodes_to_same_profile() {
        // Marker text that is not the next marker is harmless.
        let profile = StudentProfile::new("9", "Major", "Ender", "FirstName Studies");
        let buf = encode(&profile).unwrap();
        assert_eq!(decode_record(&buf).unwrap(), profile);
    }

    #[test]
    fn test_decode_blank_tag_has_no_identifier() {
        assert_eq!(decode_record(&[0u8; 184]), Err(FrameError::NoIdentifier));
        assert_eq!(decode_record(b"FirstNameAdaEnd"), Err(FrameError::NoIdentifier));
        assert_eq!(decode_record(&[]), Err(FrameError::NoIdentifier));
    }

    #[test]
    fn test_decode_ignores_interspersed_filler() {
        let clean = encode(&ada()).unwrap();
        let mut noisy = Vec::new();
        for (i, b) in clean.iter().enumerate() {
            noisy.push(*b);
            if i % 3 == 0 {
                noisy.extend_from_slice(&[0x00, 0xFF, 0x0A]);
            }
        }
        noisy.extend_from_slice(&[0u8; 40]);
        assert_eq!(decode_record(&noisy).unwrap(), decode_record(&clean).unwrap());
    }

    #[test]
    fn test_decode_ignores_stale_tail() {
        let mut memory = encode(&StudentProfile::new("1", "Al", "Ng", "Art"))
            .unwrap()
            .to_vec();
        memory.extend_from_slice(b"\0\0MajorOldLongerMajorEnd");
        let profile = decode_record(&memory).unwrap();
        assert_eq!(profile.major, "Art");
    }

    #[test]
    fn test_decode_identifier_keeps_digits_only() {
        let profile = decode_record(b"CinNumber12 3x4FirstNameAdaLastNameLMajorMEnd").unwrap();
        assert_eq!(profile.identifier, "1234");
    }

    #[test]
    fn test_decode_missing_marker_is_named() {
        assert_eq!(
            decode_record(b"CinNumber12FirstNameAdaMajorMEnd"),
            Err(FrameError::MalformedRecord {
                missing: Marker::LastName
            })
        );
        assert_eq!(
            decode_record(b"CinNumber12FirstNameAdaLastNameLMajorM"),
            Err(FrameError::MalformedRecord {
                missing: Marker::End
            })
        );
    }

    #[test]
    fn test_decode_identifier_without_fields_is_malformed() {
        assert_eq!(
            decode_record(b"CinNumber12"),
            Err(FrameError::MalformedRecord {
                missing: Marker::FirstName
            })
        );
        assert_eq!(
            decode_record(b"CinNumberFirstNameAdaLastNameLMajorMEnd"),
            Err(FrameError::MalformedRecord {
                missing: Marker::Identifier
            })
        );
    }
}
