//! Canonical sprite image names.
//!
//! Custom villager frames are looked up by name, so these formats are also the
//! public contract with texture packs:
//!
//! ```text
//! archive.face.variant_record-frame      e.g. 123.145.S1w_3-1
//! archive.X.variant_record-frame         same frame for every face
//! archive.tag_record-frame               guard, regional/national tag
//! archive_record-frame                   guard without tag / engine replacement
//! ```
//!
//! `variant` is a number, optionally preceded by a climate tag (`S` for
//! subtropical/swamp) and followed by a season letter (`f` fall, `p` spring,
//! `m` summer, `w` winter). Any name may carry the `_Emission` suffix.

use engine_core::Season;
use thiserror::Error;

/// Suffix marking an emission map.
pub const EMISSION_SUFFIX: &str = "_Emission";
/// Placeholder in the face slot of a name that applies to every face.
pub const ANY_FACE: &str = "X";
/// Season tags indexed by season ordinal.
pub const SEASON_TAGS: [&str; 4] = ["f", "p", "m", "w"];
/// Climate tag for subtropical and swamp skins.
pub const CLIMATE_SUBTROPICAL: &str = "S";

pub fn season_tag(season: Season) -> &'static str {
    SEASON_TAGS[season.ordinal()]
}

/// Name of one villager frame for a specific face record.
pub fn image_name(
    archive: u32,
    record: usize,
    frame: usize,
    face: u32,
    variant: u32,
    climate: &str,
    season: &str,
) -> String {
    format!("{archive:03}.{face}.{climate}{variant}{season}_{record}-{frame}")
}

/// Name of one villager frame shared by every face of the archive.
pub fn image_name_any_face(
    archive: u32,
    record: usize,
    frame: usize,
    variant: u32,
    climate: &str,
    season: &str,
) -> String {
    format!("{archive:03}.{ANY_FACE}.{climate}{variant}{season}_{record}-{frame}")
}

/// Name of one guard frame, qualified by a regional or national tag when one applies.
pub fn guard_image_name(archive: u32, record: usize, frame: usize, tag: Option<&str>) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => format!("{archive:03}.{tag}_{record}-{frame}"),
        _ => replacement_name(archive, record, frame),
    }
}

/// The engine's own texture-replacement key for a frame.
pub fn replacement_name(archive: u32, record: usize, frame: usize) -> String {
    format!("{archive:03}_{record}-{frame}")
}

/// Prefix shared by every frame of a guard archive.
pub fn guard_archive_prefix(archive: u32, tag: Option<&str>) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => format!("{archive:03}.{tag}"),
        _ => format!("{archive:03}"),
    }
}

pub fn emission_name(name: &str) -> String {
    format!("{name}{EMISSION_SUFFIX}")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameParseError {
    #[error("image name '{0}' has no '_record-frame' tail")]
    MissingTail(String),
    #[error("image name '{name}' has an invalid {field}")]
    InvalidField { name: String, field: &'static str },
    #[error("image name '{0}' has too many '.' separated parts")]
    TooManyParts(String),
}

/// What kind of name was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameKind {
    Villager {
        /// `None` for the any-face placeholder.
        face: Option<u32>,
        variant: u32,
        climate: String,
        season: String,
    },
    /// Guard or engine replacement name.
    Plain { tag: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImageName {
    pub archive: u32,
    pub record: usize,
    pub frame: usize,
    pub kind: NameKind,
    pub emission: bool,
}

/// Parse any name produced by this module back into its fields.
pub fn parse_image_name(name: &str) -> Result<ParsedImageName, NameParseError> {
    let invalid = |field: &'static str| NameParseError::InvalidField {
        name: name.to_string(),
        field,
    };

    let (body, emission) = match name.strip_suffix(EMISSION_SUFFIX) {
        Some(body) => (body, true),
        None => (name, false),
    };
    let (head, tail) = body
        .rsplit_once('_')
        .ok_or_else(|| NameParseError::MissingTail(name.to_string()))?;
    let (record, frame) = tail
        .split_once('-')
        .ok_or_else(|| NameParseError::MissingTail(name.to_string()))?;
    let record = parse_number(record).ok_or_else(|| invalid("record"))? as usize;
    let frame = parse_number(frame).ok_or_else(|| invalid("frame"))? as usize;

    let parts: Vec<&str> = head.split('.').collect();
    let archive = parse_number(parts[0]).ok_or_else(|| invalid("archive"))?;

    let kind = match parts.as_slice() {
        [_] => NameKind::Plain { tag: None },
        [_, tag] if !tag.is_empty() => NameKind::Plain {
            tag: Some((*tag).to_string()),
        },
        [_, face, qualifiers] => {
            let face = if *face == ANY_FACE {
                None
            } else {
                Some(parse_number(face).ok_or_else(|| invalid("face"))?)
            };
            let (climate, variant, season) =
                split_qualifiers(qualifiers).ok_or_else(|| invalid("variant"))?;
            NameKind::Villager {
                face,
                variant,
                climate: climate.to_string(),
                season: season.to_string(),
            }
        }
        [_, _] => return Err(invalid("tag")),
        _ => return Err(NameParseError::TooManyParts(name.to_string())),
    };

    Ok(ParsedImageName {
        archive,
        record,
        frame,
        kind,
        emission,
    })
}

fn parse_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Split `S1w` into (`S`, 1, `w`).
fn split_qualifiers(text: &str) -> Option<(&str, u32, &str)> {
    let digits_start = text.find(|c: char| c.is_ascii_digit())?;
    let (climate, rest) = text.split_at(digits_start);
    if !climate.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, season) = rest.split_at(digits_end);
    if !season.is_empty() && !SEASON_TAGS.contains(&season) {
        return None;
    }
    Some((climate, digits.parse().ok()?, season))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn villager_name_is_positional() {
        assert_eq!(image_name(396, 0, 0, 158, 1, "", ""), "396.158.1_0-0");
        assert_eq!(image_name(123, 3, 1, 145, 1, "S", "w"), "123.145.S1w_3-1");
        assert_eq!(image_name(9, 2, 4, 7, 0, "", "p"), "009.7.0p_2-4");
    }

    #[test]
    fn any_face_uses_placeholder() {
        assert_eq!(image_name_any_face(396, 1, 2, 0, "S", "m"), "396.X.S0m_1-2");
    }

    #[test]
    fn guard_names_with_and_without_tag() {
        assert_eq!(guard_image_name(399, 0, 0, Some("Sentinel")), "399.Sentinel_0-0");
        assert_eq!(guard_image_name(399, 15, 2, None), "399_15-2");
        assert_eq!(guard_image_name(399, 15, 2, Some("")), "399_15-2");
        assert_eq!(guard_archive_prefix(399, Some("HF")), "399.HF");
        assert_eq!(guard_archive_prefix(399, None), "399");
    }

    #[test]
    fn emission_is_suffix() {
        assert_eq!(emission_name("396.158.1_0-0"), "396.158.1_0-0_Emission");
    }

    #[test]
    fn season_tags_follow_ordinals() {
        assert_eq!(season_tag(Season::Fall), "f");
        assert_eq!(season_tag(Season::Spring), "p");
        assert_eq!(season_tag(Season::Summer), "m");
        assert_eq!(season_tag(Season::Winter), "w");
    }

    #[test]
    fn format_then_parse_recovers_fields() {
        for (face, variant, climate, season) in [
            (158u32, 1u32, "", ""),
            (0, 0, "S", "w"),
            (470, 12, "S", ""),
            (24, 3, "", "f"),
        ] {
            let name = image_name(1053, 6, 11, face, variant, climate, season);
            let parsed = parse_image_name(&name).expect("parse");
            assert_eq!(parsed.archive, 1053);
            assert_eq!(parsed.record, 6);
            assert_eq!(parsed.frame, 11);
            assert!(!parsed.emission);
            assert_eq!(
                parsed.kind,
                NameKind::Villager {
                    face: Some(face),
                    variant,
                    climate: climate.to_string(),
                    season: season.to_string(),
                }
            );
        }
    }

    #[test]
    fn parse_any_face_guard_and_emission() {
        let parsed = parse_image_name("396.X.S0m_1-2_Emission").expect("parse");
        assert!(parsed.emission);
        assert!(matches!(parsed.kind, NameKind::Villager { face: None, variant: 0, .. }));

        let guard = parse_image_name("399.Sentinel_3-0").expect("parse");
        assert_eq!(
            guard.kind,
            NameKind::Plain {
                tag: Some("Sentinel".to_string())
            }
        );
        let bare = parse_image_name("399_3-0").expect("parse");
        assert_eq!(bare.kind, NameKind::Plain { tag: None });
        assert_eq!((bare.record, bare.frame), (3, 0));
    }

    #[test]
    fn parse_rejects_malformed_names() {
        for name in ["", "396", "396.158.1_0", "abc_0-0", "396.158.1x_0-0", "1.2.3.4_0-0", "396.158.q1_0-0"] {
            assert!(parse_image_name(name).is_err(), "name={name}");
        }
    }
}
