use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ExtractError, Result};

/// Timestamp layout used by annotation documents:
/// day/month/year, 24h clock, microsecond fraction.
pub const ARTF_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S%.6f";

/// An externally annotated time interval marking an artifactual reading.
///
/// Two artefacts are equal when they cover the same interval; who annotated
/// them and when is deliberately excluded from equality.
///
/// # Examples
///
/// ```rust
/// use artiseg::Artefact;
///
/// let a = Artefact::parse_attrs(
///     Some("nurse7"),
///     Some("02/01/2023 08:00:00.000000"),
///     "02/01/2023 10:00:00.000000",
///     "02/01/2023 10:00:05.000000",
/// ).unwrap();
/// let b = Artefact::parse_attrs(
///     Some("dr_m"),
///     Some("03/01/2023 09:30:00.000000"),
///     "02/01/2023 10:00:00.000000",
///     "02/01/2023 10:00:05.000000",
/// ).unwrap();
///
/// // Same interval, different annotators: still the same artefact
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Artefact {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub modified_by: String,
    pub modified_time: DateTime<Utc>,
}

impl PartialEq for Artefact {
    fn eq(&self, other: &Self) -> bool {
        self.start_time == other.start_time && self.end_time == other.end_time
    }
}

impl Eq for Artefact {}

impl Artefact {
    /// Builds an artefact from raw attribute strings.
    ///
    /// `modified_by` defaults to `"Administrator"` and `modified_date` to
    /// the artefact's own start time when the document omits them.
    pub fn parse_attrs(
        modified_by: Option<&str>,
        modified_date: Option<&str>,
        start_time: &str,
        end_time: &str,
    ) -> Result<Artefact> {
        let start_time = parse_timestamp(start_time)?;
        let end_time = parse_timestamp(end_time)?;
        let modified_time = match modified_date {
            Some(raw) => parse_timestamp(raw)?,
            None => start_time,
        };
        Ok(Artefact {
            start_time,
            end_time,
            modified_by: modified_by.unwrap_or("Administrator").to_string(),
            modified_time,
        })
    }

    /// Start of the interval as a Unix timestamp in microseconds.
    pub fn start_micros(&self) -> i64 {
        self.start_time.timestamp_micros()
    }

    /// End of the interval as a Unix timestamp in microseconds.
    pub fn end_micros(&self) -> i64 {
        self.end_time.timestamp_micros()
    }
}

/// Parses a `DD/MM/YYYY HH:MM:SS.ffffff` timestamp as UTC.
///
/// Shorter fractional parts are zero-padded to six digits first, so
/// `"02/01/2023 10:00:00.5"` and `"02/01/2023 10:00:00.500000"` parse to
/// the same instant. A missing fraction counts as `.000000`.
///
/// # Examples
///
/// ```rust
/// use artiseg::{parse_timestamp, render_timestamp};
///
/// let raw = "02/01/2023 10:00:00.123456";
/// let ts = parse_timestamp(raw).unwrap();
///
/// // Rendering reproduces the original string to microsecond precision
/// assert_eq!(render_timestamp(&ts), raw);
/// ```
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let filled = fill_fractional(raw.trim());
    let naive = NaiveDateTime::parse_from_str(&filled, ARTF_TIME_FORMAT)
        .map_err(|_| ExtractError::InvalidTimestamp(raw.to_string()))?;
    Ok(naive.and_utc())
}

/// Renders a timestamp in the annotation document layout, fractional part
/// zero-padded to six digits.
pub fn render_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(ARTF_TIME_FORMAT).to_string()
}

/// Pads the fractional seconds of a raw timestamp string to six digits.
fn fill_fractional(raw: &str) -> String {
    match raw.split_once('.') {
        None => format!("{}.000000", raw),
        Some((whole, frac)) => format!("{}.{:0<6}", whole, frac),
    }
}

/// Optional `Info` block of an annotation document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtfMetadata {
    pub signal_filename: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
enum BlockScope {
    Global,
    Group(String),
}

#[derive(Debug, Clone)]
struct ArtefactBlock {
    scope: BlockScope,
    artefacts: Vec<Artefact>,
}

/// All artefacts of one annotation document, grouped the way the document
/// groups them.
///
/// A document carries a `Global` block whose artefacts apply to every
/// channel, plus named `SignalGroup` blocks that apply to a single channel.
/// Block order and the order of artefacts inside a block are preserved;
/// nothing is re-sorted (sort by start time yourself if you need it).
///
/// # Examples
///
/// ```rust
/// use artiseg::ArtefactSet;
///
/// let doc = r#"<?xml version="1.0" encoding="utf-8"?>
/// <ICMArtefacts>
///     <Global>
///         <Artefact ModifiedBy="Administrator" ModifiedDate="01/01/2023 12:00:00.000000" StartTime="01/01/2023 10:00:00.000000" EndTime="01/01/2023 10:00:05.000000"/>
///     </Global>
///     <SignalGroup Name="icp">
///         <Artefact ModifiedBy="nurse7" ModifiedDate="01/01/2023 12:00:00.000000" StartTime="01/01/2023 10:00:20.000000" EndTime="01/01/2023 10:00:25.000000"/>
///     </SignalGroup>
/// </ICMArtefacts>"#;
///
/// let set = ArtefactSet::parse(doc).unwrap();
/// assert_eq!(set.global().len(), 1);
/// assert_eq!(set.group("icp").len(), 1);
/// // Global artefacts apply to icp too, in document order
/// assert_eq!(set.for_channel("icp").len(), 2);
/// assert_eq!(set.for_channel("abp").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArtefactSet {
    blocks: Vec<ArtefactBlock>,
    metadata: Option<ArtfMetadata>,
}

impl ArtefactSet {
    /// Reads and parses an annotation document from disk.
    ///
    /// The file is decoded leniently (annotation tools in the wild write
    /// Latin-1 annotator names); a missing file maps to
    /// [`ExtractError::MissingFile`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ArtefactSet> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ExtractError::MissingFile(format!("{}: no such annotation file", path.display()))
            } else {
                ExtractError::Io(e)
            }
        })?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    /// Parses an annotation document from text.
    pub fn parse(text: &str) -> Result<ArtefactSet> {
        let mut set = ArtefactSet::default();
        let mut scope: Option<BlockScope> = None;

        let mut rest = text;
        while let Some(open) = rest.find('<') {
            let Some(len) = rest[open..].find('>') else {
                return Err(ExtractError::InvalidAnnotation(
                    "unterminated tag".to_string(),
                ));
            };
            let tag = rest[open + 1..open + len].trim();
            rest = &rest[open + len + 1..];

            // Declarations and comments carry no artefact data
            if tag.starts_with('?') || tag.starts_with('!') {
                continue;
            }

            if let Some(closing) = tag.strip_prefix('/') {
                if matches!(closing.trim(), "Global" | "SignalGroup") {
                    scope = None;
                }
                continue;
            }

            let self_closing = tag.ends_with('/');
            let tag = tag.trim_end_matches('/').trim_end();
            let (element, attrs) = match tag.find(char::is_whitespace) {
                Some(pos) => (&tag[..pos], &tag[pos..]),
                None => (tag, ""),
            };

            match element {
                "Global" => {
                    if !self_closing {
                        set.blocks.push(ArtefactBlock {
                            scope: BlockScope::Global,
                            artefacts: Vec::new(),
                        });
                        scope = Some(BlockScope::Global);
                    }
                }
                "SignalGroup" => {
                    let name = attr_value(attrs, "Name").ok_or_else(|| {
                        ExtractError::InvalidAnnotation("SignalGroup without Name".to_string())
                    })?;
                    if !self_closing {
                        set.blocks.push(ArtefactBlock {
                            scope: BlockScope::Group(name.clone()),
                            artefacts: Vec::new(),
                        });
                        scope = Some(BlockScope::Group(name));
                    }
                }
                "Artefact" => {
                    if scope.is_none() {
                        return Err(ExtractError::InvalidAnnotation(
                            "Artefact outside Global or SignalGroup".to_string(),
                        ));
                    }
                    let start = attr_value(attrs, "StartTime").ok_or_else(|| {
                        ExtractError::InvalidAnnotation("Artefact without StartTime".to_string())
                    })?;
                    let end = attr_value(attrs, "EndTime").ok_or_else(|| {
                        ExtractError::InvalidAnnotation("Artefact without EndTime".to_string())
                    })?;
                    let artefact = Artefact::parse_attrs(
                        attr_value(attrs, "ModifiedBy").as_deref(),
                        attr_value(attrs, "ModifiedDate").as_deref(),
                        &start,
                        &end,
                    )?;
                    if let Some(block) = set.blocks.last_mut() {
                        block.artefacts.push(artefact);
                    }
                }
                "Info" => {
                    set.metadata = Some(ArtfMetadata {
                        signal_filename: attr_value(attrs, "HDF5Filename"),
                        user_id: attr_value(attrs, "UserID"),
                    });
                }
                // Root element and anything unknown pass through
                _ => {}
            }
        }

        Ok(set)
    }

    /// Artefacts of the `Global` block(s), in document order.
    pub fn global(&self) -> Vec<&Artefact> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.scope, BlockScope::Global))
            .flat_map(|b| b.artefacts.iter())
            .collect()
    }

    /// Artefacts of the named signal group, in document order. Empty when
    /// the document has no such group.
    pub fn group(&self, name: &str) -> Vec<&Artefact> {
        self.blocks
            .iter()
            .filter(|b| matches!(&b.scope, BlockScope::Group(n) if n == name))
            .flat_map(|b| b.artefacts.iter())
            .collect()
    }

    /// Names of the signal groups present in the document.
    pub fn group_names(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match &b.scope {
                BlockScope::Group(n) => Some(n.as_str()),
                BlockScope::Global => None,
            })
            .collect()
    }

    /// All artefacts applying to `channel`: its signal group's and the
    /// Global ones, walked in document order as one sequence.
    pub fn for_channel(&self, channel: &str) -> Vec<&Artefact> {
        self.blocks
            .iter()
            .filter(|b| match &b.scope {
                BlockScope::Global => true,
                BlockScope::Group(n) => n == channel,
            })
            .flat_map(|b| b.artefacts.iter())
            .collect()
    }

    /// Number of artefacts applying to `channel`, per annotator.
    pub fn annotator_counts(&self, channel: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for artefact in self.for_channel(channel) {
            *counts.entry(artefact.modified_by.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// The document's `Info` block, when present.
    pub fn metadata(&self) -> Option<&ArtfMetadata> {
        self.metadata.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.artefacts.is_empty())
    }
}

/// Looks up an attribute value inside a tag's attribute list.
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    let mut search = attrs;
    while let Some(pos) = search.find(name) {
        let boundary = search[..pos]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        let after = search[pos + name.len()..].trim_start();
        if boundary {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                if let Some(quoted) = value.strip_prefix('"') {
                    if let Some(end) = quoted.find('"') {
                        return Some(unescape(&quoted[..end]));
                    }
                }
                return None;
            }
        }
        search = &search[pos + name.len()..];
    }
    None
}

/// Undoes the entity escaping annotation writers apply to attribute values.
fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_fractional() {
        assert_eq!(fill_fractional("01/01/2023 10:00:00"), "01/01/2023 10:00:00.000000");
        assert_eq!(fill_fractional("01/01/2023 10:00:00.5"), "01/01/2023 10:00:00.500000");
        assert_eq!(
            fill_fractional("01/01/2023 10:00:00.123456"),
            "01/01/2023 10:00:00.123456"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("2023-01-01T10:00:00Z").is_err());
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("32/01/2023 10:00:00.000000").is_err());
    }

    #[test]
    fn test_attr_value_boundaries() {
        let attrs = r#" HDF5Filename="TBI_1.hdf5" Name="icp""#;
        // "Name" must not match inside "HDF5Filename"
        assert_eq!(attr_value(attrs, "Name").as_deref(), Some("icp"));
        assert_eq!(
            attr_value(attrs, "HDF5Filename").as_deref(),
            Some("TBI_1.hdf5")
        );
        assert_eq!(attr_value(attrs, "UserID"), None);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape("a &amp; b"), "a & b");
        assert_eq!(unescape("&lt;x&gt;"), "<x>");
    }
}
