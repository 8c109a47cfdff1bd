//! `minSdkVersion` reading and in-place rewriting for `AndroidManifest.xml`.
//!
//! The attribute looked at is `android:minSdkVersion` on the `<uses-sdk>`
//! element that is a direct child of the document root. Rewrites splice the new
//! value into the attribute's quotes and leave every other byte of the file
//! as it was. UTF-8 and BOM-marked UTF-16 files are read, and a rewrite is
//! saved in the encoding the file came in.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Attribute, Document};
use serde::Serialize;

use crate::core::errors::{ApfError, Result};
use crate::scanner::walker::ArtifactFile;

/// Namespace bound to the `android:` prefix in manifests.
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

const USES_SDK: &str = "uses-sdk";
const MIN_SDK_VERSION: &str = "minSdkVersion";
const BOM: char = '\u{feff}';
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Highest `minSdkVersion` seen so far plus an optional explicit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SdkVersionState {
    highest: u32,
    target: Option<u32>,
}

impl Default for SdkVersionState {
    fn default() -> Self {
        Self::new(15)
    }
}

impl SdkVersionState {
    #[must_use]
    pub const fn new(floor: u32) -> Self {
        Self {
            highest: floor,
            target: None,
        }
    }

    /// Fold one observed value into the running maximum.
    pub fn observe(&mut self, value: u32) -> u32 {
        self.highest = self.highest.max(value);
        self.highest
    }

    #[must_use]
    pub const fn highest(&self) -> u32 {
        self.highest
    }

    /// Value manifests get rewritten to: the explicit target if one was set,
    /// otherwise the highest value observed.
    #[must_use]
    pub fn target(&self) -> u32 {
        self.target.unwrap_or(self.highest)
    }

    #[must_use]
    pub const fn explicit_target(&self) -> Option<u32> {
        self.target
    }

    pub fn set_target(&mut self, value: u32) {
        self.target = Some(value);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }
}

/// Read `android:minSdkVersion` from the manifest at `path`.
///
/// `Ok(None)` when the root, its `<uses-sdk>` child, or the attribute is
/// missing. The caller folds the value into its [`SdkVersionState`].
pub fn read_min_sdk(path: &Path) -> Result<Option<u32>> {
    let manifest = ManifestText::load(path)?;
    min_sdk_from_str(path, &manifest.text)
}

/// Parse a manifest held in memory; `path` is only used in errors.
pub fn min_sdk_from_str(path: &Path, text: &str) -> Result<Option<u32>> {
    let doc = parse_document(path, strip_bom(text))?;
    let Some(attr) = find_min_sdk(&doc) else {
        return Ok(None);
    };
    parse_sdk_value(path, attr.value()).map(Some)
}

/// What a rewrite did (or would do) to one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Attribute text replaced; `previous` is the old raw value.
    Rewritten { previous: String },
    /// Attribute already held exactly the requested text.
    Unchanged,
    /// No `<uses-sdk>` or no `android:minSdkVersion`; nothing written.
    Absent,
}

/// Overwrite `android:minSdkVersion` in the manifest at `path` with `value`.
///
/// Missing element or attribute is a silent no-op; no element is created.
pub fn write_min_sdk(path: &Path, value: u32) -> Result<WriteOutcome> {
    rewrite(path, value, true)
}

/// Same as [`write_min_sdk`] without touching the file.
pub fn preview_min_sdk(path: &Path, value: u32) -> Result<WriteOutcome> {
    rewrite(path, value, false)
}

fn rewrite(path: &Path, value: u32, persist: bool) -> Result<WriteOutcome> {
    let manifest = ManifestText::load(path)?;
    let Some((updated, previous)) = set_min_sdk_in_str(path, &manifest.text, value)? else {
        return Ok(WriteOutcome::Absent);
    };
    if updated == manifest.text {
        return Ok(WriteOutcome::Unchanged);
    }
    if persist {
        fs::write(path, manifest.encoding.encode(&updated))
            .map_err(|source| ApfError::io(path, source))?;
    }
    Ok(WriteOutcome::Rewritten { previous })
}

/// Return `text` with the attribute value replaced, plus the previous raw
/// value, or `None` when the attribute is absent.
pub fn set_min_sdk_in_str(
    path: &Path,
    text: &str,
    value: u32,
) -> Result<Option<(String, String)>> {
    let body = strip_bom(text);
    let offset = text.len() - body.len();

    let doc = parse_document(path, body)?;
    let Some(attr) = find_min_sdk(&doc) else {
        return Ok(None);
    };
    let range = attr.range_value();

    let start = offset + range.start;
    let end = offset + range.end;
    let previous = text[start..end].to_string();
    let mut updated = String::with_capacity(text.len() + 4);
    updated.push_str(&text[..start]);
    updated.push_str(&value.to_string());
    updated.push_str(&text[end..]);
    Ok(Some((updated, previous)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf8Bom => [UTF8_BOM.as_slice(), text.as_bytes()].concat(),
            Self::Utf16Le => UTF16LE_BOM
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_le_bytes))
                .collect(),
            Self::Utf16Be => UTF16BE_BOM
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                .collect(),
        }
    }
}

/// Manifest contents decoded to text, BOM removed.
#[derive(Debug)]
struct ManifestText {
    encoding: TextEncoding,
    text: String,
}

impl ManifestText {
    fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| ApfError::io(path, source))?;
        Self::decode(path, &bytes)
    }

    fn decode(path: &Path, bytes: &[u8]) -> Result<Self> {
        let (encoding, decoded) = match bytes {
            [0xFF, 0xFE, rest @ ..] => (TextEncoding::Utf16Le, utf16(rest, u16::from_le_bytes)),
            [0xFE, 0xFF, rest @ ..] => (TextEncoding::Utf16Be, utf16(rest, u16::from_be_bytes)),
            [0xEF, 0xBB, 0xBF, rest @ ..] => (TextEncoding::Utf8Bom, utf8(rest)),
            _ => (TextEncoding::Utf8, utf8(bytes)),
        };
        let text = decoded.map_err(|details| ApfError::MalformedManifest {
            path: path.to_path_buf(),
            details,
        })?;
        Ok(Self { encoding, text })
    }
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| format!("not valid UTF-8: {err}"))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> std::result::Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("UTF-16 text has an odd number of bytes".to_string());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|err| format!("not valid UTF-16: {err}"))
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

fn parse_document<'input>(path: &Path, text: &'input str) -> Result<Document<'input>> {
    Document::parse(text).map_err(|err| ApfError::MalformedManifest {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn find_min_sdk<'a, 'input>(doc: &'a Document<'input>) -> Option<Attribute<'a, 'input>> {
    let uses_sdk = doc
        .root_element()
        .children()
        .find(|node| node.is_element() && node.has_tag_name(USES_SDK))?;
    uses_sdk
        .attributes()
        .find(|attr| attr.namespace() == Some(ANDROID_NS) && attr.name() == MIN_SDK_VERSION)
}

fn parse_sdk_value(path: &Path, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| ApfError::Parse {
        path: path.to_path_buf(),
        value: raw.to_string(),
    })
}

/// Outcome of reading one manifest during a survey.
#[derive(Debug)]
pub struct ManifestReading {
    pub path: PathBuf,
    pub result: Result<Option<u32>>,
}

/// Every manifest read once, with the running maximum folded in.
#[derive(Debug)]
pub struct ManifestSurvey {
    pub readings: Vec<ManifestReading>,
    pub highest: u32,
}

impl ManifestSurvey {
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ApfError)> {
        self.readings
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.path.as_path(), e)))
    }
}

/// Read every manifest, folding declared values into `state`. A failure on
/// one manifest is recorded and does not stop the others.
pub fn survey(manifests: &[ArtifactFile], state: &mut SdkVersionState) -> ManifestSurvey {
    let readings: Vec<ManifestReading> = manifests
        .iter()
        .map(|manifest| {
            let result = read_min_sdk(&manifest.path);
            if let Ok(Some(value)) = result {
                state.observe(value);
            }
            ManifestReading {
                path: manifest.path.clone(),
                result,
            }
        })
        .collect();
    ManifestSurvey {
        readings,
        highest: state.highest(),
    }
}

/// Outcome of rewriting one manifest.
#[derive(Debug)]
pub struct ManifestWrite {
    pub path: PathBuf,
    pub result: Result<WriteOutcome>,
}

/// Result of applying one target value to a set of manifests. Each write
/// commits on its own; earlier writes stay when a later one fails.
#[derive(Debug)]
pub struct ApplyReport {
    pub target: u32,
    pub dry_run: bool,
    pub writes: Vec<ManifestWrite>,
}

impl ApplyReport {
    #[must_use]
    pub fn rewritten(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w.result, Ok(WriteOutcome::Rewritten { .. })))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ApfError)> {
        self.writes
            .iter()
            .filter_map(|w| w.result.as_ref().err().map(|e| (w.path.as_path(), e)))
    }
}

/// Rewrite every manifest's `minSdkVersion` to `target`.
pub fn apply(manifests: &[ArtifactFile], target: u32, dry_run: bool) -> ApplyReport {
    let writes = manifests
        .iter()
        .map(|manifest| ManifestWrite {
            path: manifest.path.clone(),
            result: rewrite(&manifest.path, target, !dry_run),
        })
        .collect();
    ApplyReport {
        target,
        dry_run,
        writes,
    }
}
