//! Asset roles, MIME allowlist and storage object key rules.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum size of a user upload (50 MiB).
pub const MAX_UPLOAD_BYTES: i64 = 50 * 1024 * 1024;

/// Number of random bytes in an object key (hex-encoded to 64 characters).
pub const OBJECT_KEY_RANDOM_BYTES: usize = 32;

/// Fallback content type when a fetched artifact does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// MIME types accepted for user uploads.
pub const ALLOWED_UPLOAD_MIME_TYPES: &[&str] = &[
    "audio/mp3",
    "audio/mpeg",
    "audio/wav",
    "audio/flac",
    "audio/mp4",
    "audio/mov",
    "audio/wma",
    "audio/ogg",
    "audio/m4a",
    "audio/x-wav",
];

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Semantic role of an asset relative to its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Original,
    Generation,
    Vocals,
    Accompaniment,
    Bass,
    Drums,
    Guitar,
    Piano,
    Other,
    Analysis,
    AnalysisSonic,
    AnalysisViz,
    Midi,
    Lyrics,
}

impl AssetRole {
    pub const ALL: [AssetRole; 14] = [
        AssetRole::Original,
        AssetRole::Generation,
        AssetRole::Vocals,
        AssetRole::Accompaniment,
        AssetRole::Bass,
        AssetRole::Drums,
        AssetRole::Guitar,
        AssetRole::Piano,
        AssetRole::Other,
        AssetRole::Analysis,
        AssetRole::AnalysisSonic,
        AssetRole::AnalysisViz,
        AssetRole::Midi,
        AssetRole::Lyrics,
    ];

    /// Name stored in `assets.role`.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetRole::Original => "original",
            AssetRole::Generation => "generation",
            AssetRole::Vocals => "vocals",
            AssetRole::Accompaniment => "accompaniment",
            AssetRole::Bass => "bass",
            AssetRole::Drums => "drums",
            AssetRole::Guitar => "guitar",
            AssetRole::Piano => "piano",
            AssetRole::Other => "other",
            AssetRole::Analysis => "analysis",
            AssetRole::AnalysisSonic => "analysis_sonic",
            AssetRole::AnalysisViz => "analysis_viz",
            AssetRole::Midi => "midi",
            AssetRole::Lyrics => "lyrics",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == name)
    }

    /// Role for a named separation stem. Unknown stems yield `None`.
    pub fn from_stem(stem: &str) -> Option<Self> {
        match stem {
            "vocals" => Some(AssetRole::Vocals),
            "accompaniment" => Some(AssetRole::Accompaniment),
            "bass" => Some(AssetRole::Bass),
            "drums" => Some(AssetRole::Drums),
            "guitar" => Some(AssetRole::Guitar),
            "piano" => Some(AssetRole::Piano),
            "other" => Some(AssetRole::Other),
            _ => None,
        }
    }

    /// Role for one entry of an analysis output list.
    ///
    /// Deliberately narrow: anything outside `.json`, `.png` and `.mp3` is
    /// skipped by the caller.
    pub fn from_analysis_extension(extension: &str) -> Option<Self> {
        match extension {
            ".json" => Some(AssetRole::Analysis),
            ".png" => Some(AssetRole::AnalysisViz),
            ".mp3" => Some(AssetRole::AnalysisSonic),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a client-declared upload MIME type against the allowlist.
pub fn validate_upload_mime_type(mime_type: &str) -> Result<(), CoreError> {
    if ALLOWED_UPLOAD_MIME_TYPES.contains(&mime_type) {
        Ok(())
    } else {
        Err(CoreError::invalid_field(
            "mime_type",
            format!("unsupported MIME type '{mime_type}'"),
        ))
    }
}

/// Validate a client-declared upload size.
pub fn validate_upload_size(size_bytes: i64) -> Result<(), CoreError> {
    if size_bytes <= 0 {
        return Err(CoreError::invalid_field("size_bytes", "must be positive"));
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(CoreError::invalid_field(
            "size_bytes",
            format!("max file size is {} MB", MAX_UPLOAD_BYTES / 1024 / 1024),
        ));
    }
    Ok(())
}

/// Normalise a file extension to `.ext` form, rejecting anything that could
/// smuggle path characters into an object key.
pub fn normalize_extension(extension: &str) -> Result<String, CoreError> {
    let bare = extension.trim().trim_start_matches('.');
    if bare.is_empty() || bare.len() > 10 || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::invalid_field(
            "extension",
            "must be 1-10 alphanumeric characters",
        ));
    }
    Ok(format!(".{}", bare.to_ascii_lowercase()))
}

/// Client request for a presigned upload grant.
///
/// `checksum` is advisory: it is accepted but never compared against the
/// uploaded bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub mime_type: String,
    pub extension: String,
    pub size_bytes: i64,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl UploadRequest {
    /// Validate the declared upload and return the normalised extension.
    pub fn validate_upload(&self) -> Result<String, CoreError> {
        validate_upload_mime_type(&self.mime_type)?;
        validate_upload_size(self.size_bytes)?;
        normalize_extension(&self.extension)
    }
}

// ---------------------------------------------------------------------------
// Object keys
// ---------------------------------------------------------------------------

/// Generate a fresh, unguessable object key ending in `extension`.
///
/// `extension` is appended verbatim, so callers pass either an empty string
/// or a normalised `.ext`.
pub fn generate_object_key(extension: &str) -> String {
    let mut bytes = [0u8; OBJECT_KEY_RANDOM_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    let mut key = String::with_capacity(OBJECT_KEY_RANDOM_BYTES * 2 + extension.len());
    for byte in bytes {
        key.push_str(&format!("{byte:02x}"));
    }
    key.push_str(extension);
    key
}

/// Extract the lowercase `.ext` of the last path segment of a URL, ignoring
/// query string and fragment. Returns an empty string when there is none.
pub fn url_extension(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let last_segment = path.rsplit('/').next().unwrap_or_default();

    match last_segment.rfind('.') {
        Some(pos) if pos > 0 => {
            let ext = &last_segment[pos..];
            if ext.len() > 1 && ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
                ext.to_ascii_lowercase()
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

/// Strip parameters (`; charset=...`) from a content type header value.
pub fn essence_mime_type(content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}
