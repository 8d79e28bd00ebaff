//! Job kinds and the per-kind facts the dispatcher and reconciler rely on.
//!
//! The job kind is the discriminant for everything kind-specific: which
//! model version runs it, which provider input key receives the uploaded
//! audio, and which output shape the completion callback carries.

use serde::{Deserialize, Serialize};

use crate::asset::AssetRole;

/// The fixed set of AI operations a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "generation")]
    Generate,
    #[serde(rename = "separation")]
    Separate,
    #[serde(rename = "analysis")]
    Analyze,
    #[serde(rename = "midi")]
    TranscribeMidi,
    #[serde(rename = "lyrics")]
    TranscribeLyrics,
}

/// How the provider reports results for a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// One URL string.
    SingleUrl(AssetRole),
    /// Array of nullable URL strings, role inferred from file extension.
    UrlList,
    /// Object mapping stem name to nullable URL string.
    Stems,
    /// Arbitrary structured JSON, persisted verbatim.
    Document(AssetRole),
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::Generate,
        JobKind::Separate,
        JobKind::Analyze,
        JobKind::TranscribeMidi,
        JobKind::TranscribeLyrics,
    ];

    /// Name stored in `jobs.kind` and used in callback paths.
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Generate => "generation",
            JobKind::Separate => "separation",
            JobKind::Analyze => "analysis",
            JobKind::TranscribeMidi => "midi",
            JobKind::TranscribeLyrics => "lyrics",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether submitting this kind requires a previously uploaded asset.
    pub fn requires_asset(self) -> bool {
        !matches!(self, JobKind::Generate)
    }

    /// Provider input key that receives the presigned URL of the input audio.
    pub fn audio_input_key(self) -> &'static str {
        match self {
            JobKind::Generate => "input_audio",
            JobKind::Separate => "audio",
            JobKind::Analyze => "music_input",
            JobKind::TranscribeMidi => "audio_file",
            JobKind::TranscribeLyrics => "audio",
        }
    }

    pub fn output_shape(self) -> OutputShape {
        match self {
            JobKind::Generate => OutputShape::SingleUrl(AssetRole::Generation),
            JobKind::TranscribeMidi => OutputShape::SingleUrl(AssetRole::Midi),
            JobKind::Analyze => OutputShape::UrlList,
            JobKind::Separate => OutputShape::Stems,
            JobKind::TranscribeLyrics => OutputShape::Document(AssetRole::Lyrics),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
