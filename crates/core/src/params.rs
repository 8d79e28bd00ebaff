//! Per-kind model parameters and the job submission request envelope.
//!
//! Each parameter struct serializes directly into the provider's `input`
//! object; the presigned URL of the uploaded audio is injected afterwards
//! under the kind's audio input key.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{collect_field_errors, CoreError, FieldErrors};
use crate::job::JobKind;
use crate::types::DbId;

/// Longest display name a job may carry.
pub const MAX_JOB_NAME_LEN: usize = 255;

/// Parameters accepted by one job kind.
pub trait ModelParams: Serialize + Validate + Default {
    const KIND: JobKind;
}

/// Body of every job submission endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRequest<P> {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    pub asset_id: Option<DbId>,
    #[serde(default)]
    pub params: P,
}

impl<P: ModelParams> JobRequest<P> {
    pub fn kind(&self) -> JobKind {
        P::KIND
    }

    /// Check the envelope and the nested parameters together, so a client
    /// gets every failing field in one response.
    pub fn validate_request(&self) -> Result<(), CoreError> {
        let mut fields = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_JOB_NAME_LEN {
            fields
                .entry("name".to_string())
                .or_default()
                .push(format!("must be 1-{MAX_JOB_NAME_LEN} characters"));
        }

        if P::KIND.requires_asset() && self.asset_id.is_none() {
            fields
                .entry("asset_id".to_string())
                .or_default()
                .push(format!("required for {} jobs", P::KIND));
        }

        if let Err(errors) = self.params.validate() {
            collect_field_errors(&errors, "params", &mut fields);
        }

        if fields.is_empty() {
            return Ok(());
        }

        let message = fields.keys().cloned().collect::<Vec<_>>().join(", ");
        Err(CoreError::Validation {
            message: format!("invalid fields: {message}"),
            fields,
        })
    }

    /// Build the provider `input` object.
    pub fn provider_input(&self, audio_url: Option<&str>) -> Result<serde_json::Value, CoreError> {
        let mut input = serde_json::to_value(&self.params)
            .map_err(|e| CoreError::Internal(format!("failed to encode model input: {e}")))?;

        if let (Some(url), Some(object)) = (audio_url, input.as_object_mut()) {
            object.insert(
                P::KIND.audio_input_key().to_string(),
                serde_json::Value::String(url.to_string()),
            );
        }
        Ok(input)
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationModel {
    Large,
    MelodyLarge,
    StereoLarge,
    #[default]
    StereoMelodyLarge,
    EncodeDecode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationStrategy {
    #[default]
    Loudness,
    Clip,
    Peak,
    Rms,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationFormat {
    #[default]
    Mp3,
    Wav,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenerationParams {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    pub model_version: GenerationModel,
    #[validate(range(min = 1, max = 60, message = "must be between 1 and 60 seconds"))]
    pub duration: u32,
    pub continuation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_end: Option<u32>,
    pub multi_band_diffusion: bool,
    pub normalization_strategy: NormalizationStrategy,
    pub top_k: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f64,
    #[validate(range(min = 0.0))]
    pub temperature: f64,
    pub classifier_free_guidance: u32,
    pub output_format: GenerationFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model_version: GenerationModel::default(),
            duration: 8,
            continuation: false,
            continuation_start: None,
            continuation_end: None,
            multi_band_diffusion: false,
            normalization_strategy: NormalizationStrategy::default(),
            top_k: 250,
            top_p: 0.0,
            temperature: 1.0,
            classifier_free_guidance: 3,
            output_format: GenerationFormat::default(),
            seed: None,
        }
    }
}

impl ModelParams for GenerationParams {
    const KIND: JobKind = JobKind::Generate;
}

// ---------------------------------------------------------------------------
// Separation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparationModel {
    #[default]
    Htdemucs,
    HtdemucsFt,
    #[serde(rename = "htdemucs_6s")]
    Htdemucs6s,
    HdemucsMmi,
    MdxQ,
    MdxExtraQ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Bass,
    Drums,
    Guitar,
    Piano,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    #[default]
    Rescale,
    Clamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparationFormat {
    #[default]
    Mp3,
    Wav,
    Flac,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SeparationParams {
    pub model: SeparationModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stem: Option<Stem>,
    pub clip_mode: ClipMode,
    #[validate(range(min = 1))]
    pub jobs: u32,
    pub split: bool,
    #[validate(range(min = 1, max = 10, message = "must be between 1 and 10"))]
    pub shifts: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub overlap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<u32>,
    pub output_format: SeparationFormat,
    pub mp3_preset: u32,
    #[validate(length(min = 1, max = 16))]
    pub wav_format: String,
    pub mp3_bitrate: u32,
}

impl Default for SeparationParams {
    fn default() -> Self {
        Self {
            model: SeparationModel::default(),
            stem: None,
            clip_mode: ClipMode::default(),
            jobs: 1,
            split: true,
            shifts: 1,
            overlap: 0.25,
            segment: None,
            output_format: SeparationFormat::default(),
            mp3_preset: 2,
            wav_format: "int24".to_string(),
            mp3_bitrate: 320,
        }
    }
}

impl ModelParams for SeparationParams {
    const KIND: JobKind = JobKind::Separate;
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisModel {
    #[default]
    HarmonixAll,
    HarmonixFold0,
    HarmonixFold1,
    HarmonixFold2,
    HarmonixFold3,
    HarmonixFold4,
    HarmonixFold5,
    HarmonixFold6,
    HarmonixFold7,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisParams {
    pub visualize: bool,
    pub sonify: bool,
    pub activ: bool,
    pub embed: bool,
    pub model: AnalysisModel,
    pub include_activations: bool,
    pub include_embeddings: bool,
}

impl ModelParams for AnalysisParams {
    const KIND: JobKind = JobKind::Analyze;
}

// ---------------------------------------------------------------------------
// MIDI transcription
// ---------------------------------------------------------------------------

/// MIDI transcription takes nothing but the audio file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MidiParams {}

impl ModelParams for MidiParams {
    const KIND: JobKind = JobKind::TranscribeMidi;
}

// ---------------------------------------------------------------------------
// Lyrics transcription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricsTask {
    #[default]
    Transcribe,
    Translate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    #[default]
    Chunk,
    Word,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_diarisation"))]
pub struct LyricsParams {
    pub task: LyricsTask,
    /// `"None"` asks the model to detect the language.
    #[validate(length(min = 1, max = 32))]
    pub language: String,
    #[validate(range(min = 1, max = 64, message = "must be between 1 and 64"))]
    pub batch_size: u32,
    pub timestamp: TimestampMode,
    pub diarise_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<String>,
}

impl Default for LyricsParams {
    fn default() -> Self {
        Self {
            task: LyricsTask::default(),
            language: "None".to_string(),
            batch_size: 24,
            timestamp: TimestampMode::default(),
            diarise_audio: false,
            hf_token: None,
        }
    }
}

impl ModelParams for LyricsParams {
    const KIND: JobKind = JobKind::TranscribeLyrics;
}

fn validate_diarisation(params: &LyricsParams) -> Result<(), ValidationError> {
    let has_token = params
        .hf_token
        .as_deref()
        .is_some_and(|token| !token.trim().is_empty());
    if params.diarise_audio && !has_token {
        let mut err = ValidationError::new("hf_token_required");
        err.message = Some("diarisation requires an hf_token".into());
        return Err(err);
    }
    Ok(())
}
