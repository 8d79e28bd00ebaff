use mu2mi_core::job::JobKind;

/// Model version identifier per job kind.
#[derive(Debug, Clone)]
pub struct ModelVersions {
    pub generation: String,
    pub separation: String,
    pub analysis: String,
    pub midi: String,
    pub lyrics: String,
}

impl ModelVersions {
    pub fn for_kind(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::Generate => &self.generation,
            JobKind::Separate => &self.separation,
            JobKind::Analyze => &self.analysis,
            JobKind::TranscribeMidi => &self.midi,
            JobKind::TranscribeLyrics => &self.lyrics,
        }
    }
}

impl Default for ModelVersions {
    fn default() -> Self {
        Self {
            generation: "671ac645ce5e552cc63a54a2bbff63fcf798043055d2dac5fc9e36a837eedcfb".into(),
            separation: "5a7041cc9b82e5a558fea6b3d7b12dea89625e89da33f0447bd727c2d0ab9e77".into(),
            analysis: "001b4137be6ac67bdc28cb5cffacf128b874f530258d033de23121e785cb7290".into(),
            midi: "a7cf33cf63fca9c71f2235332af5a9fdfb7d23c459a0dc429daa203ff8e80c78".into(),
            lyrics: "3ab86df6c8f54c11309d4d1f930ac292bad43ace52d10c80d87eb258b3c9f79c".into(),
        }
    }
}

/// Provider configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_url: String,
    pub api_token: String,
    /// Standard Webhooks signing secret (`whsec_...`).
    pub webhook_secret: String,
    /// Public origin of this service, used to build callback URLs.
    pub base_url: String,
    pub models: ModelVersions,
}

impl ReplicateConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                        |
    /// |--------------------------------------|--------------------------------|
    /// | `REPLICATE_API_URL`                  | `https://api.replicate.com/v1` |
    /// | `REPLICATE_API_TOKEN`                | (required)                     |
    /// | `REPLICATE_WEBHOOK_SECRET`           | (required)                     |
    /// | `BASE_URL`                           | `http://localhost:3000`        |
    /// | `MUSIC_GENERATION_MODEL_VERSION`     | built-in version hash          |
    /// | `TRACK_SEPARATION_MODEL_VERSION`     | built-in version hash          |
    /// | `TRACK_ANALYSIS_MODEL_VERSION`       | built-in version hash          |
    /// | `MIDI_TRANSCRIPTION_MODEL_VERSION`   | built-in version hash          |
    /// | `LYRICS_TRANSCRIPTION_MODEL_VERSION` | built-in version hash          |
    pub fn from_env() -> Self {
        let defaults = ModelVersions::default();
        let var_or = |name: &str, default: String| std::env::var(name).unwrap_or(default);

        Self {
            api_url: var_or("REPLICATE_API_URL", "https://api.replicate.com/v1".into()),
            api_token: std::env::var("REPLICATE_API_TOKEN")
                .expect("REPLICATE_API_TOKEN must be set"),
            webhook_secret: std::env::var("REPLICATE_WEBHOOK_SECRET")
                .expect("REPLICATE_WEBHOOK_SECRET must be set"),
            base_url: var_or("BASE_URL", "http://localhost:3000".into()),
            models: ModelVersions {
                generation: var_or("MUSIC_GENERATION_MODEL_VERSION", defaults.generation),
                separation: var_or("TRACK_SEPARATION_MODEL_VERSION", defaults.separation),
                analysis: var_or("TRACK_ANALYSIS_MODEL_VERSION", defaults.analysis),
                midi: var_or("MIDI_TRANSCRIPTION_MODEL_VERSION", defaults.midi),
                lyrics: var_or("LYRICS_TRANSCRIPTION_MODEL_VERSION", defaults.lyrics),
            },
        }
    }
}
