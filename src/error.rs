use serde::ser::{SerializeStruct, Serializer};
use thiserror::Error;

use crate::config::ConfigError;
use crate::spec::SpecError;
use crate::timeline::TimelineError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Spec(#[from] SpecError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Timeline(#[from] TimelineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No edit specification provided (use --file, --json or pipe JSON on stdin)")]
    NoSpecification,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spec(e) => match e {
                SpecError::Read { .. } => "SPEC_READ",
                SpecError::Stdin(_) => "SPEC_STDIN",
                SpecError::Json(_) => "SPEC_INVALID_JSON",
                SpecError::MissingName => "SPEC_MISSING_NAME",
            },
            Self::Config(e) => match e {
                ConfigError::Read { .. } => "CONFIG_READ",
                ConfigError::Json { .. } => "CONFIG_INVALID_JSON",
                ConfigError::MissingApiKey => "CONFIG_MISSING_API_KEY",
                ConfigError::Invalid(_) => "CONFIG_INVALID",
            },
            Self::Timeline(e) => match e {
                TimelineError::Serialization { .. } => "TIMELINE_SERIALIZATION",
                TimelineError::Json(_) => "TIMELINE_JSON",
                TimelineError::InvalidRange { .. } => "TIMELINE_INVALID_RANGE",
                TimelineError::InvalidClip { .. } => "TIMELINE_INVALID_CLIP",
                TimelineError::Read(_) => "TIMELINE_READ",
                TimelineError::Parse(_) => "TIMELINE_PARSE",
            },
            Self::Json(_) => "JSON_ERROR",
            Self::NoSpecification => "NO_SPECIFICATION",
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
