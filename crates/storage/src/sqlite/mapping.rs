use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use spacey_core::model::{
    BadgeTier, ChoiceOption, DEFAULT_IMAGE_DURATION, MediaPath, Question, QuestionId, Section,
    SectionId, SectionKind,
};

use crate::repository::StorageError;

pub(super) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(super) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(super) fn section_kind_str(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::AudioText => "audio_text",
        SectionKind::Text => "text",
        SectionKind::Image => "image",
    }
}

/// Column tuple written for one section row, in table order.
pub(super) struct SectionColumns {
    pub kind: &'static str,
    pub body: Option<String>,
    pub audio_path: Option<String>,
    pub speak: i64,
    pub image_path: Option<String>,
    pub caption: Option<String>,
    pub duration_ms: Option<i64>,
}

pub(super) fn section_to_columns(section: &Section) -> SectionColumns {
    match section {
        Section::AudioText {
            text, audio_path, ..
        } => SectionColumns {
            kind: section_kind_str(SectionKind::AudioText),
            body: Some(text.clone()),
            audio_path: audio_path.as_ref().map(|p| p.as_str().to_string()),
            speak: 0,
            image_path: None,
            caption: None,
            duration_ms: None,
        },
        Section::Text { content, speak, .. } => SectionColumns {
            kind: section_kind_str(SectionKind::Text),
            body: Some(content.clone()),
            audio_path: None,
            speak: i64::from(*speak),
            image_path: None,
            caption: None,
            duration_ms: None,
        },
        Section::Image {
            path,
            caption,
            duration,
            ..
        } => SectionColumns {
            kind: section_kind_str(SectionKind::Image),
            body: None,
            audio_path: None,
            speak: 0,
            image_path: Some(path.as_str().to_string()),
            caption: caption.clone(),
            duration_ms: i64::try_from(duration.as_millis()).ok(),
        },
    }
}

pub(super) fn section_from_row(row: &SqliteRow) -> Result<Section, StorageError> {
    let section_id: String = row.try_get("section_id").map_err(ser)?;
    let id = SectionId::new(&section_id).map_err(ser)?;
    let kind: String = row.try_get("kind").map_err(ser)?;

    match kind.as_str() {
        "audio_text" => {
            let text: Option<String> = row.try_get("body").map_err(ser)?;
            let audio_path: Option<String> = row.try_get("audio_path").map_err(ser)?;
            let audio_path = audio_path
                .map(|p| MediaPath::new(&p).map_err(ser))
                .transpose()?;
            Ok(Section::AudioText {
                id,
                text: text.unwrap_or_default(),
                audio_path,
            })
        }
        "text" => {
            let content: Option<String> = row.try_get("body").map_err(ser)?;
            let speak: i64 = row.try_get("speak").map_err(ser)?;
            Ok(Section::Text {
                id,
                content: content.unwrap_or_default(),
                speak: speak != 0,
            })
        }
        "image" => {
            let image_path: Option<String> = row.try_get("image_path").map_err(ser)?;
            let path = image_path
                .ok_or_else(|| StorageError::Serialization("image row without path".into()))?;
            let caption: Option<String> = row.try_get("caption").map_err(ser)?;
            let duration_ms: Option<i64> = row.try_get("duration_ms").map_err(ser)?;
            let duration = duration_ms
                .and_then(|ms| u64::try_from(ms).ok())
                .map_or(DEFAULT_IMAGE_DURATION, Duration::from_millis);
            Ok(Section::Image {
                id,
                path: MediaPath::new(&path).map_err(ser)?,
                caption,
                duration,
            })
        }
        other => Err(StorageError::Serialization(format!(
            "unknown section kind: {other}"
        ))),
    }
}

pub(super) fn question_from_row(
    row: &SqliteRow,
    options: Vec<ChoiceOption>,
) -> Result<Question, StorageError> {
    let question_id: String = row.try_get("question_id").map_err(ser)?;
    let id = QuestionId::new(&question_id).map_err(ser)?;
    let kind: String = row.try_get("kind").map_err(ser)?;
    let text: String = row.try_get("text").map_err(ser)?;
    let explanation: String = row.try_get("explanation").map_err(ser)?;

    match kind.as_str() {
        "mcq" => Ok(Question::MultipleChoice {
            id,
            text,
            options,
            explanation,
        }),
        "normal" => Ok(Question::Open {
            id,
            text,
            explanation,
        }),
        other => Err(StorageError::Serialization(format!(
            "unknown question kind: {other}"
        ))),
    }
}

pub(super) fn badge_tier_from_name(name: &str) -> Result<BadgeTier, StorageError> {
    match name {
        "Galactic Genius" => Ok(BadgeTier::GalacticGenius),
        "Star Voyager" => Ok(BadgeTier::StarVoyager),
        other => Err(StorageError::Serialization(format!(
            "unknown badge name: {other}"
        ))),
    }
}
