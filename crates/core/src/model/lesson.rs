use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use crate::model::{LessonSlug, MediaPath, SectionId};

/// Default display time for image sections.
pub const DEFAULT_IMAGE_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson must contain at least one section")]
    NoSections,

    #[error("duplicate section id within lesson: {0}")]
    DuplicateSectionId(SectionId),
}

/// One atomic unit of lesson content.
///
/// The player matches exhaustively on this type; adding a variant is a
/// deliberate playback-policy decision, not just a data change.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Narrated audio with a transcript. `audio_path` may be absent when the
    /// authoring tool produced incomplete data; the player handles that at
    /// playback time rather than rejecting the lesson.
    AudioText {
        id: SectionId,
        text: String,
        audio_path: Option<MediaPath>,
    },
    /// Plain text, optionally narrated through speech synthesis.
    Text {
        id: SectionId,
        content: String,
        speak: bool,
    },
    /// Timed image display.
    Image {
        id: SectionId,
        path: MediaPath,
        caption: Option<String>,
        duration: Duration,
    },
}

/// Discriminant of a `Section`, used for storage mapping and quota logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    AudioText,
    Text,
    Image,
}

impl Section {
    #[must_use]
    pub fn id(&self) -> &SectionId {
        match self {
            Section::AudioText { id, .. } | Section::Text { id, .. } | Section::Image { id, .. } => {
                id
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::AudioText { .. } => SectionKind::AudioText,
            Section::Text { .. } => SectionKind::Text,
            Section::Image { .. } => SectionKind::Image,
        }
    }

    /// Text shown alongside the section while it plays: transcript, content,
    /// or image caption.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            Section::AudioText { text, .. } => text,
            Section::Text { content, .. } => content,
            Section::Image { caption, .. } => caption.as_deref().unwrap_or(""),
        }
    }

    /// Whether the user can pause/resume this section. Timed kinds only
    /// auto-advance.
    #[must_use]
    pub fn is_pausable(&self) -> bool {
        match self {
            Section::AudioText { .. } => true,
            Section::Text { speak, .. } => *speak,
            Section::Image { .. } => false,
        }
    }
}

/// A lesson document as produced by the authoring tool. Read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    slug: LessonSlug,
    title: String,
    description: Option<String>,
    sections: Vec<Section>,
}

impl Lesson {
    /// Build a validated lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the title is blank, there are no sections,
    /// or two sections share an id.
    pub fn new(
        slug: LessonSlug,
        title: impl Into<String>,
        description: Option<String>,
        sections: Vec<Section>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if sections.is_empty() {
            return Err(LessonError::NoSections);
        }
        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.id().clone()) {
                return Err(LessonError::DuplicateSectionId(section.id().clone()));
            }
        }
        Ok(Self {
            slug,
            title,
            description,
            sections,
        })
    }

    #[must_use]
    pub fn slug(&self) -> &LessonSlug {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn section_at(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Context string handed to the AI tutor: description, else title.
    #[must_use]
    pub fn ai_context(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(raw: &str) -> SectionId {
        SectionId::new(raw).unwrap()
    }

    fn slug() -> LessonSlug {
        LessonSlug::new("build-your-own-satellite").unwrap()
    }

    fn text_section(id: &str) -> Section {
        Section::Text {
            id: sid(id),
            content: "Satellites orbit the Earth.".into(),
            speak: false,
        }
    }

    #[test]
    fn lesson_requires_sections_and_title() {
        assert!(matches!(
            Lesson::new(slug(), "  ", None, vec![text_section("s1")]),
            Err(LessonError::EmptyTitle)
        ));
        assert!(matches!(
            Lesson::new(slug(), "Satellites", None, Vec::new()),
            Err(LessonError::NoSections)
        ));
    }

    #[test]
    fn lesson_rejects_duplicate_section_ids() {
        let err = Lesson::new(
            slug(),
            "Satellites",
            None,
            vec![text_section("s1"), text_section("s1")],
        )
        .unwrap_err();
        assert!(matches!(err, LessonError::DuplicateSectionId(id) if id.as_str() == "s1"));
    }

    #[test]
    fn ai_context_prefers_description() {
        let with_desc = Lesson::new(
            slug(),
            "Satellites",
            Some("How satellites stay in orbit".into()),
            vec![text_section("s1")],
        )
        .unwrap();
        assert_eq!(with_desc.ai_context(), "How satellites stay in orbit");

        let without = Lesson::new(slug(), "Satellites", None, vec![text_section("s1")]).unwrap();
        assert_eq!(without.ai_context(), "Satellites");
    }

    #[test]
    fn pausable_kinds() {
        let audio = Section::AudioText {
            id: sid("a"),
            text: "hello".into(),
            audio_path: None,
        };
        let spoken = Section::Text {
            id: sid("b"),
            content: "hello".into(),
            speak: true,
        };
        let image = Section::Image {
            id: sid("c"),
            path: MediaPath::new("img/one.png").unwrap(),
            caption: None,
            duration: DEFAULT_IMAGE_DURATION,
        };
        assert!(audio.is_pausable());
        assert!(spoken.is_pausable());
        assert!(!image.is_pausable());
        assert!(!text_section("d").is_pausable());
    }
}
