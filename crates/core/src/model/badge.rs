use chrono::{DateTime, Utc};

use crate::model::{LessonSlug, UserId};

/// Badge tier earned for a quiz score. Purely a function of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeTier {
    /// Perfect score.
    GalacticGenius,
    /// 80 or above, short of perfect.
    StarVoyager,
}

impl BadgeTier {
    /// Tier for a 0–100 score, or `None` below the award threshold.
    #[must_use]
    pub fn for_score(score: u8) -> Option<Self> {
        match score {
            100 => Some(Self::GalacticGenius),
            80..=99 => Some(Self::StarVoyager),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GalacticGenius => "Galactic Genius",
            Self::StarVoyager => "Star Voyager",
        }
    }

    #[must_use]
    pub fn image_url(&self) -> &'static str {
        match self {
            Self::GalacticGenius => "https://img.icons8.com/color/96/medal2.png",
            Self::StarVoyager => "https://img.icons8.com/color/96/star--v1.png",
        }
    }

    #[must_use]
    pub fn description_for(&self, quiz_title: &str) -> String {
        match self {
            Self::GalacticGenius => {
                format!("Achieved a perfect score on the \"{quiz_title}\" quiz!")
            }
            Self::StarVoyager => {
                format!("Scored 80% or higher on the \"{quiz_title}\" quiz!")
            }
        }
    }

    /// Dash-joined name used in composed document ids.
    #[must_use]
    pub fn slug_fragment(&self) -> String {
        self.name().replace(' ', "-")
    }
}

/// A badge record as persisted for the dashboard.
///
/// Keyed by `doc_id`, so re-earning the same badge merges into the existing
/// record instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnedBadge {
    pub user_id: UserId,
    pub lesson_slug: LessonSlug,
    pub tier: BadgeTier,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

impl EarnedBadge {
    #[must_use]
    pub fn new(
        user_id: UserId,
        lesson_slug: LessonSlug,
        tier: BadgeTier,
        quiz_title: &str,
        earned_at: DateTime<Utc>,
    ) -> Self {
        let description = tier.description_for(quiz_title);
        Self {
            user_id,
            lesson_slug,
            tier,
            description,
            earned_at,
        }
    }

    /// Stable id: one record per user+lesson+badge.
    #[must_use]
    pub fn doc_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.user_id,
            self.lesson_slug,
            self.tier.slug_fragment()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn tiers_follow_score_bands() {
        assert_eq!(BadgeTier::for_score(100), Some(BadgeTier::GalacticGenius));
        assert_eq!(BadgeTier::for_score(99), Some(BadgeTier::StarVoyager));
        assert_eq!(BadgeTier::for_score(85), Some(BadgeTier::StarVoyager));
        assert_eq!(BadgeTier::for_score(80), Some(BadgeTier::StarVoyager));
        assert_eq!(BadgeTier::for_score(79), None);
        assert_eq!(BadgeTier::for_score(0), None);
    }

    #[test]
    fn doc_id_uses_dashed_badge_name() {
        let badge = EarnedBadge::new(
            UserId::new("uid-1").unwrap(),
            LessonSlug::new("build-your-own-satellite").unwrap(),
            BadgeTier::StarVoyager,
            "Satellite Quiz",
            fixed_now(),
        );
        assert_eq!(
            badge.doc_id(),
            "uid-1_build-your-own-satellite_Star-Voyager"
        );
        assert!(badge.description.contains("Satellite Quiz"));
    }
}
