use serde::Serialize;

use crate::models::Profile;
use crate::progress::Stats;

pub struct Achievement {
    pub title: &'static str,
    pub description: &'static str,
    pub quote: &'static str,
    pub unlocked: fn(&Profile, &Stats) -> bool,
}

/// Evaluated in declaration order.
pub const ACHIEVEMENTS: [Achievement; 3] = [
    Achievement {
        title: "Consistency Star",
        description: "Learning streak of 7+ days",
        quote: "Consistency breeds excellence",
        unlocked: week_long_streak,
    },
    Achievement {
        title: "UI Pro",
        description: "Completed UI Magic course",
        quote: "Design is intelligence made visible",
        unlocked: one_third_complete,
    },
    Achievement {
        title: "Backend Explorer",
        description: "Completed Backend Essentials",
        quote: "Logic is the backbone of innovation",
        unlocked: two_thirds_complete,
    },
];

fn week_long_streak(profile: &Profile, _: &Stats) -> bool {
    profile.streak_days >= 7
}

fn one_third_complete(_: &Profile, stats: &Stats) -> bool {
    stats.completion_percentage >= 33
}

fn two_thirds_complete(_: &Profile, stats: &Stats) -> bool {
    stats.completion_percentage >= 66
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementStatus {
    pub title: &'static str,
    pub description: &'static str,
    pub quote: &'static str,
    pub unlocked: bool,
}

pub fn evaluate(profile: &Profile, stats: &Stats) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|a| AchievementStatus {
            title: a.title,
            description: a.description,
            quote: a.quote,
            unlocked: (a.unlocked)(profile, stats),
        })
        .collect()
}
