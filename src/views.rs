use serde::Serialize;

use crate::models::Profile;
use crate::progress::{CourseFilter, CourseProgress, Stats, course_progress, filter_courses};
use crate::services::Snapshot;
use crate::services::achievements::{self, AchievementStatus};

pub const EMPTY_FILTER_MESSAGE: &str = "No courses found for this filter. Try a different filter!";
pub const EMPTY_JOURNAL_MESSAGE: &str = "No entry yet...";

/// Closed set of course icons; unknown tags render as `Code`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CourseIcon {
    #[default]
    Code,
    Server,
    Palette,
}

impl CourseIcon {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("Server") => CourseIcon::Server,
            Some("Palette") => CourseIcon::Palette,
            _ => CourseIcon::Code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub icon: CourseIcon,
    pub color: Option<String>,
    pub progress: CourseProgress,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct CourseListView {
    pub filter: CourseFilter,
    pub courses: Vec<CourseCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub fn course_list(snapshot: &Snapshot, filter: CourseFilter) -> CourseListView {
    let courses: Vec<CourseCard> = filter_courses(&snapshot.courses, &snapshot.modules, &snapshot.completions, filter)
        .into_iter()
        .map(|course| {
            let progress = course_progress(&course.id, &snapshot.modules, &snapshot.completions);
            CourseCard {
                id: course.id.clone(),
                title: course.title.clone(),
                description: course.description.clone().unwrap_or_default(),
                category: course.category.clone(),
                icon: CourseIcon::from_tag(course.icon.as_deref()),
                color: course.color.clone(),
                is_completed: progress.percentage == 100,
                progress,
            }
        })
        .collect();

    CourseListView {
        filter,
        empty_message: courses.is_empty().then_some(EMPTY_FILTER_MESSAGE),
        courses,
        warnings: snapshot.load_errors.clone(),
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: Option<String>,
    pub order_index: i32,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ModuleListView {
    pub course_id: String,
    pub course_title: String,
    pub modules: Vec<ModuleItem>,
    pub progress: CourseProgress,
    pub can_mark_all: bool,
}

/// Modules of one course in `order_index` order, or `None` for an unknown course.
pub fn module_list(snapshot: &Snapshot, course_id: &str) -> Option<ModuleListView> {
    let course = snapshot.course(course_id)?;

    let mut modules = snapshot.course_modules(course_id);
    modules.sort_by_key(|m| m.order_index);

    let progress = course_progress(course_id, &snapshot.modules, &snapshot.completions);
    let items = modules
        .into_iter()
        .map(|m| ModuleItem {
            completed: snapshot.completions.has_module(&m.id),
            id: m.id,
            title: m.title,
            description: m.description.unwrap_or_default(),
            duration: m.duration,
            order_index: m.order_index,
        })
        .collect();

    Some(ModuleListView {
        course_id: course.id.clone(),
        course_title: course.title.clone(),
        modules: items,
        can_mark_all: progress.completed < progress.total,
        progress,
    })
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub profile: Profile,
    pub avatar_initial: String,
    pub journal: String,
    pub stats: Stats,
    pub achievements: Vec<AchievementStatus>,
}

pub fn profile_page(snapshot: &Snapshot) -> Option<ProfilePage> {
    let profile = snapshot.profile.clone()?;
    let stats = Stats::compute(&snapshot.courses, &snapshot.modules, &snapshot.completions);

    let avatar_initial = profile
        .username
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "U".to_string());
    let journal = profile
        .daily_journal
        .clone()
        .filter(|j| !j.is_empty())
        .unwrap_or_else(|| EMPTY_JOURNAL_MESSAGE.to_string());

    Some(ProfilePage {
        achievements: achievements::evaluate(&profile, &stats),
        avatar_initial,
        journal,
        stats,
        profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Completion, Course, Module, Theme};

    fn snapshot() -> Snapshot {
        let course = |id: &str, icon: Option<&str>| Course {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: None,
            category: "Dev".to_string(),
            icon: icon.map(str::to_string),
            color: None,
        };
        let module = |id: &str, course_id: &str, order_index| Module {
            id: id.to_string(),
            course_id: course_id.to_string(),
            title: id.to_string(),
            description: Some(format!("About {}", id)),
            order_index,
            duration: Some("10 min".to_string()),
        };

        Snapshot {
            courses: vec![course("ui", Some("Palette")), course("api", Some("Rocket"))],
            modules: vec![module("u2", "ui", 2), module("u1", "ui", 1), module("a1", "api", 1)],
            completions: [Completion::new("u1", "u1"), Completion::new("u1", "u2")].into_iter().collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn icon_tags_fall_back_to_code() {
        assert_eq!(CourseIcon::from_tag(Some("Palette")), CourseIcon::Palette);
        assert_eq!(CourseIcon::from_tag(Some("Server")), CourseIcon::Server);
        assert_eq!(CourseIcon::from_tag(Some("Rocket")), CourseIcon::Code);
        assert_eq!(CourseIcon::from_tag(None), CourseIcon::Code);
    }

    #[test]
    fn course_list_reports_empty_filter() {
        let snap = snapshot();

        let completed = course_list(&snap, CourseFilter::Completed);
        assert_eq!(completed.courses.len(), 1);
        assert!(completed.courses[0].is_completed);
        assert_eq!(completed.courses[0].icon, CourseIcon::Palette);
        assert!(completed.empty_message.is_none());

        let in_progress = course_list(&snap, CourseFilter::InProgress);
        assert!(in_progress.courses.is_empty());
        assert_eq!(in_progress.empty_message, Some(EMPTY_FILTER_MESSAGE));
    }

    #[test]
    fn module_list_is_ordered_and_flags_mark_all() {
        let snap = snapshot();

        let ui = module_list(&snap, "ui").expect("course exists");
        let ids: Vec<&str> = ui.modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert!(!ui.can_mark_all);

        let api = module_list(&snap, "api").expect("course exists");
        assert!(api.can_mark_all);
        assert_eq!(api.progress.percentage, 0);

        assert!(module_list(&snap, "missing").is_none());
    }

    #[test]
    fn profile_page_fills_placeholders() {
        let mut snap = snapshot();
        assert!(profile_page(&snap).is_none());

        snap.profile = Some(Profile {
            id: "u1".to_string(),
            username: "ada".to_string(),
            profile_photo: None,
            cover_image: None,
            tagline: None,
            theme: Theme::Neon,
            learning_mood: None,
            daily_journal: Some(String::new()),
            streak_days: 7,
        });

        let page = profile_page(&snap).expect("profile loaded");
        assert_eq!(page.avatar_initial, "A");
        assert_eq!(page.journal, EMPTY_JOURNAL_MESSAGE);
        assert_eq!(page.stats.completion_percentage, 67);
        assert!(page.achievements.iter().all(|a| a.unlocked));
    }
}
