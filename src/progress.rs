use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{CompletionSet, Course, Module};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CourseFilter {
    #[default]
    All,
    InProgress,
    Completed,
}

impl CourseFilter {
    pub fn matches(&self, percentage: u32) -> bool {
        match self {
            CourseFilter::All => true,
            CourseFilter::InProgress => percentage > 0 && percentage < 100,
            CourseFilter::Completed => percentage == 100,
        }
    }
}

impl FromStr for CourseFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CourseFilter::All),
            "in-progress" => Ok(CourseFilter::InProgress),
            "completed" => Ok(CourseFilter::Completed),
            other => Err(format!("unknown course filter: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub total: usize,
    pub completed: usize,
    pub percentage: u32,
}

/// Rounds `100 * completed / total` to the nearest integer, halves up.
/// An empty denominator yields 0.
pub fn percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * completed + total) / (2 * total)) as u32
}

pub fn course_progress(course_id: &str, modules: &[Module], completions: &CompletionSet) -> CourseProgress {
    let course_modules = modules.iter().filter(|m| m.course_id == course_id);

    let mut total = 0;
    let mut completed = 0;
    for module in course_modules {
        total += 1;
        if completions.has_module(&module.id) {
            completed += 1;
        }
    }

    CourseProgress {
        total,
        completed,
        percentage: percentage(completed, total),
    }
}

/// Keeps the courses whose progress falls in `filter`, preserving input order.
pub fn filter_courses<'a>(
    courses: &'a [Course],
    modules: &[Module],
    completions: &CompletionSet,
    filter: CourseFilter,
) -> Vec<&'a Course> {
    courses
        .iter()
        .filter(|course| filter.matches(course_progress(&course.id, modules, completions).percentage))
        .collect()
}

/// Learner-wide totals. Every visible course counts as enrolled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub courses_enrolled: usize,
    pub modules_completed: usize,
    pub total_modules: usize,
    pub completion_percentage: u32,
}

impl Stats {
    pub fn compute(courses: &[Course], modules: &[Module], completions: &CompletionSet) -> Self {
        let module_ids: HashSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        let modules_completed = module_ids
            .iter()
            .filter(|id| completions.has_module(id))
            .count();
        let total_modules = module_ids.len();

        Self {
            courses_enrolled: courses.len(),
            modules_completed,
            total_modules,
            completion_percentage: percentage(modules_completed, total_modules),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Completion;

    fn course(id: &str) -> Course {
        Course {
            id: id.to_string(),
            title: format!("Course {}", id),
            description: None,
            category: "General".to_string(),
            icon: None,
            color: None,
        }
    }

    fn module(id: &str, course_id: &str, order_index: i32) -> Module {
        Module {
            id: id.to_string(),
            course_id: course_id.to_string(),
            title: format!("Module {}", id),
            description: None,
            order_index,
            duration: Some("15 min".to_string()),
        }
    }

    fn done(ids: &[&str]) -> CompletionSet {
        ids.iter().map(|id| Completion::new("u1", *id)).collect()
    }

    #[test]
    fn empty_course_has_zero_progress() {
        let modules = vec![module("m1", "other", 1)];
        let progress = course_progress("c1", &modules, &done(&["m1"]));
        assert_eq!(progress, CourseProgress { total: 0, completed: 0, percentage: 0 });
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let modules = vec![module("m1", "c1", 1), module("m2", "c1", 2), module("m3", "c1", 3)];

        assert_eq!(course_progress("c1", &modules, &done(&["m1"])).percentage, 33);
        assert_eq!(course_progress("c1", &modules, &done(&["m1", "m2"])).percentage, 67);
        assert_eq!(course_progress("c1", &modules, &done(&["m1", "m2", "m3"])).percentage, 100);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn completed_never_exceeds_total() {
        let modules = vec![module("m1", "c1", 1), module("m2", "c2", 1)];
        let completions = done(&["m1", "m2", "ghost"]);

        let progress = course_progress("c1", &modules, &completions);
        assert_eq!(progress.total, 1);
        assert_eq!(progress.completed, 1);
        assert!(progress.completed <= progress.total);
    }

    #[test]
    fn filter_buckets_follow_percentage() {
        let courses = vec![course("done"), course("half"), course("fresh"), course("empty")];
        let modules = vec![
            module("d1", "done", 1),
            module("h1", "half", 1),
            module("h2", "half", 2),
            module("f1", "fresh", 1),
        ];
        let completions = done(&["d1", "h1"]);

        let ids = |filter| {
            filter_courses(&courses, &modules, &completions, filter)
                .into_iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(CourseFilter::Completed), vec!["done"]);
        assert_eq!(ids(CourseFilter::InProgress), vec!["half"]);
        assert_eq!(ids(CourseFilter::All), vec!["done", "half", "fresh", "empty"]);
    }

    #[test]
    fn filter_parses_bucket_names() {
        assert_eq!("in-progress".parse::<CourseFilter>(), Ok(CourseFilter::InProgress));
        assert_eq!("completed".parse::<CourseFilter>(), Ok(CourseFilter::Completed));
        assert_eq!("all".parse::<CourseFilter>(), Ok(CourseFilter::All));
        assert!("finished".parse::<CourseFilter>().is_err());
    }

    #[test]
    fn stats_ignore_completions_for_unknown_modules() {
        let courses = vec![course("c1"), course("c2")];
        let modules = vec![module("m1", "c1", 1), module("m2", "c1", 2), module("m3", "c2", 1)];
        let stats = Stats::compute(&courses, &modules, &done(&["m1", "gone"]));

        assert_eq!(
            stats,
            Stats {
                courses_enrolled: 2,
                modules_completed: 1,
                total_modules: 3,
                completion_percentage: 33,
            }
        );
    }
}
