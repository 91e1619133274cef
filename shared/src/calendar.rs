//! Calendar view state.
//!
//! All view state lives in [`CalendarState`] and only changes through
//! [`CalendarState::reduce`]. The month grid and the status board are two
//! renderings of the same filtered set of tasks.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{team_member, Category, Status, Task, YearMonth};

/// Presentational mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Month,
    Board,
}

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Loading,
    Loaded(Vec<Task>),
    LoadFailed(String),
    NextMonth,
    PreviousMonth,
    GoToMonth(YearMonth),
    ToggleCategory(Category),
    /// Show only one team member's tasks, or everyone's with `None`.
    FocusMember(Option<String>),
    SetMode(ViewMode),
    /// Open (or close) the detail modal for a task.
    Select(Option<i64>),
    DismissError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarState {
    pub tasks: Vec<Task>,
    pub page: YearMonth,
    pub categories: BTreeSet<Category>,
    pub focus: Option<String>,
    pub mode: ViewMode,
    pub selected: Option<i64>,
    pub loading: bool,
    pub error: Option<String>,
}

/// One day of the month grid.
#[derive(Debug, Serialize)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub tasks: Vec<&'a Task>,
}

/// Month grid for the active page.
#[derive(Debug, Serialize)]
pub struct MonthGrid<'a> {
    pub page: YearMonth,
    /// Empty cells before the 1st in a Sunday-first week.
    pub leading_blanks: u32,
    pub days: Vec<DayCell<'a>>,
}

/// One status column of the board.
#[derive(Debug, Serialize)]
pub struct BoardColumn<'a> {
    pub status: Status,
    pub label: &'static str,
    pub tasks: Vec<&'a Task>,
}

/// Counts for the active page.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct MonthSummary {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
    pub by_category: BTreeMap<Category, usize>,
}

/// Group tasks by their year-month key, preserving input order within a month.
pub fn group_by_month(tasks: &[Task]) -> BTreeMap<YearMonth, Vec<&Task>> {
    let mut groups: BTreeMap<YearMonth, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.year_month()).or_default().push(task);
    }
    groups
}

impl CalendarState {
    /// Fresh state on `page` with every category enabled.
    pub fn new(page: YearMonth) -> Self {
        Self {
            tasks: Vec::new(),
            page,
            categories: Category::ALL.into_iter().collect(),
            focus: None,
            mode: ViewMode::default(),
            selected: None,
            loading: false,
            error: None,
        }
    }

    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::Loading => {
                self.loading = true;
            }
            Action::Loaded(tasks) => {
                self.tasks = tasks;
                self.loading = false;
                self.error = None;
                if let Some(id) = self.selected {
                    if !self.tasks.iter().any(|t| t.id == id) {
                        self.selected = None;
                    }
                }
            }
            Action::LoadFailed(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            Action::NextMonth => self.page = self.page.next(),
            Action::PreviousMonth => self.page = self.page.previous(),
            Action::GoToMonth(page) => self.page = page,
            Action::ToggleCategory(category) => {
                if !self.categories.remove(&category) {
                    self.categories.insert(category);
                }
            }
            Action::FocusMember(member) => {
                // unknown ids clear the focus rather than hiding everything
                self.focus = member.filter(|id| team_member(id).is_some());
            }
            Action::SetMode(mode) => self.mode = mode,
            Action::Select(id) => {
                self.selected = id.filter(|id| self.tasks.iter().any(|t| t.id == *id));
            }
            Action::DismissError => self.error = None,
        }
    }

    /// Category toggles and member focus, independent of the page.
    pub fn is_visible(&self, task: &Task) -> bool {
        self.categories.contains(&task.category)
            && self.focus.as_deref().map_or(true, |id| task.assignee == id)
    }

    /// Tasks passing the filters on the active page, in date and time order.
    pub fn page_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.year_month() == self.page && self.is_visible(t))
            .collect();
        tasks.sort_by(|a, b| (a.day, &a.time, a.id).cmp(&(b.day, &b.time, b.id)));
        tasks
    }

    pub fn month_grid(&self) -> MonthGrid<'_> {
        let page_tasks = self.page_tasks();
        let leading_blanks = self
            .page
            .first_day()
            .map(|d| d.weekday().num_days_from_sunday())
            .unwrap_or(0);

        let days = (1..=self.page.days_in_month())
            .filter_map(|day| NaiveDate::from_ymd_opt(self.page.year, self.page.month, day))
            .map(|date| DayCell {
                date,
                tasks: page_tasks
                    .iter()
                    .copied()
                    .filter(|t| t.day == date.day())
                    .collect(),
            })
            .collect();

        MonthGrid {
            page: self.page,
            leading_blanks,
            days,
        }
    }

    pub fn board(&self) -> Vec<BoardColumn<'_>> {
        let page_tasks = self.page_tasks();
        Status::ALL
            .into_iter()
            .map(|status| BoardColumn {
                status,
                label: status.label(),
                tasks: page_tasks
                    .iter()
                    .copied()
                    .filter(|t| t.status == status)
                    .collect(),
            })
            .collect()
    }

    pub fn summary(&self) -> MonthSummary {
        let mut summary = MonthSummary::default();
        for task in self.page_tasks() {
            summary.total += 1;
            *summary.by_status.entry(task.status).or_default() += 1;
            *summary.by_category.entry(task.category).or_default() += 1;
        }
        summary
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selected.and_then(|id| self.task(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, day: u32, month: u32, category: Category, assignee: &str, status: Status) -> Task {
        Task {
            id,
            title: format!("Task {}", id),
            description: String::new(),
            category,
            day,
            month,
            year: 2026,
            time: format!("{:02}:00", 8 + id % 10),
            assignee: assignee.to_string(),
            status,
            color: Some(category.color().to_string()),
            kind: Some(category.type_label().to_string()),
            tags: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn loaded() -> CalendarState {
        let mut state = CalendarState::new(YearMonth::new(2026, 3).unwrap());
        state.reduce(Action::Loaded(vec![
            task(1, 3, 3, Category::Campaigns, "alex", Status::Planned),
            task(2, 3, 3, Category::Blog, "sam", Status::InProgress),
            task(3, 20, 3, Category::SocialMedia, "alex", Status::Review),
            task(4, 1, 4, Category::Newsletter, "jordan", Status::Completed),
        ]));
        state
    }

    fn ids(tasks: &[&Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_group_by_month() {
        let state = loaded();
        let groups = group_by_month(&state.tasks);
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[&YearMonth::new(2026, 3).unwrap()]), vec![1, 2, 3]);
        assert_eq!(ids(&groups[&YearMonth::new(2026, 4).unwrap()]), vec![4]);
    }

    #[test]
    fn test_page_navigation_changes_visible_tasks() {
        let mut state = loaded();
        assert_eq!(ids(&state.page_tasks()), vec![1, 2, 3]);

        state.reduce(Action::NextMonth);
        assert_eq!(ids(&state.page_tasks()), vec![4]);

        state.reduce(Action::GoToMonth(YearMonth::new(2025, 12).unwrap()));
        assert!(state.page_tasks().is_empty());
        state.reduce(Action::NextMonth);
        assert_eq!(state.page, YearMonth::new(2026, 1).unwrap());
    }

    #[test]
    fn test_category_toggle_and_focus() {
        let mut state = loaded();
        state.reduce(Action::ToggleCategory(Category::Blog));
        assert_eq!(ids(&state.page_tasks()), vec![1, 3]);

        state.reduce(Action::FocusMember(Some("alex".to_string())));
        state.reduce(Action::ToggleCategory(Category::Campaigns));
        assert_eq!(ids(&state.page_tasks()), vec![3]);

        state.reduce(Action::ToggleCategory(Category::Blog));
        state.reduce(Action::ToggleCategory(Category::Campaigns));
        assert_eq!(ids(&state.page_tasks()), vec![1, 3]);

        state.reduce(Action::FocusMember(Some("ghost".to_string())));
        assert_eq!(state.focus, None);
        assert_eq!(ids(&state.page_tasks()), vec![1, 2, 3]);
    }

    #[test]
    fn test_month_grid_places_tasks_on_days() {
        let state = loaded();
        let grid = state.month_grid();
        assert_eq!(grid.days.len(), 31);
        // 1 March 2026 is a Sunday
        assert_eq!(grid.leading_blanks, 0);
        assert_eq!(ids(&grid.days[2].tasks), vec![1, 2]);
        assert_eq!(ids(&grid.days[19].tasks), vec![3]);
        assert!(grid.days[0].tasks.is_empty());
    }

    #[test]
    fn test_board_uses_same_filtered_set() {
        let mut state = loaded();
        state.reduce(Action::SetMode(ViewMode::Board));
        state.reduce(Action::ToggleCategory(Category::SocialMedia));

        let board = state.board();
        let columns: Vec<(Status, Vec<i64>)> =
            board.iter().map(|c| (c.status, ids(&c.tasks))).collect();
        assert_eq!(
            columns,
            vec![
                (Status::Planned, vec![1]),
                (Status::InProgress, vec![2]),
                (Status::Review, vec![]),
                (Status::Completed, vec![]),
            ]
        );
        assert_eq!(board[1].label, "In Progress");
    }

    #[test]
    fn test_summary_counts_page() {
        let state = loaded();
        let summary = state.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_status[&Status::Planned], 1);
        assert_eq!(summary.by_category.get(&Category::Newsletter), None);
    }

    #[test]
    fn test_selection_cleared_when_task_disappears() {
        let mut state = loaded();
        state.reduce(Action::Select(Some(2)));
        assert_eq!(state.selected_task().map(|t| t.id), Some(2));

        state.reduce(Action::Select(Some(99)));
        assert_eq!(state.selected, None);

        state.reduce(Action::Select(Some(2)));
        let remaining: Vec<Task> = state.tasks.iter().filter(|t| t.id != 2).cloned().collect();
        state.reduce(Action::Loaded(remaining));
        assert_eq!(state.selected, None);
    }

    #[test]
    fn test_load_failure_keeps_tasks() {
        let mut state = loaded();
        state.reduce(Action::Loading);
        assert!(state.loading);
        state.reduce(Action::LoadFailed("Upstream returned 503: unavailable".to_string()));
        assert!(!state.loading);
        assert_eq!(state.tasks.len(), 4);
        assert_eq!(state.error.as_deref(), Some("Upstream returned 503: unavailable"));
        state.reduce(Action::DismissError);
        assert_eq!(state.error, None);
    }
}
