//! Shared data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::{Error, Result};

/// Marketing content type of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Campaigns,
    SocialMedia,
    Blog,
    Newsletter,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Campaigns,
        Category::SocialMedia,
        Category::Blog,
        Category::Newsletter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Campaigns => "campaigns",
            Category::SocialMedia => "social-media",
            Category::Blog => "blog",
            Category::Newsletter => "newsletter",
        }
    }

    /// Display colour persisted alongside the task.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Campaigns => "#8b5cf6",
            Category::SocialMedia => "#3b82f6",
            Category::Blog => "#10b981",
            Category::Newsletter => "#f59e0b",
        }
    }

    /// Label persisted in the task's `type` column.
    pub fn type_label(&self) -> &'static str {
        match self {
            Category::Campaigns => "Campaign",
            Category::SocialMedia => "Social Post",
            Category::Blog => "Blog Article",
            Category::Newsletter => "Newsletter",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown category: {}", s)))
    }
}

/// Workflow status, in board column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Planned,
    InProgress,
    Review,
    Completed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Planned,
        Status::InProgress,
        Status::Review,
        Status::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Planned => "planned",
            Status::InProgress => "in-progress",
            Status::Review => "review",
            Status::Completed => "completed",
        }
    }

    /// Column heading on the board.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Planned => "Planned",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown status: {}", s)))
    }
}

/// Member of the content team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
}

/// The fixed roster tasks can be assigned to.
pub const TEAM: &[TeamMember] = &[
    TeamMember { id: "alex", name: "Alex Rivera", role: "Content Lead" },
    TeamMember { id: "sam", name: "Sam Okafor", role: "Social Media Manager" },
    TeamMember { id: "jordan", name: "Jordan Lee", role: "Copywriter" },
    TeamMember { id: "taylor", name: "Taylor Brooks", role: "Designer" },
];

/// Look up a roster member by id.
pub fn team_member(id: &str) -> Option<&'static TeamMember> {
    TEAM.iter().find(|m| m.id == id)
}

/// Calendar page key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Returns `None` when `month` is outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { month: self.month + 1, ..self }
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { month: self.month - 1, ..self }
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn days_in_month(self) -> u32 {
        match (self.first_day(), self.next().first_day()) {
            (Some(start), Some(end)) => (end - start).num_days() as u32,
            _ => 0,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A content calendar entry as stored upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub category: Category,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub time: String,
    pub assignee: String,
    pub status: Status,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }

    /// `None` if the stored day/month/year do not form a real date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn assignee_member(&self) -> Option<&'static TeamMember> {
        team_member(&self.assignee)
    }

    /// Colour to render with, falling back to the category colour for rows
    /// written before colours were persisted.
    pub fn display_color(&self) -> &str {
        self.color.as_deref().unwrap_or_else(|| self.category.color())
    }
}

/// Contents of the "New Entry" form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_calendar_date"))]
pub struct NewTask {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    #[validate(custom(function = "validate_time"))]
    pub time: String,
    #[validate(custom(function = "validate_assignee"))]
    pub assignee: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A full-record edit carries the same fields as a new entry.
pub type TaskUpdate = NewTask;

impl NewTask {
    /// Validate and produce the row sent upstream, with colour and type
    /// derived from the category.
    pub fn to_record(&self) -> Result<TaskRecord<'_>> {
        self.validate()?;
        Ok(TaskRecord {
            title: self.title.trim(),
            description: &self.description,
            category: self.category,
            day: self.day,
            month: self.month,
            year: self.year,
            time: &self.time,
            assignee: &self.assignee,
            status: self.status,
            color: self.category.color(),
            kind: self.category.type_label(),
            tags: self.tags.as_deref(),
            created_by: self.created_by.as_deref(),
        })
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<&Task> for NewTask {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category,
            day: task.day,
            month: task.month,
            year: task.year,
            time: task.time.clone(),
            assignee: task.assignee.clone(),
            status: task.status,
            tags: task.tags.clone(),
            created_by: task.created_by.clone(),
        }
    }
}

/// Row payload for insert and full update.
#[derive(Debug, Serialize)]
pub struct TaskRecord<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: Category,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub time: &'a str,
    pub assignee: &'a str,
    pub status: Status,
    pub color: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<&'a str>,
}

/// Single-field update issued by a drag between board columns.
#[derive(Debug, Serialize)]
pub struct StatusPatch {
    pub status: Status,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn validate_calendar_date(task: &NewTask) -> std::result::Result<(), ValidationError> {
    if task.date().is_some() {
        return Ok(());
    }
    Err(ValidationError::new("invalid_date").with_message(
        format!("{}-{:02}-{:02} is not a valid date", task.year, task.month, task.day).into(),
    ))
}

fn validate_title(title: &str) -> std::result::Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if (1..=200).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("title must be between 1 and 200 characters".into()))
    }
}

fn validate_time(time: &str) -> std::result::Result<(), ValidationError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_time").with_message("time must be HH:MM".into()))
}

fn validate_assignee(assignee: &str) -> std::result::Result<(), ValidationError> {
    match team_member(assignee) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("unknown_assignee")
            .with_message(format!("{} is not on the team", assignee).into())),
    }
}

fn validate_tags(tags: &[String]) -> std::result::Result<(), ValidationError> {
    if tags.iter().all(|t| !t.trim().is_empty() && t.chars().count() <= 32) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_tag")
            .with_message("tags must be non-empty and at most 32 characters".into()))
    }
}
