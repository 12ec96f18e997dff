use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasUser {
    pub id: u64,
    pub name: String,
}

/// A course as listed for the current user. Fields not modelled here are kept
/// in `extra` so the harvested JSON carries everything Canvas returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    // Date-restricted courses come back without a name.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_restricted_by_date: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    pub fn is_restricted(&self) -> bool {
        self.access_restricted_by_date.unwrap_or(false)
    }

    /// The last two whitespace-separated words of the course name, e.g.
    /// `"WN 2025"` for `"EECS 281 001 WN 2025"`.
    pub fn term(&self) -> Option<String> {
        let words: Vec<&str> = self.name.split_whitespace().collect();
        if words.len() < 2 {
            return None;
        }
        Some(words[words.len() - 2..].join(" "))
    }
}

/// Assignment reduced to the fields worth keeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unlock_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lock_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub course_id: Option<u64>,
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub submission_types: Vec<String>,
    #[serde(default)]
    pub grading_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub delayed_post_at: Option<String>,
    #[serde(default)]
    pub last_reply_at: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub items: Vec<ModuleItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleItem {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub page_url: Option<String>,
    /// Page body, filled in for `Page` items only.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub quiz_type: Option<String>,
    #[serde(default)]
    pub allowed_attempts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub tab_type: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub full_url: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasCalendarEvent {
    pub id: Value,
    pub title: String,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub context_code: Option<String>,
}

/// Filter for the account calendar listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventQuery {
    pub context_codes: Vec<String>,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentExport {
    pub id: u64,
    pub workflow_state: String,
    #[serde(default)]
    pub attachment: Option<ExportAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportAttachment {
    pub url: String,
}

/// A readable file pulled out of a course export archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedFile {
    pub filename: String,
    pub content: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

/// Everything gathered about one course. A section that failed to load is
/// `None` rather than failing the whole collection.
#[derive(Debug, Clone, Serialize)]
pub struct CourseContent {
    pub tabs: Option<Vec<Tab>>,
    pub syllabus: Option<Vec<ExportedFile>>,
    pub announcements: Option<Vec<Announcement>>,
    pub modules: Option<Vec<CourseModule>>,
    pub quizzes: Option<Vec<Quiz>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingAssignment {
    pub course_name: String,
    pub name: String,
    pub due_at: DateTime<Utc>,
}

impl UpcomingAssignment {
    pub fn due_display(&self) -> String {
        self.due_at.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}
