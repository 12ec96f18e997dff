// =============================================================================
// CANVAS SERVICE
// =============================================================================
//
// Course harvesting on top of the `CanvasApi` trait: current-term filtering,
// upcoming assignments, per-course content and cached content exports.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::canvas_models::*;
use super::export_archive::extract_text_files;
use super::export_cache::ExportCache;
use crate::core::clock::Clock;
use crate::core::errors::UpstreamError;

#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn current_user(&self) -> Result<CanvasUser, UpstreamError>;
    /// Courses of the current user that are not completed.
    async fn list_courses(&self) -> Result<Vec<Course>, UpstreamError>;
    async fn list_assignments(&self, course_id: u64) -> Result<Vec<Assignment>, UpstreamError>;
    async fn list_announcements(&self, course_id: u64)
        -> Result<Vec<Announcement>, UpstreamError>;
    /// Modules with their items inlined.
    async fn list_modules(&self, course_id: u64) -> Result<Vec<CourseModule>, UpstreamError>;
    async fn get_page(&self, course_id: u64, page_url: &str) -> Result<Page, UpstreamError>;
    async fn list_quizzes(&self, course_id: u64) -> Result<Vec<Quiz>, UpstreamError>;
    async fn list_tabs(&self, course_id: u64) -> Result<Vec<Tab>, UpstreamError>;
    async fn list_calendar_events(
        &self,
        query: &CalendarEventQuery,
    ) -> Result<Vec<CanvasCalendarEvent>, UpstreamError>;
    async fn create_content_export(&self, course_id: u64) -> Result<ContentExport, UpstreamError>;
    async fn get_content_export(
        &self,
        course_id: u64,
        export_id: u64,
    ) -> Result<ContentExport, UpstreamError>;
    async fn download(&self, url: &str) -> Result<Vec<u8>, UpstreamError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
    #[error("Content export {0} failed")]
    ExportFailed(u64),
    #[error("Content export {export_id} did not finish within {waited_secs}s")]
    ExportTimedOut { export_id: u64, waited_secs: u64 },
    #[error("Content export {0} has no attachment")]
    MissingAttachment(u64),
    #[error("Unreadable export archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// How content exports are polled.
#[derive(Debug, Clone, Copy)]
pub struct ExportPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ExportPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Result of collecting every current-term course's assignments.
#[derive(Debug, Clone)]
pub struct AssignmentHarvest {
    pub all_courses: Vec<Course>,
    pub current_courses: Vec<Course>,
    /// Keyed by course name. Courses whose assignments failed to load are absent.
    pub assignments: BTreeMap<String, Vec<Assignment>>,
}

/// Courses whose name ends in `term` (e.g. `"WN 2025"`), skipping courses
/// Canvas has restricted by date.
pub fn filter_current_term(courses: &[Course], term: &str) -> Vec<Course> {
    courses
        .iter()
        .filter(|c| !c.is_restricted())
        .filter(|c| c.term().as_deref() == Some(term))
        .cloned()
        .collect()
}

/// Assignments due strictly after `now`, ordered by due date.
pub fn upcoming_from(
    assignments: &BTreeMap<String, Vec<Assignment>>,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<UpcomingAssignment> {
    let mut upcoming: Vec<UpcomingAssignment> = assignments
        .iter()
        .flat_map(|(course_name, list)| {
            list.iter().filter_map(move |a| {
                a.due_at.filter(|due| *due > now).map(|due_at| UpcomingAssignment {
                    course_name: course_name.clone(),
                    name: a.name.clone(),
                    due_at,
                })
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.due_at.cmp(&b.due_at));
    upcoming
}

pub struct CanvasService {
    api: Arc<dyn CanvasApi>,
    cache: ExportCache,
    clock: Arc<dyn Clock>,
    term: String,
    polling: ExportPolling,
}

impl CanvasService {
    pub fn new(
        api: Arc<dyn CanvasApi>,
        cache: ExportCache,
        clock: Arc<dyn Clock>,
        term: impl Into<String>,
        polling: ExportPolling,
    ) -> Self {
        Self {
            api,
            cache,
            clock,
            term: term.into(),
            polling,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub async fn current_user(&self) -> Result<CanvasUser, CanvasError> {
        Ok(self.api.current_user().await?)
    }

    /// Lists all courses and their current-term subset, then fetches the
    /// assignments of each current course.
    pub async fn harvest_assignments(&self) -> Result<AssignmentHarvest, CanvasError> {
        let all_courses = self.api.list_courses().await?;
        tracing::info!(count = all_courses.len(), "Fetched Canvas courses");

        let current_courses = filter_current_term(&all_courses, &self.term);
        tracing::info!(term = %self.term, count = current_courses.len(), "Filtered current-term courses");

        let mut assignments = BTreeMap::new();
        for course in &current_courses {
            match self.api.list_assignments(course.id).await {
                Ok(list) => {
                    tracing::debug!(course = %course.name, count = list.len(), "Fetched assignments");
                    assignments.insert(course.name.clone(), list);
                }
                Err(e) => {
                    tracing::warn!(course = %course.name, error = %e, "Failed to fetch assignments");
                }
            }
        }

        Ok(AssignmentHarvest {
            all_courses,
            current_courses,
            assignments,
        })
    }

    /// Future-due assignments of current-term courses, optionally limited to
    /// courses whose name contains `course_filter` (case-insensitive).
    pub async fn upcoming_assignments(
        &self,
        course_filter: Option<&str>,
    ) -> Result<Vec<UpcomingAssignment>, CanvasError> {
        let all_courses = self.api.list_courses().await?;
        let needle = course_filter
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());

        let mut assignments = BTreeMap::new();
        for course in filter_current_term(&all_courses, &self.term) {
            if let Some(needle) = &needle {
                if !course.name.to_lowercase().contains(needle) {
                    continue;
                }
            }
            let list = self.api.list_assignments(course.id).await?;
            assignments.insert(course.name, list);
        }

        Ok(upcoming_from(&assignments, self.clock.now()))
    }

    /// Gathers tabs, export text, announcements, modules and quizzes of one
    /// course. Each section is fetched independently.
    pub async fn course_content(&self, course_id: u64) -> CourseContent {
        CourseContent {
            tabs: section("tabs", course_id, self.api.list_tabs(course_id).await),
            syllabus: section("syllabus", course_id, self.export_text(course_id).await),
            announcements: section(
                "announcements",
                course_id,
                self.api.list_announcements(course_id).await,
            ),
            modules: section("modules", course_id, self.modules_with_pages(course_id).await),
            quizzes: section("quizzes", course_id, self.api.list_quizzes(course_id).await),
        }
    }

    pub async fn calendar_events(
        &self,
        query: &CalendarEventQuery,
    ) -> Result<Vec<CanvasCalendarEvent>, CanvasError> {
        Ok(self.api.list_calendar_events(query).await?)
    }

    async fn modules_with_pages(&self, course_id: u64) -> Result<Vec<CourseModule>, CanvasError> {
        let mut modules = self.api.list_modules(course_id).await?;
        for module in &mut modules {
            for item in &mut module.items {
                if item.item_type != "Page" {
                    continue;
                }
                let Some(page_url) = item.page_url.clone() else {
                    continue;
                };
                match self.api.get_page(course_id, &page_url).await {
                    Ok(page) => item.content = page.body,
                    Err(e) => {
                        tracing::warn!(page = %item.title, error = %e, "Could not fetch page content")
                    }
                }
            }
        }
        Ok(modules)
    }

    /// Text files from the course's content export.
    pub async fn export_text(&self, course_id: u64) -> Result<Vec<ExportedFile>, CanvasError> {
        let bytes = self.export_archive(course_id).await?;
        Ok(extract_text_files(&bytes)?)
    }

    /// The course's export archive, from cache when fresh.
    pub async fn export_archive(&self, course_id: u64) -> Result<Vec<u8>, CanvasError> {
        if let Some(cached) = self.cache.get(course_id).await {
            return Ok(cached.zip_bytes);
        }

        let export = self.api.create_content_export(course_id).await?;
        tracing::info!(course_id, export_id = export.id, "Created content export");

        let url = self.wait_for_export(course_id, export.id).await?;
        let bytes = self.api.download(&url).await?;

        if let Err(e) = self.cache.put(course_id, &bytes).await {
            tracing::warn!(course_id, error = %e, "Failed to cache course export");
        }
        Ok(bytes)
    }

    async fn wait_for_export(&self, course_id: u64, export_id: u64) -> Result<String, CanvasError> {
        let started = tokio::time::Instant::now();
        loop {
            let export = self.api.get_content_export(course_id, export_id).await?;
            let elapsed = started.elapsed();
            tracing::debug!(export_id, state = %export.workflow_state, elapsed_secs = elapsed.as_secs_f32(), "Export status");

            match export.workflow_state.as_str() {
                "exported" => {
                    tracing::info!(export_id, elapsed_secs = elapsed.as_secs_f32(), "Content export finished");
                    return export
                        .attachment
                        .map(|a| a.url)
                        .ok_or(CanvasError::MissingAttachment(export_id));
                }
                "failed" => return Err(CanvasError::ExportFailed(export_id)),
                "created" | "exporting" => {}
                other => tracing::warn!(export_id, state = other, "Unknown export state"),
            }

            if elapsed >= self.polling.timeout {
                return Err(CanvasError::ExportTimedOut {
                    export_id,
                    waited_secs: elapsed.as_secs(),
                });
            }
            tokio::time::sleep(self.polling.interval).await;
        }
    }
}

fn section<T, E: std::fmt::Display>(name: &str, course_id: u64, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(course_id, section = name, error = %e, "Failed to fetch course section");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeCanvasApi;
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::infra::store::InMemoryStore;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::io::{Cursor, Write};
    use std::sync::atomic::Ordering;

    fn course(id: u64, name: &str) -> Course {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    fn assignment(id: u64, name: &str, due: Option<&str>) -> Assignment {
        serde_json::from_value(json!({"id": id, "name": name, "due_at": due})).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()
    }

    fn fast_polling() -> ExportPolling {
        ExportPolling {
            interval: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    fn service(api: FakeCanvasApi) -> (CanvasService, Arc<FakeCanvasApi>) {
        let api = Arc::new(api);
        let clock = Arc::new(FixedClock(now()));
        let cache = ExportCache::new(
            Arc::new(InMemoryStore::new()),
            clock.clone(),
            chrono::Duration::hours(24),
        );
        let service = CanvasService::new(api.clone(), cache, clock, "WN 2025", fast_polling());
        (service, api)
    }

    fn zip_with(name: &str, body: &[u8]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file(name, opts).unwrap();
        zip.write_all(body).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_filter_current_term() {
        let mut restricted = course(3, "HIST 101 WN 2025");
        restricted.access_restricted_by_date = Some(true);
        let courses = vec![
            course(1, "EECS 281 001 WN 2025"),
            course(2, "EECS 280 FA 2024"),
            restricted,
            course(4, "2025"),
        ];

        let current = filter_current_term(&courses, "WN 2025");
        let ids: Vec<u64> = current.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_harvest_skips_courses_that_fail() {
        let api = FakeCanvasApi {
            courses: vec![
                course(1, "EECS 281 WN 2025"),
                course(2, "MATH 214 WN 2025"),
                course(3, "EECS 280 FA 2024"),
            ],
            assignments: BTreeMap::from([(1, vec![assignment(10, "P1", None)])]),
            failing_assignments: vec![2],
            ..Default::default()
        };
        let (service, _) = service(api);

        let harvest = service.harvest_assignments().await.unwrap();

        assert_eq!(harvest.all_courses.len(), 3);
        assert_eq!(harvest.current_courses.len(), 2);
        assert_eq!(
            harvest.assignments.keys().collect::<Vec<_>>(),
            vec!["EECS 281 WN 2025"]
        );
    }

    #[tokio::test]
    async fn test_upcoming_assignments_are_future_and_sorted() {
        let api = FakeCanvasApi {
            courses: vec![course(1, "EECS 281 WN 2025"), course(2, "MATH 214 WN 2025")],
            assignments: BTreeMap::from([
                (
                    1,
                    vec![
                        assignment(10, "Past", Some("2025-01-20T04:59:00Z")),
                        assignment(11, "Later", Some("2025-03-01T04:59:00Z")),
                        assignment(12, "Undated", None),
                    ],
                ),
                (2, vec![assignment(20, "Sooner", Some("2025-02-05T17:00:00Z"))]),
            ]),
            ..Default::default()
        };
        let (service, _) = service(api);

        let upcoming = service.upcoming_assignments(None).await.unwrap();
        let names: Vec<&str> = upcoming.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Sooner", "Later"]);

        let filtered = service.upcoming_assignments(Some("eecs")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].course_name, "EECS 281 WN 2025");
    }

    #[tokio::test]
    async fn test_export_polls_until_exported_then_caches() {
        let api = FakeCanvasApi {
            export_states: vec!["created", "exporting", "exported"],
            archive: zip_with("syllabus.html", b"<p>Week 1</p>"),
            ..Default::default()
        };
        let (service, api) = service(api);

        let files = service.export_text(42).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "<p>Week 1</p>");
        assert_eq!(api.polls(), 3);

        // Second call is served from the cache.
        service.export_text(42).await.unwrap();
        assert_eq!(api.exports_created.load(Ordering::SeqCst), 1);
        assert_eq!(api.downloads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_export() {
        let api = FakeCanvasApi {
            export_states: vec!["exporting", "failed"],
            ..Default::default()
        };
        let (service, _) = service(api);

        let err = service.export_archive(42).await.unwrap_err();
        assert!(matches!(err, CanvasError::ExportFailed(77)));
    }

    #[tokio::test]
    async fn test_export_times_out() {
        let api = Arc::new(FakeCanvasApi {
            export_states: vec!["exporting"],
            ..Default::default()
        });
        let clock = Arc::new(FixedClock(now()));
        let cache = ExportCache::new(
            Arc::new(InMemoryStore::new()),
            clock.clone(),
            chrono::Duration::hours(24),
        );
        let polling = ExportPolling {
            interval: Duration::from_millis(1),
            timeout: Duration::ZERO,
        };
        let service = CanvasService::new(api.clone(), cache, clock, "WN 2025", polling);

        let err = service.export_archive(42).await.unwrap_err();
        assert!(matches!(err, CanvasError::ExportTimedOut { export_id: 77, .. }));
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test]
    async fn test_course_content_sections_fail_independently() {
        let module: CourseModule = serde_json::from_value(json!({
            "id": 1,
            "name": "Week 1",
            "items": [
                {"id": 1, "title": "Intro", "type": "Page", "page_url": "intro"},
                {"id": 2, "title": "Missing", "type": "Page", "page_url": "gone"},
                {"id": 3, "title": "Slides", "type": "File"}
            ]
        }))
        .unwrap();
        let api = FakeCanvasApi {
            modules: vec![module],
            pages: BTreeMap::from([("intro".to_string(), "<p>Welcome</p>".to_string())]),
            export_states: vec!["failed"],
            ..Default::default()
        };
        let (service, _) = service(api);

        let content = service.course_content(42).await;

        assert!(content.syllabus.is_none());
        assert!(content.quizzes.is_none());
        assert_eq!(content.tabs.as_ref().map(Vec::len), Some(0));
        let items = &content.modules.unwrap()[0].items;
        assert_eq!(items[0].content.as_deref(), Some("<p>Welcome</p>"));
        assert_eq!(items[1].content, None);
        assert_eq!(items[2].content, None);
    }
}
