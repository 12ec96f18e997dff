use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::canvas::{
    upcoming_from, CalendarEventQuery, CanvasService, CanvasUser, Course, UpcomingAssignment,
};

/// How far ahead the account calendar is read.
const CALENDAR_WINDOW_DAYS: i64 = 180;

async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote harvest file");
    Ok(path)
}

/// Calendar events of the user and their current courses, from today on.
fn calendar_query(user: &CanvasUser, courses: &[Course], now: DateTime<Utc>) -> CalendarEventQuery {
    let mut context_codes = vec![format!("user_{}", user.id)];
    context_codes.extend(courses.iter().map(|c| format!("course_{}", c.id)));
    CalendarEventQuery {
        context_codes,
        start_date: now.format("%Y-%m-%d").to_string(),
        end_date: (now + chrono::Duration::days(CALENDAR_WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string(),
    }
}

/// Writes `AllCourses.json`, `CurrentCourses.json`, `AllAssignments.json` and
/// `CalendarEvents.json` (plus `course_content_<id>.json` when a course is
/// given) and returns the assignments due after `now`.
pub async fn run_harvest(
    canvas: &CanvasService,
    output_dir: &Path,
    course: Option<u64>,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<UpcomingAssignment>> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let user = canvas.current_user().await?;
    tracing::info!(user = %user.name, term = canvas.term(), "Harvesting Canvas data");

    let harvest = canvas.harvest_assignments().await?;
    write_json(output_dir, "AllCourses.json", &harvest.all_courses).await?;
    write_json(output_dir, "CurrentCourses.json", &harvest.current_courses).await?;
    write_json(output_dir, "AllAssignments.json", &harvest.assignments).await?;

    let query = calendar_query(&user, &harvest.current_courses, now);
    match canvas.calendar_events(&query).await {
        Ok(events) => {
            write_json(output_dir, "CalendarEvents.json", &events).await?;
        }
        Err(e) => tracing::warn!(error = %e, "Failed to fetch Canvas calendar events"),
    }

    if let Some(course_id) = course {
        let content = canvas.course_content(course_id).await;
        write_json(output_dir, &format!("course_content_{}.json", course_id), &content).await?;
    }

    Ok(upcoming_from(&harvest.assignments, now))
}

pub fn print_upcoming(upcoming: &[UpcomingAssignment]) {
    if upcoming.is_empty() {
        println!("No upcoming assignments.");
        return;
    }
    println!("Upcoming assignments:");
    for assignment in upcoming {
        println!(
            "  {} - {} (due {})",
            assignment.course_name,
            assignment.name,
            assignment.due_display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::canvas::canvas_service::fakes::FakeCanvasApi;
    use crate::core::canvas::{Assignment, Course, ExportCache, ExportPolling};
    use crate::core::clock::FixedClock;
    use crate::infra::store::InMemoryStore;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()
    }

    fn canvas(api: FakeCanvasApi) -> CanvasService {
        let clock = Arc::new(FixedClock(now()));
        let cache = ExportCache::new(
            Arc::new(InMemoryStore::new()),
            clock.clone(),
            chrono::Duration::hours(24),
        );
        CanvasService::new(
            Arc::new(api),
            cache,
            clock,
            "WN 2025",
            ExportPolling {
                interval: Duration::ZERO,
                timeout: Duration::from_secs(1),
            },
        )
    }

    fn fixture() -> FakeCanvasApi {
        let courses: Vec<Course> = serde_json::from_value(json!([
            {"id": 1, "name": "EECS 281 001 WN 2025"},
            {"id": 2, "name": "MATH 215 FA 2024"},
            {"id": 3, "access_restricted_by_date": true}
        ]))
        .unwrap();
        let assignments: Vec<Assignment> = serde_json::from_value(json!([
            {"id": 10, "name": "Project 1", "due_at": "2025-01-20T04:59:00Z"},
            {"id": 11, "name": "Project 2", "due_at": "2025-02-14T04:59:00Z"},
            {"id": 12, "name": "Lab 0", "due_at": null}
        ]))
        .unwrap();

        FakeCanvasApi {
            courses,
            assignments: BTreeMap::from([(1, assignments)]),
            ..Default::default()
        }
    }

    fn read(dir: &Path, name: &str) -> Value {
        serde_json::from_str(&std::fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_harvest_writes_files_and_reports_upcoming() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("harvest");

        let upcoming = run_harvest(&canvas(fixture()), &out, None, now())
            .await
            .unwrap();

        assert_eq!(read(&out, "AllCourses.json").as_array().unwrap().len(), 3);
        let current = read(&out, "CurrentCourses.json");
        assert_eq!(current.as_array().unwrap().len(), 1);
        assert_eq!(current[0]["name"], "EECS 281 001 WN 2025");
        let all = read(&out, "AllAssignments.json");
        assert_eq!(all["EECS 281 001 WN 2025"].as_array().unwrap().len(), 3);
        assert_eq!(read(&out, "CalendarEvents.json"), json!([]));
        assert!(!out.join("course_content_1.json").exists());

        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].name, "Project 2");
        assert_eq!(upcoming[0].due_display(), "2025-02-14 04:59 UTC");
    }

    #[test]
    fn test_calendar_query_covers_user_and_current_courses() {
        let user = CanvasUser {
            id: 9,
            name: "Student".to_string(),
        };
        let courses: Vec<Course> =
            serde_json::from_value(json!([{"id": 1, "name": "EECS 281 001 WN 2025"}])).unwrap();

        let query = calendar_query(&user, &courses, now());
        assert_eq!(query.context_codes, vec!["user_9", "course_1"]);
        assert_eq!(query.start_date, "2025-02-01");
        assert_eq!(query.end_date, "2025-07-31");
    }

    #[tokio::test]
    async fn test_harvest_with_course_content() {
        let dir = tempfile::tempdir().unwrap();

        run_harvest(&canvas(fixture()), dir.path(), Some(1), now())
            .await
            .unwrap();

        let content = read(dir.path(), "course_content_1.json");
        assert_eq!(content["tabs"], json!([]));
        // Quizzes fail in the fake and the empty archive cannot be read.
        assert_eq!(content["quizzes"], Value::Null);
        assert_eq!(content["syllabus"], Value::Null);
    }
}
