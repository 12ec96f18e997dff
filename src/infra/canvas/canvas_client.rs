// =============================================================================
// CANVAS CLIENT
// =============================================================================
//
// reqwest implementation of `CanvasApi` against the Canvas LMS REST API
// (`{base}/api/v1/...`). List endpoints are paginated through the `Link`
// response header.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::core::canvas::canvas_models::{
    Announcement, CanvasCalendarEvent, ContentExport, CourseModule, Page, Quiz, Tab,
};
use crate::core::canvas::{Assignment, CalendarEventQuery, CanvasApi, CanvasUser, Course};
use crate::core::errors::{ErrorKind, UpstreamError};
use crate::infra::upstream;

const SERVICE: &str = "Canvas";
const PER_PAGE: &str = "100";

pub const DEFAULT_CANVAS_URL: &str = "https://canvas.instructure.com";

pub struct CanvasClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CanvasClient {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).bearer_auth(&self.api_key)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let response = self
            .get(&self.url(path))
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;
        upstream::read_json(SERVICE, response).await
    }

    /// Follows `rel="next"` links until the last page.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, UpstreamError> {
        let mut items = Vec::new();
        let mut request = self
            .get(&self.url(path))
            .query(query)
            .query(&[("per_page", PER_PAGE)]);
        let mut pages = 0usize;

        loop {
            let response = request
                .send()
                .await
                .map_err(|e| upstream::from_reqwest(SERVICE, e))?;
            let response = upstream::check_status(SERVICE, response).await?;
            let next = next_link(response.headers());

            let page: Vec<T> = response
                .json()
                .await
                .map_err(|e| UpstreamError::new(SERVICE, ErrorKind::InvalidResponse, e.to_string()))?;
            items.extend(page);
            pages += 1;

            match next {
                Some(url) => request = self.get(&url),
                None => break,
            }
        }

        tracing::debug!(path, pages, count = items.len(), "Fetched Canvas list");
        Ok(items)
    }
}

/// The `rel="next"` target of a `Link` header, if any.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|s| {
            let s = s.trim();
            s == "rel=\"next\"" || s == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[async_trait]
impl CanvasApi for CanvasClient {
    async fn current_user(&self) -> Result<CanvasUser, UpstreamError> {
        self.get_json("users/self").await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, UpstreamError> {
        self.get_paged("users/self/courses", &[("completed", "false")])
            .await
    }

    async fn list_assignments(&self, course_id: u64) -> Result<Vec<Assignment>, UpstreamError> {
        self.get_paged(&format!("courses/{}/assignments", course_id), &[])
            .await
    }

    async fn list_announcements(
        &self,
        course_id: u64,
    ) -> Result<Vec<Announcement>, UpstreamError> {
        self.get_paged(
            &format!("courses/{}/discussion_topics", course_id),
            &[("only_announcements", "true")],
        )
        .await
    }

    async fn list_modules(&self, course_id: u64) -> Result<Vec<CourseModule>, UpstreamError> {
        self.get_paged(
            &format!("courses/{}/modules", course_id),
            &[("include[]", "items")],
        )
        .await
    }

    async fn get_page(&self, course_id: u64, page_url: &str) -> Result<Page, UpstreamError> {
        self.get_json(&format!("courses/{}/pages/{}", course_id, page_url))
            .await
    }

    async fn list_quizzes(&self, course_id: u64) -> Result<Vec<Quiz>, UpstreamError> {
        self.get_paged(&format!("courses/{}/quizzes", course_id), &[])
            .await
    }

    async fn list_tabs(&self, course_id: u64) -> Result<Vec<Tab>, UpstreamError> {
        self.get_paged(&format!("courses/{}/tabs", course_id), &[])
            .await
    }

    async fn list_calendar_events(
        &self,
        query: &CalendarEventQuery,
    ) -> Result<Vec<CanvasCalendarEvent>, UpstreamError> {
        let mut params: Vec<(&str, &str)> = vec![
            ("type", "event"),
            ("start_date", query.start_date.as_str()),
            ("end_date", query.end_date.as_str()),
        ];
        params.extend(
            query
                .context_codes
                .iter()
                .map(|code| ("context_codes[]", code.as_str())),
        );
        self.get_paged("calendar_events", &params).await
    }

    async fn create_content_export(&self, course_id: u64) -> Result<ContentExport, UpstreamError> {
        let response = self
            .client
            .post(self.url(&format!("courses/{}/content_exports", course_id)))
            .bearer_auth(&self.api_key)
            .form(&[("export_type", "zip")])
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;
        upstream::read_json(SERVICE, response).await
    }

    async fn get_content_export(
        &self,
        course_id: u64,
        export_id: u64,
    ) -> Result<ContentExport, UpstreamError> {
        self.get_json(&format!(
            "courses/{}/content_exports/{}",
            course_id, export_id
        ))
        .await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, UpstreamError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;
        let response = upstream::check_status(SERVICE, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;
        Ok(bytes.to_vec())
    }
}
