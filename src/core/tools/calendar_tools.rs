use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::registry::{parse_args, require, Tool, ToolContext};
use super::tool_error::ToolError;
use crate::core::ai::models::{FunctionDef, FunctionParameters, PropertyDef};
use crate::core::clock::Clock;
use crate::core::workspace::{CalendarApi, EventQuery, NewCalendarEvent};

const DEFAULT_MAX_RESULTS: u32 = 10;
const MAX_RESULTS_CAP: u32 = 250;

// =============================================================================
// create_calendar_event
// =============================================================================

pub struct CreateCalendarEventTool {
    api: Arc<dyn CalendarApi>,
    time_zone: Tz,
}

impl CreateCalendarEventTool {
    pub fn new(api: Arc<dyn CalendarApi>, time_zone: Tz) -> Self {
        Self { api, time_zone }
    }
}

#[derive(Debug, Deserialize)]
struct CreateEventArgs {
    summary: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    attendees: Option<Vec<String>>,
}

#[async_trait]
impl Tool for CreateCalendarEventTool {
    fn declaration(&self) -> FunctionDef {
        FunctionDef {
            name: "create_calendar_event".to_string(),
            description: "Creates an event in the user's primary Google Calendar.".to_string(),
            parameters: FunctionParameters::object()
                .required_property("summary", PropertyDef::string("Title of the event."))
                .required_property(
                    "start_time",
                    PropertyDef::string("Start time in ISO-8601 format, e.g. 2025-04-17T14:00:00."),
                )
                .required_property(
                    "end_time",
                    PropertyDef::string("End time in ISO-8601 format, e.g. 2025-04-17T15:00:00."),
                )
                .property("description", PropertyDef::string("Longer description of the event."))
                .property("location", PropertyDef::string("Where the event takes place."))
                .property(
                    "attendees",
                    PropertyDef::string_array("Email addresses of people to invite."),
                ),
        }
    }

    fn result_label(&self) -> &'static str {
        "Calendar Result"
    }

    async fn call(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        // Checked before anything else: no credential means no remote call.
        let credential = ctx.credential.as_ref().ok_or(ToolError::MissingCredential {
            action: "create calendar events",
        })?;

        let args: CreateEventArgs = parse_args(args)?;
        let event = NewCalendarEvent {
            summary: require(args.summary, "summary")?,
            start_time: require(args.start_time, "start_time")?,
            end_time: require(args.end_time, "end_time")?,
            time_zone: self.time_zone.name().to_string(),
            description: args.description.filter(|d| !d.trim().is_empty()),
            location: args.location.filter(|l| !l.trim().is_empty()),
            attendees: args
                .attendees
                .unwrap_or_default()
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        };

        let created = self
            .api
            .insert_event(credential, &event)
            .await
            .map_err(ToolError::upstream("creating calendar event"))?;

        tracing::info!(event_id = %created.id, "Calendar event created");

        Ok(match created.html_link {
            Some(link) => format!("Event created: {}\nLink: {}", event.summary, link),
            None => format!("Event created: {}", event.summary),
        })
    }
}

// =============================================================================
// read_calendar_events
// =============================================================================

pub struct ReadCalendarEventsTool {
    api: Arc<dyn CalendarApi>,
    clock: Arc<dyn Clock>,
    time_zone: Tz,
}

impl ReadCalendarEventsTool {
    pub fn new(api: Arc<dyn CalendarApi>, clock: Arc<dyn Clock>, time_zone: Tz) -> Self {
        Self {
            api,
            clock,
            time_zone,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadEventsArgs {
    time_min: Option<String>,
    time_max: Option<String>,
    // Models often send whole numbers as floats.
    max_results: Option<f64>,
}

#[async_trait]
impl Tool for ReadCalendarEventsTool {
    fn declaration(&self) -> FunctionDef {
        FunctionDef {
            name: "read_calendar_events".to_string(),
            description: "Lists upcoming events from the user's primary Google Calendar."
                .to_string(),
            parameters: FunctionParameters::object()
                .property(
                    "time_min",
                    PropertyDef::string("Earliest start time (ISO-8601). Defaults to now."),
                )
                .property("time_max", PropertyDef::string("Latest start time (ISO-8601)."))
                .property(
                    "max_results",
                    PropertyDef::integer("Maximum number of events to return. Defaults to 10."),
                ),
        }
    }

    fn result_label(&self) -> &'static str {
        "Calendar Result"
    }

    async fn call(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let credential = ctx.credential.as_ref().ok_or(ToolError::MissingCredential {
            action: "read calendar events",
        })?;

        let args: ReadEventsArgs = parse_args(args)?;
        let time_min = match args.time_min.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => parse_time(text, self.time_zone)?,
            None => self.clock.now(),
        };
        let time_max = match args.time_max.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Some(parse_time(text, self.time_zone)?),
            None => None,
        };
        let max_results = args
            .max_results
            .filter(|n| n.is_finite() && *n >= 1.0)
            .map(|n| (n as u32).min(MAX_RESULTS_CAP))
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let query = EventQuery {
            time_min,
            time_max,
            max_results,
        };
        let events = self
            .api
            .list_events(credential, &query)
            .await
            .map_err(ToolError::upstream("reading calendar events"))?;

        if events.is_empty() {
            return Ok("No upcoming events found.".to_string());
        }

        let lines: Vec<String> = events
            .iter()
            .map(|e| format!("- {}: {}", e.start, e.summary))
            .collect();
        Ok(format!("Upcoming events:\n{}", lines.join("\n")))
    }
}

/// Parses an RFC 3339 timestamp, or a local date-time / date in `tz`.
fn parse_time(text: &str, tz: Tz) -> Result<DateTime<Utc>, ToolError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    naive
        .and_then(|n| tz.from_local_datetime(&n).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' is not a valid time", text)))
}
