//! Calendar agent tools (§4.8): list events in a half-open window, create,
//! patch, and delete by ID. IDs are internal — the agent's system
//! instructions forbid surfacing them to the user, not this module.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde_json::json;

use relay_domain::message::{ToolCall, ToolSchema};
use relay_domain::{Error, Result};

use crate::traits::{CalendarClient, CalendarEvent, EventPatch};

const TOOL_LIST: &str = "get_calendar_events";
const TOOL_CREATE: &str = "create_calendar_event";
const TOOL_PATCH: &str = "patch_calendar_event";
const TOOL_DELETE: &str = "delete_calendar_event";

/// Tool schemas exposed to the calendar agent.
pub fn tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: TOOL_LIST.to_string(),
            description: "List calendar events in a half-open time window [start, end).".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_iso": {"type": "string", "description": "Window start, ISO-8601 with offset"},
                    "end_iso": {"type": "string", "description": "Window end (exclusive), ISO-8601 with offset"}
                },
                "required": ["start_iso", "end_iso"]
            }),
        },
        ToolSchema {
            name: TOOL_CREATE.to_string(),
            description: "Create a calendar event.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string"},
                    "start_iso": {"type": "string", "description": "ISO-8601 with offset"},
                    "end_iso": {"type": "string", "description": "ISO-8601 with offset"}
                },
                "required": ["summary", "start_iso", "end_iso"]
            }),
        },
        ToolSchema {
            name: TOOL_PATCH.to_string(),
            description: "Patch an existing calendar event by internal ID.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "summary": {"type": "string"},
                    "start_iso": {"type": "string"},
                    "end_iso": {"type": "string"}
                },
                "required": ["id"]
            }),
        },
        ToolSchema {
            name: TOOL_DELETE.to_string(),
            description: "Delete a calendar event by internal ID.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"}
                },
                "required": ["id"]
            }),
        },
    ]
}

/// `America/Sao_Paulo`'s fixed UTC-03:00 offset, as used by the reference
/// deployment (the IANA zone currently carries no DST transitions).
pub fn sao_paulo_tz() -> Tz {
    chrono_tz::America::Sao_Paulo
}

pub fn format_sao_paulo(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&sao_paulo_tz())
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

fn render_event(ev: &crate::traits::CalendarEvent) -> serde_json::Value {
    json!({
        "id": ev.id,
        "summary": ev.summary,
        "start_iso": ev.start_iso,
        "end_iso": ev.end_iso,
    })
}

/// A dependency-free `CalendarClient`, useful until a real calendar vendor
/// is wired in. Events are kept for the process lifetime only — no
/// persistence, no external scheduling side effects.
#[derive(Default)]
pub struct InMemoryCalendar {
    events: Mutex<HashMap<String, CalendarEvent>>,
    next_id: AtomicU64,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CalendarClient for InMemoryCalendar {
    async fn get_events(&self, start: &str, end: &str) -> Result<Vec<CalendarEvent>> {
        let events = self.events.lock();
        let mut matching: Vec<_> = events
            .values()
            .filter(|ev| ev.start_iso.as_str() < end && ev.end_iso.as_str() > start)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.start_iso.cmp(&b.start_iso));
        Ok(matching)
    }

    async fn create_event(&self, summary: &str, start: &str, end: &str) -> Result<CalendarEvent> {
        let id = format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let ev = CalendarEvent {
            id: id.clone(),
            summary: summary.to_string(),
            start_iso: start.to_string(),
            end_iso: end.to_string(),
        };
        self.events.lock().insert(id, ev.clone());
        Ok(ev)
    }

    async fn update_event(&self, id: &str, patch: EventPatch) -> Result<CalendarEvent> {
        let mut events = self.events.lock();
        let ev = events
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("calendar event {id}")))?;
        if let Some(summary) = patch.summary {
            ev.summary = summary;
        }
        if let Some(start_iso) = patch.start_iso {
            ev.start_iso = start_iso;
        }
        if let Some(end_iso) = patch.end_iso {
            ev.end_iso = end_iso;
        }
        Ok(ev.clone())
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        self.events
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("calendar event {id}")))
    }
}

/// Execute one calendar tool call, returning `(result_content, is_error)`.
/// Failures are captured as the tool's result text, never propagated —
/// the specialist runtime relies on this to keep the turn alive.
pub async fn dispatch(call: &ToolCall, client: &dyn CalendarClient) -> (String, bool) {
    match call.name.as_str() {
        TOOL_LIST => {
            let (Some(start), Some(end)) = (
                call.arguments.get("start_iso").and_then(|v| v.as_str()),
                call.arguments.get("end_iso").and_then(|v| v.as_str()),
            ) else {
                return (missing_args(), true);
            };
            match client.get_events(start, end).await {
                Ok(events) => {
                    let rendered: Vec<_> = events.iter().map(render_event).collect();
                    (json!(rendered).to_string(), false)
                }
                Err(e) => (format!("failed to list events: {e}"), true),
            }
        }
        TOOL_CREATE => {
            let (Some(summary), Some(start), Some(end)) = (
                call.arguments.get("summary").and_then(|v| v.as_str()),
                call.arguments.get("start_iso").and_then(|v| v.as_str()),
                call.arguments.get("end_iso").and_then(|v| v.as_str()),
            ) else {
                return (missing_args(), true);
            };
            match client.create_event(summary, start, end).await {
                Ok(ev) => (render_event(&ev).to_string(), false),
                Err(e) => (format!("failed to create event: {e}"), true),
            }
        }
        TOOL_PATCH => {
            let Some(id) = call.arguments.get("id").and_then(|v| v.as_str()) else {
                return (missing_args(), true);
            };
            let patch = EventPatch {
                summary: call.arguments.get("summary").and_then(|v| v.as_str()).map(String::from),
                start_iso: call.arguments.get("start_iso").and_then(|v| v.as_str()).map(String::from),
                end_iso: call.arguments.get("end_iso").and_then(|v| v.as_str()).map(String::from),
            };
            match client.update_event(id, patch).await {
                Ok(ev) => (render_event(&ev).to_string(), false),
                Err(e) => (format!("failed to update event: {e}"), true),
            }
        }
        TOOL_DELETE => {
            let Some(id) = call.arguments.get("id").and_then(|v| v.as_str()) else {
                return (missing_args(), true);
            };
            match client.delete_event(id).await {
                Ok(()) => (json!({"deleted": id}).to_string(), false),
                Err(e) => (format!("failed to delete event: {e}"), true),
            }
        }
        other => (format!("unknown calendar tool: {other}"), true),
    }
}

fn missing_args() -> String {
    "missing required arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::Error;
    use std::sync::Mutex;

    struct FakeCalendar {
        events: Mutex<Vec<crate::traits::CalendarEvent>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl CalendarClient for FakeCalendar {
        async fn get_events(&self, _start: &str, _end: &str) -> relay_domain::Result<Vec<crate::traits::CalendarEvent>> {
            if self.fail {
                return Err(Error::Other("boom".into()));
            }
            Ok(self.events.lock().unwrap().clone())
        }
        async fn create_event(&self, summary: &str, start: &str, end: &str) -> relay_domain::Result<crate::traits::CalendarEvent> {
            let ev = crate::traits::CalendarEvent {
                id: "evt-1".to_string(),
                summary: summary.to_string(),
                start_iso: start.to_string(),
                end_iso: end.to_string(),
            };
            self.events.lock().unwrap().push(ev.clone());
            Ok(ev)
        }
        async fn update_event(&self, id: &str, patch: EventPatch) -> relay_domain::Result<crate::traits::CalendarEvent> {
            Ok(crate::traits::CalendarEvent {
                id: id.to_string(),
                summary: patch.summary.unwrap_or_default(),
                start_iso: patch.start_iso.unwrap_or_default(),
                end_iso: patch.end_iso.unwrap_or_default(),
            })
        }
        async fn delete_event(&self, _id: &str) -> relay_domain::Result<()> {
            Ok(())
        }
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall { id: "c1".to_string(), name: name.to_string(), arguments: args }
    }

    #[tokio::test]
    async fn list_events_returns_json_array() {
        let client = FakeCalendar { events: Mutex::new(vec![]), fail: false };
        let (content, is_error) = dispatch(
            &call(TOOL_LIST, json!({"start_iso": "2026-08-02T00:00:00-03:00", "end_iso": "2026-08-03T00:00:00-03:00"})),
            &client,
        )
        .await;
        assert!(!is_error);
        assert!(content.starts_with('['));
    }

    #[tokio::test]
    async fn list_events_surfaces_failure_as_error_result() {
        let client = FakeCalendar { events: Mutex::new(vec![]), fail: true };
        let (content, is_error) = dispatch(
            &call(TOOL_LIST, json!({"start_iso": "a", "end_iso": "b"})),
            &client,
        )
        .await;
        assert!(is_error);
        assert!(content.contains("failed to list events"));
    }

    #[tokio::test]
    async fn create_event_missing_args_is_error() {
        let client = FakeCalendar { events: Mutex::new(vec![]), fail: false };
        let (_, is_error) = dispatch(&call(TOOL_CREATE, json!({"summary": "x"})), &client).await;
        assert!(is_error);
    }

    #[tokio::test]
    async fn unknown_tool_name_is_error() {
        let client = FakeCalendar { events: Mutex::new(vec![]), fail: false };
        let (content, is_error) = dispatch(&call("not_a_tool", json!({})), &client).await;
        assert!(is_error);
        assert!(content.contains("unknown calendar tool"));
    }

    #[tokio::test]
    async fn in_memory_calendar_round_trips_create_list_update_delete() {
        let calendar = InMemoryCalendar::new();
        let created = calendar
            .create_event("standup", "2026-08-02T09:00:00-03:00", "2026-08-02T09:30:00-03:00")
            .await
            .unwrap();

        let listed = calendar
            .get_events("2026-08-02T00:00:00-03:00", "2026-08-03T00:00:00-03:00")
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        let updated = calendar
            .update_event(&created.id, EventPatch { summary: Some("renamed".into()), start_iso: None, end_iso: None })
            .await
            .unwrap();
        assert_eq!(updated.summary, "renamed");

        calendar.delete_event(&created.id).await.unwrap();
        assert!(calendar.get_events("2026-08-02T00:00:00-03:00", "2026-08-03T00:00:00-03:00").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_calendar_update_unknown_id_is_not_found() {
        let calendar = InMemoryCalendar::new();
        let result = calendar.update_event("ghost", EventPatch { summary: None, start_iso: None, end_iso: None }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn in_memory_calendar_excludes_events_outside_window() {
        let calendar = InMemoryCalendar::new();
        calendar
            .create_event("next week", "2026-08-10T09:00:00-03:00", "2026-08-10T10:00:00-03:00")
            .await
            .unwrap();
        let listed = calendar
            .get_events("2026-08-02T00:00:00-03:00", "2026-08-03T00:00:00-03:00")
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
