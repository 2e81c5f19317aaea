//! Vendor-facing interfaces (§6) the specialist agents' tools dispatch
//! against. Concrete calendar/search vendor SDKs are external
//! collaborators and are deliberately not implemented here.

use relay_domain::Result;

#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start_iso: String,
    pub end_iso: String,
}

#[derive(Debug, Clone)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub start_iso: Option<String>,
    pub end_iso: Option<String>,
}

#[async_trait::async_trait]
pub trait CalendarClient: Send + Sync {
    async fn get_events(&self, start_iso: &str, end_iso: &str) -> Result<Vec<CalendarEvent>>;
    async fn create_event(&self, summary: &str, start_iso: &str, end_iso: &str) -> Result<CalendarEvent>;
    async fn update_event(&self, id: &str, patch: EventPatch) -> Result<CalendarEvent>;
    async fn delete_event(&self, id: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait WebSearchClient: Send + Sync {
    /// Returns the already-formatted top-3-results string per the
    /// external interface contract; this crate does not reformat it.
    async fn search(&self, query: &str) -> Result<String>;
}
