//! Shared application state, grouped by concern (mirrors the teacher's
//! `AppState` layout).

use std::sync::Arc;
use std::time::Duration;

use relay_authz::{AuthorizationGate, GroupMembershipCache};
use relay_context::ContextStore;
use relay_domain::config::Config;
use relay_fragments::{Debouncer, FragmentStore};
use relay_media::Transcriber;
use relay_providers::LlmProvider;
use relay_tools::{CalendarClient, InMemoryCalendar, LeadProspectingClient, StubLeadProspecting, WebSearchClient};

use crate::chat_client::ChatClient;
use crate::dedupe::DedupeStore;
use crate::registry::AgentRegistry;

/// Everything a turn needs, built once at startup and shared behind `Arc`.
pub struct AppState {
    pub config: Config,

    // ── Conversation pipeline ──
    pub fragment_store: Arc<FragmentStore>,
    pub debouncer: Arc<Debouncer>,
    pub context_store: Arc<ContextStore>,

    // ── Authorization ──
    pub group_cache: GroupMembershipCache,

    // ── Collaborators ──
    pub llm: Arc<dyn LlmProvider>,
    pub chat: Arc<ChatClient>,
    pub transcriber: Arc<dyn Transcriber>,
    pub calendar: Arc<dyn CalendarClient>,
    pub web_search: Arc<dyn WebSearchClient>,
    pub leads: Arc<dyn LeadProspectingClient>,

    // ── Agents ──
    pub registry: Arc<AgentRegistry>,

    // ── Inbound robustness ──
    pub dedupe: DedupeStore,

    // ── Per-turn concurrency ──
    pub turn_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn authorization_gate(&self) -> AuthorizationGate<'_> {
        AuthorizationGate::new(&self.group_cache, self.chat.as_ref())
    }

    pub fn turn_deadline(&self) -> Duration {
        Duration::from_secs(self.config.turns.turn_deadline_seconds)
    }
}

/// Build the catalog of every built-in tool schema, keyed by name, for
/// `AgentRegistry::from_config` to resolve agents' `tools` lists against.
pub fn tool_catalog() -> std::collections::HashMap<String, relay_domain::message::ToolSchema> {
    let mut catalog = std::collections::HashMap::new();
    for schema in relay_tools::calendar::tool_schemas() {
        catalog.insert(schema.name.clone(), schema);
    }
    let search_schema = relay_tools::websearch::tool_schema();
    catalog.insert(search_schema.name.clone(), search_schema);
    let leads_schema = relay_tools::leads::tool_schema();
    catalog.insert(leads_schema.name.clone(), leads_schema);
    catalog
}

/// Wire up the default set of collaborators (in-memory calendar, stub
/// search, stub leads) — the vendor adapters spec.md treats as external
/// and out of scope. See DESIGN.md for the rationale.
pub fn default_calendar() -> Arc<dyn CalendarClient> {
    Arc::new(InMemoryCalendar::new())
}

pub fn default_web_search() -> Arc<dyn WebSearchClient> {
    Arc::new(relay_tools::UnconfiguredWebSearch)
}

pub fn default_leads() -> Arc<dyn LeadProspectingClient> {
    Arc::new(StubLeadProspecting)
}
