//! Tool dispatch (§4.8 step 4a/b) — routes one `ToolCall` by name to the
//! matching `relay-tools` implementation. Mirrors the match-by-name
//! dispatch idiom of a plain tool router: one function per call, capturing
//! failures as result text rather than propagating them.

use relay_domain::message::ToolCall;
use relay_tools::leads::LeadProspectingClient;
use relay_tools::{CalendarClient, WebSearchClient};

pub struct ToolDispatcher<'a> {
    pub calendar: &'a dyn CalendarClient,
    pub web_search: &'a dyn WebSearchClient,
    pub leads: &'a dyn LeadProspectingClient,
}

const CALENDAR_TOOLS: &[&str] = &[
    "get_calendar_events",
    "create_calendar_event",
    "patch_calendar_event",
    "delete_calendar_event",
];

impl<'a> ToolDispatcher<'a> {
    /// Execute `call`, returning `(result_content, is_error)`. Unknown tool
    /// names are reported as an error result, not a panic or a propagated
    /// error — the model sees it and can apologize or retry differently.
    pub async fn dispatch(&self, call: &ToolCall) -> (String, bool) {
        if CALENDAR_TOOLS.contains(&call.name.as_str()) {
            return relay_tools::calendar::dispatch(call, self.calendar).await;
        }
        if call.name == "web_search" {
            return relay_tools::websearch::dispatch(call, self.web_search).await;
        }
        if call.name == "prospect_leads" {
            return relay_tools::leads::dispatch(call, self.leads).await;
        }
        (format!("unknown tool: {}", call.name), true)
    }
}
