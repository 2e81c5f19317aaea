//! Tool implementations used by specialist agents (§4.8): calendar,
//! web search, and lead prospecting.

pub mod calendar;
pub mod leads;
pub mod traits;
pub mod websearch;

pub use calendar::InMemoryCalendar;
pub use leads::{LeadProspectingClient, StubLeadProspecting};
pub use traits::{CalendarClient, CalendarEvent, EventPatch, WebSearchClient};
pub use websearch::UnconfiguredWebSearch;
