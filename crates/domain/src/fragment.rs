use serde::{Deserialize, Serialize};

/// Opaque identifier for one conversation endpoint (a phone number in
/// canonical form, for the WhatsApp-shaped provider this gateway targets).
/// Sole partitioning key for the Fragment Store, Context Store, and
/// debounce timers.
pub type UserKey = String;

/// An immutable text payload plus its arrival ordinal within one user's
/// pending batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub ordinal: u64,
}

/// Join drained fragments into one utterance: space-joined, arrival order.
pub fn join_fragments(fragments: &[Fragment]) -> String {
    let mut sorted = fragments.to_vec();
    sorted.sort_by_key(|f| f.ordinal);
    sorted
        .into_iter()
        .map(|f| f.text)
        .collect::<Vec<_>>()
        .join(" ")
}
