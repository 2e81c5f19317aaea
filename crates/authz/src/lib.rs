pub mod cache;
pub mod gate;

pub use cache::GroupMembershipCache;
pub use gate::{AuthorizationGate, ChatProvider};
