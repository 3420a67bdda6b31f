//! Recording doubles for the collaborators of a skill dialog.
//!
//! Every double records what it was asked to do so tests can assert on the
//! exact activities exchanged, and can share a [`Timeline`] to assert on the
//! relative order of calls across collaborators.
mod adapter;
pub mod fixtures;
mod ids;
mod skill_client;
mod state;
mod timeline;
mod token;

pub use adapter::RecordingAdapter;
pub use ids::RecordingConversationIdFactory;
pub use skill_client::{PostedActivity, RecordingSkillClient};
pub use state::{RecordedSave, RecordingConversationState};
pub use timeline::Timeline;
pub use token::{ExchangeCall, StaticTokenProvider, TokenBehavior};
