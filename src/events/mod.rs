//! Events and the subscriber registry.

pub mod event;
pub mod registry;

pub use event::{Event, EventKey, EventPayload};
pub use registry::SubscriberRegistry;
