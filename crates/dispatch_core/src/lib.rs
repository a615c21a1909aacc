//! Real-time ride dispatch core.
//!
//! Tracks live driver positions, maps participants to their live channels, and runs the
//! sequential offer protocol that turns a rider's search into a matched ride or a
//! "driver not found" outcome.
//!
//! The transport is not part of this crate: anything that can deliver an
//! [`events::OutboundEvent`] implements [`registry::Channel`], and inbound frames are
//! routed through [`service::DispatchService`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod geo;
pub mod location;
pub mod notifier;
pub mod presence;
pub mod registry;
pub mod service;
pub mod types;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use service::DispatchService;
pub use types::ParticipantId;
