//! In-process clinic event bus.
//!
//! Handlers publish [`ClinicEvent`]s on the [`EventBus`]; the API crate's
//! notification router subscribes, resolves each event's [`Audience`] and
//! writes notification rows.

pub mod audience;
pub mod bus;
pub mod event;

pub use audience::Audience;
pub use bus::EventBus;
pub use event::ClinicEvent;
