//! Notification delivery infrastructure.
//!
//! The [`NotificationRouter`] subscribes to the event bus and writes one
//! in-app notification row per recipient of each event's audience.

pub mod router;

pub use router::NotificationRouter;
