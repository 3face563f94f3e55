//! Typed in-process event bus and approval gate for Attache.
//!
//! This crate provides the [`EventBus`] every component publishes to:
//! - Thread-safe subscriber storage using `Arc<RwLock<T>>`
//! - Handle-based unsubscribe
//! - Channel subscribers for async consumers
//!
//! and the [`ApprovalGate`], a one-shot rendezvous between an agent asking
//! for permission and a human answering over the bus.
//!
//! # Example
//!
//! ```no_run
//! use attache_events::EventBus;
//! use attache_models::{BusEvent, EventKind};
//!
//! let bus = EventBus::new();
//!
//! let handle = bus
//!     .subscribe(EventKind::AgentLog, |event| {
//!         if let BusEvent::AgentLog { content, .. } = event {
//!             println!("agent: {}", content);
//!         }
//!     })
//!     .unwrap();
//!
//! bus.publish(BusEvent::AgentLog {
//!     role: "assistant".into(),
//!     content: "ready".into(),
//! })
//! .unwrap();
//!
//! bus.unsubscribe(&handle);
//! ```

pub mod approval;
pub mod bus;
pub mod error;

pub use approval::ApprovalGate;
pub use bus::{EventBus, SubscriptionHandle};
pub use error::{EventError, Result};
