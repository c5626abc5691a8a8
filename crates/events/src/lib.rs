//! Domain events and in-process fan-out.
//!
//! The kitchen state machine emits one event per accepted mutation. Events
//! are applied to the aggregate first and then published on an [`EventBus`]
//! for anything that wants a push feed (activity logs, tests, the HTTP layer).

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
