//! Callback Simulator
//!
//! Delayed, persisted HTTP callbacks with JSON placeholder resolution for
//! request stubbing servers. After the host server finishes an exchange, it
//! hands the served event and the stub's callback definitions to
//! [`CallbackSimulator`], which resolves `$(...)` placeholders, persists each
//! normalized callback to a temp file, and fires a POST once the configured
//! delay elapses. Delivery is fire-and-forget: no retries, no cancellation,
//! outcomes observable only in the logs.
//!
//! # Placeholder syntax
//!
//! - `$(request.customer.name)` — JSON path lookup against the served
//!   request body; `response.*` and `urlParts[n]` work the same way
//! - `$(!UUID)`, `$(!Random)` — computed values
//! - `$(!Instant.plus[m30])`, `$(!Timestamp.plus[h-2])` — current time with
//!   an offset in hours, minutes, or seconds
//!
//! # Example configuration
//!
//! ```yaml
//! callbacks:
//!   - url: "$(request.callbackUrl)"
//!     delay_ms: 5000
//!     data:
//!       orderId: "$(urlParts[1])"
//!       confirmedAt: "$(!Instant)"
//!     authentication:
//!       type: basic
//!       username: callback-user
//!       password: secret
//! ```

pub mod config;
pub mod dispatch;
mod keyword;
pub mod placeholder;
pub mod scheduler;
pub mod simulator;
pub mod store;

pub use config::{Authentication, Callback, CallbackConfig, ServedEvent};
pub use placeholder::{LookupDocument, PlaceholderEngine, PlaceholderError};
pub use simulator::CallbackSimulator;
