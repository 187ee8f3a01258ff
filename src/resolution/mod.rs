//! Just-in-time playable link resolution with a one-item lookahead.
mod cache;
pub mod error;
mod slot;
pub mod token;
pub use cache::{PrefetchTask, ResolutionCache};
pub use slot::{PrefetchSlot, SlotTicket};
pub use token::{SharedToken, TokenProvider};
