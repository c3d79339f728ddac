#![deny(missing_docs)]
//! Bounded, per-session conversation state: the sliding processing window,
//! the hot turn buffer, and the scalar state table.

mod error;
mod sliding_window;
mod state_table;
mod turn_buffer;

pub use error::WindowConfigError;
pub use sliding_window::{SlidingWindow, UpdateOutcome, WindowInfo};
pub use state_table::StateTable;
pub use turn_buffer::{BufferedTurn, TurnBuffer};
