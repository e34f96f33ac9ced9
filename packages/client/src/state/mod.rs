//! Observable client state and the reducer that feeds it.

mod live;
pub mod reducer;

pub use live::{LiveState, LiveStore};
pub use reducer::{Effect, Reduction};
