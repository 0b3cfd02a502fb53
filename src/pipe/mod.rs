mod filter;
mod inspect;
mod latency;
mod progress;

pub use filter::filter;
pub use inspect::inspect;
pub use latency::{Latency, latency};
pub use progress::{Progress, progress};
