pub mod fallback;
pub mod fanout;
pub mod overlay;
pub mod pagination;
pub mod projector;
pub mod scheduler;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod upstream;

pub use session::{AggregateSession, CycleReport, PageRequest, SessionDeps};
