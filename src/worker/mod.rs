mod error;
mod ids;
mod snapshot;
mod status;
mod streams;
#[allow(clippy::module_inception)]
mod worker;

pub use error::WorkerError;
pub use snapshot::WorkerSnapshot;
pub use status::Status;
pub use worker::{StartSource, Worker};
