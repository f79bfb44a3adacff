mod error;
mod supervisor;
mod table;

pub use error::SupervisorError;
pub use supervisor::Supervisor;
pub use table::ProgramTable;
