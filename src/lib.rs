pub mod cli;
pub mod config;
pub mod context;
pub mod daemon;
pub mod dispatcher;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod supervisor;
pub mod transport;
pub mod worker;
