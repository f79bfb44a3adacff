mod dispatcher;
mod reply;
mod verb;

pub use dispatcher::Dispatcher;
pub use reply::{Reply, ReplyStatus};
pub use verb::{parse, ParseError, Verb};
