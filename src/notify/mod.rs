mod sink;

pub use sink::{Action, NoopSink, NotificationSink, TracingSink};
