use std::collections::HashMap;
use std::sync::Arc;

use crate::worker::Worker;

/// The live set of managed programs, keyed by name.
pub type ProgramTable = HashMap<String, Arc<Worker>>;
