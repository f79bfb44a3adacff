use std::fs::{File, OpenOptions};
use std::process::Stdio;

use crate::config::StreamTarget;

use super::error::WorkerError;

/// Resolves a configured stdout/stderr target into something that can be
/// handed to [`std::process::Command::stdout`]/`stderr`.
///
/// Rotation (`maxbytes`/`backups`) is recorded in configuration but not
/// enforced here: files are opened in append mode and left to external log
/// rotation, matching the scope decided in SPEC_FULL.md §9.
pub fn open_stream(target: Option<&StreamTarget>) -> Result<Stdio, WorkerError> {
    match target {
        None => Ok(Stdio::null()),
        Some(target) => {
            let path = target.path();
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| WorkerError::LogFile {
                    path: path.display().to_string(),
                    source,
                })?;
            Ok(Stdio::from(file))
        }
    }
}

/// Same resolution, but returns the underlying [`File`] for callers that
/// need to keep it open themselves rather than hand it straight to a child.
pub fn open_log_file(target: &StreamTarget) -> Result<File, WorkerError> {
    let path = target.path();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| WorkerError::LogFile {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn none_target_is_discarded() {
        assert!(open_stream(None).is_ok());
    }

    #[test]
    fn path_target_opens_append_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let target = StreamTarget::Path(PathBuf::from(&path));
        assert!(open_stream(Some(&target)).is_ok());
        assert!(path.exists());
    }
}
