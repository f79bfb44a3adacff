use nix::unistd::{Gid, Group, Uid, User};

use super::error::WorkerError;

/// Resolves a configured `user`/`group` name into the uid/gid pair that
/// should be applied to a spawned child, mirroring the original
/// implementation's use of `pwd.getpwnam`/`grp.getgrnam`.
pub fn resolve_user(name: &str) -> Result<Uid, WorkerError> {
    User::from_name(name)
        .map_err(|_| WorkerError::UnknownUser(name.to_string()))?
        .map(|user| user.uid)
        .ok_or_else(|| WorkerError::UnknownUser(name.to_string()))
}

pub fn resolve_group(name: &str) -> Result<Gid, WorkerError> {
    Group::from_name(name)
        .map_err(|_| WorkerError::UnknownGroup(name.to_string()))?
        .map(|group| group.gid)
        .ok_or_else(|| WorkerError::UnknownGroup(name.to_string()))
}

/// Parses an octal umask string such as `"022"` into a mode value.
pub fn parse_umask(raw: &str) -> Result<u32, WorkerError> {
    u32::from_str_radix(raw, 8).map_err(|_| WorkerError::InvalidUmask(raw.to_string()))
}
