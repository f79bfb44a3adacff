/// The command verb sent by a client, tokenized off the wire by a
/// transport (socket or HTTP) before reaching the [`super::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Alive,
    Start(String),
    Stop(String),
    Restart(String),
    Status,
    Detail(String),
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownVerb(String),
    #[error("command `{0}` requires a program name argument")]
    MissingArgument(String),
}

/// Splits a raw request line into a [`Verb`], mirroring the original
/// implementation's `parse_request` (whitespace-separated `cmd arg...`).
pub fn parse(line: &str) -> Result<Verb, ParseError> {
    let mut tokens = line.split_whitespace();
    let cmd = tokens.next().ok_or(ParseError::Empty)?;
    let first_arg = tokens.next().map(str::to_string);

    match cmd {
        "alive" => Ok(Verb::Alive),
        "start" => first_arg
            .map(Verb::Start)
            .ok_or_else(|| ParseError::MissingArgument(cmd.to_string())),
        "stop" => first_arg
            .map(Verb::Stop)
            .ok_or_else(|| ParseError::MissingArgument(cmd.to_string())),
        "restart" => first_arg
            .map(Verb::Restart)
            .ok_or_else(|| ParseError::MissingArgument(cmd.to_string())),
        "status" => Ok(Verb::Status),
        "detail" => first_arg
            .map(Verb::Detail)
            .ok_or_else(|| ParseError::MissingArgument(cmd.to_string())),
        "reload" => Ok(Verb::Reload),
        other => Err(ParseError::UnknownVerb(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_verbs() {
        assert_eq!(Verb::Alive, parse("alive").unwrap());
        assert_eq!(Verb::Start("web".to_string()), parse("start web").unwrap());
        assert_eq!(Verb::Detail("web".to_string()), parse("detail  web").unwrap());
        assert_eq!(Verb::Status, parse("status").unwrap());
    }

    #[test]
    fn missing_argument_is_an_error() {
        assert_eq!(
            ParseError::MissingArgument("start".to_string()),
            parse("start").unwrap_err()
        );
    }

    #[test]
    fn unknown_verb_is_an_error() {
        assert_eq!(
            ParseError::UnknownVerb("frobnicate".to_string()),
            parse("frobnicate web").unwrap_err()
        );
    }

    #[test]
    fn shutdown_is_not_a_recognised_verb() {
        // The verb table is closed to exactly the seven commands
        // SPEC_FULL.md §4.4 lists; shutdown is an internal reaction to
        // SIGTERM/SIGINT, never a remote command.
        assert_eq!(
            ParseError::UnknownVerb("shutdown".to_string()),
            parse("shutdown").unwrap_err()
        );
    }

    #[test]
    fn empty_line_is_an_error() {
        assert_eq!(ParseError::Empty, parse("").unwrap_err());
    }
}
