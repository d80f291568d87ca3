//! Request commands accepted on the serial channel

/// Errors that can occur while receiving or answering a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Blank line
    Empty,
    /// Line is not one of the known commands
    UnknownCommand,
    /// Line exceeded [`crate::MAX_LINE_LEN`]
    LineTooLong,
    /// Line contained non-ASCII bytes
    InvalidText,
    /// Response line did not fit its buffer
    ResponseTooLong,
}

impl ProtocolError {
    /// Human-readable description, used in `NOK` replies
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::Empty => "empty command",
            ProtocolError::UnknownCommand => "unknown command",
            ProtocolError::LineTooLong => "line too long",
            ProtocolError::InvalidText => "invalid characters",
            ProtocolError::ResponseTooLong => "response too long",
        }
    }
}

// Command prefixes
const GET_INFO: &str = "GET info";
const GET_SETTINGS: &str = "GET settings";
const PUT_SETTINGS: &str = "PUT settings ";

/// A parsed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Report firmware identity and the state of every subsystem
    GetInfo,
    /// Report all persisted settings as `key=value,...`
    GetSettings,
    /// Apply a (possibly partial) `key=value,...` settings list
    PutSettings(&'a str),
}

impl<'a> Command<'a> {
    /// Parse a received line into a command
    ///
    /// Leading and trailing whitespace is ignored. Anything after the
    /// `GET` keywords is tolerated, matching the prefix semantics that
    /// existing tooling relies on.
    pub fn parse(line: &'a str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }

        if let Some(pairs) = line.strip_prefix(PUT_SETTINGS) {
            return Ok(Command::PutSettings(pairs.trim()));
        }
        if line.starts_with(GET_SETTINGS) {
            return Ok(Command::GetSettings);
        }
        if line.starts_with(GET_INFO) {
            return Ok(Command::GetInfo);
        }

        Err(ProtocolError::UnknownCommand)
    }

    /// Name used in the status line of the reply
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetInfo => GET_INFO,
            Command::GetSettings => GET_SETTINGS,
            Command::PutSettings(_) => "PUT settings",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_get_commands() {
        assert_eq!(Command::parse("GET info"), Ok(Command::GetInfo));
        assert_eq!(Command::parse("  GET settings \r"), Ok(Command::GetSettings));
    }

    #[test]
    fn test_put_settings_payload() {
        let cmd = Command::parse("PUT settings temperature=98.00,commissioningDone=1").unwrap();
        assert_eq!(
            cmd,
            Command::PutSettings("temperature=98.00,commissioningDone=1")
        );
        assert_eq!(cmd.name(), "PUT settings");
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        assert_eq!(Command::parse(""), Err(ProtocolError::Empty));
        assert_eq!(Command::parse("SET settings a=1"), Err(ProtocolError::UnknownCommand));
        // Missing separator after the keyword
        assert_eq!(Command::parse("PUT settings"), Err(ProtocolError::UnknownCommand));
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(line in "\\PC{0,64}") {
            let _ = Command::parse(&line);
        }

        #[test]
        fn prop_put_payload_is_preserved(payload in "[a-zA-Z]{1,12}=[0-9]{1,3}(,[a-zA-Z]{1,12}=[0-9]{1,3}){0,4}") {
            let line = format!("PUT settings {}", payload);
            prop_assert_eq!(Command::parse(&line), Ok(Command::PutSettings(payload.as_str())));
        }
    }
}
