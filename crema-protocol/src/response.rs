//! Reply lines sent back on the serial channel

use core::fmt::{self, Write};

use heapless::String;

use crate::command::ProtocolError;
use crate::line::MAX_LINE_LEN;

/// A rendered reply line (without terminator)
pub type ResponseLine = String<MAX_LINE_LEN>;

/// Result of persisting settings after a `PUT settings`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SaveOutcome {
    /// Stored record differed and was rewritten
    Saved,
    /// Stored record already matched
    Unchanged,
}

/// One reply line
#[derive(Debug, Clone, Copy)]
pub enum Response<'a> {
    /// `key=value` line
    Field {
        key: &'a str,
        value: fmt::Arguments<'a>,
    },
    /// Pre-formatted payload line, sent as-is
    Raw(&'a str),
    /// `<command> OK`
    Done(&'static str),
    /// `PUT settings OK, ...`
    Saved(SaveOutcome),
    /// `<command> NOK, <reason>`
    Rejected {
        command: &'static str,
        reason: &'a str,
    },
}

impl fmt::Display for Response<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Field { key, value } => write!(f, "{}={}", key, value),
            Response::Raw(text) => f.write_str(text),
            Response::Done(command) => write!(f, "{} OK", command),
            Response::Saved(SaveOutcome::Saved) => f.write_str("PUT settings OK, settings saved."),
            Response::Saved(SaveOutcome::Unchanged) => f.write_str("PUT settings OK, no changes."),
            Response::Rejected { command, reason } => write!(f, "{} NOK, {}", command, reason),
        }
    }
}

impl Response<'_> {
    /// Render this reply into a fixed-capacity line
    pub fn render(&self) -> Result<ResponseLine, ProtocolError> {
        let mut line = ResponseLine::new();
        write!(line, "{}", self).map_err(|_| ProtocolError::ResponseTooLong)?;
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_line() {
        let line = Response::Field {
            key: "boilerState",
            value: format_args!("{}", "READY"),
        }
        .render()
        .unwrap();
        assert_eq!(line.as_str(), "boilerState=READY");
    }

    #[test]
    fn test_float_field_line() {
        let line = Response::Field {
            key: "temperature",
            value: format_args!("{:.2}", 93.456f32),
        }
        .render()
        .unwrap();
        assert_eq!(line.as_str(), "temperature=93.46");
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Response::Done("GET info").render().unwrap().as_str(), "GET info OK");
        assert_eq!(
            Response::Saved(SaveOutcome::Unchanged).render().unwrap().as_str(),
            "PUT settings OK, no changes."
        );
        assert_eq!(
            Response::Rejected {
                command: "PUT settings",
                reason: "unknown key: settings not saved",
            }
            .render()
            .unwrap()
            .as_str(),
            "PUT settings NOK, unknown key: settings not saved"
        );
    }

    #[test]
    fn test_overlong_response() {
        let long = [b'a'; MAX_LINE_LEN + 1];
        let text = core::str::from_utf8(&long).unwrap();
        assert_eq!(Response::Raw(text).render(), Err(ProtocolError::ResponseTooLong));
    }
}
