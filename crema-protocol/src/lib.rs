//! Serial Command Protocol
//!
//! This crate defines the newline-delimited text protocol spoken on the
//! controller's USB serial port. It is intended for service tooling and
//! the companion app, not for the end user.
//!
//! # Protocol Overview
//!
//! Each request is one line of ASCII text terminated by `\n` (a
//! preceding `\r` is ignored):
//! ```text
//! GET info
//! GET settings
//! PUT settings temperature=98.00,commissioningDone=1
//! ```
//!
//! Responses are zero or more `key=value` lines followed by a status
//! line (`GET info OK`, `PUT settings NOK, unknown key: ...`).
//!
//! The controller never blocks on the port: bytes are fed to a
//! [`LineParser`] as they arrive and a command is handled once a full
//! line has been assembled.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod line;
pub mod response;

pub use command::{Command, ProtocolError};
pub use line::{Line, LineParser, MAX_LINE_LEN};
pub use response::{Response, ResponseLine, SaveOutcome};
