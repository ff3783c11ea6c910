//! Verb resolution and engine calls

use crate::error::Error;
use crate::storage::{HashMap, ParseValueError};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Protocol verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Set,
    Get,
    Put,
    Del,
}

impl Verb {
    /// Resolve a verb token. Verbs are upper-case on the wire.
    pub fn parse(token: &[u8]) -> Option<Self> {
        match token {
            b"SET" => Some(Verb::Set),
            b"GET" => Some(Verb::Get),
            b"PUT" => Some(Verb::Put),
            b"DEL" => Some(Verb::Del),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Set => "SET",
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Del => "DEL",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-command failures
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("{verb} missing argument: {name}")]
    MissingArgument { verb: Verb, name: &'static str },

    #[error("{verb} {source}")]
    InvalidValue {
        verb: Verb,
        #[source]
        source: ParseValueError,
    },

    #[error("{verb} error: {source}")]
    Storage {
        verb: Verb,
        #[source]
        source: Error,
    },
}

impl CommandError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommandError::Storage { source, .. } if source.is_fatal())
    }
}

/// Result of one command, as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// SET/PUT/DEL succeeded
    Success,
    /// GET/DEL found no such key
    NotFound(Verb),
    /// GET hit, rendered as text
    Value(Vec<u8>),
    /// Recoverable error; the table is unchanged
    Error(String),
    /// The table can no longer serve; the process must shut down
    Fatal(String),
}

impl Outcome {
    /// Wire reply, newline terminated
    pub fn to_reply(&self) -> Vec<u8> {
        let mut reply = match self {
            Outcome::Success => b"Ok".to_vec(),
            Outcome::NotFound(verb) => format!("{} Not found", verb).into_bytes(),
            Outcome::Value(bytes) => bytes.clone(),
            Outcome::Error(text) | Outcome::Fatal(text) => text.clone().into_bytes(),
        };
        reply.push(b'\n');
        reply
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal(_))
    }
}

impl From<CommandError> for Outcome {
    fn from(e: CommandError) -> Self {
        if e.is_fatal() {
            error!(error = %e, "Fatal engine error");
            Outcome::Fatal(e.to_string())
        } else {
            warn!(error = %e, "Command failed");
            Outcome::Error(e.to_string())
        }
    }
}

/// Run one tokenized command (`argv[0]` is the verb) against `table`
pub fn process_command(table: &mut HashMap, argv: &[&[u8]]) -> Outcome {
    match dispatch(table, argv) {
        Ok(outcome) => outcome,
        Err(e) => e.into(),
    }
}

fn dispatch(table: &mut HashMap, argv: &[&[u8]]) -> Result<Outcome, CommandError> {
    let token = argv.first().copied().unwrap_or_default();
    let verb = Verb::parse(token)
        .ok_or_else(|| CommandError::InvalidCommand(String::from_utf8_lossy(token).into_owned()))?;
    let arg = |index: usize, name: &'static str| {
        argv.get(index)
            .copied()
            .ok_or(CommandError::MissingArgument { verb, name })
    };

    debug!(%verb, argc = argv.len(), "Dispatching command");

    match verb {
        Verb::Set | Verb::Put => {
            let key = arg(1, "key")?;
            let raw = arg(2, "value")?;
            let value = table
                .value_type()
                .encode(raw)
                .map_err(|source| CommandError::InvalidValue { verb, source })?;
            table
                .set(key, &value)
                .map_err(|source| CommandError::Storage { verb, source })?;
            Ok(Outcome::Success)
        }
        Verb::Get => {
            let key = arg(1, "key")?;
            Ok(match table.get(key) {
                Some(stored) => Outcome::Value(table.value_type().decode(stored)),
                None => Outcome::NotFound(verb),
            })
        }
        Verb::Del => {
            let key = arg(1, "key")?;
            match table.delete(key) {
                Ok(()) => Ok(Outcome::Success),
                Err(Error::NotFound) => Ok(Outcome::NotFound(verb)),
                Err(source) => Err(CommandError::Storage { verb, source }),
            }
        }
    }
}
