//! Command dispatch
//!
//! Turns a tokenized command line into a table operation and maps the
//! result to a protocol outcome.
//!
//! | Verb      | Args       | Success        | Failure              |
//! |-----------|------------|----------------|----------------------|
//! | SET / PUT | key, value | `Ok`           | engine error         |
//! | GET       | key        | value bytes    | `GET Not found`      |
//! | DEL       | key        | `Ok`           | `DEL Not found`      |
//! | other     |            |                | invalid command      |

pub mod dispatcher;

pub use dispatcher::{process_command, CommandError, Outcome, Verb};
