// SiKV - Rust Implementation
// An in-memory key/value server backed by an open-addressing hash table

#![warn(rust_2018_idioms)]

pub mod command;
pub mod config;
pub mod logging;
pub mod network;
pub mod storage;

// Re-exports for convenience
pub use command::{process_command, Outcome, Verb};
pub use config::Config;
pub use storage::{HashMap, ValueType};

/// SiKV error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid capacity {0}: must be a non-zero power of two")]
        InvalidCapacity(usize),

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Maximum memory exceeded: {requested} bytes requested, limit is {limit}")]
        MaxSizeExceeded { requested: usize, limit: usize },

        #[error("Hash table full: probed all {capacity} slots without a free one")]
        TableFull { capacity: usize },

        #[error("Unable to allocate slot array of {0} bytes")]
        SlotArrayAlloc(usize),

        #[error("Hash map has been destroyed")]
        Destroyed,

        #[error("Not found")]
        NotFound,

        #[error("Unable to allocate {requested} bytes for entry")]
        Alloc { requested: usize },

        #[error("Invalid length: {0}")]
        InvalidLength(i64),
    }

    impl Error {
        /// Errors after which the table cannot keep serving.
        pub fn is_fatal(&self) -> bool {
            matches!(
                self,
                Error::InvalidCapacity(_)
                    | Error::InvalidConfig(_)
                    | Error::MaxSizeExceeded { .. }
                    | Error::TableFull { .. }
                    | Error::SlotArrayAlloc(_)
                    | Error::Destroyed
            )
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
