//! Network transport
//!
//! A line-oriented TCP protocol in front of one shared hash table.
//!
//! ## Protocol Flow
//!
//! 1. **Connect**: any number of clients, bounded by `server.max_connections`
//! 2. **Command Loop**: one `VERB key [value]` line in, one reply line out
//! 3. **Shutdown**: Ctrl-C or a fatal engine error stops the accept loop;
//!    the binary then destroys the table
//!
//! ## Replies
//!
//! | Reply              | Meaning                              |
//! |--------------------|--------------------------------------|
//! | `Ok`               | SET / PUT / DEL succeeded            |
//! | `<value>`          | GET hit                              |
//! | `<VERB> Not found` | GET / DEL on a missing key           |
//! | anything else      | error text, table unchanged          |

pub mod client;
pub mod connection;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use connection::{ConnectionHandler, SharedTable};
pub use protocol::{read_frame, tokenize, write_reply, Frame, MAX_FIELDS};
pub use server::{shutdown_on_ctrl_c, ProtocolServer, ShutdownHandle, ShutdownReason};
