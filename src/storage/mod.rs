//! Storage layer
//!
//! # Architecture
//!
//! ```text
//! HashMap (open addressing, linear probing)
//!   ├─→ slots: [Empty | Tombstone | Occupied(key_len, val_len, payload)]
//!   ├─→ HashFn (MurmurHash3 by default, seeded)
//!   ├─→ ValueType (declared once per table, sizes every value)
//!   └─→ Payload backing
//!        ├─→ system allocator (one boxed buffer per entry)
//!        └─→ Pool (bump-allocated arenas, compacted on resize)
//! ```

pub mod hash;
pub mod pool;
pub mod table;
pub mod value_type;

pub use hash::{murmur3, HashFn};
pub use pool::{Chunk, Pool, PoolStats};
pub use table::{Entry, HashMap, TableStats};
pub use value_type::{ParseValueError, ValueType};
