//! Open-addressing hash table engine
//!
//! # Layout
//!
//! ```text
//! slots: [ Empty | Occupied(k1) | Tombstone | Occupied(k2) | Empty | ... ]
//!          ^ capacity is a power of two, slot = hash & (capacity - 1)
//!
//! Occupied payload: [ key bytes (key_len) | value bytes (val_len) ]
//! ```
//!
//! Collisions are resolved by linear probing with wraparound. Deleted
//! entries leave a tombstone so later probe runs stay intact; lookups
//! skip tombstones and stop only at an `Empty` slot or after visiting
//! every slot. Tombstones keep counting toward `len` until the next
//! resize, which rehashes live entries only.
//!
//! The table assumes exclusive access for every call (`&mut self` for
//! mutation). Callers sharing it across tasks wrap it in a mutex.

use super::hash::{murmur3, HashFn};
use super::pool::{Chunk, Pool};
use super::value_type::ValueType;
use crate::config::{validate_resize_policy, TableConfig};
use crate::error::{Error, Result};
use std::cell::Cell;
use std::fmt;
use tracing::{debug, info, warn};

/// Owned key+value bytes of one entry
#[derive(Debug)]
enum Payload {
    Owned(Box<[u8]>),
    Pooled(Chunk),
}

/// A live key/value record
#[derive(Debug)]
pub struct Record {
    key_len: i32,
    val_len: i32,
    payload: Payload,
}

impl Record {
    fn key_len(&self) -> usize {
        self.key_len as usize
    }

    fn total_len(&self) -> usize {
        self.key_len as usize + self.val_len as usize
    }
}

/// One slot of the table
#[derive(Debug, Default)]
pub enum Entry {
    /// Never written since the last resize
    #[default]
    Empty,
    /// Previously occupied, now deleted
    Tombstone,
    Occupied(Record),
}

/// Where payload buffers come from
#[derive(Debug)]
enum Backing {
    System,
    Pooled { pool: Pool, config: PoolSettings },
}

#[derive(Debug, Clone, Copy)]
struct PoolSettings {
    arena_size: usize,
    max_bytes: Option<usize>,
}

enum Probe {
    /// Slot holding the key
    Found(usize),
    /// First reusable slot of the probe run
    Vacant(usize),
}

/// Counters reported by [`HashMap::stats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub hits: u64,
    pub misses: u64,
    pub resizes: u64,
}

/// In-memory key/value hash table
pub struct HashMap {
    slots: Vec<Entry>,
    /// Occupied plus tombstoned slots
    len: usize,
    /// Occupied slots only
    live: usize,
    /// Bytes of live key+value payloads
    size: usize,
    seed: u32,
    val_type: ValueType,
    hash_fn: HashFn,
    backing: Backing,
    load_factor: f64,
    resize_policy: usize,
    max_table_bytes: usize,
    hits: Cell<u64>,
    misses: Cell<u64>,
    resizes: u64,
    destroyed: bool,
}

impl fmt::Debug for HashMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashMap")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("live", &self.live)
            .field("size", &self.size)
            .field("val_type", &self.val_type)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

impl HashMap {
    /// Create a table with default tuning and the system allocator
    pub fn init(capacity: usize, hash_fn: HashFn, val_type: ValueType) -> Result<Self> {
        let config = TableConfig {
            initial_capacity: capacity,
            value_type: val_type,
            ..TableConfig::default()
        };
        Self::with_config(&config, hash_fn)
    }

    /// Create a table from configuration
    pub fn with_config(config: &TableConfig, hash_fn: HashFn) -> Result<Self> {
        config.validate()?;

        let capacity = config.initial_capacity;
        Self::check_max_size(capacity, config.max_table_bytes)?;
        let slots = Self::alloc_slots(capacity)?;

        let backing = if config.pool.enabled {
            let settings = PoolSettings {
                arena_size: config.pool.arena_size,
                max_bytes: config.pool.max_bytes,
            };
            Backing::Pooled {
                pool: Pool::new(settings.arena_size, settings.max_bytes),
                config: settings,
            }
        } else {
            Backing::System
        };

        info!(
            capacity,
            val_type = %config.value_type,
            pooled = config.pool.enabled,
            "Initialized hash map"
        );

        Ok(Self {
            slots,
            len: 0,
            live: 0,
            size: 0,
            seed: config.seed,
            val_type: config.value_type,
            hash_fn,
            backing,
            load_factor: config.load_factor,
            resize_policy: config.resize_policy,
            max_table_bytes: config.max_table_bytes,
            hits: Cell::new(0),
            misses: Cell::new(0),
            resizes: 0,
            destroyed: false,
        })
    }

    /// Create a table from configuration with the default hash
    pub fn from_config(config: &TableConfig) -> Result<Self> {
        Self::with_config(config, murmur3)
    }

    fn alloc_slots(capacity: usize) -> Result<Vec<Entry>> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| Error::SlotArrayAlloc(capacity * std::mem::size_of::<Entry>()))?;
        slots.resize_with(capacity, Entry::default);
        Ok(slots)
    }

    fn check_max_size(capacity: usize, limit: usize) -> Result<()> {
        let requested = capacity
            .checked_mul(std::mem::size_of::<Entry>())
            .unwrap_or(usize::MAX);
        if requested > limit {
            return Err(Error::MaxSizeExceeded { requested, limit });
        }
        Ok(())
    }

    fn checked_len(n: usize) -> Result<i32> {
        i32::try_from(n).map_err(|_| Error::InvalidLength(n as i64))
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied plus tombstoned slots (drives resizing)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of retrievable entries
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn tombstones(&self) -> usize {
        self.len - self.live
    }

    /// Bytes of live key+value payloads
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn value_type(&self) -> ValueType {
        self.val_type
    }

    pub fn load_factor(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.len as f64 / self.capacity() as f64
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.backing, Backing::Pooled { .. })
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            resizes: self.resizes,
        }
    }

    /// Pool statistics, when payloads are pooled
    pub fn pool_stats(&self) -> Option<super::pool::PoolStats> {
        match &self.backing {
            Backing::Pooled { pool, .. } => Some(pool.stats()),
            Backing::System => None,
        }
    }

    fn payload_bytes<'a>(backing: &'a Backing, record: &'a Record) -> &'a [u8] {
        match (&record.payload, backing) {
            (Payload::Owned(buf), _) => &buf[..],
            (Payload::Pooled(chunk), Backing::Pooled { pool, .. }) => pool.bytes(chunk),
            (Payload::Pooled(_), Backing::System) => &[],
        }
    }

    fn key_of<'a>(backing: &'a Backing, record: &'a Record) -> &'a [u8] {
        &Self::payload_bytes(backing, record)[..record.key_len()]
    }

    fn value_of<'a>(backing: &'a Backing, record: &'a Record) -> &'a [u8] {
        &Self::payload_bytes(backing, record)[record.key_len()..]
    }

    fn start_slot(&self, key: &[u8]) -> usize {
        (self.hash_fn)(key, self.seed) as usize & (self.capacity() - 1)
    }

    /// Probe for `key`, skipping tombstones, stopping at `Empty`
    fn find(&self, key: &[u8]) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }

        let mask = self.capacity() - 1;
        let start = self.start_slot(key);
        for i in 0..self.capacity() {
            let slot = (start + i) & mask;
            match &self.slots[slot] {
                Entry::Empty => return None,
                Entry::Tombstone => continue,
                Entry::Occupied(record) => {
                    if record.key_len() == key.len() && Self::key_of(&self.backing, record) == key
                    {
                        return Some(slot);
                    }
                }
            }
        }
        None
    }

    /// Probe for the update or insertion point of `key`
    ///
    /// The first tombstone of the run is remembered as the insertion point,
    /// but the scan continues to the first `Empty` slot in case the key
    /// lives further along.
    fn probe(&self, key: &[u8]) -> Result<Probe> {
        let capacity = self.capacity();
        let mask = capacity - 1;
        let start = self.start_slot(key);
        let mut reusable = None;

        for i in 0..capacity {
            let slot = (start + i) & mask;
            match &self.slots[slot] {
                Entry::Empty => return Ok(Probe::Vacant(reusable.unwrap_or(slot))),
                Entry::Tombstone => {
                    reusable.get_or_insert(slot);
                }
                Entry::Occupied(record) => {
                    if record.key_len() == key.len() && Self::key_of(&self.backing, record) == key
                    {
                        return Ok(Probe::Found(slot));
                    }
                }
            }
        }

        reusable
            .map(Probe::Vacant)
            .ok_or(Error::TableFull { capacity })
    }

    fn alloc_payload(&mut self, key: &[u8], value: &[u8]) -> Result<Payload> {
        let n = key.len() + value.len();
        match &mut self.backing {
            Backing::System => {
                let mut buf = Vec::new();
                buf.try_reserve_exact(n)
                    .map_err(|_| Error::Alloc { requested: n })?;
                buf.extend_from_slice(key);
                buf.extend_from_slice(value);
                Ok(Payload::Owned(buf.into_boxed_slice()))
            }
            Backing::Pooled { pool, .. } => {
                let chunk = pool.alloc(n)?;
                let bytes = pool.bytes_mut(&chunk);
                bytes[..key.len()].copy_from_slice(key);
                bytes[key.len()..].copy_from_slice(value);
                Ok(Payload::Pooled(chunk))
            }
        }
    }

    /// The single release point for payload buffers
    fn release(&mut self, payload: Payload) {
        match (payload, &mut self.backing) {
            (Payload::Owned(buf), _) => drop(buf),
            (Payload::Pooled(chunk), Backing::Pooled { pool, .. }) => pool.free(chunk),
            (Payload::Pooled(_), Backing::System) => {}
        }
    }

    /// Insert or overwrite `key`
    ///
    /// On allocation failure the table is left exactly as before. A resize
    /// triggered by the insert runs after the entry is stored; if it fails
    /// the entry stays and the (fatal) error is returned.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.destroyed {
            return Err(Error::Destroyed);
        }
        let key_len = Self::checked_len(key.len())?;
        let val_len = Self::checked_len(value.len())?;
        Self::checked_len(key.len() + value.len())?;

        let probe = self.probe(key)?;
        let payload = self.alloc_payload(key, value)?;
        let new_total = key.len() + value.len();

        match probe {
            Probe::Found(slot) => {
                let Entry::Occupied(record) = &mut self.slots[slot] else {
                    unreachable!("probe reported an occupied slot");
                };
                let old_total = record.total_len();
                record.val_len = val_len;
                let old = std::mem::replace(&mut record.payload, payload);
                self.release(old);
                self.size = self.size - old_total + new_total;
                debug!(slot, size = self.size, "Updated entry");
            }
            Probe::Vacant(slot) => {
                let reused = matches!(self.slots[slot], Entry::Tombstone);
                self.slots[slot] = Entry::Occupied(Record {
                    key_len,
                    val_len,
                    payload,
                });
                if !reused {
                    self.len += 1;
                }
                self.live += 1;
                self.size += new_total;
                debug!(slot, reused, len = self.len, "Inserted entry");

                if self.needs_resize() {
                    self.resize(self.resize_policy)?;
                }
            }
        }
        Ok(())
    }

    /// Whether the next insert would push the load factor past the threshold
    fn needs_resize(&self) -> bool {
        (self.len + 1) as f64 / self.capacity() as f64 > self.load_factor
    }

    /// Value bytes stored for `key`
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.find(key) {
            Some(slot) => {
                self.hits.set(self.hits.get() + 1);
                match &self.slots[slot] {
                    Entry::Occupied(record) => Some(Self::value_of(&self.backing, record)),
                    _ => None,
                }
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Free the entry for `key` and leave a tombstone
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        let slot = self.find(key).ok_or(Error::NotFound)?;
        let Entry::Occupied(record) = std::mem::replace(&mut self.slots[slot], Entry::Tombstone)
        else {
            unreachable!("find reported an occupied slot");
        };

        self.size -= record.total_len();
        self.live -= 1;
        self.release(record.payload);
        debug!(slot, size = self.size, "Deleted entry");
        Ok(())
    }

    /// Grow the slot array by `policy` and rehash every live entry
    ///
    /// Tombstones are dropped. With a pool, live payloads are copied into
    /// fresh arenas so the holes left by deletes and overwrites are
    /// reclaimed. Nothing is modified when an error is returned.
    pub fn resize(&mut self, policy: usize) -> Result<()> {
        if self.destroyed {
            return Err(Error::Destroyed);
        }
        validate_resize_policy(policy)?;
        let old_capacity = self.capacity();
        let new_capacity = old_capacity
            .checked_mul(policy)
            .ok_or(Error::MaxSizeExceeded {
                requested: usize::MAX,
                limit: self.max_table_bytes,
            })?;
        Self::check_max_size(new_capacity, self.max_table_bytes)?;
        let mut slots = Self::alloc_slots(new_capacity)?;

        // Plan every move first so a failure leaves the old array untouched.
        let mask = new_capacity - 1;
        let mut moves = Vec::with_capacity(self.live);
        for (from, entry) in self.slots.iter().enumerate() {
            let Entry::Occupied(record) = entry else {
                continue;
            };
            let key = Self::key_of(&self.backing, record);
            let start = (self.hash_fn)(key, self.seed) as usize & mask;
            let to = (0..new_capacity)
                .map(|i| (start + i) & mask)
                .find(|&slot| matches!(slots[slot], Entry::Empty))
                .ok_or(Error::TableFull {
                    capacity: new_capacity,
                })?;
            // Placeholder until the record moves in
            slots[to] = Entry::Tombstone;
            moves.push((from, to));
        }

        let (fresh_pool, mut fresh_chunks) = match self.compact_pool(&moves) {
            Some((pool, chunks)) => (Some(pool), Some(chunks.into_iter())),
            None => (None, None),
        };
        for &(from, to) in &moves {
            let mut entry = std::mem::take(&mut self.slots[from]);
            if let (Entry::Occupied(record), Some(chunks)) = (&mut entry, fresh_chunks.as_mut()) {
                if let Some(chunk) = chunks.next() {
                    record.payload = Payload::Pooled(chunk);
                }
            }
            slots[to] = entry;
        }
        if let (Some(pool), Backing::Pooled { pool: current, .. }) = (fresh_pool, &mut self.backing)
        {
            *current = pool;
            debug!(arenas = current.stats().arenas, "Compacted payload pool");
        }

        self.slots = slots;
        self.len = self.live;
        self.resizes += 1;

        info!(
            from = old_capacity,
            to = new_capacity,
            live = self.live,
            "Resized hash map"
        );
        Ok(())
    }

    /// Copy the payloads named by `moves` into a fresh pool
    fn compact_pool(&self, moves: &[(usize, usize)]) -> Option<(Pool, Vec<Chunk>)> {
        let Backing::Pooled { config, .. } = &self.backing else {
            return None;
        };

        let mut pool = Pool::new(config.arena_size, config.max_bytes);
        let mut chunks = Vec::with_capacity(moves.len());
        for &(from, _) in moves {
            let Entry::Occupied(record) = &self.slots[from] else {
                return None;
            };
            match pool.alloc_copy(Self::payload_bytes(&self.backing, record)) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => {
                    warn!(error = %e, "Pool compaction skipped");
                    return None;
                }
            }
        }
        Some((pool, chunks))
    }

    /// Iterate over live `(key, value)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.slots.iter().filter_map(move |entry| match entry {
            Entry::Occupied(record) => Some((
                Self::key_of(&self.backing, record),
                Self::value_of(&self.backing, record),
            )),
            _ => None,
        })
    }

    /// Release every payload, the slot array and the pool
    ///
    /// Calling it again is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        let released = self.live;
        for entry in std::mem::take(&mut self.slots) {
            if let Entry::Occupied(record) = entry {
                self.release(record.payload);
            }
        }
        if let Backing::Pooled { pool, .. } = &mut self.backing {
            pool.destroy();
        }

        self.len = 0;
        self.live = 0;
        self.size = 0;
        self.destroyed = true;
        info!(released, "Destroyed hash map");
    }
}

impl Drop for HashMap {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(capacity: usize) -> HashMap {
        HashMap::init(capacity, murmur3, ValueType::String).unwrap()
    }

    /// Every key lands in slot 0 so probe runs are fully predictable.
    fn collide(_key: &[u8], _seed: u32) -> u32 {
        0
    }

    #[test]
    fn test_init_rejects_non_power_of_two() {
        assert!(matches!(
            HashMap::init(3, murmur3, ValueType::String),
            Err(Error::InvalidCapacity(3))
        ));
        assert!(matches!(
            HashMap::init(0, murmur3, ValueType::String),
            Err(Error::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_set_get() -> Result<()> {
        let mut map = table(4);
        map.set(b"foo", b"100")?;
        assert_eq!(map.get(b"foo"), Some(&b"100"[..]));
        assert_eq!(map.get(b"bar"), None);
        assert_eq!(map.size(), 6);
        Ok(())
    }

    #[test]
    fn test_overwrite_adjusts_size() -> Result<()> {
        let mut map = table(16);
        map.set(b"k", b"short")?;
        map.set(b"k", b"a longer value")?;
        assert_eq!(map.get(b"k"), Some(&b"a longer value"[..]));
        assert_eq!(map.live(), 1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.size(), 1 + 14);
        Ok(())
    }

    #[test]
    fn test_resize_at_three_of_four() -> Result<()> {
        let mut map = table(4);
        map.set(b"a", b"1")?;
        map.set(b"b", b"2")?;
        assert_eq!(map.capacity(), 4);
        map.set(b"c", b"3")?;
        assert_eq!(map.capacity(), 8);
        assert_eq!(map.stats().resizes, 1);

        assert_eq!(map.get(b"a"), Some(&b"1"[..]));
        assert_eq!(map.get(b"b"), Some(&b"2"[..]));
        assert_eq!(map.get(b"c"), Some(&b"3"[..]));
        Ok(())
    }

    #[test]
    fn test_delete_leaves_tombstone() -> Result<()> {
        let mut map = table(8);
        map.set(b"x", b"1")?;
        map.delete(b"x")?;

        assert_eq!(map.get(b"x"), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.live(), 0);
        assert_eq!(map.tombstones(), 1);
        assert_eq!(map.size(), 0);

        map.set(b"x", b"2")?;
        assert_eq!(map.get(b"x"), Some(&b"2"[..]));
        assert_eq!(map.len(), 1);
        Ok(())
    }

    #[test]
    fn test_delete_missing() {
        let mut map = table(4);
        assert!(matches!(map.delete(b"nope"), Err(Error::NotFound)));
    }

    #[test]
    fn test_lookup_skips_tombstones() -> Result<()> {
        let mut map = HashMap::init(16, collide, ValueType::String)?;
        map.set(b"a", b"1")?;
        map.set(b"b", b"2")?;
        map.set(b"c", b"3")?;
        map.delete(b"a")?;

        // "b" and "c" sit past the tombstone in the same run
        assert_eq!(map.get(b"b"), Some(&b"2"[..]));
        assert_eq!(map.get(b"c"), Some(&b"3"[..]));
        Ok(())
    }

    #[test]
    fn test_set_after_tombstone_updates_existing_key() -> Result<()> {
        let mut map = HashMap::init(16, collide, ValueType::String)?;
        map.set(b"a", b"1")?;
        map.set(b"b", b"2")?;
        map.delete(b"a")?;

        // "b" must be updated in place, not duplicated into the tombstone
        map.set(b"b", b"3")?;
        assert_eq!(map.live(), 1);
        map.delete(b"b")?;
        assert_eq!(map.get(b"b"), None);
        Ok(())
    }

    #[test]
    fn test_resize_drops_tombstones() -> Result<()> {
        let mut map = HashMap::init(8, collide, ValueType::String)?;
        map.set(b"a", b"1")?;
        map.set(b"b", b"2")?;
        map.delete(b"a")?;
        assert_eq!(map.tombstones(), 1);
        assert_eq!(map.len(), 2);

        map.resize(2)?;
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.tombstones(), 0);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(b"b"), Some(&b"2"[..]));
        Ok(())
    }

    #[test]
    fn test_probe_terminates_on_full_table() -> Result<()> {
        let mut map = table(4);
        // Fill every slot directly; the public API would have resized.
        for (i, slot) in map.slots.iter_mut().enumerate() {
            *slot = Entry::Occupied(Record {
                key_len: 1,
                val_len: 1,
                payload: Payload::Owned(Box::new([b'a' + i as u8, b'v'])),
            });
        }
        map.len = 4;
        map.live = 4;

        assert_eq!(map.get(b"missing"), None);
        assert_eq!(map.get(b"c"), Some(&b"v"[..]));
        assert!(matches!(
            map.set(b"missing", b"v"),
            Err(Error::TableFull { capacity: 4 })
        ));
        Ok(())
    }

    #[test]
    fn test_resize_ceiling_is_fatal() -> Result<()> {
        let config = TableConfig {
            initial_capacity: 4,
            max_table_bytes: 4 * std::mem::size_of::<Entry>(),
            ..TableConfig::default()
        };
        let mut map = HashMap::with_config(&config, murmur3)?;
        map.set(b"a", b"1")?;
        map.set(b"b", b"2")?;
        let err = map.set(b"c", b"3").unwrap_err();
        assert!(matches!(err, Error::MaxSizeExceeded { .. }));
        assert!(err.is_fatal());

        // The insert itself completed and the old array is intact
        assert_eq!(map.capacity(), 4);
        assert_eq!(map.get(b"c"), Some(&b"3"[..]));
        Ok(())
    }

    #[test]
    fn test_pooled_payloads() -> Result<()> {
        let mut config = TableConfig::default();
        config.pool.enabled = true;
        config.pool.arena_size = 32;
        let mut map = HashMap::from_config(&config)?;

        for i in 0..50 {
            let key = format!("key:{}", i);
            map.set(key.as_bytes(), format!("value {}", i).as_bytes())?;
        }
        map.set(b"key:7", b"overwritten")?;
        map.delete(b"key:8")?;

        assert!(map.is_pooled());
        assert_eq!(map.get(b"key:7"), Some(&b"overwritten"[..]));
        assert_eq!(map.get(b"key:8"), None);
        assert_eq!(map.get(b"key:49"), Some(&b"value 49"[..]));
        Ok(())
    }

    #[test]
    fn test_pool_exhaustion_leaves_table_unchanged() -> Result<()> {
        let mut config = TableConfig::default();
        config.initial_capacity = 16;
        config.pool.enabled = true;
        config.pool.arena_size = 8;
        config.pool.max_bytes = Some(8);
        let mut map = HashMap::from_config(&config)?;

        map.set(b"k", b"v1")?;
        let err = map.set(b"k", b"a value that does not fit").unwrap_err();
        assert!(matches!(err, Error::Alloc { .. }));
        assert!(!err.is_fatal());
        assert_eq!(map.get(b"k"), Some(&b"v1"[..]));
        assert_eq!(map.live(), 1);
        assert_eq!(map.size(), 3);
        Ok(())
    }

    #[test]
    fn test_resize_compacts_pool() -> Result<()> {
        let mut config = TableConfig::default();
        config.initial_capacity = 8;
        config.pool.enabled = true;
        config.pool.arena_size = 64;
        let mut map = HashMap::from_config(&config)?;

        map.set(b"a", b"1111")?;
        map.set(b"a", b"2222")?;
        map.set(b"a", b"3333")?;
        assert_eq!(map.pool_stats().map(|s| s.holes), Some(10));

        map.resize(2)?;
        let stats = map.pool_stats().unwrap_or_default();
        assert_eq!(stats.holes, 0);
        assert_eq!(stats.used, 5);
        assert_eq!(map.get(b"a"), Some(&b"3333"[..]));
        Ok(())
    }

    #[test]
    fn test_destroy_is_idempotent() -> Result<()> {
        let mut map = table(4);
        map.set(b"a", b"1")?;
        map.destroy();
        map.destroy();
        assert!(map.is_destroyed());
        assert_eq!(map.get(b"a"), None);
        assert!(matches!(map.delete(b"a"), Err(Error::NotFound)));
        assert!(map.set(b"a", b"1").is_err());
        Ok(())
    }

    #[test]
    fn test_stats_track_hits_and_misses() -> Result<()> {
        let mut map = table(4);
        map.set(b"a", b"1")?;
        map.get(b"a");
        map.get(b"b");
        map.get(b"c");
        let stats = map.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        Ok(())
    }

    #[test]
    fn test_iter_yields_live_entries() -> Result<()> {
        let mut map = table(8);
        map.set(b"a", b"1")?;
        map.set(b"b", b"2")?;
        map.delete(b"a")?;
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![(&b"b"[..], &b"2"[..])]);
        Ok(())
    }
}
