//! Bump allocation pool for entry payloads
//!
//! ```text
//! Pool
//!   ├─→ Arena 0 [##########......]  used / reserved
//!   ├─→ Arena 1 [################]
//!   └─→ Arena 2 [####............]  ← current
//! ```
//!
//! Requests are carved from the current arena; when it cannot satisfy a
//! request a new arena of `max(n, arena_size)` bytes is appended. Freed
//! chunks are never reused: the bytes become holes until the whole pool
//! is destroyed. Table resizes compact live entries anyway, so a free
//! list would buy nothing for this access pattern.

use crate::error::{Error, Result};
use tracing::debug;

/// Default arena size (64 KiB)
pub const DEFAULT_ARENA_SIZE: usize = 64 * 1024;

/// Handle to a region carved from a pool arena.
///
/// Not `Clone`: a chunk is released by moving it into [`Pool::free`].
#[derive(Debug, PartialEq, Eq)]
pub struct Chunk {
    arena: usize,
    offset: usize,
    len: usize,
}

#[derive(Debug)]
struct Arena {
    buf: Vec<u8>,
    /// High-water mark
    used: usize,
}

impl Arena {
    fn new(size: usize) -> Option<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).ok()?;
        buf.resize(size, 0);
        Some(Self { buf, used: 0 })
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.used
    }

    fn carve(&mut self, n: usize) -> usize {
        let offset = self.used;
        self.used += n;
        offset
    }
}

/// Arena-backed bump allocator
#[derive(Debug)]
pub struct Pool {
    arenas: Vec<Arena>,
    arena_size: usize,
    /// Ceiling on total reserved arena bytes
    max_bytes: Option<usize>,
    holes: usize,
}

impl Pool {
    /// Create a pool whose arenas are `arena_size` bytes (at least one byte)
    pub fn new(arena_size: usize, max_bytes: Option<usize>) -> Self {
        Self {
            arenas: Vec::new(),
            arena_size: arena_size.max(1),
            max_bytes,
            holes: 0,
        }
    }

    /// Carve `n` bytes, appending a new arena when the current one is short
    pub fn alloc(&mut self, n: usize) -> Result<Chunk> {
        let fits = self.arenas.last().is_some_and(|a| a.remaining() >= n);
        if !fits {
            self.grow(n)?;
        }

        let arena = self.arenas.len() - 1;
        let offset = self.arenas[arena].carve(n);
        Ok(Chunk {
            arena,
            offset,
            len: n,
        })
    }

    /// Allocate and fill a chunk with `data`
    pub fn alloc_copy(&mut self, data: &[u8]) -> Result<Chunk> {
        let chunk = self.alloc(data.len())?;
        self.bytes_mut(&chunk).copy_from_slice(data);
        Ok(chunk)
    }

    fn grow(&mut self, n: usize) -> Result<()> {
        let size = n.max(self.arena_size);
        if let Some(max) = self.max_bytes {
            if self.reserved() + size > max {
                return Err(Error::Alloc { requested: n });
            }
        }

        let arena = Arena::new(size).ok_or(Error::Alloc { requested: n })?;
        self.arenas.push(arena);
        debug!(arenas = self.arenas.len(), size, "Appended pool arena");
        Ok(())
    }

    /// Release a chunk. The bytes stay reserved until the pool is destroyed.
    pub fn free(&mut self, chunk: Chunk) {
        self.holes += chunk.len;
    }

    pub fn bytes(&self, chunk: &Chunk) -> &[u8] {
        &self.arenas[chunk.arena].buf[chunk.offset..chunk.offset + chunk.len]
    }

    pub fn bytes_mut(&mut self, chunk: &Chunk) -> &mut [u8] {
        &mut self.arenas[chunk.arena].buf[chunk.offset..chunk.offset + chunk.len]
    }

    /// Drop every arena
    pub fn destroy(&mut self) {
        debug!(arenas = self.arenas.len(), "Destroying pool");
        self.arenas.clear();
        self.holes = 0;
    }

    /// Total bytes reserved by all arenas
    pub fn reserved(&self) -> usize {
        self.arenas.iter().map(|a| a.buf.len()).sum()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            arenas: self.arenas.len(),
            reserved: self.reserved(),
            used: self.arenas.iter().map(|a| a.used).sum(),
            holes: self.holes,
        }
    }
}

/// Statistics for the pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub arenas: usize,
    pub reserved: usize,
    pub used: usize,
    /// Bytes freed but not reclaimable
    pub holes: usize,
}
