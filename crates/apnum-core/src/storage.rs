//! Digit storage: an ordered container of fixed-width words.
//!
//! Two variants behind one type: in-memory ("cached") storage with O(1)
//! random access, and disk-backed scratch storage streamed in blocks through
//! an anonymous temporary file. The transform engine and the number layer
//! access both through the same surface:
//!
//! - [`DataStorage::read_block`] / [`DataStorage::write_block`] for random
//!   block access (the six-step / two-pass kernels),
//! - [`DataStorage::reader`] / [`DataStorage::writer`] sequential cursors
//!   (READ and WRITE iterator modes; carry propagation and digit streams),
//! - [`DataStorage::modify_blocks`] for a sequential READ_WRITE pass.
//!
//! Ownership is strictly hierarchical: an operation owns its scratch
//! storages and drops them on every exit path; disk scratch files are
//! unlinked by the OS when dropped.

use crate::error::{ApError, Result};
use crate::word::Word;
use crate::Context;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Mutex;

/// Words per disk I/O block.
pub const DISK_BLOCK_WORDS: usize = 1 << 14;

/// An ordered sequence of machine-word digits, cached or disk-backed.
#[derive(Debug)]
pub struct DataStorage<W: Word> {
    imp: Imp<W>,
}

#[derive(Debug)]
enum Imp<W: Word> {
    Cached(Vec<W>),
    Disk(DiskStorage<W>),
}

impl<W: Word> DataStorage<W> {
    /// Zero-filled in-memory storage of `len` words.
    #[must_use]
    pub fn cached(len: usize) -> Self {
        Self {
            imp: Imp::Cached(vec![W::default(); len]),
        }
    }

    /// Wrap an existing word vector.
    #[must_use]
    pub fn from_words(words: Vec<W>) -> Self {
        Self {
            imp: Imp::Cached(words),
        }
    }

    /// Zero-filled disk-backed storage of `len` words.
    pub fn disk(len: usize) -> Result<Self> {
        Ok(Self {
            imp: Imp::Disk(DiskStorage::create(len)?),
        })
    }

    /// Total number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.imp {
            Imp::Cached(v) => v.len(),
            Imp::Disk(d) => d.len,
        }
    }

    /// Whether the storage holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capability bit consulted by the parallel scheduler: cached storages
    /// support O(1) random access, disk-backed ones may be sequential only.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self.imp, Imp::Cached(_))
    }

    /// Borrow the words of a cached storage; `None` when disk-backed.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[W]> {
        match &self.imp {
            Imp::Cached(v) => Some(v),
            Imp::Disk(_) => None,
        }
    }

    /// Mutably borrow the words of a cached storage; `None` when disk-backed.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> Option<&mut [W]> {
        match &mut self.imp {
            Imp::Cached(v) => Some(v),
            Imp::Disk(_) => None,
        }
    }

    /// Read `out.len()` words starting at `start`.
    pub fn read_block(&self, start: usize, out: &mut [W]) -> Result<()> {
        self.check_range(start, out.len())?;
        match &self.imp {
            Imp::Cached(v) => {
                out.copy_from_slice(&v[start..start + out.len()]);
                Ok(())
            }
            Imp::Disk(d) => d.read_block(start, out),
        }
    }

    /// Write `data.len()` words starting at `start`.
    pub fn write_block(&mut self, start: usize, data: &[W]) -> Result<()> {
        self.check_range(start, data.len())?;
        match &mut self.imp {
            Imp::Cached(v) => {
                v[start..start + data.len()].copy_from_slice(data);
                Ok(())
            }
            Imp::Disk(d) => d.write_block(start, data),
        }
    }

    /// Copy the first `n` words of `src` into the front of this storage.
    pub fn copy_from(&mut self, src: &Self, n: usize) -> Result<()> {
        let mut buf = vec![W::default(); DISK_BLOCK_WORDS.min(n)];
        let mut pos = 0usize;
        while pos < n {
            let chunk = buf.len().min(n - pos);
            src.read_block(pos, &mut buf[..chunk])?;
            self.write_block(pos, &buf[..chunk])?;
            pos += chunk;
        }
        Ok(())
    }

    /// Duplicate this storage, preserving its cached/disk kind.
    pub fn try_clone(&self) -> Result<Self> {
        let mut out = if self.is_cached() {
            Self::cached(self.len())
        } else {
            Self::disk(self.len())?
        };
        out.copy_from(self, self.len())?;
        Ok(out)
    }

    /// Sequential READ cursor over `range`.
    pub fn reader(&self, range: Range<usize>) -> Result<StorageReader<'_, W>> {
        self.check_range(range.start, range.end - range.start)?;
        Ok(StorageReader {
            storage: self,
            pos: range.start,
            end: range.end,
            buf: Vec::new(),
            buf_start: 0,
        })
    }

    /// Sequential WRITE cursor over `range`. Call
    /// [`StorageWriter::finish`] to flush; dropping flushes best-effort.
    pub fn writer(&mut self, range: Range<usize>) -> Result<StorageWriter<'_, W>> {
        self.check_range(range.start, range.end - range.start)?;
        Ok(StorageWriter {
            start: range.start,
            end: range.end,
            buf: Vec::with_capacity(DISK_BLOCK_WORDS.min(range.end - range.start)),
            storage: self,
        })
    }

    /// Sequential READ_WRITE pass: `f` observes and rewrites each block of
    /// `range` in order.
    pub fn modify_blocks(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(usize, &mut [W]),
    ) -> Result<()> {
        self.check_range(range.start, range.end - range.start)?;
        let mut buf = vec![W::default(); DISK_BLOCK_WORDS.min(range.end - range.start)];
        let mut pos = range.start;
        while pos < range.end {
            let chunk = buf.len().min(range.end - pos);
            self.read_block(pos, &mut buf[..chunk])?;
            f(pos, &mut buf[..chunk]);
            self.write_block(pos, &buf[..chunk])?;
            pos += chunk;
        }
        Ok(())
    }

    fn check_range(&self, start: usize, len: usize) -> Result<()> {
        if start + len > self.len() {
            return Err(ApError::resource(format!(
                "storage access {}..{} out of bounds (len {})",
                start,
                start + len,
                self.len()
            )));
        }
        Ok(())
    }
}

/// Sequential read cursor (READ mode).
pub struct StorageReader<'a, W: Word> {
    storage: &'a DataStorage<W>,
    pos: usize,
    end: usize,
    buf: Vec<W>,
    buf_start: usize,
}

impl<W: Word> StorageReader<'_, W> {
    /// Words not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Read the next word and advance.
    pub fn next_word(&mut self) -> Result<W> {
        if self.pos >= self.end {
            return Err(ApError::resource("read past the end of a storage cursor"));
        }
        if let Some(slice) = self.storage.as_slice() {
            let w = slice[self.pos];
            self.pos += 1;
            return Ok(w);
        }
        let off = self.pos.wrapping_sub(self.buf_start);
        if self.buf.is_empty() || off >= self.buf.len() {
            let chunk = DISK_BLOCK_WORDS.min(self.end - self.pos);
            self.buf.resize(chunk, W::default());
            self.storage.read_block(self.pos, &mut self.buf)?;
            self.buf_start = self.pos;
        }
        let w = self.buf[self.pos - self.buf_start];
        self.pos += 1;
        Ok(w)
    }
}

/// Sequential write cursor (WRITE mode); buffered, flushed block-wise.
pub struct StorageWriter<'a, W: Word> {
    storage: &'a mut DataStorage<W>,
    start: usize,
    end: usize,
    buf: Vec<W>,
}

impl<W: Word> StorageWriter<'_, W> {
    /// Append the next word; flushes internally on block boundaries.
    pub fn write_word(&mut self, w: W) -> Result<()> {
        if self.start + self.buf.len() >= self.end {
            return Err(ApError::resource("write past the end of a storage cursor"));
        }
        self.buf.push(w);
        if self.buf.len() == DISK_BLOCK_WORDS {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush buffered words and consume the cursor.
    pub fn finish(mut self) -> Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.storage.write_block(self.start, &self.buf)?;
            self.start += self.buf.len();
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Word> Drop for StorageWriter<'_, W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("storage writer flush on drop failed: {e}");
        }
    }
}

/// Disk-backed storage over an anonymous temporary file.
#[derive(Debug)]
pub struct DiskStorage<W: Word> {
    file: Mutex<File>,
    len: usize,
    _marker: PhantomData<W>,
}

impl<W: Word> DiskStorage<W> {
    fn create(len: usize) -> Result<Self> {
        let file = tempfile::tempfile()?;
        file.set_len((len * W::BYTES) as u64)?;
        Ok(Self {
            file: Mutex::new(file),
            len,
            _marker: PhantomData,
        })
    }

    fn read_block(&self, start: usize, out: &mut [W]) -> Result<()> {
        let mut bytes = vec![0u8; out.len() * W::BYTES];
        {
            let mut f = self
                .file
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            f.seek(SeekFrom::Start((start * W::BYTES) as u64))?;
            f.read_exact(&mut bytes)?;
        }
        for (i, w) in out.iter_mut().enumerate() {
            *w = W::load_le(&bytes[i * W::BYTES..]);
        }
        Ok(())
    }

    fn write_block(&self, start: usize, data: &[W]) -> Result<()> {
        let mut bytes = vec![0u8; data.len() * W::BYTES];
        for (i, w) in data.iter().enumerate() {
            w.store_le(&mut bytes[i * W::BYTES..]);
        }
        let mut f = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f.seek(SeekFrom::Start((start * W::BYTES) as u64))?;
        f.write_all(&bytes)?;
        Ok(())
    }
}

/// Builds storages sized for a convolution or transform step, choosing the
/// cached or disk-backed kind from the context's memory budget.
#[derive(Clone, Debug)]
pub struct DataStorageBuilder {
    max_memory_block_size: usize,
}

impl DataStorageBuilder {
    /// Builder bound to a context's memory budget.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            max_memory_block_size: ctx.max_memory_block_size,
        }
    }

    /// Storage of `len` words: cached when it fits the memory budget,
    /// disk-backed otherwise.
    pub fn create<W: Word>(&self, len: usize) -> Result<DataStorage<W>> {
        if len * W::BYTES <= self.max_memory_block_size {
            Ok(DataStorage::cached(len))
        } else {
            tracing::debug!(len, "allocating disk-backed storage");
            DataStorage::disk(len)
        }
    }

    /// Cached storage of `len` words regardless of the budget.
    #[must_use]
    pub fn create_cached<W: Word>(&self, len: usize) -> DataStorage<W> {
        DataStorage::cached(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_and_check(mut s: DataStorage<u32>) {
        let n = s.len();
        {
            let mut w = s.writer(0..n).unwrap();
            for i in 0..n {
                w.write_word(i as u32 * 7 + 1).unwrap();
            }
            w.finish().unwrap();
        }
        let mut r = s.reader(0..n).unwrap();
        for i in 0..n {
            assert_eq!(r.next_word().unwrap(), i as u32 * 7 + 1);
        }
        // Random block access in the middle.
        let mut mid = [0u32; 3];
        s.read_block(n / 2, &mut mid).unwrap();
        assert_eq!(mid[0], (n / 2) as u32 * 7 + 1);
    }

    #[test]
    fn cached_cursors_round_trip() {
        fill_and_check(DataStorage::cached(1000));
    }

    #[test]
    fn disk_cursors_round_trip() {
        // Deliberately larger than one I/O block to cross boundaries.
        fill_and_check(DataStorage::disk(DISK_BLOCK_WORDS + 17).unwrap());
    }

    #[test]
    fn disk_storage_reads_zeroes_initially() {
        let s = DataStorage::<u64>::disk(64).unwrap();
        let mut buf = [1u64; 64];
        s.read_block(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&w| w == 0));
    }

    #[test]
    fn copy_from_preserves_contents_across_kinds() {
        let src = DataStorage::from_words((0u32..500).collect());
        let mut dst = DataStorage::disk(500).unwrap();
        dst.copy_from(&src, 500).unwrap();
        let mut buf = vec![0u32; 500];
        dst.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, (0u32..500).collect::<Vec<_>>());
    }

    #[test]
    fn builder_respects_memory_budget() {
        let ctx = Context {
            max_memory_block_size: 1024,
            ..Context::default()
        };
        let b = DataStorageBuilder::new(&ctx);
        assert!(b.create::<u32>(16).unwrap().is_cached());
        assert!(!b.create::<u32>(100_000).unwrap().is_cached());
    }

    #[test]
    fn out_of_bounds_access_is_a_resource_error() {
        let s = DataStorage::<u32>::cached(4);
        let mut buf = [0u32; 8];
        assert!(s.read_block(0, &mut buf).is_err());
    }
}
