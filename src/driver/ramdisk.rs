//! 内存盘驱动
//!
//! 用内存中的块表模拟磁盘，未写过的块读出来全为 0。
//! 可以给每次传输加上固定延迟，模拟磁盘 I/O 期间持锁睡眠的情形。

use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use super::BlockDevice;
use crate::consts::fs::{BSIZE, FSSIZE};
use crate::fs::{Buf, BufData};
use crate::spinlock::SpinLock;

pub struct RamDisk {
    /// 以 (设备号, 块号) 为键的块内容
    blocks: SpinLock<BTreeMap<(u32, u32), BufData>>,
    nblocks: u32,
    latency: Option<Duration>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RamDisk {
    /// 每个设备有 `nblocks` 个块的内存盘
    pub fn new(nblocks: u32) -> Self {
        Self {
            blocks: SpinLock::new(BTreeMap::new(), "ramdisk"),
            nblocks,
            latency: None,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// 每次传输在完成前睡眠 `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 不经过块缓存直接写入某个块的初始内容，不足 `BSIZE` 的部分补 0。
    pub fn preload(&self, dev: u32, blockno: u32, bytes: &[u8]) {
        assert!(bytes.len() <= BSIZE, "ramdisk: preload larger than a block");
        let mut data = BufData::new();
        data.0[..bytes.len()].copy_from_slice(bytes);
        self.blocks.lock().insert((dev, blockno), data);
    }

    /// 不经过块缓存直接读出某个块在“磁盘”上的内容
    pub fn block(&self, dev: u32, blockno: u32) -> [u8; BSIZE] {
        self.blocks
            .lock()
            .get(&(dev, blockno))
            .map_or([0; BSIZE], |data| data.0)
    }

    /// 完成的读传输次数
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// 完成的写传输次数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Default for RamDisk {
    /// 与文件系统同样大小的内存盘
    fn default() -> Self {
        Self::new(FSSIZE)
    }
}

impl BlockDevice for RamDisk {
    fn rw(&self, buf: &mut Buf<'_>, writing: bool) {
        if !buf.holding() {
            panic!("ramdisk: buf not locked");
        }
        let (dev, blockno) = (buf.read_dev(), buf.read_blockno());
        if blockno >= self.nblocks {
            panic!("ramdisk: blockno out of range");
        }

        buf.set_disk(true);
        // 传输期间只持有缓冲块的睡眠锁
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let mut blocks = self.blocks.lock();
        if writing {
            blocks.insert((dev, blockno), BufData(*buf.data()));
            self.writes.fetch_add(1, Ordering::Relaxed);
        } else {
            match blocks.get(&(dev, blockno)) {
                Some(data) => buf.data_mut().copy_from_slice(&data.0),
                None => buf.data_mut().fill(0),
            }
            self.reads.fetch_add(1, Ordering::Relaxed);
        }
        drop(blocks);

        buf.set_disk(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BcacheConfig, EvictionScope};
    use crate::fs::{Bcache, BufFlags};
    use std::sync::Arc;

    fn bcache(disk: &Arc<RamDisk>, nbuf: usize) -> Bcache {
        let config = BcacheConfig::new(nbuf, 1, EvictionScope::PoolWide);
        Bcache::new(config, Arc::clone(disk) as Arc<dyn BlockDevice>).unwrap()
    }

    #[test]
    fn unwritten_blocks_read_zero() {
        let disk = Arc::new(RamDisk::new(16));
        let bcache = bcache(&disk, 2);
        let b = bcache.bread(1, 7);
        assert!(b.data().iter().all(|&x| x == 0));
        assert!(b.is_valid());
        assert!(!b.flags().contains(BufFlags::DISK));
        assert_eq!(disk.reads(), 1);
    }

    #[test]
    fn preload_is_visible_through_the_cache() {
        let disk = Arc::new(RamDisk::new(16));
        disk.preload(1, 3, b"superblock");
        let bcache = bcache(&disk, 2);
        let b = bcache.bread(1, 3);
        assert_eq!(&b.data()[..10], b"superblock");
        assert_eq!(b.data()[10], 0);
    }

    #[test]
    fn writes_survive_eviction() {
        let disk = Arc::new(RamDisk::new(16));
        let bcache = bcache(&disk, 1);

        let mut b = bcache.bread(1, 4);
        b.data_mut()[0] = 0xaa;
        b.bwrite();
        drop(b);
        assert_eq!(disk.block(1, 4)[0], 0xaa);

        // 唯一的缓冲块被另一个块占用后，再次读取必须从磁盘加载
        drop(bcache.bread(1, 5));
        let b = bcache.bread(1, 4);
        assert_eq!(b.data()[0], 0xaa);
        assert_eq!(disk.reads(), 3);
        assert_eq!(disk.writes(), 1);
    }

    #[test]
    fn devices_do_not_alias() {
        let disk = Arc::new(RamDisk::default());
        disk.preload(1, 2, &[1]);
        disk.preload(2, 2, &[2]);
        let bcache = bcache(&disk, 4);
        assert_eq!(bcache.bread(1, 2).data()[0], 1);
        assert_eq!(bcache.bread(2, 2).data()[0], 2);
    }

    #[test]
    #[should_panic(expected = "ramdisk: blockno out of range")]
    fn out_of_range_panics() {
        let disk = Arc::new(RamDisk::new(4));
        let bcache = bcache(&disk, 1);
        let _ = bcache.bread(1, 4);
    }
}
