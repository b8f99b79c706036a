//! 缓存层
//!
//! 块缓存由固定数量的缓冲块组成，缓存磁盘块的内容。
//! 缓存磁盘块既减少了磁盘读取次数，也为多个进程共同使用的磁盘块提供了同步点。
//!
//! 使用方式：
//! * 通过 `bread` 获取某个磁盘块对应的缓冲块；
//! * 修改缓冲块数据后，调用 `bwrite` 写回磁盘；
//! * 用完后释放缓冲块（`brelse` 或直接丢弃 `Buf`），此后不得再使用它；
//! * 同一时刻只有一个进程能使用某个缓冲块，因此不要长时间持有。
//!
//! 缓冲池按块号哈希划分为若干个桶，每个桶有自己的自旋锁和按释放先后排序的双向链表。
//! 链表是建立在缓冲块数组上的侵入式链表：`prev`/`next` 保存的是下标，
//! 下标 `nbuf + i` 处是第 `i` 个桶的哨兵节点。

use core::cell::UnsafeCell;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, info, trace, warn};

use crate::config::{BcacheConfig, EvictionScope};
use crate::consts::fs::BSIZE;
use crate::driver::BlockDevice;
use crate::error::{fatal, BcacheError, ConfigError};
use crate::sleeplock::{SleepLock, SleepLockGuard};
use crate::spinlock::{LockStat, SpinLock, SpinLockGuard};

/// 缓冲块的身份：设备号与块号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub dev: u32,
    pub blockno: u32,
}

impl BlockId {
    pub const fn new(dev: u32, blockno: u32) -> Self {
        Self { dev, blockno }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dev, self.blockno)
    }
}

bitflags! {
    /// 缓冲块的状态位
    pub struct BufFlags: u8 {
        /// 数据已从磁盘读入，与磁盘内容一致
        const VALID = 1 << 0;
        /// 磁盘驱动正在使用该缓冲块的数据
        const DISK = 1 << 1;
    }
}

/// 全局缓冲区缓存（Buffer Cache）结构体，用于块设备的读写缓存。
///
/// `Bcache` 在内核启动时构造一次，由驱动启动流程的组件持有，
/// 以引用的形式传给文件系统、日志层等所有使用者。
///
/// 锁的层次：
/// 1. `table`：粗粒度表锁，只在跨桶窃取时获取，且总是先于任何桶锁获取；
/// 2. `buckets[i]`：桶锁，保护第 `i` 个桶的链表以及链表中缓冲块的元数据；
/// 3. 每个缓冲块的睡眠锁：保护数据，可以跨越磁盘 I/O 持有，
///    获取它之前必须释放以上所有自旋锁。
pub struct Bcache {
    config: BcacheConfig,
    disk: Arc<dyn BlockDevice>,

    /// 粗粒度表锁，完全分片时从不被获取
    table: SpinLock<()>,

    /// 每个桶一把锁，桶内的链表通过 `ctrl` 中的下标串联
    buckets: Box<[SpinLock<()>]>,

    /// 缓冲块与哨兵的控制信息，长度为 `nbuf + buckets`。
    ///
    /// 某个下标处的控制信息只能在持有它当前所在桶的桶锁时访问，
    /// 缓冲块在桶之间迁移时同时持有源桶与目标桶的锁。
    ctrl: Box<[UnsafeCell<BufCtrl>]>,

    /// 缓冲块数组，长度为 `nbuf`，与 `ctrl` 的前 `nbuf` 项一一对应。
    bufs: Box<[BufInner]>,

    counters: Counters,
}

// `ctrl` 中的每一项都只在持有对应桶锁时访问
unsafe impl Sync for Bcache {}

impl Bcache {
    /// 按照 `config` 构造块缓存并完成初始化。
    ///
    /// # 参数
    /// - `config`: 缓冲块数量、桶数量与回收范围；
    /// - `disk`: 读写磁盘块的设备驱动。
    ///
    /// # 可能的错误
    /// - 参数校验失败时返回 [`ConfigError`]。
    pub fn new(config: BcacheConfig, disk: Arc<dyn BlockDevice>) -> Result<Self, ConfigError> {
        config.validate()?;
        let BcacheConfig { nbuf, buckets, .. } = config;
        if config.scope == EvictionScope::PoolWide && buckets > nbuf {
            warn!("bcache: {} buckets for {} buffers, some buckets start empty", buckets, nbuf);
        }

        let bcache = Self {
            config,
            disk,
            table: SpinLock::new((), "bcache"),
            buckets: (0..buckets).map(|_| SpinLock::new((), "bcache_bucket")).collect(),
            ctrl: (0..nbuf + buckets).map(|i| UnsafeCell::new(BufCtrl::new(i))).collect(),
            bufs: (0..nbuf).map(|_| BufInner::new()).collect(),
            counters: Counters::default(),
        };
        bcache.binit();
        Ok(bcache)
    }

    /// 初始化各个桶的链表。
    ///
    /// 第 `i` 个缓冲块放入第 `i % buckets` 个桶，依次插到最近释放端，
    /// 因此下标最小的缓冲块位于最久未释放端，最先被回收。
    /// 两种回收范围的初始布局相同；本桶回收时缓冲块此后不会再迁移。
    fn binit(&self) {
        for index in 0..self.config.nbuf {
            let mut bucket = self.lock_bucket(index % self.config.buckets);
            bucket.push_front(index);
        }
        info!(
            "bcache: {} buffers, {} buckets, {:?} eviction",
            self.config.nbuf, self.config.buckets, self.config.scope
        );

        if cfg!(feature = "verbose_init_info") {
            for bucket in 0..self.config.buckets {
                info!("bcache: bucket {} holds {} buffers", bucket, self.snapshot(bucket).len());
            }
        }
    }

    pub fn config(&self) -> &BcacheConfig {
        &self.config
    }

    /// 块号所在的桶
    #[inline]
    pub fn bucket_of(&self, blockno: u32) -> usize {
        blockno as usize % self.config.buckets
    }

    fn lock_bucket(&self, bucket: usize) -> BufLru<'_> {
        BufLru {
            _guard: self.buckets[bucket].lock(),
            ctrl: &self.ctrl,
            head: self.config.nbuf + bucket,
        }
    }

    /// 获取指定设备与块号对应的缓冲块，返回时调用者已持有其睡眠锁。
    ///
    /// # 功能说明
    /// 若缓存命中，则返回已存在的缓冲块；否则回收一个未被引用的缓冲块分配给该块。
    /// 该函数不读磁盘，调用者通过 [`Buf::is_valid`] 判断是否需要从磁盘加载数据；
    /// 打算整块覆盖写的调用者可以直接使用它而跳过读盘。
    ///
    /// # 流程解释
    /// - 在本桶锁下查找 `(dev, blockno)`，命中则增加引用计数；
    /// - 未命中则从本桶最久未释放端找引用计数为 0 的缓冲块，改写身份、清除有效位；
    /// - 本桶没有空闲块时，按回收范围决定是失败还是跨桶窃取；
    /// - 释放所有自旋锁之后，再获取缓冲块的睡眠锁。
    ///
    /// # 可能的错误
    /// - 搜索范围内所有缓冲块都被引用时，致命错误 `ResourceExhausted`。
    pub fn bget(&self, dev: u32, blockno: u32) -> Buf<'_> {
        let key = BlockId::new(dev, blockno);
        let home = self.bucket_of(blockno);

        let found = {
            let mut bucket = self.lock_bucket(home);
            match bucket.find_cached(key) {
                Some(index) => Some(Lookup::Hit(index)),
                None => bucket.recycle(key).map(|index| {
                    self.bufs[index].clear(BufFlags::VALID);
                    Lookup::Claimed(index)
                }),
            }
        };

        let lookup = match found {
            Some(lookup) => lookup,
            None => match self.config.scope {
                EvictionScope::PoolWide => self.steal(home, key),
                EvictionScope::BucketLocal => {
                    fatal(BcacheError::ResourceExhausted { dev, blockno, bucket: home })
                }
            },
        };

        let index = match lookup {
            Lookup::Hit(index) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                trace!("bget{}: hit slot {}", key, index);
                index
            }
            Lookup::Claimed(index) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!("bget{}: miss, slot {} in bucket {}", key, index, home);
                index
            }
            Lookup::Stolen { index, victim } => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!("bget{}: miss, stole slot {} from bucket {}", key, index, victim);
                index
            }
        };

        Buf {
            bcache: self,
            index,
            dev,
            blockno,
            data: ManuallyDrop::new(self.bufs[index].data.lock()),
        }
    }

    /// 跨桶窃取：本桶没有空闲块时，从其他桶最久未释放端取一个空闲缓冲块。
    ///
    /// 持有表锁期间依次持有本桶锁与某个其他桶的锁。
    /// 只有表锁的持有者会同时持有两把桶锁，因此桶锁之间不会形成环路。
    fn steal(&self, home: usize, key: BlockId) -> Lookup {
        let table = self.table.lock();
        let mut bucket = self.lock_bucket(home);

        // 释放本桶锁到重新获取之间，其他进程可能已经缓存了该块，
        // 或者在本桶中释放了缓冲块
        if let Some(index) = bucket.find_cached(key) {
            return Lookup::Hit(index);
        }
        if let Some(index) = bucket.recycle(key) {
            self.bufs[index].clear(BufFlags::VALID);
            return Lookup::Claimed(index);
        }

        let n = self.config.buckets;
        for victim in (1..n).map(|offset| (home + offset) % n) {
            let mut other = self.lock_bucket(victim);
            if let Some(index) = other.take_free() {
                drop(other);
                bucket.claim_stolen(index, key);
                self.bufs[index].clear(BufFlags::VALID);
                self.counters.steals.fetch_add(1, Ordering::Relaxed);
                return Lookup::Stolen { index, victim };
            }
        }

        drop(bucket);
        drop(table);
        fatal(BcacheError::ResourceExhausted { dev: key.dev, blockno: key.blockno, bucket: home })
    }

    /// 从缓冲区缓存中读取指定设备与块号对应的数据。
    ///
    /// # 功能说明
    /// 调用 `bget` 获取缓冲块；若其有效位未设置，调用磁盘驱动读入数据并设置有效位。
    /// 返回的缓冲块仍由调用者独占持有。
    ///
    /// # 可能的错误
    /// - 缓冲块耗尽时触发致命错误；
    /// - 磁盘读失败不在本层处理。
    pub fn bread(&self, dev: u32, blockno: u32) -> Buf<'_> {
        let mut b = self.bget(dev, blockno);
        if !b.is_valid() {
            self.disk.rw(&mut b, false);
            self.bufs[b.index].set(BufFlags::VALID);
            self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        }
        b
    }

    /// 释放缓冲块，与直接丢弃 `Buf` 等价。
    pub fn brelse(&self, b: Buf<'_>) {
        debug_assert!(ptr::eq(b.bcache, self), "brelse: buffer from another cache");
        drop(b);
    }

    /// 引用计数减一；归零时把缓冲块移到本桶的最近释放端。
    fn release_slot(&self, index: usize, blockno: u32) {
        let mut bucket = self.lock_bucket(self.bucket_of(blockno));
        let released = bucket.move_if_no_ref(index);
        drop(bucket);
        if let Err(err) = released {
            fatal(err);
        }
    }

    /// 查找某个块当前的引用计数，未缓存时返回 `None`。
    pub fn refcnt(&self, dev: u32, blockno: u32) -> Option<usize> {
        let key = BlockId::new(dev, blockno);
        let bucket = self.lock_bucket(self.bucket_of(blockno));
        let found = bucket.iter().find(|&i| bucket.at(i).key == Some(key));
        found.map(|i| bucket.at(i).refcnt)
    }

    /// 按从最近释放端到最久未释放端的顺序，列出某个桶中的缓冲块。
    pub fn snapshot(&self, bucket: usize) -> Vec<SlotInfo> {
        let lru = self.lock_bucket(bucket);
        lru.iter()
            .map(|index| {
                let c = lru.at(index);
                SlotInfo {
                    index,
                    key: c.key,
                    refcnt: c.refcnt,
                    valid: self.bufs[index].flags().contains(BufFlags::VALID),
                }
            })
            .collect()
    }

    /// 命中、未命中与磁盘读写的累计次数。
    pub fn stats(&self) -> BcacheStats {
        let c = &self.counters;
        BcacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            steals: c.steals.load(Ordering::Relaxed),
            disk_reads: c.disk_reads.load(Ordering::Relaxed),
            disk_writes: c.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// 表锁与所有桶锁的竞争统计。
    pub fn lock_stats(&self) -> Vec<LockStat> {
        let mut stats = vec![self.table.stats()];
        stats.extend(self.buckets.iter().enumerate().map(|(i, lock)| {
            let mut stat = lock.stats();
            stat.name = format!("{}_{}", lock.name(), i);
            stat
        }));
        stats
    }

    /// 所有块缓存锁上 test-and-set 失败的总次数。
    pub fn contention(&self) -> u64 {
        self.lock_stats().iter().map(|s| s.spins).sum()
    }

    /// 把统计信息输出到内核日志。
    pub fn report(&self) {
        info!("bcache: {}", self.stats());
        for stat in self.lock_stats() {
            info!("{}", stat);
        }
        info!("bcache: total contention {}", self.contention());
    }
}

#[cfg(feature = "lock_stats_report")]
impl Drop for Bcache {
    fn drop(&mut self) {
        self.report();
    }
}

enum Lookup {
    /// 命中已缓存的缓冲块
    Hit(usize),
    /// 回收了本桶的一个空闲缓冲块
    Claimed(usize),
    /// 从 `victim` 桶窃取了一个空闲缓冲块
    Stolen { index: usize, victim: usize },
}

/// 缓冲块数据的包装结构，表示一个已分配的磁盘块缓存实体。
///
/// `Buf` 持有对其数据的独占访问权限（由 `SleepLockGuard` 保护），
/// 并在生命周期结束时自动释放睡眠锁、减少引用计数。
///
/// `Buf` 可以被转交给其他内核线程，但接收方并不持有睡眠锁：
/// 在接收方上写回、钉住或释放都会触发致命错误。
pub struct Buf<'a> {
    bcache: &'a Bcache,

    /// 缓冲块在缓冲数组中的下标
    index: usize,

    dev: u32,
    blockno: u32,

    /// 睡眠锁守卫，在 `Drop` 中先于引用计数释放
    data: ManuallyDrop<SleepLockGuard<'a, BufData>>,
}

impl<'a> Buf<'a> {
    pub fn read_dev(&self) -> u32 {
        self.dev
    }

    pub fn read_blockno(&self) -> u32 {
        self.blockno
    }

    pub fn id(&self) -> BlockId {
        BlockId::new(self.dev, self.blockno)
    }

    /// 缓冲块在缓冲数组中的下标
    pub fn slot(&self) -> usize {
        self.index
    }

    pub fn data(&self) -> &[u8; BSIZE] {
        &self.data.0
    }

    pub fn data_mut(&mut self) -> &mut [u8; BSIZE] {
        &mut self.data.0
    }

    /// 数据是否与磁盘内容一致
    pub fn is_valid(&self) -> bool {
        self.flags().contains(BufFlags::VALID)
    }

    pub fn flags(&self) -> BufFlags {
        self.bcache.bufs[self.index].flags()
    }

    /// 磁盘驱动在传输期间持有 `DISK` 位
    pub fn set_disk(&self, owned: bool) {
        let inner = &self.bcache.bufs[self.index];
        if owned {
            inner.set(BufFlags::DISK);
        } else {
            inner.clear(BufFlags::DISK);
        }
    }

    /// 调用者是否持有该缓冲块的睡眠锁
    pub fn holding(&self) -> bool {
        self.data.holding()
    }

    /// 将缓冲块数据写回磁盘，调用者必须持有睡眠锁。
    pub fn bwrite(&mut self) {
        if !self.holding() {
            fatal(BcacheError::not_locked("bwrite"));
        }
        let bcache = self.bcache;
        bcache.disk.rw(self, true);
        self.bcache.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// 将引用计数加一，“钉住”该块，使其在释放后仍不会被回收。
    ///
    /// 日志层在事务提交前用它把块留在缓存中，与 `unpin` 配对使用。
    /// 只改动引用计数，不改变睡眠锁和链表位置。
    pub fn pin(&self) {
        if !self.holding() {
            fatal(BcacheError::not_locked("bpin"));
        }
        let mut bucket = self.bcache.lock_bucket(self.bcache.bucket_of(self.blockno));
        bucket.with(self.index, |c| c.refcnt += 1);
    }

    /// 将引用计数减一，解除 `pin`。
    ///
    /// # 可能的错误
    /// - 引用计数不大于调用者自身持有的那一份时，说明 `pin`/`unpin` 不配对，触发致命错误。
    pub fn unpin(&self) {
        if !self.holding() {
            fatal(BcacheError::not_locked("bunpin"));
        }
        let mut bucket = self.bcache.lock_bucket(self.bcache.bucket_of(self.blockno));
        if bucket.at(self.index).refcnt <= 1 {
            drop(bucket);
            fatal(BcacheError::ProtocolViolation { op: "bunpin", reason: "unpin not match" });
        }
        bucket.with(self.index, |c| c.refcnt -= 1);
    }
}

impl<'a> Drop for Buf<'a> {
    /// 先释放睡眠锁，唤醒下一个等待者，再在桶锁下减少引用计数。
    fn drop(&mut self) {
        if thread::panicking() {
            // 内核正在停机，只放开睡眠锁
            unsafe { ManuallyDrop::drop(&mut self.data) };
            return;
        }
        if !self.holding() {
            unsafe { ManuallyDrop::drop(&mut self.data) };
            fatal(BcacheError::not_locked("brelse"));
        }
        unsafe { ManuallyDrop::drop(&mut self.data) };
        self.bcache.release_slot(self.index, self.blockno);
    }
}

impl<'a> fmt::Debug for Buf<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buf")
            .field("slot", &self.index)
            .field("dev", &self.dev)
            .field("blockno", &self.blockno)
            .field("holder", &self.bcache.bufs[self.index].data.holder())
            .field("flags", &self.flags())
            .finish()
    }
}

/// 持有某个桶锁期间对该桶链表的视图。
///
/// 链表按释放先后排列：哨兵的 `next` 一侧是最近释放端，`prev` 一侧是最久未释放端。
struct BufLru<'a> {
    _guard: SpinLockGuard<'a, ()>,
    ctrl: &'a [UnsafeCell<BufCtrl>],
    /// 本桶哨兵的下标
    head: usize,
}

impl<'a> BufLru<'a> {
    /// 读取本桶链表中某个节点的控制信息。
    fn at(&self, index: usize) -> &BufCtrl {
        // SAFETY: 持有本桶锁，且 `index` 位于本桶链表中（或正在被迁入本桶），
        // 其他线程不会同时访问该节点
        unsafe { &*self.ctrl[index].get() }
    }

    fn with<R>(&mut self, index: usize, f: impl FnOnce(&mut BufCtrl) -> R) -> R {
        // SAFETY: 同 `at`；`&mut self` 保证本视图没有其他借用存活
        f(unsafe { &mut *self.ctrl[index].get() })
    }

    /// 从最近释放端到最久未释放端遍历本桶的缓冲块
    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let head = self.head;
        let mut b = self.at(head).next;
        core::iter::from_fn(move || {
            if b == head {
                return None;
            }
            let cur = b;
            b = self.at(cur).next;
            Some(cur)
        })
    }

    /// 查找身份匹配的缓冲块，命中时引用计数加一。
    fn find_cached(&mut self, key: BlockId) -> Option<usize> {
        let index = self.iter().find(|&i| self.at(i).key == Some(key))?;
        self.with(index, |c| c.refcnt += 1);
        Some(index)
    }

    /// 从最久未释放端开始，找到第一个引用计数为 0 的缓冲块并改写其身份。
    /// 被回收的缓冲块留在原位，释放时才会移到最近释放端。
    fn recycle(&mut self, key: BlockId) -> Option<usize> {
        let index = self.lru_free()?;
        self.with(index, |c| {
            c.key = Some(key);
            c.refcnt = 1;
        });
        Some(index)
    }

    fn lru_free(&self) -> Option<usize> {
        let mut b = self.at(self.head).prev;
        while b != self.head {
            let c = self.at(b);
            if c.refcnt == 0 {
                return Some(b);
            }
            b = c.prev;
        }
        None
    }

    /// 摘下本桶最久未释放的空闲缓冲块，供其他桶窃取。
    fn take_free(&mut self) -> Option<usize> {
        let index = self.lru_free()?;
        self.unlink(index);
        Some(index)
    }

    /// 接收从其他桶窃取来的缓冲块，改写身份并插到最近释放端。
    fn claim_stolen(&mut self, index: usize, key: BlockId) {
        self.with(index, |c| {
            c.key = Some(key);
            c.refcnt = 1;
        });
        self.push_front(index);
    }

    /// 引用计数减一；若归零，将其移至最近释放端。
    fn move_if_no_ref(&mut self, index: usize) -> Result<(), BcacheError> {
        let refcnt = self.at(index).refcnt;
        if refcnt == 0 {
            return Err(BcacheError::ProtocolViolation { op: "brelse", reason: "refcnt underflow" });
        }
        self.with(index, |c| c.refcnt -= 1);
        if refcnt == 1 && self.at(self.head).next != index {
            self.unlink(index);
            self.push_front(index);
        }
        Ok(())
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let c = self.at(index);
            (c.prev, c.next)
        };
        self.with(prev, |c| c.next = next);
        self.with(next, |c| c.prev = prev);
        self.with(index, |c| {
            c.prev = index;
            c.next = index;
        });
    }

    fn push_front(&mut self, index: usize) {
        let head = self.head;
        let first = self.at(head).next;
        self.with(index, |c| {
            c.prev = head;
            c.next = first;
        });
        self.with(first, |c| c.prev = index);
        self.with(head, |c| c.next = index);
    }
}

/// 缓冲块控制结构，记录缓冲块的身份、引用计数和链表中的前后下标。
#[derive(Debug, Clone, Copy)]
struct BufCtrl {
    /// 缓冲块当前缓存的磁盘块，从未被使用过的缓冲块没有身份
    key: Option<BlockId>,
    /// 持有者与 `pin` 的数量，为 0 时可以被回收
    refcnt: usize,
    prev: usize,
    next: usize,
}

impl BufCtrl {
    /// 新节点自成环，哨兵即表示空链表
    const fn new(index: usize) -> Self {
        Self {
            key: None,
            refcnt: 0,
            prev: index,
            next: index,
        }
    }
}

/// 缓冲块的数据部分，包含实际的磁盘块内容及其状态位。
///
/// 状态位在持有桶锁（回收时清除 `VALID`）或持有睡眠锁（读盘后设置 `VALID`）时修改。
struct BufInner {
    flags: AtomicU8,
    data: SleepLock<BufData>,
}

impl BufInner {
    fn new() -> Self {
        Self {
            flags: AtomicU8::new(0),
            data: SleepLock::new(BufData::new(), "buffer"),
        }
    }

    fn flags(&self) -> BufFlags {
        BufFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    fn set(&self, flags: BufFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    fn clear(&self, flags: BufFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }
}

/// BufData 的对齐方式应足以满足可能由此结构体转换而来的其他结构体的需求。
#[repr(C, align(8))]
#[derive(Clone)]
pub struct BufData(pub [u8; BSIZE]);

impl BufData {
    pub const fn new() -> Self {
        Self([0; BSIZE])
    }
}

impl Default for BufData {
    fn default() -> Self {
        Self::new()
    }
}

/// 某个桶中一个缓冲块的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub index: usize,
    pub key: Option<BlockId>,
    pub refcnt: usize,
    pub valid: bool,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    steals: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

/// 块缓存的累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BcacheStats {
    pub hits: u64,
    pub misses: u64,
    /// 未命中中通过跨桶窃取完成的次数
    pub steals: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

impl fmt::Display for BcacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits {} misses {} steals {} reads {} writes {}",
            self.hits, self.misses, self.steals, self.disk_reads, self.disk_writes
        )
    }
}
