//! 自旋锁模块
//! 自旋锁将数据包裹在自身内部以保护这些数据。

use core::cell::UnsafeCell;
use core::fmt;
use core::hint;
use core::ops::{Deref, DerefMut, Drop};
use core::sync::atomic::{fence, AtomicBool, AtomicIsize, AtomicU64, Ordering};

use crate::process::{CpuManager, pop_off, push_off};

/// 表示一个自旋锁结构，用于在多核环境下保护共享数据。
///
/// `SpinLock` 通过忙等待实现互斥，只适合保护很短的临界区，
/// 持有期间不得调用任何可能睡眠的操作（睡眠锁、磁盘读写）。
/// 锁会记录持有者的 hart 编号用于检测重入，并统计获取次数与
/// test-and-set 失败次数，用于衡量锁竞争。
///
/// # 字段说明
/// - `lock`: 锁状态（`false`=未锁定，`true`=已锁定）；
/// - `name`: 锁的名称，用于调试和统计；
/// - `cpuid`: 当前持有锁的 hart 编号（-1 表示无持有者）；
/// - `nts`: 获取锁时 test-and-set 失败的累计次数；
/// - `n`: 成功获取锁的累计次数；
/// - `data`: 被保护的数据。
pub struct SpinLock<T: ?Sized> {
    lock: AtomicBool,
    name: &'static str,
    cpuid: AtomicIsize,
    nts: AtomicU64,
    n: AtomicU64,
    data: UnsafeCell<T>,
}

// 为SpinLock实现Sync trait，允许跨线程共享（要求T是Send）
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// 创建一个新的自旋锁实例。
    ///
    /// # 参数
    /// - `data`: 需要被保护的数据；
    /// - `name`: 锁的标识名称，用于调试。
    pub const fn new(data: T, name: &'static str) -> Self {
        Self {
            lock: AtomicBool::new(false),
            name,
            cpuid: AtomicIsize::new(-1),
            nts: AtomicU64::new(0),
            n: AtomicU64::new(0),
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// 获取自旋锁并返回一个守卫对象。
    ///
    /// 守卫对象实现了`Deref`和`DerefMut`，离开作用域时自动释放锁。
    ///
    /// # 示例
    /// ```
    /// use xv6_bcache::spinlock::SpinLock;
    ///
    /// let lock = SpinLock::new(0, "test");
    /// {
    ///     let mut guard = lock.lock(); // 获取锁
    ///     *guard = 42; // 修改受保护数据
    /// } // 守卫离开作用域，自动释放锁
    /// assert_eq!(*lock.lock(), 42);
    /// ```
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.acquire();
        SpinLockGuard {
            lock: self,
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// 锁的名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 当前 hart 是否持有此锁。
    fn holding(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
            && self.cpuid.load(Ordering::Relaxed) == CpuManager::cpu_id() as isize
    }

    /// 获取锁的核心实现。
    ///
    /// # 流程解释
    /// 1. 调用`push_off()`禁用中断；
    /// 2. 检查是否已持有锁（防止重入导致死锁）；
    /// 3. 使用原子比较交换（CAS）忙等待获取锁，每次失败计入 `nts`；
    /// 4. 获取成功后设置内存屏障，记录当前 hart 编号。
    fn acquire(&self) {
        push_off();
        if self.holding() {
            panic!("spinlock {} acquire", self.name);
        }
        while self.lock.compare_exchange_weak(false, true,
            Ordering::Acquire, Ordering::Relaxed).is_err() {
            self.nts.fetch_add(1, Ordering::Relaxed);
            hint::spin_loop();
        }
        self.n.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        self.cpuid.store(CpuManager::cpu_id() as isize, Ordering::Relaxed);
    }

    /// 释放锁的核心实现，由守卫的 `Drop` 调用。
    ///
    /// # 流程解释
    /// 1. 验证当前 hart 确实持有锁；
    /// 2. 清除持有者记录；
    /// 3. 设置内存屏障后释放锁；
    /// 4. 调用`pop_off()`恢复中断状态。
    fn release(&self) {
        if !self.holding() {
            panic!("spinlock {} release", self.name);
        }
        self.cpuid.store(-1, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        self.lock.store(false, Ordering::Release);
        pop_off();
    }

    /// 读取锁的竞争统计。
    pub fn stats(&self) -> LockStat {
        LockStat {
            name: self.name.to_string(),
            acquires: self.n.load(Ordering::Relaxed),
            spins: self.nts.load(Ordering::Relaxed),
        }
    }
}

/// 一把自旋锁的竞争统计。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStat {
    pub name: String,
    /// 成功获取锁的次数
    pub acquires: u64,
    /// test-and-set 失败的次数，反映锁上的竞争
    pub spins: u64,
}

impl fmt::Display for LockStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock: {}: #test-and-set {} #acquire() {}", self.name, self.spins, self.acquires)
    }
}

/// 自旋锁守卫对象，提供对受保护数据的访问。
///
/// 当守卫对象存在时，表示锁已被持有。
/// 守卫离开作用域时自动释放锁。
pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
    data: &'a mut T,
}

impl<'a, T: ?Sized> Deref for SpinLockGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.data
    }
}

impl<'a, T: ?Sized> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.data
    }
}

impl<'a, T: ?Sized> Drop for SpinLockGuard<'a, T> {
    /// 当守卫离开作用域时自动释放锁，并恢复中断状态（通过`pop_off`）
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl<'a, T: ?Sized> SpinLockGuard<'a, T> {
    /// 检查当前 hart 是否持有此锁，守卫存在时应恒为真，用于调试验证。
    pub fn holding(&self) -> bool {
        self.lock.holding()
    }
}
