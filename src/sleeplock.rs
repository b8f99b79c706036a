//! 睡眠锁模块
//! 提供基于进程休眠/唤醒机制的同步原语，适用于可能长时间持有的锁。
//!
//! 当锁被占用时，尝试获取锁的进程会进入休眠状态，避免忙等待。
//! 睡眠锁可以跨越磁盘 I/O 持有，块缓存用它保护每个缓冲块的数据。

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut, Drop};

use crate::process::{CpuManager, WaitQueue};
use crate::spinlock::SpinLock;

/// 睡眠锁结构，提供阻塞式同步机制
///
/// # 字段说明
/// - `lock`: 内部自旋锁，保护锁状态（是否被占用、持有者进程号）
/// - `waiters`: 等待该锁的进程队列
/// - `name`: 锁的标识名称，用于调试
/// - `data`: 被保护的数据，通过`UnsafeCell`实现内部可变性
pub struct SleepLock<T: ?Sized> {
    lock: SpinLock<SleepState>,
    waiters: WaitQueue,
    name: &'static str,
    data: UnsafeCell<T>,
}

struct SleepState {
    locked: bool,
    /// 持有锁的进程号，0 表示无持有者
    pid: usize,
}

// 为SleepLock实现Sync，允许跨线程共享（要求T是Send）
unsafe impl<T: ?Sized + Send> Sync for SleepLock<T> {}

impl<T> SleepLock<T> {
    /// 创建一个新的睡眠锁实例
    pub const fn new(data: T, name: &'static str) -> Self {
        Self {
            lock: SpinLock::new(SleepState { locked: false, pid: 0 }, "sleeplock"),
            waiters: WaitQueue::new("sleeplock waiters"),
            name,
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> SleepLock<T> {
    /// 获取睡眠锁（可能阻塞进程）
    ///
    /// # 流程解释
    /// 1. 确认当前 hart 没有持有任何自旋锁，否则睡眠会带着自旋锁让出处理器；
    /// 2. 获取内部自旋锁保护临界区；
    /// 3. 检查`locked`状态：
    ///   - 如果已锁定：挂到等待队列上睡眠，被唤醒后重新检查
    ///   - 如果未锁定：设置`locked=true`并记录持有者进程号
    /// 4. 释放内部自旋锁，返回守卫
    ///
    /// # 可能的错误
    /// - 持有自旋锁时调用会 panic。
    pub fn lock(&self) -> SleepLockGuard<'_, T> {
        if CpuManager::noff() != 0 {
            panic!("sleeplock {} acquire: holding spinlock", self.name);
        }

        let mut guard = self.lock.lock();
        while guard.locked {
            self.waiters.sleep(guard);
            guard = self.lock.lock();
        }
        guard.locked = true;
        guard.pid = CpuManager::my_pid();
        drop(guard);

        SleepLockGuard {
            lock: self,
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// 当前进程是否持有该睡眠锁。
    pub fn holding(&self) -> bool {
        let guard = self.lock.lock();
        guard.locked && guard.pid == CpuManager::my_pid()
    }

    /// 持有者的进程号，未被持有时返回 `None`。
    pub fn holder(&self) -> Option<usize> {
        let guard = self.lock.lock();
        if guard.locked {
            Some(guard.pid)
        } else {
            None
        }
    }

    /// 释放锁（由守卫的Drop调用），并唤醒恰好一个等待者
    fn unlock(&self) {
        let mut guard = self.lock.lock();
        guard.locked = false;
        guard.pid = 0;
        self.waiters.wakeup_one();
        drop(guard);
    }
}

/// 睡眠锁守卫，提供对受保护数据的访问
///
/// 守卫离开作用域时自动释放锁。
pub struct SleepLockGuard<'a, T: ?Sized> {
    lock: &'a SleepLock<T>,
    data: &'a mut T,
}

impl<'a, T: ?Sized> SleepLockGuard<'a, T> {
    /// 调用者进程是否持有守卫对应的锁。
    ///
    /// 守卫可以被转交给其他内核线程，此时接收方并不是锁的持有者，
    /// 块缓存在写回和释放前用它检查调用约定。
    pub fn holding(&self) -> bool {
        self.lock.holding()
    }
}

impl<'a, T: ?Sized> Deref for SleepLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &*self.data
    }
}

impl<'a, T: ?Sized> DerefMut for SleepLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.data
    }
}

impl<'a, T: ?Sized> Drop for SleepLockGuard<'a, T> {
    /// 当守卫离开作用域时自动释放锁：
    /// 1. 标记锁为可用状态
    /// 2. 唤醒一个等待该锁的进程
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn records_holder() {
        let l = SleepLock::new(5, "holder");
        assert_eq!(l.holder(), None);
        let guard = l.lock();
        assert!(guard.holding());
        assert_eq!(l.holder(), Some(CpuManager::my_pid()));
        drop(guard);
        assert!(!l.holding());
    }

    #[test]
    fn exclusion_across_sleep() {
        const K: usize = 4;
        let l = Arc::new(SleepLock::new(Vec::new(), "io"));
        let start = Arc::new(Barrier::new(K));

        let handles: Vec<_> = (0..K)
            .map(|i| {
                let (l, start) = (Arc::clone(&l), Arc::clone(&start));
                thread::spawn(move || {
                    start.wait();
                    let mut guard = l.lock();
                    guard.push(i);
                    // 持锁期间睡眠，模拟磁盘 I/O
                    thread::sleep(Duration::from_millis(5));
                    assert_eq!(guard.last(), Some(&i));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = l.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..K).collect::<Vec<_>>());
    }

    #[test]
    fn guard_moved_to_other_thread_is_not_held() {
        let l = SleepLock::new(0u8, "moved");
        let guard = l.lock();
        let held_elsewhere = thread::scope(|s| s.spawn(move || guard.holding()).join().unwrap());
        assert!(!held_elsewhere);
        // 守卫已在另一线程中释放
        assert_eq!(l.holder(), None);
    }

    #[test]
    #[should_panic(expected = "sleeplock nested acquire: holding spinlock")]
    fn acquire_under_spinlock_panics() {
        let s = SpinLock::new((), "outer");
        let l = SleepLock::new((), "nested");
        let _g = s.lock();
        let _ = l.lock();
    }
}
