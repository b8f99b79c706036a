//! 等待队列
//!
//! 内核线程需要等待某个条件时，把自己挂到等待队列上并让出处理器；
//! 条件满足时，由另一个线程从队列中取出并唤醒。

use std::collections::VecDeque;
use std::thread::{self, Thread};

use crate::spinlock::{SpinLock, SpinLockGuard};
use super::CpuManager;

/// 等待队列，每个元素对应一个正在睡眠的内核线程。
pub struct WaitQueue {
    sleepers: SpinLock<VecDeque<Thread>>,
}

impl WaitQueue {
    pub const fn new(name: &'static str) -> Self {
        Self {
            sleepers: SpinLock::new(VecDeque::new(), name),
        }
    }

    /// # 功能说明
    /// 原子地释放条件锁 `guard` 并进入睡眠，被唤醒后返回。
    ///
    /// # 流程解释
    /// 1. 在仍持有 `guard` 时把当前线程挂入队列，唤醒者必须先拿到同一把条件锁，
    ///    因此不会错过唤醒；
    /// 2. 释放 `guard`，此时本 hart 不能再持有任何自旋锁；
    /// 3. 让出处理器，直到被 `wakeup_one` 唤醒；
    /// 4. 把自己从队列中摘除（可能已被唤醒者摘除）。
    ///
    /// 返回后调用者需要重新获取条件锁并检查条件，唤醒可能是虚假的。
    pub fn sleep<T: ?Sized>(&self, guard: SpinLockGuard<'_, T>) {
        let me = thread::current();
        let id = me.id();
        self.sleepers.lock().push_back(me);
        drop(guard);

        if CpuManager::noff() != 0 {
            panic!("sleep: holding {} spinlock(s)", CpuManager::noff());
        }
        thread::park();

        self.sleepers.lock().retain(|t| t.id() != id);
    }

    /// 唤醒队首的一个睡眠者，返回是否确实有线程被唤醒。
    pub fn wakeup_one(&self) -> bool {
        let first = self.sleepers.lock().pop_front();
        match first {
            Some(t) => {
                t.unpark();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
impl WaitQueue {
    /// 唤醒所有睡眠者。
    pub fn wakeup_all(&self) {
        let all: VecDeque<Thread> = core::mem::take(&mut *self.sleepers.lock());
        for t in all {
            t.unpark();
        }
    }

    /// 当前睡眠者数量
    pub fn len(&self) -> usize {
        self.sleepers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
