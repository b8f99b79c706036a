//! 多核内核的磁盘块缓存层
//!
//! 块缓存是文件系统、日志层与系统调用访问磁盘的唯一入口。
//! 缓冲块池按块号哈希划分为若干个桶，每个桶持有独立的自旋锁与 LRU 链表，
//! 每个缓冲块持有一把睡眠锁，用于跨越磁盘 I/O 的独占访问。
//!
//! 内核线程在宿主机上由操作系统线程充当：每个线程拥有独立的 hart 编号与进程号，
//! 睡眠与唤醒通过线程的 park/unpark 完成。

#![warn(rust_2018_idioms)]

#[macro_use]
extern crate bitflags;

#[macro_use]
pub mod printf;

pub mod config;
pub mod consts;
pub mod driver;
pub mod error;
pub mod fs;
pub mod process;
pub mod sleeplock;
pub mod spinlock;

pub use config::{BcacheConfig, EvictionScope};
pub use driver::{BlockDevice, RamDisk};
pub use error::{BcacheError, ConfigError};
pub use fs::{Bcache, BcacheStats, BlockId, Buf, BufData, BufFlags, SlotInfo};
