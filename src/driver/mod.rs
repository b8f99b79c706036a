//! 设备驱动模块，目前只有块设备

use crate::fs::Buf;

mod ramdisk;

pub use ramdisk::RamDisk;

/// 块设备驱动接口。
///
/// 块缓存在持有缓冲块睡眠锁的情况下调用 `rw`，驱动可以在传输期间睡眠，
/// 但不能获取该缓冲块的睡眠锁，也不能在持有自旋锁时睡眠。
pub trait BlockDevice: Send + Sync {
    /// 以 `BSIZE` 为单位读写 `buf` 对应的磁盘块：
    /// `writing` 为 `false` 时把磁盘内容读入 `buf`，否则把 `buf` 的内容写入磁盘。
    /// 返回时传输已经完成。
    fn rw(&self, buf: &mut Buf<'_>, writing: bool);
}
