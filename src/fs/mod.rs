//! 文件系统模块
//!
//! 目前只包含块缓存层：日志层与 inode 层都通过它读写磁盘块。

mod bio;

pub use bio::{Bcache, BcacheStats, BlockId, Buf, BufData, BufFlags, SlotInfo};
