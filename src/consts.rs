//! 内核参数

/// 文件系统相关的常量
pub mod fs {
    /// 任何一次文件系统操作最多写入的块数
    pub const MAXOPBLOCKS: usize = 10;

    /// 磁盘块缓存的缓冲块数量
    pub const NBUF: usize = MAXOPBLOCKS * 3;

    /// 块缓存的哈希桶数量
    pub const NBUCKET: usize = 13;

    /// 块大小（字节）
    pub const BSIZE: usize = 1024;

    /// 文件系统的总块数
    pub const FSSIZE: u32 = 10000;
}
