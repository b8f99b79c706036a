//! 块缓存层的错误类型
//!
//! 块缓存中的所有运行期错误都是致命的：缓冲块耗尽说明整个可达的缓冲池都被钉住，
//! 违反加锁约定说明调用者存在缺陷，二者都不能在本层恢复。
//! 只有启动参数的校验错误会以 `Result` 的形式返回给调用者。

use thiserror::Error;

/// 块缓存的致命错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BcacheError {
    /// 未命中时搜索范围内没有引用计数为 0 的缓冲块
    #[error("bget: no buffers (dev {dev}, blockno {blockno}, bucket {bucket})")]
    ResourceExhausted { dev: u32, blockno: u32, bucket: usize },

    /// 调用者没有持有操作所要求的锁或引用
    #[error("{op}: {reason}")]
    ProtocolViolation { op: &'static str, reason: &'static str },
}

impl BcacheError {
    pub(crate) const fn not_locked(op: &'static str) -> Self {
        Self::ProtocolViolation { op, reason: "buffer not locked by caller" }
    }
}

/// 块缓存启动参数的校验错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bcache needs at least one buffer")]
    ZeroBuffers,

    #[error("bcache needs at least one bucket")]
    ZeroBuckets,

    #[error("bucket-local scope leaves buckets empty ({nbuf} buffers over {buckets} buckets)")]
    EmptyBucket { nbuf: usize, buckets: usize },

    #[error("malformed kernel config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 报告致命错误并终止当前内核线程。
#[cold]
#[track_caller]
pub fn fatal(err: BcacheError) -> ! {
    log::error!("{}", err);
    panic!("{}", err)
}
