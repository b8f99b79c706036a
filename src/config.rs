//! 块缓存的启动参数
//!
//! 锁粒度与回收范围在启动时由 [`BcacheConfig`] 决定，而不是在编译期选择：
//! 同一份内核可以分别以“全局一把锁”（`buckets = 1`）、“按桶分片、本桶回收”
//! 以及“按桶分片、跨桶窃取”三种方式运行。
//!
//! 参数既可以在代码中构造，也可以从内核配置文件的 `[bcache]` 表中读取：
//!
//! ```toml
//! [bcache]
//! nbuf = 30
//! buckets = 13
//! scope = "pool-wide"
//! ```

use serde::Deserialize;

use crate::consts::fs::{NBUCKET, NBUF};
use crate::error::ConfigError;

/// 未命中时回收空闲缓冲块的搜索范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionScope {
    /// 每个桶独占一段互不相交的缓冲块，只在请求块所在的桶内回收。
    /// 不同桶之间永远不会竞争，但某个桶耗尽时即使其他桶有空闲块也会失败。
    BucketLocal,
    /// 桶只是缓冲池上按哈希划分的视图；本桶没有空闲块时，
    /// 在粗粒度表锁保护下从其他桶窃取空闲块。
    PoolWide,
}

/// 块缓存的启动参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BcacheConfig {
    /// 缓冲块总数
    pub nbuf: usize,
    /// 哈希桶数量
    pub buckets: usize,
    /// 回收范围
    pub scope: EvictionScope,
}

impl Default for BcacheConfig {
    fn default() -> Self {
        Self {
            nbuf: NBUF,
            buckets: NBUCKET,
            scope: EvictionScope::PoolWide,
        }
    }
}

#[derive(Deserialize)]
struct KernelToml {
    #[serde(default)]
    bcache: BcacheConfig,
}

impl BcacheConfig {
    pub const fn new(nbuf: usize, buckets: usize, scope: EvictionScope) -> Self {
        Self { nbuf, buckets, scope }
    }

    /// 从内核配置文件中读取 `[bcache]` 表，缺省的字段取默认值。
    /// 文件中的其他表不属于块缓存，直接忽略。
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: KernelToml = toml::from_str(text)?;
        file.bcache.validate()?;
        Ok(file.bcache)
    }

    /// 校验参数：至少一个缓冲块和一个桶；本桶回收时每个桶至少分到一个缓冲块。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nbuf == 0 {
            return Err(ConfigError::ZeroBuffers);
        }
        if self.buckets == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.scope == EvictionScope::BucketLocal && self.nbuf < self.buckets {
            return Err(ConfigError::EmptyBucket { nbuf: self.nbuf, buckets: self.buckets });
        }
        Ok(())
    }

    /// 是否完全分片：完全分片时粗粒度表锁从不被获取。
    pub fn is_sharded(&self) -> bool {
        self.scope == EvictionScope::BucketLocal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = BcacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.nbuf, NBUF);
        assert!(!config.is_sharded());
    }

    #[test]
    fn shipped_kernel_toml() {
        let config = BcacheConfig::from_toml(include_str!("../Kernel.toml")).unwrap();
        assert_eq!(config, BcacheConfig::new(30, 13, EvictionScope::PoolWide));
    }

    #[test]
    fn partial_table_uses_defaults() {
        let config = BcacheConfig::from_toml("[bcache]\nscope = \"bucket-local\"\n").unwrap();
        assert_eq!(config.scope, EvictionScope::BucketLocal);
        assert_eq!(config.nbuf, NBUF);
        assert_eq!(config.buckets, NBUCKET);

        let config = BcacheConfig::from_toml("[memory]\nheap = 4096\n").unwrap();
        assert_eq!(config, BcacheConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            BcacheConfig::new(0, 1, EvictionScope::PoolWide).validate(),
            Err(ConfigError::ZeroBuffers)
        ));
        assert!(matches!(
            BcacheConfig::new(4, 0, EvictionScope::PoolWide).validate(),
            Err(ConfigError::ZeroBuckets)
        ));
        assert!(matches!(
            BcacheConfig::new(4, 8, EvictionScope::BucketLocal).validate(),
            Err(ConfigError::EmptyBucket { nbuf: 4, buckets: 8 })
        ));
        // 跨桶窃取时空桶是允许的
        assert!(BcacheConfig::new(4, 8, EvictionScope::PoolWide).validate().is_ok());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = BcacheConfig::from_toml("[bcache]\nscope = \"everywhere\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = BcacheConfig::from_toml("[bcache]\nnbufs = 3\n").unwrap_err();
        assert!(err.to_string().starts_with("malformed kernel config"));
        assert!(matches!(
            BcacheConfig::from_toml("[bcache]\nnbuf = 0\n"),
            Err(ConfigError::ZeroBuffers)
        ));
    }
}
