//! 块缓存在多个内核线程之间的行为

use std::any::Any;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use xv6_bcache::{Bcache, BcacheConfig, BlockDevice, EvictionScope, RamDisk};

const DEV: u32 = 1;

fn boot(nbuf: usize, buckets: usize, scope: EvictionScope, disk: &Arc<RamDisk>) -> Bcache {
    xv6_bcache::printf::init_logger(log::LevelFilter::Info);
    let disk: Arc<dyn BlockDevice> = disk.clone();
    Bcache::new(BcacheConfig::new(nbuf, buckets, scope), disk).unwrap()
}

fn panic_message(err: Box<dyn Any + Send>) -> String {
    match err.downcast::<String>() {
        Ok(msg) => *msg,
        Err(err) => err.downcast_ref::<&str>().map(|s| s.to_string()).unwrap_or_default(),
    }
}

#[test]
fn boot_from_kernel_toml() {
    let config = BcacheConfig::from_toml(include_str!("../Kernel.toml")).unwrap();
    let disk: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(64));
    let bcache = Bcache::new(config, disk).unwrap();
    let total: usize = (0..config.buckets).map(|b| bcache.snapshot(b).len()).sum();
    assert_eq!(total, config.nbuf);
}

#[test]
fn read_once_then_hit() {
    let disk = Arc::new(RamDisk::new(64));
    disk.preload(DEV, 9, b"inode");
    let bcache = boot(4, 2, EvictionScope::PoolWide, &disk);

    for _ in 0..2 {
        thread::scope(|s| {
            s.spawn(|| {
                let b = bcache.bread(DEV, 9);
                assert_eq!(&b.data()[..5], b"inode");
            });
        });
    }
    assert_eq!(disk.reads(), 1);
    let stats = bcache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[test]
fn concurrent_miss_reads_disk_once() {
    const K: usize = 8;
    let disk = Arc::new(RamDisk::new(64).with_latency(Duration::from_millis(20)));
    disk.preload(DEV, 33, &[0xab; 64]);
    let bcache = boot(6, 3, EvictionScope::PoolWide, &disk);
    let start = Barrier::new(K);

    thread::scope(|s| {
        for _ in 0..K {
            s.spawn(|| {
                start.wait();
                let b = bcache.bread(DEV, 33);
                assert!(b.is_valid());
                assert_eq!(&b.data()[..64], &[0xab; 64][..]);
            });
        }
    });

    assert_eq!(disk.reads(), 1);
    assert_eq!(bcache.refcnt(DEV, 33), Some(0));
    let owners = (0..3)
        .flat_map(|b| bcache.snapshot(b))
        .filter(|s| s.key.map(|k| k.blockno) == Some(33))
        .count();
    assert_eq!(owners, 1);
}

#[test]
fn bwrite_from_non_holder_is_fatal() {
    let disk = Arc::new(RamDisk::new(64));
    let bcache = boot(2, 1, EvictionScope::PoolWide, &disk);
    let b = bcache.bread(DEV, 4);

    let err = thread::scope(|s| {
        s.spawn(move || {
            let mut b = b;
            b.bwrite();
        })
        .join()
    })
    .unwrap_err();
    assert!(panic_message(err).contains("bwrite: buffer not locked by caller"));
    assert_eq!(disk.writes(), 0);
}

#[test]
fn release_from_non_holder_is_fatal() {
    let disk = Arc::new(RamDisk::new(64));
    let bcache = boot(2, 1, EvictionScope::PoolWide, &disk);
    let b = bcache.bread(DEV, 4);

    let err = thread::scope(|s| s.spawn(move || drop(b)).join()).unwrap_err();
    assert!(panic_message(err).contains("brelse: buffer not locked by caller"));
}

#[test]
fn pinned_block_outlives_eviction_pressure() {
    let disk = Arc::new(RamDisk::new(64));
    let bcache = boot(3, 1, EvictionScope::BucketLocal, &disk);

    // 日志层写入块后钉住它，直到事务提交
    let mut b = bcache.bread(DEV, 20);
    b.data_mut()[0] = 7;
    b.pin();
    drop(b);

    thread::scope(|s| {
        for t in 0..2 {
            let bcache = &bcache;
            s.spawn(move || {
                for blockno in 0..10 {
                    drop(bcache.bread(DEV, 40 + t * 10 + blockno));
                }
            });
        }
    });

    let b = bcache.bread(DEV, 20);
    assert_eq!(b.data()[0], 7, "pinned block was recycled");
    b.unpin();
    drop(b);
    assert_eq!(bcache.refcnt(DEV, 20), Some(0));
    assert_eq!(disk.block(DEV, 20)[0], 0);
}

fn exhaust_home_bucket(scope: EvictionScope) -> thread::Result<()> {
    let disk = Arc::new(RamDisk::new(64));
    let bcache = boot(4, 2, scope, &disk);
    let holders: Vec<_> = [0, 2].iter().map(|&n| bcache.bread(DEV, n)).collect();
    assert!(bcache.snapshot(1).iter().all(|s| s.refcnt == 0));

    let result = thread::scope(|s| s.spawn(|| drop(bcache.bread(DEV, 4))).join());
    drop(holders);
    result
}

#[test]
fn bucket_local_exhaustion_with_free_buckets() {
    let err = exhaust_home_bucket(EvictionScope::BucketLocal).unwrap_err();
    assert!(panic_message(err).contains("bget: no buffers"));
}

#[test]
fn pool_wide_steals_instead_of_failing() {
    assert!(exhaust_home_bucket(EvictionScope::PoolWide).is_ok());
}

#[test]
fn pool_wide_exhaustion_is_fatal() {
    let disk = Arc::new(RamDisk::new(64));
    let bcache = boot(3, 2, EvictionScope::PoolWide, &disk);
    let holders: Vec<_> = (0..3).map(|n| bcache.bread(DEV, n)).collect();

    let err = thread::scope(|s| s.spawn(|| drop(bcache.bread(DEV, 3))).join()).unwrap_err();
    assert!(panic_message(err).contains("bget: no buffers"));
    drop(holders);
}

/// 多个线程随机地对若干块上的计数器做“读-加一-写回”，最终计数必须与操作次数一致
fn counter_stress(nbuf: usize, buckets: usize, scope: EvictionScope) {
    const THREADS: usize = 4;
    const ROUNDS: usize = 300;
    const BLOCKS: u32 = 10;

    let disk = Arc::new(RamDisk::new(64));
    let bcache = boot(nbuf, buckets, scope, &disk);

    let per_thread: Vec<Vec<u32>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let bcache = &bcache;
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(t as u64);
                    let mut done = vec![0u32; BLOCKS as usize];
                    for _ in 0..ROUNDS {
                        let blockno = rng.gen_range(0..BLOCKS);
                        let mut b = bcache.bread(DEV, blockno);
                        let mut word = [0u8; 4];
                        word.copy_from_slice(&b.data()[..4]);
                        let n = u32::from_le_bytes(word) + 1;
                        b.data_mut()[..4].copy_from_slice(&n.to_le_bytes());
                        b.bwrite();
                        done[blockno as usize] += 1;
                    }
                    done
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for blockno in 0..BLOCKS {
        let expected: u32 = per_thread.iter().map(|d| d[blockno as usize]).sum();
        let mut word = [0u8; 4];
        word.copy_from_slice(&disk.block(DEV, blockno)[..4]);
        assert_eq!(u32::from_le_bytes(word), expected, "block {}", blockno);

        let b = bcache.bread(DEV, blockno);
        assert_eq!(&b.data()[..4], &word[..]);
    }

    let stats = bcache.stats();
    assert_eq!(stats.disk_writes, (THREADS * ROUNDS) as u64);
    assert_eq!(stats.hits + stats.misses, (THREADS * ROUNDS) as u64 + u64::from(BLOCKS));
    bcache.report();
}

#[test]
fn counter_stress_single_lock() {
    counter_stress(4, 1, EvictionScope::PoolWide);
}

#[test]
fn counter_stress_bucket_local() {
    counter_stress(12, 3, EvictionScope::BucketLocal);
}

#[test]
fn counter_stress_pool_wide() {
    counter_stress(6, 3, EvictionScope::PoolWide);
}
