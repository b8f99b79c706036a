//! 处理器状态管理，用于记录当前内核线程所在的 hart 与中断开关

use core::cell::Cell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// 下一个分配的 hart 编号
static NEXT_HART: AtomicUsize = AtomicUsize::new(0);

/// 下一个分配的进程号，0 保留给“无持有者”
static NEXT_PID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CPU: Cpu = Cpu::new();
}

/// 单个内核线程独占的处理器记录。
///
/// 每个内核线程在首次访问时被分配一个 hart 编号和一个进程号，
/// 此后不会迁移，因此“当前 CPU”与“当前进程”在整个线程生命周期内保持不变。
/// `sie` 模拟 `sstatus.SIE` 位，`noff`/`intena` 与 xv6 的 `push_off`/`pop_off` 语义一致。
struct Cpu {
    id: usize,
    pid: usize,
    /// `push_off` 的嵌套深度
    noff: Cell<u32>,
    /// 第一次 `push_off` 之前中断是否开启
    intena: Cell<bool>,
    sie: Cell<bool>,
}

impl Cpu {
    fn new() -> Self {
        Self {
            id: NEXT_HART.fetch_add(1, Ordering::Relaxed),
            pid: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            noff: Cell::new(0),
            intena: Cell::new(false),
            sie: Cell::new(true),
        }
    }
}

/// 当前 CPU 与进程身份的查询入口。
pub struct CpuManager;

impl CpuManager {
    /// 当前内核线程所在的 hart 编号。
    #[inline]
    pub fn cpu_id() -> usize {
        CPU.with(|c| c.id)
    }

    /// 当前内核线程的进程号，睡眠锁用它记录持有者。
    #[inline]
    pub fn my_pid() -> usize {
        CPU.with(|c| c.pid)
    }

    /// `push_off` 的当前嵌套深度，等于本 hart 正持有的自旋锁数量。
    #[inline]
    pub fn noff() -> u32 {
        CPU.with(|c| c.noff.get())
    }

    /// 当前 hart 的中断是否开启。
    #[inline]
    pub fn intr_get() -> bool {
        CPU.with(|c| c.sie.get())
    }
}

/// # 功能说明
/// 关闭当前 hart 的中断并增加嵌套计数。
/// 与 `pop_off()` 成对使用，只有最外层的 `push_off()` 会记录之前的中断状态。
///
/// # 流程解释
/// 1. 读取当前中断状态后关闭中断；
/// 2. 若嵌套计数为 0，记录之前的中断状态到 `intena`；
/// 3. 嵌套计数加 1。
pub fn push_off() {
    CPU.with(|c| {
        let old = c.sie.get();
        c.sie.set(false);
        if c.noff.get() == 0 {
            c.intena.set(old);
        }
        c.noff.set(c.noff.get() + 1);
    })
}

/// # 功能说明
/// 撤销一次 `push_off()`。嵌套计数归零且之前中断为开启状态时，重新开启中断。
///
/// # 可能的错误
/// - 调用时中断处于开启状态，panic `"pop_off(): interruptable"`；
/// - 嵌套计数已为 0，panic `"pop_off(): count not match"`。
pub fn pop_off() {
    CPU.with(|c| {
        if c.sie.get() {
            panic!("pop_off(): interruptable");
        }
        let noff = match c.noff.get().checked_sub(1) {
            Some(noff) => noff,
            None => panic!("pop_off(): count not match"),
        };
        c.noff.set(noff);
        if noff == 0 && c.intena.get() {
            c.sie.set(true);
        }
    })
}
