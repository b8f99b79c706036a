//! 进程与处理器
//!
//! 块缓存层只需要调度器的一小部分能力：识别当前 hart 与当前进程、
//! 嵌套地关闭/恢复中断，以及在等待队列上睡眠与唤醒。

mod cpu;
mod wait;

pub use cpu::CpuManager;
pub use cpu::{push_off, pop_off};
pub use wait::WaitQueue;
