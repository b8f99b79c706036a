//! 定义系统内核的输出方法
//!
//! `print!`/`println!` 直接写控制台；内核各模块的日志通过 `log` 门面输出，
//! 由 [`KernelLogger`] 转发到同一个控制台。

use core::fmt;
use std::io::{self, Write as _};

use log::{LevelFilter, Log, Metadata, Record};

use crate::process::CpuManager;
use crate::spinlock::SpinLock;

/// 零大小类型（ZST）的打印结构体，用于在多个 CPU 之间对打印操作进行排序。
struct Print;

impl fmt::Write for Print {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        io::stderr().write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

/// 核心打印函数（被宏调用）
///
/// 使用自旋锁保证多核输出不会交错。
/// 此函数被声明为pub，因为需要在宏中调用
pub fn _print(args: fmt::Arguments<'_>) {
    use fmt::Write;
    static PRINT: SpinLock<()> = SpinLock::new((), "print");

    let guard = PRINT.lock();
    // 控制台写失败时没有更底层的地方可以报告
    let _ = Print.write_fmt(args);
    drop(guard);
}

/// 在终端输出一串字符
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::printf::_print(format_args!($($arg)*));
    };
}

/// 在终端输出一行字符
#[macro_export]
macro_rules! println {
    () => {$crate::print!("\n")};
    ($fmt:expr) => {$crate::print!(concat!($fmt, "\n"))};
    ($fmt:expr, $($arg:tt)*) => {
        $crate::print!(concat!($fmt, "\n"), $($arg)*)
    };
}

/// `log` 门面的内核控制台后端，每条日志带上级别、hart 编号与模块路径。
pub struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        println!(
            "[{:>5}][hart {}][{}] {}",
            record.level(),
            CpuManager::cpu_id(),
            record.module_path().unwrap_or("kernel"),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// 安装内核日志后端。重复调用只会调整日志级别。
pub fn init_logger(level: LevelFilter) {
    // 已经安装过时 set_logger 返回错误，忽略即可
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
