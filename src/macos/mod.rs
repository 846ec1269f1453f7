//! # macOS 模块
//!
//! 这个模块包含所有 macOS 特定的实现，也就是对 libproc 的 FFI 调用：
//! - `dylib`: 运行时解析 libproc 符号
//! - `syscall`: 捕获 errno 的原始调用原语
//! - `libproc`: 类型化封装
//!
//! 其他平台见 `unsupported` 模块。

pub mod dylib;
pub mod libproc;
mod syscall;

// 重新导出常用函数，方便在 crate 根使用
pub use dylib::{NativeEntry, ProcLibrary, LIBPROC_PATH};
pub use libproc::{
    all_pids, init, list_all_pids, list_pid_fds, pid_info_size, pid_name, proc_bsd_info,
    proc_pid_info,
};
