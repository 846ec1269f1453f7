//! # procinfo
//!
//! 通过 macOS 的 libproc 读取进程信息。
//!
//! ## 功能
//! - 统计 / 列出所有进程 PID
//! - 获取进程名
//! - 获取 BSD 进程信息（`proc_bsdinfo`）
//! - 列出进程打开的文件描述符（`proc_fdinfo`）
//! - 任意 flavor 的 `proc_pidinfo` 透传
//!
//! ## 使用
//! ```no_run
//! fn main() -> procinfo::Result<()> {
//!     // 启动时解析 libproc 符号，失败直接退出
//!     procinfo::init()?;
//!
//!     println!("Running processes: {}", procinfo::list_all_pids()?);
//!
//!     let pid = std::process::id() as i32;
//!     println!("Current process: {}", procinfo::pid_name(pid)?);
//!     Ok(())
//! }
//! ```
//!
//! 部分系统进程（kernel_task、launchd）在安全策略下会返回空名字或错误，
//! 这是正常现象。

pub mod error;
pub mod types;

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod buffer;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "macos")]
pub use macos::*;

#[cfg(not(target_os = "macos"))]
mod unsupported;
#[cfg(not(target_os = "macos"))]
pub use unsupported::*;

pub use error::{Error, Result};
pub use types::{FdType, PidInfoFlavor, ProcBsdInfo, ProcFdInfo, ProcStatus};
