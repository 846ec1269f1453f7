//! # 非 macOS 平台
//!
//! 与 `macos::libproc` 相同的接口，全部返回 `Error::Unsupported`，
//! 让依赖方和命令行工具在其他平台上也能编译。

use std::ffi::c_void;

use crate::error::{Error, Result};
use crate::types::{PidInfoFlavor, ProcBsdInfo, ProcFdInfo};

pub fn init() -> Result<()> {
    Err(Error::Unsupported)
}

pub fn list_all_pids() -> Result<usize> {
    Err(Error::Unsupported)
}

pub fn all_pids() -> Result<Vec<i32>> {
    Err(Error::Unsupported)
}

pub fn pid_name(_pid: i32) -> Result<String> {
    Err(Error::Unsupported)
}

/// # Safety
/// 与 macOS 版本的约束相同；此实现不会访问 `buffer`。
pub unsafe fn proc_pid_info(
    _pid: i32,
    _flavor: PidInfoFlavor,
    _arg: u64,
    _buffer: *mut c_void,
    _buffersize: i32,
) -> Result<usize> {
    Err(Error::Unsupported)
}

pub fn pid_info_size(_pid: i32, _flavor: PidInfoFlavor, _arg: u64) -> Result<usize> {
    Err(Error::Unsupported)
}

pub fn proc_bsd_info(_pid: i32) -> Result<ProcBsdInfo> {
    Err(Error::Unsupported)
}

pub fn list_pid_fds(_pid: i32) -> Result<Vec<ProcFdInfo>> {
    Err(Error::Unsupported)
}
