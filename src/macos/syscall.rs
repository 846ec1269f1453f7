//! # 原始调用原语
//!
//! 把已解析的 libproc 入口当作普通 `extern "C"` 函数指针调用，并捕获 errno。
//!
//! ## 调用约定
//! - 返回值为 -1 时才读取 errno，其他返回值下 errno 没有意义
//! - 返回 -1 且 errno 非零 → `Error::Os(errno)`；否则返回值就是结果
//! - libproc 的 `proc_name` / `proc_pidinfo` 失败时返回 0 并留下 errno，
//!   这种情况按成功处理，由上层按空结果或大小不符解释
//! - 这一层不检查参数语义，只负责把整数/指针交给 C 函数
//!
//! Rust 线程栈大小固定，调用期间不会被运行时抢占或扩栈，
//! 所以不需要额外的"固定栈"标记。

use std::ffi::{c_int, c_void};

use super::dylib::ProcLibrary;
use crate::error::{Error, Result};

/// 一次原生调用的原始结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawReturn {
    /// C 函数的返回值
    pub ret: c_int,
    /// `ret == -1` 时的 errno，其余情况为 0
    pub errno: c_int,
}

impl RawReturn {
    /// 返回 -1 且 errno 非零时转换为错误
    pub(crate) fn check(self) -> Result<c_int> {
        if self.ret == -1 && self.errno != 0 {
            Err(Error::Os(self.errno))
        } else {
            Ok(self.ret)
        }
    }
}

/// 执行一次原生调用，失败时捕获 errno
///
/// ## Safety
/// `call` 内部的 FFI 调用必须满足目标函数的参数约束
/// （缓冲区指针与大小匹配等）。
#[inline(never)]
pub(crate) unsafe fn raw_call<F: FnOnce() -> c_int>(call: F) -> RawReturn {
    let ret = call();
    // errno 是线程局部变量，必须在调用之后立即读取
    let errno = if ret == -1 { *libc::__error() } else { 0 };
    RawReturn { ret, errno }
}

// ========================================
// 三个入口的薄封装
// ========================================

/// `proc_listallpids(buffer, buffersize)`
///
/// 返回 PID 个数（不是字节数）。`buffer` 为空时返回内核估计的个数。
pub(crate) unsafe fn proc_listallpids(
    lib: &ProcLibrary,
    buffer: *mut c_void,
    buffersize: c_int,
) -> Result<c_int> {
    let f = lib.listallpids.func();
    raw_call(|| f(buffer, buffersize)).check()
}

/// `proc_name(pid, buffer, buffersize)`
///
/// 返回写入的名字长度，不含 NUL。
pub(crate) unsafe fn proc_name(
    lib: &ProcLibrary,
    pid: c_int,
    buffer: *mut c_void,
    buffersize: u32,
) -> Result<c_int> {
    let f = lib.name.func();
    raw_call(|| f(pid, buffer, buffersize)).check()
}

/// `proc_pidinfo(pid, flavor, arg, buffer, buffersize)`
///
/// 返回写入的字节数；`buffer` 为空且 `buffersize` 为 0 时返回需要的字节数。
pub(crate) unsafe fn proc_pidinfo(
    lib: &ProcLibrary,
    pid: c_int,
    flavor: c_int,
    arg: u64,
    buffer: *mut c_void,
    buffersize: c_int,
) -> Result<c_int> {
    let f = lib.pidinfo.func();
    raw_call(|| f(pid, flavor, arg, buffer, buffersize)).check()
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_call_ignores_errno_on_success() {
        let raw = unsafe {
            raw_call(|| {
                *libc::__error() = libc::EBADF;
                7
            })
        };
        assert_eq!(raw, RawReturn { ret: 7, errno: 0 });
        assert_eq!(raw.check(), Ok(7));
    }

    #[test]
    fn test_raw_call_zero_return_with_errno_is_not_error() {
        // proc_name 对不存在的进程返回 0，同时留下 ESRCH
        let raw = unsafe {
            raw_call(|| {
                *libc::__error() = libc::ESRCH;
                0
            })
        };
        assert_eq!(raw.check(), Ok(0));
    }

    #[test]
    fn test_raw_call_captures_errno_on_minus_one() {
        let raw = unsafe {
            raw_call(|| {
                *libc::__error() = libc::EPERM;
                -1
            })
        };
        assert_eq!(raw.errno, libc::EPERM);
        assert_eq!(raw.check(), Err(Error::Os(libc::EPERM)));
    }

    #[test]
    fn test_check_minus_one_without_errno() {
        let raw = RawReturn { ret: -1, errno: 0 };
        assert_eq!(raw.check(), Ok(-1));
    }

    #[test]
    fn test_proc_pidinfo_size_query() {
        let lib = crate::macos::dylib::init().expect("libproc should resolve");
        let pid = std::process::id() as c_int;
        let flavor = crate::types::PidInfoFlavor::ListFds.as_raw();
        let result = unsafe { proc_pidinfo(lib, pid, flavor, 0, std::ptr::null_mut(), 0) };
        let needed = result.expect("size query should succeed");
        assert!(needed > 0);
    }
}
