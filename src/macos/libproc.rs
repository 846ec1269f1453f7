//! # libproc 类型化封装
//!
//! 这个模块在原始调用原语之上提供安全的 Rust 接口：
//! - 统计 / 列出所有进程 PID
//! - 获取进程名
//! - 通用 `proc_pidinfo` 透传
//! - 获取 BSD 进程信息、列出进程的文件描述符
//!
//! ## 主要 API
//! - `list_all_pids()` - 进程数量
//! - `all_pids()` - 所有 PID
//! - `pid_name(pid)` - 进程名（最多约 32 字符）
//! - `proc_pid_info(...)` - 任意 flavor 的原始查询
//! - `proc_bsd_info(pid)` - `proc_bsdinfo` 记录
//! - `list_pid_fds(pid)` - `proc_fdinfo` 列表
//!
//! ## 错误处理
//! 原生调用设置的 errno 原样返回，不重试。
//! 空结果（0 个描述符、空进程名）不是错误。

use std::ffi::{c_int, c_void};
use std::mem;
use std::ptr;

use super::dylib;
use super::syscall::{proc_listallpids, proc_name, proc_pidinfo};
use crate::buffer::{check_record_size, is_buffer_full, truncate_to_written};
use crate::error::Result;
use crate::types::{until_nul, PidInfoFlavor, ProcBsdInfo, ProcFdInfo};

// ========================================
// 常量定义
// ========================================

/// 进程名缓冲区大小
///
/// MAXCOMLEN 只有 16，长名字也只有 32，但 proc_name 要求缓冲区不小于 pbi_name，
/// 这里留足余量。
const PROC_NAME_BUF_SIZE: usize = 2 * 1024;

/// 单个 PID 的字节宽度
const PID_SIZE: usize = mem::size_of::<libc::pid_t>();

/// PID 缓冲区在估计值之外多留的条目数
const PID_HEADROOM: usize = 32;

/// 单条 proc_fdinfo 的字节宽度
const FD_INFO_SIZE: usize = mem::size_of::<ProcFdInfo>();

// ========================================
// 公开 API 函数
// ========================================

/// 解析 libproc 入口
///
/// 应在程序启动时调用一次；失败时调用方应直接退出。
/// 不调用也可以，第一次封装调用会触发同样的解析。
pub fn init() -> Result<()> {
    dylib::init().map(|_| ())
}

/// 获取系统中的进程数量
///
/// ## 实现说明
/// - 调用 `proc_listallpids(NULL, 0)`，只询问大小，不取数据
/// - 该函数已经把内核返回的字节数除以 `sizeof(pid_t)`，返回值就是个数
/// - 空缓冲区时内核会在实际进程数上留一点余量，因此结果是估计值
pub fn list_all_pids() -> Result<usize> {
    let lib = dylib::init()?;
    let count = unsafe { proc_listallpids(lib, ptr::null_mut(), 0) }?;
    Ok(count.max(0) as usize)
}

/// 获取系统中所有进程的 PID 列表
///
/// ## 实现流程
/// 1. 空缓冲区调用，得到估计的 PID 个数
/// 2. 按估计值加余量分配缓冲区，再次调用
/// 3. 缓冲区被填满时可能还有进程没取到，扩容重试
/// 4. 按最后一次调用返回的个数截断（两次之间进程可能增减）
///
/// 结果包含 PID 0（kernel_task）。
pub fn all_pids() -> Result<Vec<i32>> {
    let lib = dylib::init()?;

    let estimate = unsafe { proc_listallpids(lib, ptr::null_mut(), 0) }?;
    if estimate <= 0 {
        return Ok(Vec::new());
    }

    let mut pids: Vec<libc::pid_t> = vec![0; estimate as usize + PID_HEADROOM];

    loop {
        let buf = pids.as_mut_ptr() as *mut c_void;
        let buf_size = (pids.len() * PID_SIZE) as c_int;
        let count = unsafe { proc_listallpids(lib, buf, buf_size) }?;

        // 如果缓冲区满了，可能有更多 PID，扩展并重试
        if is_buffer_full(count, pids.len()) {
            pids.resize(pids.len() * 2, 0);
            continue;
        }

        // proc_listallpids 返回的是条目数
        truncate_to_written(&mut pids, count, 1);
        return Ok(pids);
    }
}

/// 获取进程名
///
/// ## 返回
/// - `Ok(String)`: 进程名，可能为空
/// - `Err(Error::Os)`: 原生调用返回 -1 并设置了 errno
///
/// 进程不存在或没有权限时 `proc_name` 返回 0，结果是空字符串而不是错误；
/// 系统进程在安全策略下也常常拿不到名字。
pub fn pid_name(pid: i32) -> Result<String> {
    let lib = dylib::init()?;
    let mut name_buf = vec![0u8; PROC_NAME_BUF_SIZE];

    let len = unsafe {
        proc_name(
            lib,
            pid,
            name_buf.as_mut_ptr() as *mut c_void,
            name_buf.len() as u32,
        )
    }?;

    if len <= 0 {
        return Ok(String::new());
    }

    // 只看返回的有效区间，在其中找 NUL
    let span = &name_buf[..(len as usize).min(name_buf.len())];
    Ok(until_nul(span))
}

/// 通用 `proc_pidinfo` 查询
///
/// 直接透传 flavor、附加参数和缓冲区，返回实际写入的字节数；
/// `buffer` 为空且 `buffersize` 为 0 时返回需要的字节数。
///
/// 不校验 flavor 与缓冲区是否匹配。写入字节数小于期望的记录大小
/// 说明布局不一致，应由上层调用方按错误处理（参见 [`proc_bsd_info`]）。
///
/// # Safety
/// `buffer` 必须为空，或指向至少 `buffersize` 字节的可写内存，
/// 且内存布局与 `flavor` 对应的 C 结构体一致。
pub unsafe fn proc_pid_info(
    pid: i32,
    flavor: PidInfoFlavor,
    arg: u64,
    buffer: *mut c_void,
    buffersize: i32,
) -> Result<usize> {
    let lib = dylib::init()?;
    let written = proc_pidinfo(lib, pid, flavor.as_raw(), arg, buffer, buffersize)?;
    Ok(written.max(0) as usize)
}

/// 查询某个 flavor 需要的缓冲区字节数（空缓冲区调用）
pub fn pid_info_size(pid: i32, flavor: PidInfoFlavor, arg: u64) -> Result<usize> {
    unsafe { proc_pid_info(pid, flavor, arg, ptr::null_mut(), 0) }
}

/// 获取进程的 BSD 信息
///
/// 写入字节数必须恰好等于 `size_of::<ProcBsdInfo>()`（136），
/// 否则返回 `Error::SizeMismatch`（errno 语义为 EINVAL）。
pub fn proc_bsd_info(pid: i32) -> Result<ProcBsdInfo> {
    let mut info = ProcBsdInfo::default();
    let size = mem::size_of::<ProcBsdInfo>();

    let written = unsafe {
        proc_pid_info(
            pid,
            PidInfoFlavor::BsdInfo,
            0,
            &mut info as *mut ProcBsdInfo as *mut c_void,
            size as i32,
        )
    }?;

    check_record_size(written, size)?;
    Ok(info)
}

/// 列出进程打开的文件描述符
///
/// ## 实现流程
/// 1. 空缓冲区调用 `proc_pidinfo(PROC_PIDLISTFDS)`，得到需要的字节数
/// 2. 为 0 或负数时返回空列表（没有描述符或权限不足）
/// 3. 分配 `需要字节数 / 8` 条记录，第二次调用填充
/// 4. 按第二次调用实际写入的字节数截断
pub fn list_pid_fds(pid: i32) -> Result<Vec<ProcFdInfo>> {
    let lib = dylib::init()?;
    let flavor = PidInfoFlavor::ListFds.as_raw();

    // ========================================
    // Step 1: 查询需要多大的缓冲区
    // ========================================
    let needed = unsafe { proc_pidinfo(lib, pid, flavor, 0, ptr::null_mut(), 0) }?;
    if needed <= 0 {
        return Ok(Vec::new());
    }

    let mut fds = vec![ProcFdInfo::default(); needed as usize / FD_INFO_SIZE];
    if fds.is_empty() {
        return Ok(fds);
    }

    // ========================================
    // Step 2: 实际获取 FD 列表
    // ========================================
    let buf = fds.as_mut_ptr() as *mut c_void;
    let buf_size = (fds.len() * FD_INFO_SIZE) as c_int;
    let written = unsafe { proc_pidinfo(lib, pid, flavor, 0, buf, buf_size) }?;

    // 第二次的结果才是准的，只会缩短不会变长
    truncate_to_written(&mut fds, written, FD_INFO_SIZE);
    Ok(fds)
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FdType;

    fn current_pid() -> i32 {
        std::process::id() as i32
    }

    #[test]
    fn test_list_all_pids() {
        let count = list_all_pids().expect("Should count PIDs");
        // 至少应该有一些进程，但不会多得离谱
        assert!(count >= 10, "only {} processes", count);
        assert!(count < 10_000, "{} processes", count);
        println!("Found {} processes", count);
    }

    #[test]
    fn test_all_pids_contains_self() {
        let pids = all_pids().expect("Should list PIDs");
        assert!(pids.len() >= 10);
        assert!(pids.contains(&current_pid()));
        assert!(pids.iter().all(|&pid| pid >= 0));
    }

    #[test]
    fn test_pid_name_current_process() {
        let name = pid_name(current_pid()).expect("Should get current process name");
        assert!(!name.is_empty());
        assert!(!name.contains('\0'));
        println!("Current process name: {:?}", name);
    }

    #[test]
    fn test_pid_name_parent_process() {
        let ppid = unsafe { libc::getppid() };
        let name = pid_name(ppid).expect("Should get parent process name");
        assert!(!name.is_empty());
    }

    #[test]
    fn test_pid_name_system_processes() {
        // kernel_task / launchd：没有权限时得到空字符串，而不是错误
        for pid in [0, 1] {
            let name = pid_name(pid).expect("system process name should not fail");
            println!("pid_name({}) = {:?}", pid, name);
        }
    }

    #[test]
    fn test_pid_name_invalid_pid() {
        // proc_name 对不存在的进程返回 0，残留的 errno 不算失败
        assert_eq!(pid_name(99_999), Ok(String::new()));
        assert_eq!(pid_name(-1), Ok(String::new()));
    }

    #[test]
    fn test_proc_bsd_info_current_process() {
        let info = proc_bsd_info(current_pid()).expect("Should get BSD info");
        assert_eq!(info.pid as i32, current_pid());
        assert_eq!(info.ppid as i32, unsafe { libc::getppid() });
        assert_eq!(info.uid, unsafe { libc::getuid() });
        assert!(!info.comm().is_empty());
        assert!(info.start_time() <= std::time::SystemTime::now());
    }

    #[test]
    fn test_proc_bsd_info_invalid_pid() {
        // 没有写入任何字节，按记录大小不符报告
        let err = proc_bsd_info(99_999).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_proc_pid_info_bsd_size() {
        let mut info = ProcBsdInfo::default();
        let result = unsafe {
            proc_pid_info(
                current_pid(),
                PidInfoFlavor::BsdInfo,
                0,
                &mut info as *mut ProcBsdInfo as *mut c_void,
                mem::size_of::<ProcBsdInfo>() as i32,
            )
        };
        let written = result.expect("Should query BSD info");
        assert_eq!(written, 136);
    }

    #[test]
    fn test_pid_info_size_for_fds() {
        let needed = pid_info_size(current_pid(), PidInfoFlavor::ListFds, 0)
            .expect("Should query FD list size");
        assert!(needed >= 3 * FD_INFO_SIZE);
        assert_eq!(needed % FD_INFO_SIZE, 0);
    }

    #[test]
    fn test_list_pid_fds_has_stdio() {
        let fds = list_pid_fds(current_pid()).expect("Should list FDs");
        assert!(fds.len() >= 3, "only {} fds", fds.len());
        for fd in 0..3 {
            assert!(fds.iter().any(|info| info.proc_fd == fd), "fd {} missing", fd);
        }
        assert!(fds.iter().all(|info| info.proc_fd >= 0));
    }

    #[test]
    fn test_list_pid_fds_sees_new_file() {
        let file = std::fs::File::open("/dev/null").expect("Should open /dev/null");
        let raw = std::os::unix::io::AsRawFd::as_raw_fd(&file);

        let fds = list_pid_fds(current_pid()).expect("Should list FDs");
        let entry = fds
            .iter()
            .find(|info| info.proc_fd == raw)
            .expect("opened fd should be listed");
        assert_eq!(entry.fd_type(), FdType::Vnode);
    }

    #[test]
    fn test_list_pid_fds_stable_between_calls() {
        let first = list_pid_fds(current_pid()).expect("Should list FDs");
        let second = list_pid_fds(current_pid()).expect("Should list FDs");
        // 标准输入输出在两次调用之间不会被关闭
        for fd in 0..3 {
            assert!(first.iter().any(|info| info.proc_fd == fd));
            assert!(second.iter().any(|info| info.proc_fd == fd));
        }
    }

    #[test]
    fn test_list_pid_fds_invalid_pid() {
        let fds = list_pid_fds(99_999).expect("missing process is not an error");
        assert!(fds.is_empty());
    }

    #[test]
    fn test_concurrent_callers() {
        let pid = current_pid();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(move || pid_name(pid))).collect();
            for handle in handles {
                let result = handle.join().expect("thread panicked");
                let name = result.expect("Should get name");
                assert!(!name.is_empty());
            }
        });
    }
}
