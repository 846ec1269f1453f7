//! # libproc 记录布局
//!
//! 这个模块定义与 `<sys/proc_info.h>` 逐字节兼容的结构体：
//! - `ProcBsdInfo` 对应 `struct proc_bsdinfo`（136 字节）
//! - `ProcFdInfo` 对应 `struct proc_fdinfo`（8 字节）
//!
//! ## 布局约束
//! 字段顺序、保留字段和对齐都必须与 C 结构体完全一致，
//! 否则内核写入的数据会被静默地错位解析。
//! 每个字段的偏移量都在编译期用 `offset_of!` 断言。
//!
//! 这些类型不依赖 macOS，可以在任何平台上编译和测试。

use std::mem::{offset_of, size_of};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

// ========================================
// proc_pidinfo flavor
// ========================================

/// `proc_pidinfo` 的 flavor 参数，决定内核填充哪种记录
///
/// 只有 `ListFds` 和 `BsdInfo` 有对应的类型化封装，
/// 其余值仅供 `proc_pid_info` 直接透传。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PidInfoFlavor {
    /// PROC_PIDLISTFDS：`proc_fdinfo` 数组
    ListFds = 1,
    /// PROC_PIDTBSDINFO：`proc_bsdinfo`
    BsdInfo = 3,
    /// PROC_PIDTASKINFO：`proc_taskinfo`
    TaskInfo = 4,
    /// PROC_PIDTHREADINFO：`proc_threadinfo`
    ThreadInfo = 5,
    /// PROC_PIDVNODEPATHINFO：`proc_vnodepathinfo`
    VnodePathInfo = 9,
}

impl PidInfoFlavor {
    /// 传给 C 函数的原始值
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

// ========================================
// 文件描述符类型
// ========================================

// PROX_FDTYPE_* 常量（来自 sys/proc_info.h）
const PROX_FDTYPE_ATALK: u32 = 0;
const PROX_FDTYPE_VNODE: u32 = 1;
const PROX_FDTYPE_SOCKET: u32 = 2;
const PROX_FDTYPE_PSHM: u32 = 3;
const PROX_FDTYPE_PSEM: u32 = 4;
const PROX_FDTYPE_KQUEUE: u32 = 5;
const PROX_FDTYPE_PIPE: u32 = 6;
const PROX_FDTYPE_FSEVENTS: u32 = 7;
const PROX_FDTYPE_NETPOLICY: u32 = 9;
const PROX_FDTYPE_CHANNEL: u32 = 10;
const PROX_FDTYPE_NEXUS: u32 = 11;

/// 文件描述符指向的内核对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FdType {
    /// AppleTalk / 本地 socket（历史遗留）
    Atalk,
    /// 普通文件、目录、设备
    Vnode,
    /// 网络 socket
    Socket,
    /// POSIX 共享内存
    Pshm,
    /// POSIX 信号量
    Psem,
    Kqueue,
    Pipe,
    FsEvents,
    NetPolicy,
    Channel,
    Nexus,
    Unknown(u32),
}

impl FdType {
    /// 从 `proc_fdtype` 原始值转换
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            PROX_FDTYPE_ATALK => FdType::Atalk,
            PROX_FDTYPE_VNODE => FdType::Vnode,
            PROX_FDTYPE_SOCKET => FdType::Socket,
            PROX_FDTYPE_PSHM => FdType::Pshm,
            PROX_FDTYPE_PSEM => FdType::Psem,
            PROX_FDTYPE_KQUEUE => FdType::Kqueue,
            PROX_FDTYPE_PIPE => FdType::Pipe,
            PROX_FDTYPE_FSEVENTS => FdType::FsEvents,
            PROX_FDTYPE_NETPOLICY => FdType::NetPolicy,
            PROX_FDTYPE_CHANNEL => FdType::Channel,
            PROX_FDTYPE_NEXUS => FdType::Nexus,
            other => FdType::Unknown(other),
        }
    }
}

impl std::fmt::Display for FdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FdType::Atalk => write!(f, "ATALK"),
            FdType::Vnode => write!(f, "VNODE"),
            FdType::Socket => write!(f, "SOCKET"),
            FdType::Pshm => write!(f, "PSHM"),
            FdType::Psem => write!(f, "PSEM"),
            FdType::Kqueue => write!(f, "KQUEUE"),
            FdType::Pipe => write!(f, "PIPE"),
            FdType::FsEvents => write!(f, "FSEVENTS"),
            FdType::NetPolicy => write!(f, "NETPOLICY"),
            FdType::Channel => write!(f, "CHANNEL"),
            FdType::Nexus => write!(f, "NEXUS"),
            FdType::Unknown(n) => write!(f, "UNKNOWN({})", n),
        }
    }
}

// ========================================
// 进程状态
// ========================================

// p_stat 取值（来自 sys/proc.h）
const SIDL: u32 = 1;
const SRUN: u32 = 2;
const SSLEEP: u32 = 3;
const SSTOP: u32 = 4;
const SZOMB: u32 = 5;

/// `pbi_status` 表示的进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcStatus {
    /// 正在 fork
    Idle,
    Run,
    Sleep,
    Stop,
    Zombie,
    Unknown(u32),
}

impl ProcStatus {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            SIDL => ProcStatus::Idle,
            SRUN => ProcStatus::Run,
            SSLEEP => ProcStatus::Sleep,
            SSTOP => ProcStatus::Stop,
            SZOMB => ProcStatus::Zombie,
            other => ProcStatus::Unknown(other),
        }
    }
}

impl std::fmt::Display for ProcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcStatus::Idle => write!(f, "IDLE"),
            ProcStatus::Run => write!(f, "RUN"),
            ProcStatus::Sleep => write!(f, "SLEEP"),
            ProcStatus::Stop => write!(f, "STOP"),
            ProcStatus::Zombie => write!(f, "ZOMBIE"),
            ProcStatus::Unknown(n) => write!(f, "UNKNOWN({})", n),
        }
    }
}

// ========================================
// struct proc_bsdinfo
// ========================================

/// 进程命令名长度（MAXCOMLEN）
pub const MAXCOMLEN: usize = 16;

/// `struct proc_bsdinfo` 的 Rust 镜像
///
/// 由 `proc_pidinfo(pid, PROC_PIDTBSDINFO, ...)` 填充。
/// `rfu_1`、`e_tdev`、`e_tpgid` 是占位字段，不能删除。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcBsdInfo {
    /// 64bit、系统进程等标志位（PROC_FLAG_*）
    pub flags: u32,
    /// p_stat：SRUN、SZOMB 等
    pub status: u32,
    /// 退出状态
    pub xstatus: u32,
    pub pid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub gid: u32,
    pub ruid: u32,
    pub rgid: u32,
    pub svuid: u32,
    pub svgid: u32,
    pub rfu_1: u32,
    /// 命令名，最多 16 字节，不保证以 NUL 结尾
    pub comm: [u8; MAXCOMLEN],
    /// 长进程名，最多 32 字节
    pub name: [u8; 2 * MAXCOMLEN],
    pub nfiles: u32,
    pub pgid: u32,
    pub pjobc: u32,
    /// 控制终端设备号（保留）
    pub e_tdev: u32,
    /// 控制终端进程组（保留）
    pub e_tpgid: u32,
    pub nice: i32,
    /// 启动时间（struct timeval 展开）
    pub start_tvsec: u64,
    pub start_tvusec: u64,
}

/// `proc_bsdinfo` 的字节大小
pub const PROC_BSD_INFO_SIZE: usize = 136;

const _: () = {
    assert!(size_of::<ProcBsdInfo>() == PROC_BSD_INFO_SIZE);
    assert!(offset_of!(ProcBsdInfo, flags) == 0);
    assert!(offset_of!(ProcBsdInfo, pid) == 12);
    assert!(offset_of!(ProcBsdInfo, svgid) == 40);
    assert!(offset_of!(ProcBsdInfo, rfu_1) == 44);
    assert!(offset_of!(ProcBsdInfo, comm) == 48);
    assert!(offset_of!(ProcBsdInfo, name) == 64);
    assert!(offset_of!(ProcBsdInfo, nfiles) == 96);
    assert!(offset_of!(ProcBsdInfo, e_tdev) == 108);
    assert!(offset_of!(ProcBsdInfo, e_tpgid) == 112);
    assert!(offset_of!(ProcBsdInfo, nice) == 116);
    assert!(offset_of!(ProcBsdInfo, start_tvsec) == 120);
    assert!(offset_of!(ProcBsdInfo, start_tvusec) == 128);
};

impl ProcBsdInfo {
    /// 短命令名（`pbi_comm`），截断到第一个 NUL
    pub fn comm(&self) -> String {
        until_nul(&self.comm)
    }

    /// 长进程名（`pbi_name`），为空时回退到 `comm`
    ///
    /// 与 libproc 的 `proc_name` 取名规则一致。
    pub fn name(&self) -> String {
        if self.name[0] != 0 {
            until_nul(&self.name)
        } else {
            self.comm()
        }
    }

    /// 解码后的进程状态
    pub fn proc_status(&self) -> ProcStatus {
        ProcStatus::from_raw(self.status)
    }

    /// 进程启动时间
    pub fn start_time(&self) -> SystemTime {
        // tv_usec 总是小于 1_000_000，乘 1000 不会溢出 u32
        let nanos = (self.start_tvusec % 1_000_000) as u32 * 1_000;
        UNIX_EPOCH + Duration::new(self.start_tvsec, nanos)
    }
}

// ========================================
// struct proc_fdinfo
// ========================================

/// `struct proc_fdinfo` 的 Rust 镜像
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcFdInfo {
    /// 文件描述符编号
    pub proc_fd: i32,
    /// PROX_FDTYPE_* 原始值
    pub proc_fdtype: u32,
}

/// `proc_fdinfo` 的字节大小
pub const PROC_FD_INFO_SIZE: usize = 8;

const _: () = {
    assert!(size_of::<ProcFdInfo>() == PROC_FD_INFO_SIZE);
    assert!(offset_of!(ProcFdInfo, proc_fd) == 0);
    assert!(offset_of!(ProcFdInfo, proc_fdtype) == 4);
};

impl ProcFdInfo {
    /// 解码后的描述符类型
    pub fn fd_type(&self) -> FdType {
        FdType::from_raw(self.proc_fdtype)
    }
}

/// 把 C 字符缓冲区转成 String：截断到第一个 NUL，非 UTF-8 字节做有损替换
pub(crate) fn until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
