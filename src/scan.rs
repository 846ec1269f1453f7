//! # 进程扫描模块
//!
//! 把 libproc 封装的结果整理成可输出的结构：
//! 1. 并行扫描所有进程，得到类似 `ps` 的列表
//! 2. 把 `ProcBsdInfo` / `ProcFdInfo` 转成可序列化的视图
//!
//! 拿不到名字的进程（权限不足或已退出）直接跳过。

use std::time::UNIX_EPOCH;

use anyhow::Result;
use procinfo::{FdType, ProcBsdInfo, ProcFdInfo, ProcStatus};
use rayon::prelude::*;
use serde::Serialize;

// ========================================
// 单个进程的扫描结果
// ========================================

/// `ps` 子命令的一行
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    /// 进程 ID
    pub pid: i32,
    /// 父进程 ID（拿不到 BSD 信息时为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppid: Option<i32>,
    /// 有效 uid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    /// 进程状态
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcStatus>,
    /// 进程名（可能为空）
    pub name: String,
    /// 打开的文件描述符数量（只在 --fds 时统计）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fds_count: Option<usize>,
}

// ========================================
// 扫描选项
// ========================================

/// 扫描过滤条件
#[derive(Debug, Default, Clone)]
pub struct ScanOptions {
    /// 只保留该 uid 的进程
    pub uid: Option<u32>,
    /// 是否统计文件描述符
    pub count_fds: bool,
}

/// 扫描所有进程
///
/// ## 流程
/// 1. 获取所有 PID
/// 2. 并行查询每个进程的名字和 BSD 信息
/// 3. 按 uid 过滤
/// 4. 按 PID 排序
pub fn scan_all_processes(opts: &ScanOptions) -> Result<Vec<ProcessResult>> {
    let pids = procinfo::all_pids()?;
    log::debug!("scanning {} pids", pids.len());

    let mut results: Vec<ProcessResult> = pids
        .into_par_iter()
        .filter_map(|pid| scan_process(pid, opts))
        .collect();

    results.sort_by_key(|r| r.pid);
    Ok(results)
}

fn scan_process(pid: i32, opts: &ScanOptions) -> Option<ProcessResult> {
    // 获取进程名（失败时跳过）
    let name = match procinfo::pid_name(pid) {
        Ok(name) => name,
        Err(err) => {
            log::debug!("skip pid {}: {}", pid, err);
            return None;
        }
    };

    let bsd = match procinfo::proc_bsd_info(pid) {
        Ok(info) => Some(info),
        Err(err) => {
            log::debug!("no BSD info for pid {}: {}", pid, err);
            None
        }
    };

    if let Some(uid) = opts.uid {
        if bsd.map(|info| info.uid) != Some(uid) {
            return None;
        }
    }

    let fds_count = if opts.count_fds {
        procinfo::list_pid_fds(pid).ok().map(|fds| fds.len())
    } else {
        None
    };

    Some(ProcessResult {
        pid,
        ppid: bsd.map(|info| info.ppid as i32),
        uid: bsd.map(|info| info.uid),
        status: bsd.map(|info| info.proc_status()),
        name,
        fds_count,
    })
}

// ========================================
// 记录视图
// ========================================

/// `proc_bsdinfo` 的可读视图
#[derive(Debug, Clone, Serialize)]
pub struct BsdSummary {
    pub pid: u32,
    pub ppid: u32,
    pub pgid: u32,
    pub uid: u32,
    pub gid: u32,
    pub ruid: u32,
    pub rgid: u32,
    pub svuid: u32,
    pub svgid: u32,
    pub status: ProcStatus,
    pub xstatus: u32,
    pub flags: u32,
    pub nice: i32,
    pub nfiles: u32,
    pub comm: String,
    pub name: String,
    /// 启动时间（Unix 秒）
    pub start_time: u64,
}

impl From<&ProcBsdInfo> for BsdSummary {
    fn from(info: &ProcBsdInfo) -> Self {
        Self {
            pid: info.pid,
            ppid: info.ppid,
            pgid: info.pgid,
            uid: info.uid,
            gid: info.gid,
            ruid: info.ruid,
            rgid: info.rgid,
            svuid: info.svuid,
            svgid: info.svgid,
            status: info.proc_status(),
            xstatus: info.xstatus,
            flags: info.flags,
            nice: info.nice,
            nfiles: info.nfiles,
            comm: info.comm(),
            name: info.name(),
            start_time: info
                .start_time()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// `proc_fdinfo` 的可读视图
#[derive(Debug, Clone, Serialize)]
pub struct FdSummary {
    pub fd: i32,
    pub fd_type: FdType,
}

impl From<&ProcFdInfo> for FdSummary {
    fn from(info: &ProcFdInfo) -> Self {
        Self {
            fd: info.proc_fd,
            fd_type: info.fd_type(),
        }
    }
}
