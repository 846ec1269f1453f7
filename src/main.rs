//! # procinfo
//!
//! macOS CLI 工具，通过 libproc 查看进程信息。
//!
//! ## 功能
//! - 统计 / 列出所有进程 PID
//! - 查询进程名
//! - 查看 BSD 进程信息
//! - 列出进程打开的文件描述符
//! - 并行扫描所有进程（类似 ps）
//!
//! ## 使用
//! ```bash
//! # 进程数量
//! procinfo count
//!
//! # 当前 shell 的 BSD 信息
//! procinfo bsd $$
//!
//! # 某个进程的文件描述符，JSON 输出
//! procinfo --json fds 1234
//!
//! # 扫描当前用户的进程（查看其他用户的进程需要 sudo）
//! procinfo ps --uid $(id -u) --fds
//! ```

use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

mod scan;

// ========================================
// CLI 参数定义
// ========================================

/// macOS 进程信息查看工具
#[derive(Parser)]
#[command(name = "procinfo")]
#[command(version)]
#[command(about = "Inspect macOS processes through libproc")]
struct Cli {
    /// JSON 格式输出
    #[arg(long, global = true)]
    json: bool,

    /// 显示调试信息（等价于 RUST_LOG=debug）
    #[arg(long, global = true)]
    debug: bool,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 支持的子命令
#[derive(Subcommand)]
enum Commands {
    /// 显示运行中的进程数量
    Count,
    /// 列出所有进程 PID
    Pids,
    /// 查询进程名
    Name {
        /// 进程 ID
        #[arg(allow_negative_numbers = true)]
        pid: i32,
    },
    /// 显示进程的 BSD 信息 (默认当前进程)
    Bsd {
        /// 进程 ID
        #[arg(allow_negative_numbers = true)]
        pid: Option<i32>,
    },
    /// 列出进程打开的文件描述符 (默认当前进程)
    Fds {
        /// 进程 ID
        #[arg(allow_negative_numbers = true)]
        pid: Option<i32>,
    },
    /// 扫描所有进程
    Ps {
        /// 只显示该 uid 的进程
        #[arg(long)]
        uid: Option<u32>,

        /// 统计每个进程打开的文件描述符数量
        #[arg(long)]
        fds: bool,
    },
}

// ========================================
// 主函数
// ========================================

fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 初始化日志：RUST_LOG 优先，其次 --debug
    let default_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // 启动时解析 libproc 符号，失败视为致命错误
    if let Err(e) = procinfo::init().context("Failed to load libproc") {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    // 执行对应的子命令
    let result = match cli.command {
        Commands::Count => run_count(cli.json),
        Commands::Pids => run_pids(cli.json),
        Commands::Name { pid } => run_name(pid, cli.json),
        Commands::Bsd { pid } => run_bsd(pid.unwrap_or_else(current_pid), cli.json),
        Commands::Fds { pid } => run_fds(pid.unwrap_or_else(current_pid), cli.json),
        Commands::Ps { uid, fds } => run_ps(
            scan::ScanOptions {
                uid,
                count_fds: fds,
            },
            cli.json,
        ),
    };

    // 处理错误
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn current_pid() -> i32 {
    process::id() as i32
}

/// JSON 格式输出
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

// ========================================
// 子命令实现
// ========================================

fn run_count(json: bool) -> Result<()> {
    let count = procinfo::list_all_pids().context("Failed to count processes")?;
    if json {
        print_json(&serde_json::json!({ "count": count }))
    } else {
        println!("Running processes: {}", count);
        Ok(())
    }
}

fn run_pids(json: bool) -> Result<()> {
    let pids = procinfo::all_pids().context("Failed to list processes")?;
    if json {
        return print_json(&pids);
    }
    for pid in &pids {
        println!("{}", pid);
    }
    Ok(())
}

fn run_name(pid: i32, json: bool) -> Result<()> {
    let name = procinfo::pid_name(pid)
        .with_context(|| format!("Failed to get name of pid {}", pid))?;
    if json {
        return print_json(&serde_json::json!({ "pid": pid, "name": name }));
    }
    if name.is_empty() {
        // 系统进程在安全策略下常常没有名字
        println!("{}\t-", pid);
    } else {
        println!("{}\t{}", pid, name);
    }
    Ok(())
}

fn run_bsd(pid: i32, json: bool) -> Result<()> {
    let info = procinfo::proc_bsd_info(pid)
        .with_context(|| format!("Failed to get BSD info of pid {}", pid))?;
    let summary = scan::BsdSummary::from(&info);
    if json {
        return print_json(&summary);
    }

    println!("{:<10}{}", "PID", summary.pid);
    println!("{:<10}{}", "PPID", summary.ppid);
    println!("{:<10}{}", "PGID", summary.pgid);
    println!(
        "{:<10}{} (real {}, saved {})",
        "UID", summary.uid, summary.ruid, summary.svuid
    );
    println!(
        "{:<10}{} (real {}, saved {})",
        "GID", summary.gid, summary.rgid, summary.svgid
    );
    println!("{:<10}{}", "STATUS", summary.status);
    println!("{:<10}{}", "NICE", summary.nice);
    println!("{:<10}{}", "FILES", summary.nfiles);
    println!("{:<10}{}", "COMM", summary.comm);
    println!("{:<10}{}", "NAME", summary.name);
    println!("{:<10}{}", "STARTED", summary.start_time);
    Ok(())
}

fn run_fds(pid: i32, json: bool) -> Result<()> {
    let fds = procinfo::list_pid_fds(pid)
        .with_context(|| format!("Failed to list file descriptors of pid {}", pid))?;
    let summaries: Vec<scan::FdSummary> = fds.iter().map(scan::FdSummary::from).collect();
    if json {
        return print_json(&summaries);
    }

    println!("{:<8}\t{:<12}", "FD", "TYPE");
    for fd in &summaries {
        println!("{:<8}\t{:<12}", fd.fd, fd.fd_type);
    }
    println!("\nTotal: {} file descriptors", summaries.len());
    Ok(())
}

fn run_ps(opts: scan::ScanOptions, json: bool) -> Result<()> {
    let results = scan::scan_all_processes(&opts)?;
    if json {
        return print_json(&results);
    }

    // 打印表头
    println!(
        "{:<8}\t{:<8}\t{:<6}\t{:<8}\t{:<6}\t{}",
        "PID", "PPID", "UID", "STATUS", "FDS", "NAME"
    );

    let dash = || "-".to_string();
    for res in &results {
        let name = if res.name.is_empty() {
            "-"
        } else {
            res.name.as_str()
        };
        println!(
            "{:<8}\t{:<8}\t{:<6}\t{:<8}\t{:<6}\t{}",
            res.pid,
            res.ppid.map(|p| p.to_string()).unwrap_or_else(dash),
            res.uid.map(|u| u.to_string()).unwrap_or_else(dash),
            res.status.map(|s| s.to_string()).unwrap_or_else(dash),
            res.fds_count.map(|n| n.to_string()).unwrap_or_else(dash),
            name,
        );
    }

    println!("\nTotal: {} processes", results.len());
    Ok(())
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["procinfo", "fds", "42", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Fds { pid: Some(42) }));
    }

    #[test]
    fn test_parse_negative_pid() {
        let cli = Cli::try_parse_from(["procinfo", "name", "-1"]).unwrap();
        assert!(matches!(cli.command, Commands::Name { pid: -1 }));
    }

    #[test]
    fn test_parse_ps_options() {
        let args = ["procinfo", "--debug", "ps", "--uid", "501", "--fds"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::Ps { uid, fds } => {
                assert_eq!(uid, Some(501));
                assert!(fds);
            }
            _ => panic!("expected ps"),
        }
    }
}
