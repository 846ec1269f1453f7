//! # 缓冲区协议辅助函数
//!
//! libproc 的变长查询都遵循"先问大小，再取数据"的两次调用约定。
//! 这里是调用之后的纯计算部分，与平台无关：
//! - 定长记录：写入字节数必须恰好等于记录大小
//! - 变长数组：按第二次调用的实际写入量截断，只缩短不变长
//! - 缓冲区被填满时，可能还有条目没取到

use std::ffi::c_int;

use crate::error::{Error, Result};

/// 校验定长记录查询写入的字节数
///
/// 少写或多写都说明 flavor 与记录布局不匹配，报告为 `SizeMismatch`（EINVAL）。
pub(crate) fn check_record_size(written: usize, expected: usize) -> Result<()> {
    if written != expected {
        return Err(Error::SizeMismatch {
            expected,
            actual: written,
        });
    }
    Ok(())
}

/// 按第二次调用的实际写入量截断缓冲区
///
/// `written` 的单位由 `unit` 决定：返回字节数时传单条记录大小，
/// 返回条目数时传 1。负数按 0 处理，超过缓冲区长度时保持原长度。
pub(crate) fn truncate_to_written<T>(buf: &mut Vec<T>, written: c_int, unit: usize) {
    let count = written.max(0) as usize / unit.max(1);
    buf.truncate(count.min(buf.len()));
}

/// 写入的条目数是否占满了缓冲区
pub(crate) fn is_buffer_full(written: c_int, capacity: usize) -> bool {
    written.max(0) as usize >= capacity
}
