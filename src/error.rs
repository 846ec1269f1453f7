//! # 错误类型
//!
//! libproc 的错误来源只有三类：
//! - 原生调用设置了 errno（无效 PID、权限不足等），原样透传
//! - 调用成功但返回的字节数与记录大小不符，视为 EINVAL
//! - 启动时符号解析失败
//!
//! 返回 0 个进程、空进程名、没有文件描述符都不是错误，统一返回 `Ok`。

use std::io;

/// 本 crate 的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

/// libproc 调用错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// 原生调用返回了非零 errno
    #[error("libproc call failed: {}", os_message(.0))]
    Os(i32),

    /// 调用成功，但写入的字节数与期望的记录大小不一致
    #[error("unexpected record size: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// 无法从 libproc.dylib 解析符号
    #[error("failed to resolve `{symbol}`: {reason}")]
    Unresolved { symbol: String, reason: String },

    /// 当前平台没有 libproc
    #[error("libproc is only available on macOS")]
    Unsupported,
}

impl Error {
    /// 对应的 errno 值（如果有）
    ///
    /// `SizeMismatch` 报告为 `EINVAL`，与原生调用的参数错误保持一致。
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Os(errno) => Some(*errno),
            Error::SizeMismatch { .. } => Some(libc::EINVAL),
            Error::Unresolved { .. } | Error::Unsupported => None,
        }
    }

    /// 是否为权限不足（EPERM / EACCES）
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.raw_os_error(), Some(libc::EPERM) | Some(libc::EACCES))
    }
}

/// errno 对应的系统错误描述
fn os_message(errno: &i32) -> String {
    io::Error::from_raw_os_error(*errno).to_string()
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err.raw_os_error() {
            Some(errno) => io::Error::from_raw_os_error(errno),
            None => io::Error::new(io::ErrorKind::Unsupported, err),
        }
    }
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_is_einval() {
        let err = Error::SizeMismatch {
            expected: 136,
            actual: 0,
        };
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
        assert_eq!(
            err.to_string(),
            "unexpected record size: expected 136 bytes, got 0"
        );

        let io_err: io::Error = err.into();
        assert_eq!(io_err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_os_error_passthrough() {
        let err = Error::Os(libc::ESRCH);
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
        assert!(!err.is_permission_denied());
        assert!(Error::Os(libc::EPERM).is_permission_denied());

        let io_err: io::Error = err.into();
        assert_eq!(io_err.raw_os_error(), Some(libc::ESRCH));
    }

    #[test]
    fn test_unresolved_has_no_errno() {
        let err = Error::Unresolved {
            symbol: "proc_name".to_string(),
            reason: "symbol not found".to_string(),
        };
        assert_eq!(err.raw_os_error(), None);
        assert!(err.to_string().contains("proc_name"));

        let io_err: io::Error = Error::Unsupported.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Unsupported);
    }
}
