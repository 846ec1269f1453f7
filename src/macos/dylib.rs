//! # libproc 符号解析
//!
//! 在运行时用 `dlopen` 打开 `/usr/lib/libproc.dylib`，再用 `dlsym` 解析
//! 三个入口：`proc_listallpids`、`proc_name`、`proc_pidinfo`。
//!
//! ## 生命周期
//! - 只解析一次，结果（成功或失败）缓存在进程级的 `OnceLock` 中
//! - 解析成功后地址只读，可被任意线程无锁并发读取
//! - 库句柄永不 `dlclose`，地址在整个进程生命周期内有效
//!
//! 解析失败属于启动期致命错误：调用方应在启动时调用 [`init`]，
//! 失败就退出。之后每次封装调用都会返回同一个缓存的错误，不会重试。

use std::ffi::{c_int, c_void, CStr};
use std::mem;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// libproc 动态库的固定路径
pub const LIBPROC_PATH: &CStr = c"/usr/lib/libproc.dylib";

// ========================================
// 原生函数签名（来自 <libproc.h>）
// ========================================

/// `int proc_listallpids(void *buffer, int buffersize)`
pub(crate) type ListAllPidsFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;

/// `int proc_name(int pid, void *buffer, uint32_t buffersize)`
pub(crate) type NameFn = unsafe extern "C" fn(c_int, *mut c_void, u32) -> c_int;

/// `int proc_pidinfo(int pid, int flavor, uint64_t arg, void *buffer, int buffersize)`
pub(crate) type PidInfoFn = unsafe extern "C" fn(c_int, c_int, u64, *mut c_void, c_int) -> c_int;

// ========================================
// 原生入口绑定
// ========================================

/// 一个已解析的原生入口：符号名 + 所属库 + 函数地址
#[derive(Debug, Clone, Copy)]
pub struct NativeEntry<F> {
    symbol: &'static CStr,
    library: &'static CStr,
    func: F,
}

impl<F: Copy> NativeEntry<F> {
    /// 符号名
    pub fn symbol(&self) -> &'static CStr {
        self.symbol
    }

    /// 所属动态库路径
    pub fn library(&self) -> &'static CStr {
        self.library
    }

    pub(crate) fn func(&self) -> F {
        self.func
    }
}

/// 已解析的 libproc 入口集合
#[derive(Debug)]
pub struct ProcLibrary {
    pub(crate) listallpids: NativeEntry<ListAllPidsFn>,
    pub(crate) name: NativeEntry<NameFn>,
    pub(crate) pidinfo: NativeEntry<PidInfoFn>,
}

static LIBPROC: OnceLock<Result<ProcLibrary>> = OnceLock::new();

/// 解析 libproc 入口（只在第一次调用时真正执行）
///
/// ## 返回
/// - `Ok(&ProcLibrary)`: 三个符号都已解析
/// - `Err(Error::Unresolved)`: 打开库或解析某个符号失败
///
/// 失败结果同样被缓存，之后每次调用都返回该错误。
pub fn init() -> Result<&'static ProcLibrary> {
    match LIBPROC.get_or_init(ProcLibrary::resolve) {
        Ok(lib) => Ok(lib),
        Err(err) => Err(err.clone()),
    }
}

impl ProcLibrary {
    fn resolve() -> Result<Self> {
        // RTLD_NOW：打开时立即绑定，失败尽早暴露
        let handle =
            unsafe { libc::dlopen(LIBPROC_PATH.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(Error::Unresolved {
                symbol: LIBPROC_PATH.to_string_lossy().into_owned(),
                reason: last_dl_error(),
            });
        }
        log::debug!("opened {}", LIBPROC_PATH.to_string_lossy());

        // handle 有意泄漏：不 dlclose
        let lib = unsafe {
            Self {
                listallpids: lookup(handle, c"proc_listallpids")?,
                name: lookup(handle, c"proc_name")?,
                pidinfo: lookup(handle, c"proc_pidinfo")?,
            }
        };
        Ok(lib)
    }

    /// 动态库路径
    pub fn path(&self) -> &'static CStr {
        LIBPROC_PATH
    }

    /// 所有已解析的符号名
    pub fn symbols(&self) -> [&'static CStr; 3] {
        [
            self.listallpids.symbol(),
            self.name.symbol(),
            self.pidinfo.symbol(),
        ]
    }
}

/// 用 dlsym 解析单个符号并转换为函数指针
///
/// ## Safety
/// `handle` 必须是有效的 dlopen 句柄；`F` 必须是与该符号 C 签名一致的
/// `extern "C"` 函数指针类型。
unsafe fn lookup<F: Copy>(handle: *mut c_void, symbol: &'static CStr) -> Result<NativeEntry<F>> {
    let addr = libc::dlsym(handle, symbol.as_ptr());
    if addr.is_null() {
        return Err(Error::Unresolved {
            symbol: symbol.to_string_lossy().into_owned(),
            reason: last_dl_error(),
        });
    }
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
    log::debug!("resolved {} at {:p}", symbol.to_string_lossy(), addr);

    Ok(NativeEntry {
        symbol,
        library: LIBPROC_PATH,
        func: mem::transmute_copy::<*mut c_void, F>(&addr),
    })
}

/// 读取 dlerror() 的描述
fn last_dl_error() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return "unknown dynamic loader error".to_string();
    }
    let msg = unsafe { CStr::from_ptr(msg) };
    msg.to_string_lossy().into_owned()
}
