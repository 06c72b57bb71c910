//! 日志宏
//!
//! - `kl27` 目标板：转发到 defmt
//! - `simulator`：打印到标准输出
//! - 其他情况：空操作

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "kl27")]
        ::defmt::info!($($arg)*);
        #[cfg(feature = "simulator")]
        ::std::println!("[INFO] {}", ::core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "kl27")]
        ::defmt::warn!($($arg)*);
        #[cfg(feature = "simulator")]
        ::std::println!("[WARN] {}", ::core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "kl27")]
        ::defmt::error!($($arg)*);
        #[cfg(feature = "simulator")]
        ::std::eprintln!("[ERROR] {}", ::core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "kl27")]
        ::defmt::debug!($($arg)*);
        #[cfg(feature = "simulator")]
        ::std::println!("[DEBUG] {}", ::core::format_args!($($arg)*));
    }};
}
