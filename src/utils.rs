//! 浏览器控制台日志与时间工具。原生目标（单元测试）下日志为空操作。

#[cfg(target_arch = "wasm32")]
pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(_message: &str) {}

#[cfg(target_arch = "wasm32")]
pub fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(_message: &str) {}

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::utils::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::utils::warn(&format!($($t)*)))
}

/// 当前时间的 ISO 8601 字符串，用于对局记录。
#[cfg(target_arch = "wasm32")]
pub fn now_iso() -> String {
    String::from(web_sys::js_sys::Date::new_0().to_iso_string())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_iso() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    format!("@{secs}")
}
