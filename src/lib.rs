//! NFMI 会议徽章固件
//!
//! 核心逻辑位于 `common`，目标板与模拟器入口位于 `badge`。

pub use common::*;
