#![cfg_attr(not(any(test, feature = "simulator")), no_std)]

#[macro_use]
pub mod utils;
pub mod config;
pub mod protocol;
pub mod hal;
pub mod storage;
pub mod quest;
pub mod session;

// 重新导出核心模块
pub use config::BadgeConfig;
pub use hal::{Hardware, Indicator, NfmiRadio};
pub use protocol::{BadgeType, IdentityRecord, QuestFlags};
pub use quest::{CycleEvent, Effect, QuestMachine, QuestState};
pub use session::{BadgeSession, CycleReport};
pub use storage::{FlagStore, StoreError};
pub use utils::{IrqChannels, IsrHandles, MainHandles};
