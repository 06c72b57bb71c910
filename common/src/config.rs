use crate::protocol::BadgeType;

// 时序常量（毫秒）
/// 收到数据包后显示当前状态的时间
pub const ACK_DISPLAY_MS: u32 = 500;
/// 状态推进前后的停顿
pub const ADVANCE_PAUSE_MS: u32 = 500;
/// 完成任务后播放庆祝音乐之后的停顿
pub const COMPLETION_PAUSE_MS: u32 = 1500;
/// Attract 模式呼吸灯的唤醒周期
pub const HEARTBEAT_PERIOD_MS: u32 = 1000;
/// Complete 模式闪烁动画之间的休眠时间
pub const SPARKLE_PERIOD_MS: u32 = 1500;
/// NXH_UPDATE 脉冲的高/低电平保持时间
pub const UPDATE_PULSE_MS: u32 = 100;
/// 硬件事务失败后重试前的等待
pub const RETRY_SETTLE_MS: u32 = 100;

/// 游戏数据所在扇区，从程序存储末尾倒数
pub const SECTOR_INDEX_FROM_END: u32 = 1;

/// 芯片唯一标识寄存器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiliconId {
    pub uid_mh: u32,
    pub uid_ml: u32,
    pub uid_l: u32,
    pub sdid: u32,
}

impl SiliconId {
    /// 压缩为 32 位标识（不同芯片之间可能冲突）
    pub fn fold(&self) -> u32 {
        self.uid_mh ^ self.uid_ml ^ self.uid_l ^ self.sdid
    }
}

/// 徽章配置，开机时交给会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeConfig {
    /// 本徽章的身份类型
    pub badge_type: BadgeType,
    /// 是否为魔法徽章
    pub magic: bool,
    /// 开机时清除“已接触”标志，要求重新与他人接触
    pub rearm_contact_on_boot: bool,
}

impl BadgeConfig {
    pub const fn new(badge_type: BadgeType) -> Self {
        Self {
            badge_type,
            magic: false,
            rearm_contact_on_boot: false,
        }
    }

    pub const fn magic(badge_type: BadgeType) -> Self {
        Self {
            badge_type,
            magic: true,
            rearm_contact_on_boot: false,
        }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self::new(BadgeType::Human)
    }
}
