use core::fmt;

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::protocol::{BadgeType, DecodeError, QuestFlags, RECORD_LEN};

/// 身份记录的 8 字节逻辑布局
///
/// 与目标板内存中的结构体布局一致：唯一标识按小端存放。
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Clone, Copy)]
struct RecordLayout {
    unique_id: U32<LittleEndian>,
    badge_type: u8,
    magic: u8,
    quest_flags: u8,
    reserved: u8,
}

/// 徽章之间交换的身份记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub struct IdentityRecord {
    /// 唯一标识
    pub unique_id: u32,
    /// 徽章类型
    pub badge_type: BadgeType,
    /// 魔法令牌
    pub magic: bool,
    /// 任务标志
    pub quest_flags: QuestFlags,
    /// 预留字段，发送方填 0，接收方不校验
    pub reserved: u8,
}

impl IdentityRecord {
    pub fn new(unique_id: u32, badge_type: BadgeType, magic: bool, quest_flags: QuestFlags) -> Self {
        Self {
            unique_id,
            badge_type,
            magic,
            quest_flags,
            reserved: 0,
        }
    }

    /// 序列化为 8 字节
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let layout = RecordLayout {
            unique_id: U32::new(self.unique_id),
            badge_type: self.badge_type as u8,
            magic: self.magic as u8,
            quest_flags: self.quest_flags.bits(),
            reserved: self.reserved,
        };

        let mut bytes = [0u8; RECORD_LEN];
        bytes.copy_from_slice(layout.as_bytes());
        bytes
    }

    /// 从 8 字节还原
    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Result<Self, DecodeError> {
        let layout = RecordLayout::read_from(&bytes[..]).ok_or(DecodeError::Length(bytes.len()))?;
        let badge_type = BadgeType::from_u8(layout.badge_type)
            .ok_or(DecodeError::UnknownBadgeType(layout.badge_type))?;

        Ok(Self {
            unique_id: layout.unique_id.get(),
            badge_type,
            magic: layout.magic != 0,
            quest_flags: QuestFlags::from_bits(layout.quest_flags),
            reserved: layout.reserved,
        })
    }
}

/// 按调试控制台格式输出
impl fmt::Display for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X}{:02X}{:02X}{:02X}{:02X} (type {}, magic {}, flags {})",
            self.unique_id,
            self.badge_type as u8,
            self.magic as u8,
            self.quest_flags.bits(),
            self.reserved,
            self.badge_type,
            if self.magic { "yes" } else { "no" },
            self.quest_flags,
        )
    }
}
