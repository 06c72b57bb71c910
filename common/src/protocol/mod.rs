pub mod codec;
pub mod frame;
pub mod link;
pub mod record;

use core::fmt;

pub use codec::{decode, decode_frame, encode, DecodeError};
pub use frame::{FrameExtractor, RawFrame};
pub use link::{BadgeLink, HandshakeError, LinkError};
pub use record::IdentityRecord;

// 协议常量
/// 帧头
pub const FRAME_START: u8 = b'B';
/// 帧尾
pub const FRAME_END: u8 = b'E';
/// 身份记录的逻辑长度
pub const RECORD_LEN: usize = 8;
/// 半字节编码后的负载长度
pub const PAYLOAD_LEN: usize = RECORD_LEN * 2;
/// 帧头 + 负载 + 帧尾
pub const FRAME_LEN: usize = PAYLOAD_LEN + 2;
/// 每个半字节的填充高位
pub const NIBBLE_PAD: u8 = 0xD0;
/// NXH2261 准备好接收新发送记录时回送的握手字节
pub const READY_HANDSHAKE: [u8; 2] = *b"RO";

/// 徽章身份类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
#[repr(u8)]
pub enum BadgeType {
    Human = 0,
    Goon = 1,
    Speaker = 2,
    Vendor = 3,
    Press = 4,
    Village = 5,
    Contest = 6,
    Artist = 7,
    Cfp = 8,
    Uber = 9,
}

impl BadgeType {
    pub const ALL: [BadgeType; 10] = [
        BadgeType::Human,
        BadgeType::Goon,
        BadgeType::Speaker,
        BadgeType::Vendor,
        BadgeType::Press,
        BadgeType::Village,
        BadgeType::Contest,
        BadgeType::Artist,
        BadgeType::Cfp,
        BadgeType::Uber,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// 该类型对应的任务标志位（魔法徽章才会计入）
    pub fn quest_flag(self) -> Option<QuestFlags> {
        match self {
            BadgeType::Speaker => Some(QuestFlags::SPEAKER),
            BadgeType::Village => Some(QuestFlags::VILLAGE),
            BadgeType::Contest => Some(QuestFlags::CONTEST),
            BadgeType::Artist => Some(QuestFlags::ARTIST),
            BadgeType::Goon => Some(QuestFlags::GOON),
            _ => None,
        }
    }

    /// 群聊任务中的分组（共 6 组）
    pub fn group_bucket(self) -> u8 {
        match self {
            BadgeType::Human
            | BadgeType::Contest
            | BadgeType::Artist
            | BadgeType::Cfp
            | BadgeType::Uber => 0,
            BadgeType::Goon => 1,
            BadgeType::Speaker => 2,
            BadgeType::Vendor => 3,
            BadgeType::Press => 4,
            BadgeType::Village => 5,
        }
    }

    /// 按名称查找，不区分大小写
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|badge| badge.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            BadgeType::Human => "Human",
            BadgeType::Goon => "Goon",
            BadgeType::Speaker => "Speaker",
            BadgeType::Vendor => "Vendor",
            BadgeType::Press => "Press",
            BadgeType::Village => "Village",
            BadgeType::Contest => "Contest",
            BadgeType::Artist => "Artist",
            BadgeType::Cfp => "CFP",
            BadgeType::Uber => "Uber",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 任务标志位集合（最高位不使用）
///
/// | 位 | 含义 |
/// |----|------|
/// | 0  | 与任何人成功通信 |
/// | 1  | Speaker |
/// | 2  | Village |
/// | 3  | Contest |
/// | 4  | Artist |
/// | 5  | Goon |
/// | 6  | 群聊完成 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub struct QuestFlags(u8);

impl QuestFlags {
    pub const NONE: Self = Self(0);
    pub const ANY_CONTACT: Self = Self(0x01);
    pub const SPEAKER: Self = Self(0x02);
    pub const VILLAGE: Self = Self(0x04);
    pub const CONTEST: Self = Self(0x08);
    pub const ARTIST: Self = Self(0x10);
    pub const GOON: Self = Self(0x20);
    pub const GROUP_COMPLETE: Self = Self(0x40);
    /// 位 1-5
    pub const CATEGORIES: Self = Self(0x3E);
    pub const ALL: Self = Self(0x7F);

    /// 从字节构造，丢弃最高位
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// 已收集的类别数（位 1-5 中置位的个数）
    pub const fn category_count(self) -> u32 {
        (self.0 & Self::CATEGORIES.0).count_ones()
    }
}

/// 按控制台格式输出 8 位二进制
impl fmt::Display for QuestFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}
