//! NXH2261 串口帧编解码
//!
//! 发送：8 字节记录的每个半字节编码为 `0xD0 | nibble`，得到 16 字节负载，
//! 加上 `'B'` 帧头和 `'E'` 帧尾后按 [`TX_PERMUTATION`] 重排。
//!
//! 接收：负载每两个字节取低半字节拼回一个字节。接收端**不**撤销发送端的
//! 重排，两端运行同一固件，这种不对称在实际通信中是自洽的。

use core::fmt;

use crate::protocol::{
    IdentityRecord, RawFrame, FRAME_END, FRAME_LEN, FRAME_START, NIBBLE_PAD, PAYLOAD_LEN,
    RECORD_LEN,
};

/// 发送帧重排表：第 i 个字节移动到 `TX_PERMUTATION[i]`
///
/// 交换唯一标识四个字节的顺序，补偿物理层的字节序。
pub const TX_PERMUTATION: [usize; FRAME_LEN] =
    [0, 7, 8, 5, 6, 3, 4, 1, 2, 9, 10, 11, 12, 13, 14, 15, 16, 17];

/// 解码错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum DecodeError {
    /// 负载长度不是 16 字节
    Length(usize),
    /// 帧尾之前的数据超出了帧缓冲区
    Overflow,
    /// 未知的徽章类型
    UnknownBadgeType(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Length(len) => write!(f, "payload length {} (expected {})", len, PAYLOAD_LEN),
            DecodeError::Overflow => f.write_str("frame overflowed before footer"),
            DecodeError::UnknownBadgeType(value) => write!(f, "unknown badge type {}", value),
        }
    }
}

/// 将记录编码为 18 字节发送帧
pub fn encode(record: &IdentityRecord) -> [u8; FRAME_LEN] {
    let bytes = record.to_bytes();

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_START;
    frame[FRAME_LEN - 1] = FRAME_END;

    // 每个半字节填充 0xD0
    for (i, byte) in bytes.iter().enumerate() {
        frame[i * 2 + 1] = NIBBLE_PAD | (byte >> 4);
        frame[i * 2 + 2] = NIBBLE_PAD | (byte & 0x0F);
    }

    permute(&mut frame);
    frame
}

/// 解码帧提取器给出的 16 字节负载（不含帧头帧尾）
pub fn decode(payload: &[u8]) -> Result<IdentityRecord, DecodeError> {
    if payload.len() != PAYLOAD_LEN {
        return Err(DecodeError::Length(payload.len()));
    }

    // 去掉每个半字节的 0xD0 填充
    let mut bytes = [0u8; RECORD_LEN];
    for (i, pair) in payload.chunks_exact(2).enumerate() {
        bytes[i] = ((pair[0] & 0x0F) << 4) | (pair[1] & 0x0F);
    }

    IdentityRecord::from_bytes(&bytes)
}

/// 解码提取到的帧
pub fn decode_frame(frame: &RawFrame) -> Result<IdentityRecord, DecodeError> {
    if frame.is_overflowed() {
        return Err(DecodeError::Overflow);
    }
    decode(frame.payload())
}

/// 按发送重排表重排整帧
pub fn permute(frame: &mut [u8; FRAME_LEN]) {
    let mut reordered = [0u8; FRAME_LEN];
    for (i, byte) in frame.iter().enumerate() {
        reordered[TX_PERMUTATION[i]] = *byte;
    }
    *frame = reordered;
}

/// [`permute`] 的逆操作，接收路径不使用
pub fn unpermute(frame: &mut [u8; FRAME_LEN]) {
    let mut restored = [0u8; FRAME_LEN];
    for (i, target) in TX_PERMUTATION.iter().enumerate() {
        restored[i] = frame[*target];
    }
    *frame = restored;
}
