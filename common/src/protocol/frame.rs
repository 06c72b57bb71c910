use heapless::Vec;

use crate::protocol::{FRAME_END, FRAME_START};
use crate::utils::ByteSource;

/// 帧缓冲区上限，正常负载为 16 字节
pub const MAX_FRAME_PAYLOAD: usize = 32;

/// 提取到的原始帧负载（不含帧头帧尾）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    payload: Vec<u8, MAX_FRAME_PAYLOAD>,
    overflowed: bool,
}

impl RawFrame {
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// 帧尾之前的数据超出了缓冲区，超出部分已丢弃
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// 寻找帧头
    Hunting,
    /// 已找到帧头，收集负载直到帧尾
    Collecting,
}

/// 帧提取器
///
/// 从接收字节流中寻找 `'B'` ... `'E'` 帧。字节流读空时保留扫描进度并返回 None，
/// 下次调用从中断处继续，不会阻塞。帧头之前的噪声字节被丢弃。
///
/// 负载字节全部带 0xD0 填充，不可能等于帧头，收集过程中再次遇到 `'B'`
/// 说明上一帧已残缺，从新帧头重新开始。
pub struct FrameExtractor {
    state: ScanState,
    payload: Vec<u8, MAX_FRAME_PAYLOAD>,
    overflowed: bool,
}

impl FrameExtractor {
    pub const fn new() -> Self {
        Self {
            state: ScanState::Hunting,
            payload: Vec::new(),
            overflowed: false,
        }
    }

    /// 尝试提取下一帧
    pub fn try_next_frame<S: ByteSource>(&mut self, source: &mut S) -> Option<RawFrame> {
        loop {
            let byte = source.next_byte()?;

            match self.state {
                ScanState::Hunting => {
                    if byte == FRAME_START {
                        self.begin();
                    }
                }
                ScanState::Collecting => {
                    if byte == FRAME_END {
                        self.state = ScanState::Hunting;
                        let frame = RawFrame {
                            payload: core::mem::take(&mut self.payload),
                            overflowed: self.overflowed,
                        };
                        self.overflowed = false;
                        return Some(frame);
                    }

                    if byte == FRAME_START {
                        self.begin();
                    } else if self.payload.push(byte).is_err() {
                        self.overflowed = true;
                    }
                }
            }
        }
    }

    /// 当前是否处于帧中间（已见帧头、未见帧尾）
    pub fn is_mid_frame(&self) -> bool {
        self.state == ScanState::Collecting
    }

    /// 丢弃未完成的帧
    pub fn reset(&mut self) {
        self.state = ScanState::Hunting;
        self.payload.clear();
        self.overflowed = false;
    }

    fn begin(&mut self) {
        self.state = ScanState::Collecting;
        self.payload.clear();
        self.overflowed = false;
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}
