use core::fmt;

use crate::config::UPDATE_PULSE_MS;
use crate::hal::{Hardware, NfmiRadio};
use crate::protocol::{decode_frame, encode, DecodeError, FrameExtractor, IdentityRecord, READY_HANDSHAKE};
use crate::utils::{ByteSource, RxReader, RX_RING_SIZE};

/// 握手失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum HandshakeError {
    /// 接收缓冲区读空仍未见到 `'R'`
    NotReady,
    /// `'R'` 之后缺少字节
    Incomplete,
    /// `'R'` 之后不是 `'O'`
    Desync(u8),
}

/// 链路错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum LinkError {
    Handshake(HandshakeError),
    /// 驱动 NXH_UPDATE 或串口发送失败
    Transport,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Handshake(HandshakeError::NotReady) => f.write_str("no ready handshake from radio"),
            LinkError::Handshake(HandshakeError::Incomplete) => f.write_str("ready handshake truncated"),
            LinkError::Handshake(HandshakeError::Desync(byte)) => {
                write!(f, "ready handshake desync (got 0x{:02X})", byte)
            }
            LinkError::Transport => f.write_str("radio transport failure"),
        }
    }
}

impl From<HandshakeError> for LinkError {
    fn from(err: HandshakeError) -> Self {
        LinkError::Handshake(err)
    }
}

/// 与 NXH2261 之间的串口链路
///
/// 持有接收环形缓冲区的读取端，负责入站记录的提取和出站记录的更新。
pub struct BadgeLink<'a> {
    rx: RxReader<'a, RX_RING_SIZE>,
    extractor: FrameExtractor,
}

impl<'a> BadgeLink<'a> {
    pub fn new(rx: RxReader<'a, RX_RING_SIZE>) -> Self {
        Self {
            rx,
            extractor: FrameExtractor::new(),
        }
    }

    /// 提取并解码下一条入站记录
    ///
    /// 缓冲区中没有完整帧时返回 None，未完成的帧留到下次继续。
    pub fn next_record(&mut self) -> Option<Result<IdentityRecord, DecodeError>> {
        let frame = self.extractor.try_next_frame(&mut self.rx)?;
        Some(decode_frame(&frame))
    }

    /// 丢弃缓冲区中剩余的完整帧，返回丢弃的帧数
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.extractor.try_next_frame(&mut self.rx).is_some() {
            discarded += 1;
        }
        discarded
    }

    /// 缓冲区中尚未处理的字节数
    pub fn pending_bytes(&self) -> usize {
        self.rx.len()
    }

    /// 把本机记录交给 NXH2261 作为新的广播内容
    ///
    /// 拉高 NXH_UPDATE 再拉低，等待回送 `"RO"` 后写入整帧。调用方必须保证
    /// 串口接收中断处于开启状态，否则握手字节无法进入缓冲区。
    pub fn update_outgoing<H: Hardware>(
        &mut self,
        hw: &mut H,
        record: &IdentityRecord,
    ) -> Result<(), LinkError> {
        let frame = encode(record);
        log_debug!("Loading outgoing record {}", record);

        // 握手会消耗缓冲区字节，残缺帧已无法续接
        self.extractor.reset();

        hw.get_radio()
            .set_update_line(true)
            .map_err(|_| LinkError::Transport)?;
        hw.delay_ms(UPDATE_PULSE_MS);
        hw.get_radio()
            .set_update_line(false)
            .map_err(|_| LinkError::Transport)?;
        hw.delay_ms(UPDATE_PULSE_MS);

        self.await_ready()?;

        hw.get_radio()
            .send_frame(&frame)
            .map_err(|_| LinkError::Transport)
    }

    /// 在缓冲区中寻找 `'R'`，其后必须紧跟 `'O'`
    fn await_ready(&mut self) -> Result<(), HandshakeError> {
        let [ready, ok] = READY_HANDSHAKE;

        loop {
            match self.rx.next_byte() {
                Some(byte) if byte == ready => break,
                Some(_) => continue,
                None => return Err(HandshakeError::NotReady),
            }
        }

        match self.rx.next_byte() {
            Some(byte) if byte == ok => Ok(()),
            Some(byte) => Err(HandshakeError::Desync(byte)),
            None => Err(HandshakeError::Incomplete),
        }
    }
}
