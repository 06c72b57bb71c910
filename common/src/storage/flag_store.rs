use core::fmt;

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes};

use crate::config::SECTOR_INDEX_FROM_END;
use crate::hal::{FlashError, FlashInterface, Hardware};

/// 存储值的字节数
const VALUE_BYTES: usize = 4;

/// 扇区中的存储映像：每个 32 位字只存一个字节，高字节在前
#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy)]
struct FlagImage {
    words: [U32<LittleEndian>; VALUE_BYTES],
}

impl FlagImage {
    fn encode(value: u32) -> Self {
        let mut words = [U32::new(0); VALUE_BYTES];
        for (i, word) in words.iter_mut().enumerate() {
            word.set((value >> (24 - i * 8)) & 0xFF);
        }
        Self { words }
    }

    /// 整个映像仍是擦除状态
    fn is_erased(&self) -> bool {
        self.words.iter().all(|word| word.get() == u32::MAX)
    }

    /// 取出标志字节
    ///
    /// 前三个字必须为 0，最后一个字只有最低字节可以非零，否则映像是
    /// 擦除后未写完的残留。
    fn flags(&self) -> Option<u8> {
        let (last, upper) = self.words.split_last()?;
        if upper.iter().any(|word| word.get() != 0) || last.get() > 0xFF {
            return None;
        }
        Some(last.get() as u8)
    }
}

/// 持久化失败：两次尝试都未能写入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum StoreError {
    Persistence(FlashError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Persistence(err) => write!(f, "flag persistence failed: {}", err),
        }
    }
}

/// 任务标志的掉电保存
///
/// 占用程序 Flash 的最后一个扇区。未初始化的扇区读出全 1。
pub struct FlagStore {
    address: u32,
}

impl FlagStore {
    /// 根据 Flash 几何参数定位存储扇区
    pub fn locate<F: FlashInterface>(flash: &F) -> Self {
        let address =
            flash.base_address() + flash.capacity() - SECTOR_INDEX_FROM_END * flash.block_size();
        Self { address }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    /// 读取保存的标志
    ///
    /// 扇区未初始化，或写入中途掉电留下残缺映像时返回 None。
    pub fn read<F: FlashInterface>(&self, flash: &mut F) -> Result<Option<u8>, FlashError> {
        let mut image = FlagImage::encode(0);
        flash.read(self.address, image.as_bytes_mut())?;

        if image.is_erased() {
            return Ok(None);
        }
        let flags = image.flags();
        if flags.is_none() {
            log_warn!("Flag image incomplete, treating store as uninitialized");
        }
        Ok(flags)
    }

    /// 擦除扇区并写入标志，失败后重试一次
    ///
    /// 擦除和编程期间屏蔽全部中断，无论成功与否都会恢复。
    pub fn write<H: Hardware>(&self, hw: &mut H, flags: u8) -> Result<(), StoreError> {
        let image = FlagImage::encode(u32::from(flags));

        if let Err(err) = self.write_once(hw, &image) {
            log_warn!("Flash write failed ({}), retrying", err);
            self.write_once(hw, &image).map_err(StoreError::Persistence)?;
        }
        Ok(())
    }

    fn write_once<H: Hardware>(&self, hw: &mut H, image: &FlagImage) -> Result<(), FlashError> {
        hw.disable_interrupts();
        let result = Self::program(hw.get_flash(), self.address, image);
        hw.enable_interrupts();
        result
    }

    fn program<F: FlashInterface>(flash: &mut F, address: u32, image: &FlagImage) -> Result<(), FlashError> {
        let sector = flash.block_size();
        flash.erase(address, sector)?;
        flash.write(address, image.as_bytes())?;

        let mut readback = FlagImage::encode(0);
        flash.read(address, readback.as_bytes_mut())?;
        if readback.as_bytes() != image.as_bytes() {
            return Err(FlashError::VerifyFailed);
        }
        Ok(())
    }
}
