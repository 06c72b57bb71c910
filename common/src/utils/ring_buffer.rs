use heapless::spsc::{Consumer, Producer, Queue};

/// NFMI 串口接收环形缓冲区大小（有效容量为 N - 1 字节）
pub const RX_RING_SIZE: usize = 2048;

/// 逐字节读取的数据源
pub trait ByteSource {
    /// 取出下一个字节，缓冲区为空时返回 None
    fn next_byte(&mut self) -> Option<u8>;
}

/// 接收环形缓冲区
///
/// 串口接收中断是唯一的写入方，主循环是唯一的读取方。
/// 缓冲区满时丢弃最新到达的字节，已缓存但未读取的数据不会被覆盖。
pub struct RxRing<const N: usize> {
    queue: Queue<u8, N>,
}

impl<const N: usize> RxRing<N> {
    /// 创建新的空缓冲区
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    /// 拆分为写入端和读取端
    pub fn split(&mut self) -> (RxWriter<'_, N>, RxReader<'_, N>) {
        let (producer, consumer) = self.queue.split();
        (
            RxWriter {
                producer,
                dropped: 0,
            },
            RxReader { consumer },
        )
    }
}

impl<const N: usize> Default for RxRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// 写入端，只在中断上下文中使用
pub struct RxWriter<'a, const N: usize> {
    producer: Producer<'a, u8, N>,
    /// 因缓冲区满而丢弃的字节数
    dropped: u32,
}

impl<'a, const N: usize> RxWriter<'a, N> {
    /// 写入一个字节，不会阻塞
    ///
    /// 缓冲区满时丢弃该字节并返回 false。
    pub fn push(&mut self, byte: u8) -> bool {
        match self.producer.enqueue(byte) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.wrapping_add(1);
                false
            }
        }
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// 读取端，只在主循环中使用
pub struct RxReader<'a, const N: usize> {
    consumer: Consumer<'a, u8, N>,
}

impl<'a, const N: usize> RxReader<'a, N> {
    pub fn pop(&mut self) -> Option<u8> {
        self.consumer.dequeue()
    }

    pub fn peek(&self) -> Option<u8> {
        self.consumer.peek().copied()
    }

    /// 当前未读取的字节数
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.consumer.capacity()
    }
}

impl<'a, const N: usize> ByteSource for RxReader<'a, N> {
    fn next_byte(&mut self) -> Option<u8> {
        self.pop()
    }
}
