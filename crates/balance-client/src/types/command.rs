//! 操作员请求寄存器

use balance_protocol::RequestFlags;

/// 单个操作员请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Calibrate,
    Manual,
    Stop,
    Resume,
}

impl Request {
    /// 对应的请求位
    pub const fn bit(self) -> u8 {
        match self {
            Request::Calibrate => RequestFlags::CALIBRATE,
            Request::Manual => RequestFlags::MANUAL,
            Request::Stop => RequestFlags::STOP,
            Request::Resume => RequestFlags::RESUME,
        }
    }
}

/// 操作员参考值
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct References {
    /// 车速参考（m/s）
    pub speed: f64,
    /// 转向参考角（rad）
    pub steer_angle: f64,
    /// 侧倾参考角（rad）
    pub lean_angle: f64,
}

/// 请求寄存器
///
/// 请求位是锁存的：入站指令按位或合并，只有消费该请求的转换才会清除。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandRegister {
    requests: RequestFlags,
    pub references: References,
}

impl CommandRegister {
    pub fn new(references: References) -> Self {
        Self {
            requests: RequestFlags::default(),
            references,
        }
    }

    /// 当前挂起的请求
    pub fn requests(&self) -> RequestFlags {
        self.requests
    }

    /// 是否挂起指定请求
    pub fn is_pending(&self, request: Request) -> bool {
        self.requests.bits() & request.bit() != 0
    }

    /// 按位或合并入站请求
    pub fn merge(&mut self, flags: RequestFlags) {
        self.requests = self.requests.union(flags);
    }

    /// 清除指定位
    pub fn clear(&mut self, bits: u8) {
        self.requests = self.requests.difference(RequestFlags::from_bits(bits));
    }
}
