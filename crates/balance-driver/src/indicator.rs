//! 指示器接口（颜色、脉冲、蜂鸣）
//!
//! 纯输出，不参与决策。

use crate::DriverError;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// 熄灭
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// 指示器
pub trait Indicator {
    /// 推进内部闪烁 / 蜂鸣节拍（每周期调用一次）
    fn update(&mut self) -> Result<(), DriverError>;

    /// 常亮颜色
    fn set_passive_color(&mut self, color: Rgb) -> Result<(), DriverError>;

    /// 闪烁颜色
    fn set_blink_color(&mut self, color: Rgb) -> Result<(), DriverError>;

    /// 开启脉冲（亮 `on_ms`，灭 `off_ms`）
    fn set_pulse(&mut self, on_ms: u32, off_ms: u32) -> Result<(), DriverError>;

    /// 关闭脉冲
    fn disable_pulse(&mut self) -> Result<(), DriverError>;

    /// 单次蜂鸣（毫秒）
    fn beep(&mut self, duration_ms: u32) -> Result<(), DriverError>;

    /// 按位蜂鸣序列（MSB 先播）
    fn beep_pattern(&mut self, bits: u8) -> Result<(), DriverError>;
}
