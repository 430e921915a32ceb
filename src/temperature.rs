// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/temperature.rs - 辐射计数到温度的换算
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{fmt, str::FromStr};

use crate::config::ConfigError;

const KELVIN_OFFSET: f64 = 273.15;

// 传感器精度只到 0.1 度。按浮点数的精确值舍入，恰好居中时取偶数
fn round_one_decimal(value: f64) -> f64 {
  format!("{value:.1}").parse().unwrap_or(value)
}

/// 原始计数（百分之一开尔文）转开尔文
pub fn to_kelvin(raw: f64) -> f64 {
  round_one_decimal(raw / 100.0)
}

/// 原始计数转摄氏度
pub fn to_celsius(raw: f64) -> f64 {
  round_one_decimal(raw / 100.0 - KELVIN_OFFSET)
}

/// 原始计数转华氏度
pub fn to_fahrenheit(raw: f64) -> f64 {
  round_one_decimal(to_celsius(raw) * 1.8 + 32.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemperatureUnit {
  #[default]
  Celsius,
  Fahrenheit,
  Kelvin,
}

impl TemperatureUnit {
  pub const ALL: [TemperatureUnit; 3] = [
    TemperatureUnit::Celsius,
    TemperatureUnit::Fahrenheit,
    TemperatureUnit::Kelvin,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      TemperatureUnit::Celsius => "Celsius",
      TemperatureUnit::Fahrenheit => "Fahrenheit",
      TemperatureUnit::Kelvin => "Kelvin",
    }
  }

  pub fn symbol(&self) -> &'static str {
    match self {
      TemperatureUnit::Celsius => "°C",
      TemperatureUnit::Fahrenheit => "°F",
      TemperatureUnit::Kelvin => "K",
    }
  }

  /// 按单位换算原始计数
  pub fn convert(&self, raw: f64) -> Temperature {
    let value = match self {
      TemperatureUnit::Celsius => to_celsius(raw),
      TemperatureUnit::Fahrenheit => to_fahrenheit(raw),
      TemperatureUnit::Kelvin => to_kelvin(raw),
    };
    Temperature { value, unit: *self }
  }
}

impl fmt::Display for TemperatureUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for TemperatureUnit {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    TemperatureUnit::ALL
      .into_iter()
      .find(|unit| unit.name() == s)
      .ok_or_else(|| ConfigError::UnknownUnit(s.to_string()))
  }
}

/// 带单位的温度值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
  pub value: f64,
  pub unit: TemperatureUnit,
}

impl fmt::Display for Temperature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.1}{}", self.value, self.unit.symbol())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn converts_sample_count() {
    assert_eq!(to_kelvin(34123.0), 341.2);
    assert_eq!(to_celsius(34123.0), 68.1);
    assert_eq!(to_fahrenheit(34123.0), 154.6);
  }

  #[test]
  fn halfway_values_round_to_even() {
    assert_eq!(to_celsius(31140.0), 38.2);
    assert_eq!(to_celsius(31040.0), 37.2);
    assert_eq!(to_celsius(30990.0), 36.8);
    assert_eq!(to_fahrenheit(31140.0), 100.8);
  }

  #[test]
  fn rounding_follows_exact_binary_value() {
    // 0.15 的二进制值略小于 0.15
    assert_eq!(to_kelvin(15.0), 0.1);
    assert_eq!(to_kelvin(5.0), 0.1);
    assert_eq!(to_celsius(31025.0), 37.1);
  }

  #[test]
  fn units_agree_at_freezing_point() {
    let raw = 27315.0;
    assert!(to_celsius(raw).abs() < 0.051);
    assert!((to_fahrenheit(raw) - 32.0).abs() < 0.051);
    assert!((to_kelvin(raw) - 273.15).abs() < 0.051);
  }

  #[test]
  fn celsius_reverses_to_kelvin_within_rounding() {
    for raw in [0.0, 27315.0, 29815.0, 30990.0, 31015.0, 34123.0, 40000.5] {
      let recovered = to_celsius(raw) + KELVIN_OFFSET;
      assert!((recovered - raw / 100.0).abs() <= 0.05 + 1e-9, "raw {raw}");
    }
  }

  #[test]
  fn parses_unit_names_and_rejects_others() {
    assert_eq!("Kelvin".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Kelvin);
    assert_eq!(
      "Fahrenheit".parse::<TemperatureUnit>().unwrap(),
      TemperatureUnit::Fahrenheit
    );
    assert!(matches!(
      "Rankine".parse::<TemperatureUnit>(),
      Err(ConfigError::UnknownUnit(name)) if name == "Rankine"
    ));
  }

  #[test]
  fn convert_tags_value_with_unit() {
    let t = TemperatureUnit::Celsius.convert(31015.0);
    assert_eq!(t.value, 37.0);
    assert_eq!(t.to_string(), "37.0°C");
  }
}
