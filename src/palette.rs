// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/palette.rs - 伪彩色调色板
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

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
  #[error("调色板索引 {index} 超出范围 [0, {len})")]
  OutOfRange { index: usize, len: usize },
}

/// 查找表，256 个 RGB 项
pub type Lut = [[u8; 3]; 256];

type Stop = (f32, [f32; 3]);

/// 调色板，顺序与索引固定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Palette {
  Autumn,
  Bone,
  Jet,
  Winter,
  Rainbow,
  Ocean,
  Summer,
  Spring,
  Cool,
  Hsv,
  Pink,
  Hot,
  Parula,
  Magma,
  Inferno,
  Plasma,
  Viridis,
  Cividis,
  Twilight,
  TwilightShifted,
  Turbo,
  DeepGreen,
}

impl Palette {
  pub const ALL: [Palette; 22] = [
    Palette::Autumn,
    Palette::Bone,
    Palette::Jet,
    Palette::Winter,
    Palette::Rainbow,
    Palette::Ocean,
    Palette::Summer,
    Palette::Spring,
    Palette::Cool,
    Palette::Hsv,
    Palette::Pink,
    Palette::Hot,
    Palette::Parula,
    Palette::Magma,
    Palette::Inferno,
    Palette::Plasma,
    Palette::Viridis,
    Palette::Cividis,
    Palette::Twilight,
    Palette::TwilightShifted,
    Palette::Turbo,
    Palette::DeepGreen,
  ];

  /// 送入检测器的参考调色板，与用户显示用的调色板无关
  pub const REFERENCE: Palette = Palette::Ocean;

  pub fn count() -> usize {
    Self::ALL.len()
  }

  /// 按索引取调色板，越界直接报错，不做截断
  pub fn from_index(index: usize) -> Result<Palette, PaletteError> {
    Self::ALL.get(index).copied().ok_or(PaletteError::OutOfRange {
      index,
      len: Self::ALL.len(),
    })
  }

  pub fn index(&self) -> usize {
    *self as usize
  }

  pub fn name(&self) -> &'static str {
    match self {
      Palette::Autumn => "AUTUMN",
      Palette::Bone => "BONE",
      Palette::Jet => "JET",
      Palette::Winter => "WINTER",
      Palette::Rainbow => "RAINBOW",
      Palette::Ocean => "OCEAN",
      Palette::Summer => "SUMMER",
      Palette::Spring => "SPRING",
      Palette::Cool => "COOL",
      Palette::Hsv => "HSV",
      Palette::Pink => "PINK",
      Palette::Hot => "HOT",
      Palette::Parula => "PARULA",
      Palette::Magma => "MAGMA",
      Palette::Inferno => "INFERNO",
      Palette::Plasma => "PLASMA",
      Palette::Viridis => "VIRIDIS",
      Palette::Cividis => "CIVIDIS",
      Palette::Twilight => "TWILIGHT",
      Palette::TwilightShifted => "TWILIGHT_SHIFTED",
      Palette::Turbo => "TURBO",
      Palette::DeepGreen => "DEEPGREEN",
    }
  }

  fn stops(&self) -> &'static [Stop] {
    match self {
      Palette::Autumn => &[(0.0, [1.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 0.0])],
      Palette::Bone => &[
        (0.0, [0.0, 0.0, 0.0]),
        (0.375, [0.319, 0.319, 0.444]),
        (0.75, [0.652, 0.777, 0.777]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
      Palette::Jet => &[
        (0.0, [0.0, 0.0, 0.5]),
        (0.125, [0.0, 0.0, 1.0]),
        (0.375, [0.0, 1.0, 1.0]),
        (0.625, [1.0, 1.0, 0.0]),
        (0.875, [1.0, 0.0, 0.0]),
        (1.0, [0.5, 0.0, 0.0]),
      ],
      Palette::Winter => &[(0.0, [0.0, 0.0, 1.0]), (1.0, [0.0, 1.0, 0.5])],
      Palette::Rainbow => &[
        (0.0, [1.0, 0.0, 0.0]),
        (0.25, [1.0, 1.0, 0.0]),
        (0.5, [0.0, 1.0, 0.0]),
        (0.75, [0.0, 0.0, 1.0]),
        (1.0, [0.5, 0.0, 1.0]),
      ],
      Palette::Ocean => &[
        (0.0, [0.0, 0.0, 0.0]),
        (0.333, [0.0, 0.0, 0.333]),
        (0.667, [0.0, 0.5, 0.667]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
      Palette::Summer => &[(0.0, [0.0, 0.5, 0.4]), (1.0, [1.0, 1.0, 0.4])],
      Palette::Spring => &[(0.0, [1.0, 0.0, 1.0]), (1.0, [1.0, 1.0, 0.0])],
      Palette::Cool => &[(0.0, [0.0, 1.0, 1.0]), (1.0, [1.0, 0.0, 1.0])],
      Palette::Hsv => &[
        (0.0, [1.0, 0.0, 0.0]),
        (1.0 / 6.0, [1.0, 1.0, 0.0]),
        (2.0 / 6.0, [0.0, 1.0, 0.0]),
        (3.0 / 6.0, [0.0, 1.0, 1.0]),
        (4.0 / 6.0, [0.0, 0.0, 1.0]),
        (5.0 / 6.0, [1.0, 0.0, 1.0]),
        (1.0, [1.0, 0.0, 0.0]),
      ],
      Palette::Pink => &[
        (0.0, [0.118, 0.0, 0.0]),
        (0.375, [0.765, 0.545, 0.545]),
        (0.75, [0.906, 0.906, 0.702]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
      Palette::Hot => &[
        (0.0, [0.0, 0.0, 0.0]),
        (0.375, [1.0, 0.0, 0.0]),
        (0.75, [1.0, 1.0, 0.0]),
        (1.0, [1.0, 1.0, 1.0]),
      ],
      Palette::Parula => &[
        (0.0, [0.208, 0.166, 0.529]),
        (0.25, [0.018, 0.443, 0.867]),
        (0.5, [0.128, 0.723, 0.655]),
        (0.75, [0.758, 0.764, 0.285]),
        (1.0, [0.976, 0.984, 0.054]),
      ],
      Palette::Magma => &[
        (0.0, [0.001, 0.0, 0.014]),
        (0.25, [0.316, 0.071, 0.485]),
        (0.5, [0.716, 0.215, 0.475]),
        (0.75, [0.987, 0.536, 0.382]),
        (1.0, [0.987, 0.991, 0.75]),
      ],
      Palette::Inferno => &[
        (0.0, [0.001, 0.0, 0.014]),
        (0.25, [0.341, 0.062, 0.429]),
        (0.5, [0.735, 0.216, 0.33]),
        (0.75, [0.978, 0.557, 0.035]),
        (1.0, [0.988, 1.0, 0.645]),
      ],
      Palette::Plasma => &[
        (0.0, [0.05, 0.03, 0.528]),
        (0.25, [0.494, 0.012, 0.658]),
        (0.5, [0.798, 0.28, 0.47]),
        (0.75, [0.973, 0.585, 0.252]),
        (1.0, [0.94, 0.975, 0.131]),
      ],
      Palette::Viridis => &[
        (0.0, [0.267, 0.005, 0.329]),
        (0.25, [0.229, 0.322, 0.546]),
        (0.5, [0.128, 0.567, 0.551]),
        (0.75, [0.369, 0.789, 0.383]),
        (1.0, [0.993, 0.906, 0.144]),
      ],
      Palette::Cividis => &[
        (0.0, [0.0, 0.135, 0.305]),
        (0.25, [0.25, 0.3, 0.42]),
        (0.5, [0.485, 0.47, 0.47]),
        (0.75, [0.74, 0.66, 0.43]),
        (1.0, [1.0, 0.91, 0.2]),
      ],
      Palette::Twilight => &[
        (0.0, [0.886, 0.851, 0.887]),
        (0.25, [0.38, 0.51, 0.73]),
        (0.5, [0.186, 0.072, 0.232]),
        (0.75, [0.69, 0.3, 0.3]),
        (1.0, [0.886, 0.851, 0.887]),
      ],
      Palette::TwilightShifted => &[
        (0.0, [0.186, 0.072, 0.232]),
        (0.25, [0.38, 0.51, 0.73]),
        (0.5, [0.886, 0.851, 0.887]),
        (0.75, [0.69, 0.3, 0.3]),
        (1.0, [0.186, 0.072, 0.232]),
      ],
      Palette::Turbo => &[
        (0.0, [0.19, 0.07, 0.23]),
        (0.2, [0.25, 0.55, 0.99]),
        (0.4, [0.18, 0.9, 0.6]),
        (0.6, [0.75, 0.95, 0.2]),
        (0.8, [0.98, 0.55, 0.13]),
        (1.0, [0.48, 0.02, 0.01]),
      ],
      Palette::DeepGreen => &[
        (0.0, [0.0, 0.02, 0.0]),
        (0.5, [0.05, 0.55, 0.15]),
        (1.0, [0.85, 1.0, 0.85]),
      ],
    }
  }

  /// 由控制点线性插值生成查找表
  pub fn lut(&self) -> Lut {
    let stops = self.stops();
    let mut lut = [[0u8; 3]; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
      let t = i as f32 / 255.0;
      let upper = stops
        .iter()
        .position(|(pos, _)| *pos >= t)
        .unwrap_or(stops.len() - 1);
      let color = if upper == 0 {
        stops[0].1
      } else {
        let (p0, c0) = stops[upper - 1];
        let (p1, c1) = stops[upper];
        let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
        [
          c0[0] + (c1[0] - c0[0]) * f,
          c0[1] + (c1[1] - c0[1]) * f,
          c0[2] + (c1[2] - c0[2]) * f,
        ]
      };
      *entry = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    }
    lut
  }
}

impl fmt::Display for Palette {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
