// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/task.rs - 单帧与连续监测任务
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

use anyhow::anyhow;
use std::{
  sync::mpsc::{Receiver, RecvTimeoutError},
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  analyzer::FrameAnalyzer,
  config::Configuration,
  controller::{ControllerHandle, MonitorEvent, PipelineController, PipelineResult, smooth_fps},
  input::FrameSource,
  model::InferenceEngine,
  output::Render,
};

/// 等待结果时检查中断信号的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub trait Task<A, O>: Sized {
  type Error;
  fn run_task(self, analyzer: A, output: O) -> Result<(), Self::Error>;
}

/// 分析一帧、输出后退出
pub struct OneShotTask;

impl<S, E, O, RE> Task<FrameAnalyzer<S, E>, O> for OneShotTask
where
  S: FrameSource,
  E: InferenceEngine,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<PipelineResult, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, mut analyzer: FrameAnalyzer<S, E>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let now = Instant::now();
    let frame = analyzer.analyze()?;
    let elapsed = now.elapsed();
    info!("分析完成，耗时: {:.2?}, 人脸数: {}", elapsed, frame.faces.len());

    let result = PipelineResult {
      image: frame.image,
      faces: frame.faces,
      fps: smooth_fps(0.0, elapsed.as_secs_f64()),
    };
    output.render_result(&result)?;
    info!("渲染完成");

    Ok(())
  }
}

/// 在监测线程中持续分析，直到中断、致命错误或达到指定帧数。
/// 运行中收到的新配置转交给监测线程，在下一帧开始前生效。
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  updates: Option<Receiver<Configuration>>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_configuration_updates(mut self, updates: Receiver<Configuration>) -> Self {
    self.updates = Some(updates);
    self
  }

  fn forward_updates(&self, handle: &ControllerHandle) {
    let Some(updates) = &self.updates else {
      return;
    };
    for config in updates.try_iter() {
      if let Err(e) = handle.set_configuration(config) {
        warn!("忽略无效配置: {}", e);
      }
    }
  }

  fn drive<O, RE>(
    &self,
    handle: ControllerHandle,
    events: Receiver<MonitorEvent>,
    output: &O,
    interrupt: &Receiver<()>,
  ) -> Result<(), anyhow::Error>
  where
    RE: std::error::Error + Sync + Send + 'static,
    O: Render<PipelineResult, Error = RE>,
  {
    let mut frame_index = 0usize;
    loop {
      if interrupt.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      self.forward_updates(&handle);

      let event = match events.recv_timeout(POLL_INTERVAL) {
        Ok(event) => event,
        Err(RecvTimeoutError::Timeout) => continue,
        Err(RecvTimeoutError::Disconnected) => {
          warn!("监测线程已退出");
          if handle.join().is_err() {
            return Err(anyhow!("监测线程异常退出"));
          }
          break;
        }
      };

      match event {
        MonitorEvent::Frame(result) => {
          frame_index = frame_index.wrapping_add(1);
          info!(
            "第 {} 帧: {} 张人脸, {:.1} fps",
            frame_index,
            result.faces.len(),
            result.fps
          );
          output.render_result(&result)?;
          if self.frame_number.is_some_and(|n| frame_index >= n) {
            info!("达到指定帧数 {}, 退出任务循环", frame_index);
            break;
          }
        }
        // 监测线程已写入 tracing
        MonitorEvent::Log { .. } => {}
        MonitorEvent::Fatal(e) => return Err(e.into()),
      }
    }
    Ok(())
  }
}

impl<S, E, O, RE> Task<FrameAnalyzer<S, E>, O> for ContinuousTask
where
  S: FrameSource + 'static,
  E: InferenceEngine + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<PipelineResult, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, analyzer: FrameAnalyzer<S, E>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let (handle, events) = PipelineController::spawn(analyzer)?;
    self.drive(handle, events, &output, &rx)?;

    // 监测线程没有取消机制，随进程退出
    info!("任务完成，退出");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    input::FrameSource,
    model::ModelCatalog,
    output::draw::Compositor,
    test_utils::{
      FACE_RAW_37C, GatedSource, ScriptedEngine, ScriptedSource, Step, face_row, warm_face_frame,
    },
  };
  use std::{
    cell::RefCell,
    convert::Infallible,
    sync::mpsc::{self, Sender},
  };

  #[derive(Default)]
  struct Collect(RefCell<Vec<usize>>);

  impl Render<PipelineResult> for Collect {
    type Error = Infallible;

    fn render_result(&self, result: &PipelineResult) -> Result<(), Self::Error> {
      self.0.borrow_mut().push(result.faces.len());
      Ok(())
    }
  }

  impl Render<PipelineResult> for &Collect {
    type Error = Infallible;

    fn render_result(&self, result: &PipelineResult) -> Result<(), Self::Error> {
      (*self).render_result(result)
    }
  }

  #[test]
  fn one_shot_renders_a_single_frame() {
    let analyzer = FrameAnalyzer::new(
      ScriptedSource::new(vec![Step::Frame(warm_face_frame(FACE_RAW_37C))]),
      ScriptedEngine::new(vec![face_row(0.5, 0.5, 0.25, 0.25, 0.9)]),
      ModelCatalog::new("yolo"),
      Compositor::default(),
      Configuration::default(),
    )
    .unwrap();

    let output = Collect::default();
    OneShotTask.run_task(analyzer, &output).unwrap();
    assert_eq!(*output.0.borrow(), vec![1]);
  }

  #[test]
  fn one_shot_surfaces_capture_failure() {
    let analyzer = FrameAnalyzer::new(
      ScriptedSource::new(vec![Step::Disconnect]),
      ScriptedEngine::new(Vec::new()),
      ModelCatalog::new("yolo"),
      Compositor::default(),
      Configuration::default(),
    )
    .unwrap();

    let output = Collect::default();
    let err = OneShotTask.run_task(analyzer, &output).unwrap_err();
    assert!(err.to_string().contains("断开"));
    assert!(output.0.borrow().is_empty());
  }

  fn analyzer<S: FrameSource>(source: S) -> FrameAnalyzer<S, ScriptedEngine> {
    FrameAnalyzer::new(
      source,
      ScriptedEngine::new(vec![face_row(0.5, 0.5, 0.25, 0.25, 0.9)]),
      ModelCatalog::new("yolo"),
      Compositor::default(),
      Configuration::default(),
    )
    .unwrap()
  }

  /// 每输出一帧才放行下一帧的采集
  struct Stepper {
    gate: Sender<()>,
    over: RefCell<Vec<bool>>,
  }

  impl Render<PipelineResult> for Stepper {
    type Error = Infallible;

    fn render_result(&self, result: &PipelineResult) -> Result<(), Self::Error> {
      self.over.borrow_mut().push(result.faces[0].over_threshold);
      let _ = self.gate.send(());
      Ok(())
    }
  }

  #[test]
  fn continuous_forwards_configuration_updates() {
    let (entered_tx, _entered_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel();
    gate_tx.send(()).unwrap();
    let source = GatedSource::new(warm_face_frame(FACE_RAW_37C), entered_tx, gate_rx);
    let (handle, events) = PipelineController::spawn(analyzer(source)).unwrap();

    let (updates_tx, updates_rx) = mpsc::channel();
    updates_tx
      .send(Configuration::default().with_palette_index(99))
      .unwrap();
    updates_tx
      .send(Configuration::default().with_temp_threshold(36.5))
      .unwrap();

    let output = Stepper {
      gate: gate_tx,
      over: RefCell::new(Vec::new()),
    };
    let (_interrupt_tx, interrupt_rx) = mpsc::channel();
    ContinuousTask::default()
      .with_frame_number(Some(2))
      .with_configuration_updates(updates_rx)
      .drive(handle, events, &output, &interrupt_rx)
      .unwrap();

    // 第二帧开始前新阈值必然已登记
    let over = output.over.borrow();
    assert_eq!(over.len(), 2);
    assert!(over[1]);
  }

  #[test]
  fn continuous_returns_the_fatal_error() {
    let source = ScriptedSource::new(vec![Step::Frame(warm_face_frame(FACE_RAW_37C))]);
    let (handle, events) = PipelineController::spawn(analyzer(source)).unwrap();
    let output = Collect::default();
    let (_interrupt_tx, interrupt_rx) = mpsc::channel();

    let err = ContinuousTask::default()
      .drive(handle, events, &output, &interrupt_rx)
      .unwrap_err();
    assert!(err.to_string().contains("断开"));
    assert_eq!(*output.0.borrow(), vec![1]);
  }

  struct Panicking;

  impl FrameSource for Panicking {
    type Error = Infallible;

    fn capture(&mut self) -> Result<crate::frame::RawFrame, Self::Error> {
      panic!("采集线程崩溃");
    }

    fn is_connected(&self) -> bool {
      true
    }
  }

  #[test]
  fn continuous_reports_a_crashed_worker() {
    let (handle, events) = PipelineController::spawn(analyzer(Panicking)).unwrap();
    let output = Collect::default();
    let (_interrupt_tx, interrupt_rx) = mpsc::channel();

    let err = ContinuousTask::default()
      .drive(handle, events, &output, &interrupt_rx)
      .unwrap_err();
    assert!(err.to_string().contains("异常退出"));
    assert!(output.0.borrow().is_empty());
  }

  #[test]
  fn continuous_stops_on_interrupt() {
    let source = ScriptedSource::new(vec![Step::Frame(warm_face_frame(FACE_RAW_37C))]);
    let (handle, events) = PipelineController::spawn(analyzer(source)).unwrap();
    let output = Collect::default();
    let (interrupt_tx, interrupt_rx) = mpsc::channel();
    interrupt_tx.send(()).unwrap();

    ContinuousTask::default()
      .drive(handle, events, &output, &interrupt_rx)
      .unwrap();
    assert!(output.0.borrow().is_empty());
  }
}
