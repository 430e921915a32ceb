// 该文件是 Tiwen （体温监测） 项目的一部分。
// src/controller.rs - 监测线程与事件分发
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

use std::{
  sync::{
    Arc, Mutex, PoisonError,
    mpsc::{self, Receiver, Sender},
  },
  thread::{self, JoinHandle},
  time::Instant,
};

use tracing::{Level, debug, error, info, trace, warn};

use crate::{
  analyzer::{Face, FrameAnalyzer, MonitorError},
  config::{ConfigError, Configuration},
  frame::ColorFrame,
  input::FrameSource,
  model::InferenceEngine,
};

/// 帧率指数平滑系数
pub const FPS_SMOOTHING: f64 = 0.9;

/// `fps = prev * α + 1 / elapsed * (1 - α)`
pub fn smooth_fps(previous: f64, elapsed_secs: f64) -> f64 {
  let instant = 1.0 / elapsed_secs.max(f64::EPSILON);
  previous * FPS_SMOOTHING + instant * (1.0 - FPS_SMOOTHING)
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
  pub image: ColorFrame,
  pub faces: Vec<Face>,
  pub fps: f64,
}

#[derive(Debug)]
pub enum MonitorEvent {
  Frame(PipelineResult),
  Log { level: Level, message: String },
  /// 每个监测线程至多一次，之后通道关闭
  Fatal(MonitorError),
}

/// 监测线程向使用方发送事件的一端
#[derive(Debug, Clone)]
pub struct EventSink {
  sender: Sender<MonitorEvent>,
}

impl EventSink {
  pub fn new(sender: Sender<MonitorEvent>) -> Self {
    Self { sender }
  }

  /// 返回使用方是否仍在接收
  pub fn frame(&self, result: PipelineResult) -> bool {
    self.sender.send(MonitorEvent::Frame(result)).is_ok()
  }

  /// 同时写入 tracing
  pub fn log(&self, level: Level, message: impl Into<String>) -> bool {
    let message = message.into();
    if level == Level::ERROR {
      error!("{}", message);
    } else if level == Level::WARN {
      warn!("{}", message);
    } else if level == Level::INFO {
      info!("{}", message);
    } else if level == Level::DEBUG {
      debug!("{}", message);
    } else {
      trace!("{}", message);
    }
    self.sender.send(MonitorEvent::Log { level, message }).is_ok()
  }

  pub fn fatal(&self, error: MonitorError) -> bool {
    error!("监测终止: {}", error);
    self.sender.send(MonitorEvent::Fatal(error)).is_ok()
  }
}

type PendingConfiguration = Arc<Mutex<Option<Configuration>>>;

/// 在独立线程中循环分析帧
pub struct PipelineController<S, E> {
  analyzer: FrameAnalyzer<S, E>,
  pending: PendingConfiguration,
  sink: EventSink,
  fps: f64,
}

impl<S: FrameSource, E: InferenceEngine> PipelineController<S, E> {
  pub fn new(analyzer: FrameAnalyzer<S, E>, sink: EventSink) -> Self {
    Self {
      analyzer,
      pending: Arc::new(Mutex::new(None)),
      sink,
      fps: 0.0,
    }
  }

  pub fn fps(&self) -> f64 {
    self.fps
  }

  /// 运行到致命错误或使用方不再接收为止
  pub fn run(mut self) {
    self.sink.log(Level::INFO, "监测线程已启动");

    loop {
      if let Err(e) = self.apply_pending() {
        self.sink.fatal(e);
        return;
      }

      let start = Instant::now();
      let frame = match self.analyzer.analyze() {
        Ok(frame) => frame,
        Err(e) => {
          self.sink.fatal(e);
          return;
        }
      };
      self.fps = smooth_fps(self.fps, start.elapsed().as_secs_f64());

      let delivered = self.sink.frame(PipelineResult {
        image: frame.image,
        faces: frame.faces,
        fps: self.fps,
      });
      if !delivered {
        info!("使用方已关闭, 监测线程退出");
        return;
      }
    }
  }

  // 只在两帧之间读取一次
  fn apply_pending(&mut self) -> Result<(), MonitorError> {
    let pending = self
      .pending
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(config) = pending {
      self.analyzer.apply_configuration(config)?;
      self.sink.log(Level::INFO, "新配置已生效");
    }
    Ok(())
  }
}

impl<S, E> PipelineController<S, E>
where
  S: FrameSource + 'static,
  E: InferenceEngine + 'static,
{
  /// 启动监测线程，返回控制句柄与事件接收端
  pub fn spawn(
    analyzer: FrameAnalyzer<S, E>,
  ) -> Result<(ControllerHandle, Receiver<MonitorEvent>), MonitorError> {
    let (sender, receiver) = mpsc::channel();
    let controller = PipelineController::new(analyzer, EventSink::new(sender));
    let pending = controller.pending.clone();

    let worker = thread::Builder::new()
      .name("tiwen-monitor".to_string())
      .spawn(move || controller.run())?;

    Ok((
      ControllerHandle {
        pending,
        worker: Some(worker),
      },
      receiver,
    ))
  }
}

/// 使用方持有的控制句柄
pub struct ControllerHandle {
  pending: PendingConfiguration,
  worker: Option<JoinHandle<()>>,
}

impl ControllerHandle {
  /// 校验后登记新配置，下一帧开始前生效。
  /// 多次调用只保留最后一次。
  pub fn set_configuration(&self, config: Configuration) -> Result<(), ConfigError> {
    config.validate()?;
    debug!("登记新配置: {:?}", config);
    *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
  }

  pub fn is_finished(&self) -> bool {
    self.worker.as_ref().is_none_or(JoinHandle::is_finished)
  }

  /// 等待监测线程结束
  pub fn join(mut self) -> thread::Result<()> {
    match self.worker.take() {
      Some(worker) => worker.join(),
      None => Ok(()),
    }
  }
}
