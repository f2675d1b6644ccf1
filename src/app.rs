// app.rs — 主上下文循环
// 负责把定时器、任务结果、标准输入命令串在一起，并通过 CycleObserver 通知展示层

use crate::acquire::CycleEvent;
use crate::error::{Error, Result};
use crate::scheduler::SlideshowScheduler;
use crate::session::Session;
use crate::setter;
use crate::source::{Orientation, Resolution};
use rust_i18n::t;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, MissedTickBehavior};

/// 展示层需要实现的回调
pub trait CycleObserver {
    fn on_success(&mut self, path: &Path);
    fn on_failure(&mut self, message: &str);
    fn on_tick(&mut self, remaining: Duration);
}

/// 终端版展示层：打印结果，并可选地把图片设为系统壁纸
pub struct ConsoleObserver {
    apply: bool,
    pub failures: usize,
}

impl ConsoleObserver {
    pub fn new(apply: bool) -> Self {
        Self { apply, failures: 0 }
    }
}

impl CycleObserver for ConsoleObserver {
    fn on_success(&mut self, path: &Path) {
        println!("\r{}", t!("save_path", path => path.display()));
        if !self.apply {
            return;
        }
        match setter::set_from_path(path) {
            Ok(()) => println!("{}", t!("set_done")),
            Err(e) => self.on_failure(&e.to_string()),
        }
    }

    fn on_failure(&mut self, message: &str) {
        self.failures += 1;
        eprintln!("\r{}", t!("warning", message => message));
    }

    fn on_tick(&mut self, remaining: Duration) {
        print!("\r{}   ", t!("remaining", secs => remaining.as_secs()));
        let _ = std::io::stdout().flush();
    }
}

/// 轮播模式下从标准输入读取的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Start,
    Stop,
    Theme(String),
    All,
    Orientation(Orientation),
    Site(String),
    Interval(u64),
    Resolution(Resolution),
    Directory(String),
    Quit,
}

impl Command {
    /// 解析一行输入，空行返回 None
    pub fn parse(line: &str) -> Option<Result<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word.to_lowercase().as_str() {
            "next" | "n" => Ok(Command::Next),
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "theme" | "q" => Ok(Command::Theme(rest.to_string())),
            "all" => Ok(Command::All),
            "orientation" | "o" => rest.parse().map(Command::Orientation),
            "site" => Ok(Command::Site(rest.to_string())),
            "interval" | "i" => rest
                .parse::<u64>()
                .map(Command::Interval)
                .map_err(|_| Error::InvalidInput(format!("expected minutes, got {rest:?}"))),
            "resolution" | "r" => rest.parse().map(Command::Resolution),
            "dir" => Ok(Command::Directory(rest.to_string())),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(Error::InvalidInput(format!("unknown command {other:?}"))),
        };
        Some(command)
    }
}

/// 轮播：主循环
pub struct Slideshow<O: CycleObserver> {
    session: Session,
    events: UnboundedReceiver<CycleEvent>,
    scheduler: SlideshowScheduler,
    observer: O,
}

impl<O: CycleObserver> Slideshow<O> {
    pub fn new(session: Session, events: UnboundedReceiver<CycleEvent>, observer: O) -> Self {
        let scheduler = SlideshowScheduler::new(session.config().interval());
        Self {
            session,
            events,
            scheduler,
            observer,
        }
    }

    /// 开始轮播并立即触发一次
    pub fn start(&mut self) {
        self.scheduler.start(Instant::now());
        self.trigger();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// 触发一次获取；正在运行时拒绝并提示
    pub fn trigger(&mut self) {
        if let Err(e) = self.session.trigger() {
            self.observer.on_failure(&e.user_message());
        }
    }

    /// 每秒调用一次：刷新剩余时间，到期则触发
    pub fn on_second(&mut self, now: Instant) {
        if self.scheduler.poll(now) {
            if self.session.is_busy() {
                tracing::warn!("Skipping tick, previous acquisition still running");
            } else {
                self.trigger();
            }
        }
        if let Some(remaining) = self.scheduler.remaining(now) {
            self.observer.on_tick(remaining);
        }
    }

    /// 任务结果回到主上下文
    pub fn on_event(&mut self, event: CycleEvent) {
        self.session.complete(&event);
        match event {
            CycleEvent::Succeeded(path) => self.observer.on_success(&path),
            CycleEvent::Failed { message, .. } => self.observer.on_failure(&message),
        }
    }

    /// 处理一条命令，返回 false 表示退出
    pub async fn on_command(&mut self, command: Command) -> bool {
        tracing::debug!("Command {command:?}");
        let result = match command {
            Command::Next => {
                self.trigger();
                Ok(())
            }
            Command::Start => {
                self.start();
                Ok(())
            }
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Theme(theme) => self.session.set_theme(&theme).await,
            Command::All => self.session.set_theme("").await,
            Command::Orientation(orientation) => self.session.set_orientation(orientation).await,
            Command::Site(name) => self.session.set_site(&name).await,
            Command::Interval(minutes) => self.session.set_interval_minutes(minutes).map(|()| {
                let interval = self.session.config().interval();
                self.scheduler.set_interval(interval, Instant::now());
                tracing::info!("Slideshow interval is now {:?}", self.scheduler.interval());
            }),
            Command::Resolution(resolution) => self.session.set_resolution(resolution),
            Command::Directory(dir) => self.session.set_directory(&dir),
            Command::Quit => return false,
        };
        if let Err(e) = result {
            self.observer.on_failure(&e.user_message());
        }
        true
    }

    /// 运行直到 quit、标准输入结束或 Ctrl-C
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let mut second = tokio::time::interval(Duration::from_secs(1));
        second.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.start();
        loop {
            tokio::select! {
                now = second.tick() => self.on_second(now),
                Some(event) = self.events.recv() => self.on_event(event),
                line = lines.next_line(), if stdin_open => match line? {
                    Some(line) => match Command::parse(&line) {
                        Some(Ok(command)) => {
                            if !self.on_command(command).await {
                                break;
                            }
                        }
                        Some(Err(e)) => self.observer.on_failure(&e.user_message()),
                        None => {}
                    },
                    None => stdin_open = false,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        self.stop();
        println!();
        Ok(())
    }
}

/// 单次获取：触发一次并等待结果
pub async fn run_once<O: CycleObserver>(
    session: &mut Session,
    events: &mut UnboundedReceiver<CycleEvent>,
    observer: &mut O,
) -> Result<CycleEvent> {
    session.trigger()?;
    let event = events
        .recv()
        .await
        .ok_or_else(|| Error::InvalidInput("acquisition worker vanished".into()))?;
    session.complete(&event);
    match &event {
        CycleEvent::Succeeded(path) => observer.on_success(path),
        CycleEvent::Failed { message, .. } => observer.on_failure(message),
    }
    Ok(event)
}
