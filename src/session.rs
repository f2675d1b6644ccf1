// session.rs — 主上下文持有的会话状态
//
// 当前站点、查询、候选缓存、配置都放在这里，只有主上下文能修改。
// 获取任务在 tokio 工作线程上运行，结果通过 mpsc 通道发回。

use crate::acquire::{AcquisitionTask, CycleEvent};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::source::{Link, Orientation, Query, Resolution, SiteParser, SiteRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

pub struct Session {
    registry: SiteRegistry,
    parser: Arc<dyn SiteParser>,
    query: Query,
    candidates: Arc<Vec<Link>>,
    config: AppConfig,
    rng: StdRng,
    in_flight: bool,
    events: UnboundedSender<CycleEvent>,
}

impl Session {
    /// 创建会话，同时返回接收任务结果的通道
    pub fn new(
        registry: SiteRegistry,
        config: AppConfig,
        rng: StdRng,
    ) -> (Self, UnboundedReceiver<CycleEvent>) {
        let (events, receiver) = unbounded_channel();
        let session = Self {
            parser: registry.default_parser(),
            registry,
            query: Query::default(),
            candidates: Arc::new(Vec::new()),
            config,
            rng,
            in_flight: false,
            events,
        };
        (session, receiver)
    }

    pub fn parser(&self) -> &Arc<dyn SiteParser> {
        &self.parser
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn candidates(&self) -> &[Link] {
        &self.candidates
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// 设置站点与查询但不刷新，用于启动时一次性配置
    pub fn prepare(&mut self, site: Option<&str>, query: Query) -> Result<()> {
        if let Some(name) = site {
            self.parser = self.registry.get(name)?;
        }
        self.query = query;
        Ok(())
    }

    /// 重新拉取候选列表
    /// 失败时清空缓存，之后的触发会走 NoCandidates
    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.parser.get_image_links(&mut self.query).await;
        match result {
            Ok(links) => {
                tracing::info!(
                    "Refreshed {} candidates from {} page {}",
                    links.len(),
                    self.parser.name(),
                    self.query.page
                );
                self.candidates = Arc::new(links);
                Ok(())
            }
            Err(e) => {
                self.candidates = Arc::new(Vec::new());
                Err(e)
            }
        }
    }

    /// 修改主题关键词并刷新，空字符串表示全部
    pub async fn set_theme(&mut self, theme: &str) -> Result<()> {
        self.query.q = theme.trim().to_string();
        self.refresh().await
    }

    pub async fn set_orientation(&mut self, orientation: Orientation) -> Result<()> {
        self.query.orientation = orientation;
        self.refresh().await
    }

    /// 切换站点并刷新
    pub async fn set_site(&mut self, name: &str) -> Result<()> {
        self.parser = self.registry.get(name)?;
        tracing::info!("Switched to {} ({})", self.parser.name(), self.parser.url());
        self.refresh().await
    }

    pub fn set_interval_minutes(&mut self, minutes: u64) -> Result<()> {
        self.config.set_interval_minutes(minutes)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.config.set_resolution(resolution)
    }

    pub fn set_directory(&mut self, directory: &str) -> Result<()> {
        self.config.set_directory(directory)
    }

    /// 在工作线程上启动一次获取
    ///
    /// 同一时间最多一个任务；已有任务在运行时返回 `TriggerRejected`。
    /// 任务结束后结果经通道送回，主上下文收到后需调用 `complete`。
    pub fn trigger(&mut self) -> Result<()> {
        if self.in_flight {
            tracing::warn!("Trigger rejected, an acquisition is still running");
            return Err(Error::TriggerRejected);
        }
        self.in_flight = true;

        let mut task = AcquisitionTask::new(
            self.parser.clone(),
            self.candidates.clone(),
            self.config.resolution,
            self.config.directory.clone(),
            StdRng::seed_from_u64(self.rng.r#gen()),
        );
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = task.run().await;
            tracing::debug!("Acquisition task ended in {:?}", task.state());
            // 接收端已关闭说明主循环退出，丢弃结果即可
            let _ = events.send(CycleEvent::from(&result));
        });
        Ok(())
    }

    /// 主上下文收到任务结果后调用，允许下一次触发
    pub fn complete(&mut self, event: &CycleEvent) {
        tracing::debug!("Acquisition finished: {event:?}");
        self.in_flight = false;
    }
}
