// acquire.rs — 一次完整的获取流程：选择 → 下载 → 写文件 → 报告
//
// 任务在工作线程上运行，结果通过 CycleEvent 发回主上下文，
// 主上下文之外不修改任何共享状态。

use crate::error::{Error, FailureReason, Result};
use crate::select::select;
use crate::source::{Link, Resolution, SiteParser};
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// 任务状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Selecting,
    Downloading(Link),
    Completed(PathBuf),
    Failed(FailureReason),
}

/// 工作线程发回主上下文的结果消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    Succeeded(PathBuf),
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl From<&Result<PathBuf>> for CycleEvent {
    fn from(result: &Result<PathBuf>) -> Self {
        match result {
            Ok(path) => CycleEvent::Succeeded(path.clone()),
            Err(e) => CycleEvent::Failed {
                reason: e.reason(),
                message: e.user_message(),
            },
        }
    }
}

/// 单次获取任务
///
/// 启动时拿到候选列表、目标分辨率和输出目录的快照，运行期间不再读取会话状态。
pub struct AcquisitionTask {
    parser: Arc<dyn SiteParser>,
    candidates: Arc<Vec<Link>>,
    target: Resolution,
    directory: PathBuf,
    rng: StdRng,
    state: TaskState,
}

impl AcquisitionTask {
    pub fn new(
        parser: Arc<dyn SiteParser>,
        candidates: Arc<Vec<Link>>,
        target: Resolution,
        directory: PathBuf,
        rng: StdRng,
    ) -> Self {
        Self {
            parser,
            candidates,
            target,
            directory,
            rng,
            state: TaskState::Idle,
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// 执行一次完整流程，所有错误都在这里收口
    pub async fn run(&mut self) -> Result<PathBuf> {
        let result = self.acquire().await;
        self.state = match &result {
            Ok(path) => TaskState::Completed(path.clone()),
            Err(e) => {
                tracing::warn!("Acquisition failed: {e}");
                TaskState::Failed(e.reason())
            }
        };
        result
    }

    async fn acquire(&mut self) -> Result<PathBuf> {
        self.transition(TaskState::Selecting);
        let parser = self.parser.clone();
        let link = select(&self.candidates, self.target, &mut self.rng, |link: Link| {
            let parser = parser.clone();
            async move { parser.get_available_resolutions(&link).await }
        })
        .await?;

        self.transition(TaskState::Downloading(link.clone()));
        let bytes = self.parser.get_image_bytes(&link, self.target).await?;
        let path = write_image(&self.directory, &link, &bytes).await?;
        tracing::info!("Saved {link} at {} to {}", self.target, path.display());
        Ok(path)
    }

    fn transition(&mut self, next: TaskState) {
        tracing::debug!("Acquisition {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// 从链接的倒数第二段路径得到文件名，非法字符替换为 `_`
pub fn image_name(link: &Link) -> String {
    let segment = link.as_str().rsplit('/').nth(1).unwrap_or_default();
    let name: String = segment
        .chars()
        .map(|c| match c {
            '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();

    if name.is_empty() || name == "." || name == ".." {
        "wallpaper".to_string()
    } else {
        name
    }
}

/// 按图片内容识别格式，写入 `{directory}/{name}.{ext}`
pub async fn write_image(directory: &Path, link: &Link, bytes: &[u8]) -> Result<PathBuf> {
    let format =
        image::guess_format(bytes).map_err(|_| Error::UnknownImageFormat(link.to_string()))?;
    let extension = format
        .extensions_str()
        .first()
        .ok_or_else(|| Error::UnknownImageFormat(link.to_string()))?;

    fs::create_dir_all(directory).await?;
    let path = directory.join(format!("{}.{}", image_name(link), extension));
    fs::write(&path, bytes).await?;
    Ok(path)
}
