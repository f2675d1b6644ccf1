// source/mod.rs — 壁纸站解析器模块入口
pub mod wallscloud;

// 定义所有壁纸站解析器（如 WallsCloud）必须实现的通用 Trait，
// 以及它们共用的查询、链接、分辨率等数据类型

use crate::error::{Error, Result};
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use wallscloud::WallsCloud;

/// 分辨率宽高允许的取值范围（含两端）
pub const MIN_DIMENSION: u32 = 100;
pub const MAX_DIMENSION: u32 = 10000;

/// 像素分辨率，宽 x 高
///
/// 序列化为 `[width, height]` 二元数组，与配置文件格式一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 创建分辨率并检查取值范围
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let valid = MIN_DIMENSION..=MAX_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(Error::InvalidInput(format!(
                "resolution {width}x{height} is outside {MIN_DIMENSION}..={MAX_DIMENSION}"
            )));
        }
        Ok(Self { width, height })
    }

    /// 不做范围检查，用于站点返回的原始数据
    pub fn new_unchecked(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_in_domain(&self) -> bool {
        Self::new(self.width, self.height).is_ok()
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new_unchecked(width, height)
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(res: Resolution) -> Self {
        (res.width, res.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 解析 "1920x1080" 形式的用户输入（允许 x 两侧有空格）
impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("expected WIDTHxHEIGHT, got {s:?}"));
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(width, height)
    }
}

/// 图片方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            other => Err(Error::InvalidInput(format!("unknown orientation {other:?}"))),
        }
    }
}

/// 搜索查询
///
/// `page` 会在每次拉取候选列表前由解析器自己改写，调用方不要依赖它保持不变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// 主题关键词，空字符串表示不过滤
    pub q: String,
    pub page: u32,
    pub orientation: Orientation,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            q: String::new(),
            page: 1,
            orientation: Orientation::default(),
        }
    }
}

impl Query {
    pub fn new(q: impl Into<String>, orientation: Orientation) -> Self {
        Self {
            q: q.into(),
            orientation,
            ..Self::default()
        }
    }

    /// 转为 HTTP 查询参数 `{q, page, orientation}`
    pub fn params(&self) -> [(&'static str, String); 3] {
        [
            ("q", self.q.clone()),
            ("page", self.page.to_string()),
            ("orientation", self.orientation.as_str().to_string()),
        ]
    }
}

/// 一张远程图片的不透明标识（参考站点中为详情页 URL）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link(String);

impl Link {
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 壁纸站解析器的抽象 Trait
/// 所有壁纸站适配器（如 WallsCloud）都应该实现这个 Trait
///
/// # 异步 Trait 说明
/// 这里使用 `async_trait` 宏来支持异步接口，生成的 Future 都是 `Send` 的，
/// 因此解析器可以被放进 `Arc` 并在工作线程上使用。
#[async_trait]
pub trait SiteParser: Send + Sync {
    /// 展示用名称
    fn name(&self) -> &'static str;

    /// 搜索基础 URL
    fn url(&self) -> &str;

    /// 从随机挑选的一页结果中取出候选链接
    /// 会改写 `query.page`；没有结果时返回空列表而不是错误
    async fn get_image_links(&self, query: &mut Query) -> Result<Vec<Link>>;

    /// 列出某张图片在站点上提供的全部分辨率
    async fn get_available_resolutions(&self, link: &Link) -> Result<Vec<Resolution>>;

    /// 下载指定 (链接, 分辨率) 的图片字节
    async fn get_image_bytes(&self, link: &Link, resolution: Resolution) -> Result<Vec<u8>>;

    /// 查询结果总页数
    async fn get_pages(&self, query: &Query) -> Result<u32>;

    /// 查询结果总数
    async fn get_quantity(&self, query: &Query) -> Result<u32>;
}

/// 已支持的壁纸站（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    WallsCloud,
}

impl Site {
    pub const ALL: [Site; 1] = [Site::WallsCloud];

    pub fn name(&self) -> &'static str {
        match self {
            Site::WallsCloud => wallscloud::NAME,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Site::WallsCloud => wallscloud::SEARCH_URL,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn SiteParser>> {
        tracing::debug!("Building parser for {} ({})", self.name(), self.url());
        match self {
            Site::WallsCloud => Ok(Arc::new(WallsCloud::with_rng(
                self.url(),
                StdRng::from_entropy(),
            )?)),
        }
    }
}

/// 按名称索引的解析器注册表
pub struct SiteRegistry {
    parsers: BTreeMap<String, Arc<dyn SiteParser>>,
    default: String,
}

impl SiteRegistry {
    /// 为 `Site::ALL` 中的每个站点创建解析器，第一个作为默认站点
    pub fn new() -> Result<Self> {
        let parsers = Site::ALL
            .iter()
            .map(|site| site.build())
            .collect::<Result<Vec<_>>>()?;
        Self::with_parsers(parsers)
    }

    /// 用现成的解析器构建注册表，第一个作为默认站点
    pub fn with_parsers(parsers: Vec<Arc<dyn SiteParser>>) -> Result<Self> {
        let default = parsers
            .first()
            .map(|p| p.name().to_string())
            .ok_or_else(|| Error::InvalidInput("site registry is empty".into()))?;
        let parsers = parsers
            .into_iter()
            .map(|p| (p.name().to_lowercase(), p))
            .collect();
        Ok(Self {
            parsers,
            default: default.to_lowercase(),
        })
    }

    /// 名称匹配不区分大小写
    pub fn get(&self, name: &str) -> Result<Arc<dyn SiteParser>> {
        self.parsers
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("unknown site {name:?}")))
    }

    pub fn default_parser(&self) -> Arc<dyn SiteParser> {
        // with_parsers 保证 default 一定存在
        self.parsers[&self.default].clone()
    }

    pub fn parsers(&self) -> impl Iterator<Item = &Arc<dyn SiteParser>> {
        self.parsers.values()
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeParser;
    use super::*;

    #[test]
    fn test_resolution_from_str() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(res, Resolution::new_unchecked(1920, 1080));
        let res: Resolution = "2560 X 1440".parse().unwrap();
        assert_eq!(res, Resolution::new_unchecked(2560, 1440));
        assert!("99x1080".parse::<Resolution>().is_err());
        assert!("1920x10001".parse::<Resolution>().is_err());
        assert!("1920*1080".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_serializes_as_pair() {
        let res = Resolution::new_unchecked(1920, 1080);
        assert_eq!(serde_json::to_string(&res).unwrap(), "[1920,1080]");
        let back: Resolution = serde_json::from_str("[1280, 720]").unwrap();
        assert_eq!(back, Resolution::new_unchecked(1280, 720));
    }

    #[test]
    fn test_query_params() {
        let mut query = Query::new("forest", Orientation::Portrait);
        query.page = 3;
        let params = query.params();
        assert_eq!(params[0], ("q", "forest".to_string()));
        assert_eq!(params[1], ("page", "3".to_string()));
        assert_eq!(params[2], ("orientation", "portrait".to_string()));
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = SiteRegistry::with_parsers(vec![
            Arc::new(FakeParser::new("Alpha")),
            Arc::new(FakeParser::new("Beta")),
        ])
        .unwrap();
        assert_eq!(registry.get("beta").unwrap().name(), "Beta");
        assert_eq!(registry.get(" ALPHA ").unwrap().name(), "Alpha");
        assert_eq!(registry.default_parser().name(), "Alpha");
        assert!(registry.get("gamma").is_err());
        assert!(SiteRegistry::with_parsers(Vec::new()).is_err());
    }

    #[test]
    fn test_builtin_sites() {
        let registry = SiteRegistry::new().unwrap();
        let names: Vec<_> = registry.parsers().map(|p| p.name()).collect();
        assert_eq!(names, vec![Site::WallsCloud.name()]);
        assert_eq!(registry.default_parser().url(), Site::WallsCloud.url());
    }
}
