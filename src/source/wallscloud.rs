// wallscloud.rs — WallsCloud 网页解析器
// 负责抓取 WallsCloud 的搜索页和详情页 HTML：取候选链接、列出分辨率、下载图片
//
// 注意：WallsCloud 没有公开 API，这里依赖页面结构，
// 页面改版时解析会失败并以 TransportError 的形式报告。

use super::{Link, Query, Resolution, SiteParser};
use crate::error::{Error, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::Rng;
use rand::rngs::StdRng;
use scraper::{Html, Selector};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

pub const NAME: &str = "WallsCloud";
pub const SEARCH_URL: &str = "https://wallscloud.net/ru/search";

/// 每页结果数量（站点固定值）
pub const PAGE_SIZE: u32 = 35;

/// 单次请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static! {
    static ref RESULT_COUNT: Selector = Selector::parse("div.page-title small").unwrap();
    static ref RESULTS: Selector = Selector::parse("div.grid-row.walls_data").unwrap();
    static ref RESULT_MARKER: Selector = Selector::parse("figure").unwrap();
    static ref RESULT_LINK: Selector = Selector::parse("a.wall_link").unwrap();
    static ref RESOLUTION_BLOCK: Selector = Selector::parse("div.resblocks").unwrap();
    static ref RESOLUTION_ENTRY: Selector = Selector::parse("a").unwrap();
}

/// WallsCloud 异步客户端
///
/// 封装了 reqwest::Client、搜索地址和随机数源。
/// 随机数源用于挑选结果页，可以注入固定种子，让测试结果可复现。
pub struct WallsCloud {
    /// HTTP 客户端（内部有连接池，应复用）
    client: reqwest::Client,

    /// 搜索页地址
    url: Url,

    /// 挑选页码用的随机数源
    rng: Mutex<StdRng>,
}

impl WallsCloud {
    /// 指定搜索地址与随机数源
    pub fn with_rng(search_url: &str, rng: StdRng) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("wallpaster/{}", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: Url::parse(search_url)?,
            rng: Mutex::new(rng),
        })
    }

    /// GET 请求并读取响应文本，非 2xx 视为错误
    async fn fetch_text(&self, url: &str, params: Option<&Query>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(query) = params {
            request = request.query(&query.params());
        }

        tracing::debug!("GET {url} {params:?}");
        let body = request.send().await?.error_for_status()?.text().await?;
        Ok(body)
    }

    /// 取一个 [0, 1) 之间的随机数
    fn sample(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.r#gen::<f64>()
    }
}

#[async_trait]
impl SiteParser for WallsCloud {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn get_image_links(&self, query: &mut Query) -> Result<Vec<Link>> {
        let pages = self.get_pages(query).await?;
        query.page = pick_page(pages, self.sample());

        let body = self.fetch_text(self.url.as_str(), Some(query)).await?;
        let links = parse_image_links(&body, &self.url)?;
        tracing::debug!("Page {} of {} gave {} links", query.page, pages, links.len());
        Ok(links)
    }

    async fn get_available_resolutions(&self, link: &Link) -> Result<Vec<Resolution>> {
        let body = self.fetch_text(link.as_str(), None).await?;
        parse_resolutions(&body)
    }

    async fn get_image_bytes(&self, link: &Link, resolution: Resolution) -> Result<Vec<u8>> {
        let url = download_url(link, resolution);
        tracing::debug!("GET {url}");
        let bytes = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn get_pages(&self, query: &Query) -> Result<u32> {
        let quantity = self.get_quantity(query).await?;
        Ok(pages_for(quantity))
    }

    async fn get_quantity(&self, query: &Query) -> Result<u32> {
        let body = self.fetch_text(self.url.as_str(), Some(query)).await?;
        parse_quantity(&body)
    }
}

/// 结果总数对应的页数，向上取整
pub fn pages_for(quantity: u32) -> u32 {
    quantity.div_ceil(PAGE_SIZE)
}

/// 由随机数 `sample` ∈ [0, 1) 选页，结果落在 [1, pages + 1]
///
/// 上界可能比真实页数多一页，这一页通常是空的，会得到空的候选列表
pub fn pick_page(pages: u32, sample: f64) -> u32 {
    (sample * f64::from(pages) + 1.0).round() as u32
}

/// 分辨率专属的下载地址：`{link}/{width}x{height}/download`
pub fn download_url(link: &Link, resolution: Resolution) -> String {
    format!(
        "{}/{}x{}/download",
        link.as_str().trim_end_matches('/'),
        resolution.width,
        resolution.height
    )
}

/// 截掉链接中第一个 `{` 或 `}` 及其之后的内容
pub fn clean_link(href: &str) -> &str {
    match href.find(['{', '}']) {
        Some(end) => &href[..end],
        None => href,
    }
}

/// 从搜索页的结果计数中读出总数，如 "1234 wallpapers"
pub fn parse_quantity(html: &str) -> Result<u32> {
    let doc = Html::parse_document(html);
    let text = doc
        .select(&RESULT_COUNT)
        .next()
        .map(|e| e.text().collect::<String>())
        .ok_or_else(|| Error::InvalidHtml("missing result count".into()))?;

    let number = text
        .split_whitespace()
        .next()
        .map(|s| s.replace(',', ""))
        .ok_or_else(|| Error::InvalidHtml(format!("empty result count {text:?}")))?;

    number
        .parse::<u32>()
        .map_err(|_| Error::InvalidHtml(format!("bad result count {text:?}")))
}

/// 从搜索页取出候选链接
///
/// 找不到结果容器或容器中没有结果时返回空列表
pub fn parse_image_links(html: &str, base: &Url) -> Result<Vec<Link>> {
    let doc = Html::parse_document(html);
    let Some(block) = doc.select(&RESULTS).next() else {
        return Ok(Vec::new());
    };
    if block.select(&RESULT_MARKER).next().is_none() {
        return Ok(Vec::new());
    }

    block
        .select(&RESULT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| Ok(Link::new(base.join(clean_link(href))?.to_string())))
        .collect()
}

/// 从详情页取出全部分辨率，格式为 "<宽> x <高>"
///
/// 任意一项格式不对都视为整页解析失败
pub fn parse_resolutions(html: &str) -> Result<Vec<Resolution>> {
    let doc = Html::parse_document(html);
    let block = doc
        .select(&RESOLUTION_BLOCK)
        .next()
        .ok_or_else(|| Error::InvalidHtml("missing resolution block".into()))?;

    block
        .select(&RESOLUTION_ENTRY)
        .map(|a| parse_resolution_text(&a.text().collect::<String>()))
        .collect()
}

fn parse_resolution_text(text: &str) -> Result<Resolution> {
    let invalid = || Error::InvalidHtml(format!("bad resolution entry {text:?}"));
    let (w, h) = text.trim().split_once(" x ").ok_or_else(invalid)?;
    let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok(Resolution::new_unchecked(width, height))
}
