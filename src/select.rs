// select.rs — 候选选择
// 先随机抽一个候选试探，不满足目标分辨率时再从头顺序扫描

use crate::error::{Error, Result};
use crate::source::{Link, Resolution};
use rand::Rng;
use std::future::Future;

/// 从候选中挑出一个提供 `target` 分辨率的链接
///
/// `resolver` 返回某个链接在站点上提供的分辨率，每次调用通常是一次网络请求。
///
/// 1. 候选为空时直接返回 `NoCandidates`，不调用 `resolver`
/// 2. 随机挑一个起点，满足则直接返回
/// 3. 否则从下标 0 开始按原顺序扫描（跳过已经试过的起点），返回第一个满足的
/// 4. 全部不满足时返回 `NoMatchingResolution`
///
/// 每个候选最多查询一次；`resolver` 出错时立即返回该错误。
pub async fn select<R, F, Fut>(
    candidates: &[Link],
    target: Resolution,
    rng: &mut R,
    resolver: F,
) -> Result<Link>
where
    R: Rng,
    F: FnMut(Link) -> Fut,
    Fut: Future<Output = Result<Vec<Resolution>>>,
{
    if candidates.is_empty() {
        return Err(Error::NoCandidates);
    }
    let start = rng.gen_range(0..candidates.len());
    select_from(candidates, start, target, resolver).await
}

/// 以指定下标作为随机起点执行选择
pub(crate) async fn select_from<F, Fut>(
    candidates: &[Link],
    start: usize,
    target: Resolution,
    mut resolver: F,
) -> Result<Link>
where
    F: FnMut(Link) -> Fut,
    Fut: Future<Output = Result<Vec<Resolution>>>,
{
    let Some(first) = candidates.get(start) else {
        return Err(Error::NoCandidates);
    };

    if resolver(first.clone()).await?.contains(&target) {
        tracing::debug!("Random pick {first} offers {target}");
        return Ok(first.clone());
    }

    tracing::debug!("Random pick {first} lacks {target}, scanning from the front");
    for (index, link) in candidates.iter().enumerate() {
        if index == start {
            continue;
        }
        if resolver(link.clone()).await?.contains(&target) {
            return Ok(link.clone());
        }
    }

    Err(Error::NoMatchingResolution(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
    const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// 构造一个记录调用顺序的 resolver
    fn table(
        entries: &[(&str, Vec<Resolution>)],
    ) -> (
        Vec<Link>,
        Arc<Mutex<Vec<Link>>>,
        impl FnMut(Link) -> std::future::Ready<Result<Vec<Resolution>>> + use<>,
    ) {
        let links: Vec<Link> = entries.iter().map(|(l, _)| Link::new(*l)).collect();
        let map: HashMap<Link, Vec<Resolution>> = entries
            .iter()
            .map(|(l, r)| (Link::new(*l), r.clone()))
            .collect();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = calls.clone();
        let resolver = move |link: Link| {
            log.lock().unwrap().push(link.clone());
            std::future::ready(Ok(map.get(&link).cloned().unwrap_or_default()))
        };
        (links, calls, resolver)
    }

    fn sample_table() -> Vec<(&'static str, Vec<Resolution>)> {
        vec![("/a", vec![HD]), ("/b", vec![FULL_HD]), ("/c", vec![FULL_HD])]
    }

    #[tokio::test]
    async fn test_empty_candidates_never_call_resolver() {
        let (_, calls, resolver) = table(&[]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = select(&[], FULL_HD, &mut rng, resolver).await;
        assert!(matches!(result, Err(Error::NoCandidates)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_pick_falls_back_to_front() {
        let (links, calls, resolver) = table(&sample_table());
        let picked = select_from(&links, 0, FULL_HD, resolver).await.unwrap();
        assert_eq!(picked, Link::new("/b"));
        assert_eq!(*calls.lock().unwrap(), vec![Link::new("/a"), Link::new("/b")]);
    }

    #[tokio::test]
    async fn test_matching_pick_is_returned_directly() {
        let (links, calls, resolver) = table(&sample_table());
        let picked = select_from(&links, 2, FULL_HD, resolver).await.unwrap();
        assert_eq!(picked, Link::new("/c"));
        assert_eq!(*calls.lock().unwrap(), vec![Link::new("/c")]);
    }

    #[tokio::test]
    async fn test_scan_restarts_at_front_not_after_pick() {
        let entries = vec![
            ("/a", vec![FULL_HD]),
            ("/b", vec![HD]),
            ("/c", vec![FULL_HD]),
        ];
        let (links, calls, resolver) = table(&entries);
        let picked = select_from(&links, 1, FULL_HD, resolver).await.unwrap();
        assert_eq!(picked, Link::new("/a"));
        assert_eq!(*calls.lock().unwrap(), vec![Link::new("/b"), Link::new("/a")]);
    }

    #[tokio::test]
    async fn test_exhaustion_consults_each_candidate_once() {
        let entries = vec![("/a", vec![HD]), ("/b", vec![HD]), ("/c", vec![])];
        for seed in 0..10 {
            let (links, calls, resolver) = table(&entries);
            let mut rng = StdRng::seed_from_u64(seed);
            let result = select(&links, FULL_HD, &mut rng, resolver).await;
            assert!(matches!(result, Err(Error::NoMatchingResolution(r)) if r == FULL_HD));

            let mut consulted = calls.lock().unwrap().clone();
            consulted.sort();
            assert_eq!(consulted, links);
        }
    }

    #[tokio::test]
    async fn test_selection_always_offers_target() {
        for seed in 0..50 {
            let (links, _, resolver) = table(&sample_table());
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select(&links, FULL_HD, &mut rng, resolver).await.unwrap();
            assert!(picked == Link::new("/b") || picked == Link::new("/c"));
        }
    }

    #[tokio::test]
    async fn test_resolver_error_aborts_selection() {
        let links = vec![Link::new("/a"), Link::new("/b")];
        let resolver = |_link: Link| std::future::ready(Err(Error::InvalidHtml("gone".into())));
        let result = select_from(&links, 0, FULL_HD, resolver).await;
        assert!(matches!(result, Err(Error::InvalidHtml(_))));
    }
}
