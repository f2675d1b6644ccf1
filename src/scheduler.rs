// scheduler.rs — 轮播定时器
// 只记录下一次触发的时间点，由主循环每秒调用 poll() 推进

use std::time::Duration;
use tokio::time::Instant;

/// 周期触发器
///
/// 不持有任何任务，`poll` 返回 true 时由调用方发起一次获取。
#[derive(Debug, Clone)]
pub struct SlideshowScheduler {
    interval: Duration,
    next_tick: Option<Instant>,
}

impl SlideshowScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 开始计时；调用方应立即触发一次获取
    pub fn start(&mut self, now: Instant) {
        self.next_tick = Some(now + self.interval);
    }

    /// 停止计时，已在进行的获取不受影响
    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    /// 修改间隔；运行中则从现在起重新计时
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        if self.is_running() {
            self.start(now);
        }
    }

    /// 距下一次触发的剩余时间，未运行时为 None
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_tick.map(|tick| tick.saturating_duration_since(now))
    }

    /// 到期时返回 true 并安排下一次触发
    ///
    /// 主循环卡顿错过多个周期时只触发一次，下一次从 `now` 起算
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(tick) if tick <= now => {
                let next = tick + self.interval;
                self.next_tick = Some(if next > now { next } else { now + self.interval });
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_idle_scheduler_never_ticks() {
        let now = Instant::now();
        let mut scheduler = SlideshowScheduler::new(MINUTE);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.remaining(now), None);
        assert!(!scheduler.poll(now + MINUTE * 10));
    }

    #[test]
    fn test_ticks_once_per_interval() {
        let now = Instant::now();
        let mut scheduler = SlideshowScheduler::new(MINUTE);
        scheduler.start(now);

        assert_eq!(scheduler.remaining(now), Some(MINUTE));
        assert_eq!(
            scheduler.remaining(now + Duration::from_secs(45)),
            Some(Duration::from_secs(15))
        );
        assert!(!scheduler.poll(now + Duration::from_secs(59)));
        assert!(scheduler.poll(now + MINUTE));
        assert!(!scheduler.poll(now + MINUTE));
        assert_eq!(scheduler.remaining(now + MINUTE), Some(MINUTE));
        assert!(scheduler.poll(now + MINUTE * 2));
    }

    #[test]
    fn test_missed_ticks_collapse() {
        let now = Instant::now();
        let mut scheduler = SlideshowScheduler::new(MINUTE);
        scheduler.start(now);

        let late = now + MINUTE * 5 + Duration::from_secs(1);
        assert!(scheduler.poll(late));
        assert!(!scheduler.poll(late));
        assert_eq!(scheduler.remaining(late), Some(MINUTE));
    }

    #[test]
    fn test_stop_and_interval_change() {
        let now = Instant::now();
        let mut scheduler = SlideshowScheduler::new(MINUTE);
        scheduler.start(now);
        scheduler.stop();
        assert!(!scheduler.poll(now + MINUTE));
        assert_eq!(scheduler.remaining(now), None);

        scheduler.set_interval(MINUTE * 2, now);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.interval(), MINUTE * 2);

        scheduler.start(now);
        let later = now + Duration::from_secs(30);
        scheduler.set_interval(MINUTE * 3, later);
        assert_eq!(scheduler.remaining(later), Some(MINUTE * 3));
    }
}
