use std::collections::VecDeque;

/// フレーム時間の移動窓サイズ
pub const FRAME_WINDOW: usize = 60;

/// フレーム時間とFPSの計測
///
/// フレーム時間は連続するフレーム開始時刻の差として記録します。
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    frame_times: VecDeque<f64>,
    window: usize,
    last_frame_start: Option<f64>,
    pub total_frames: u64,
}

/// 計測結果のスナップショット
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceReport {
    pub average_frame_ms: f64,
    pub min_frame_ms: f64,
    pub max_frame_ms: f64,
    pub fps: f64,
    pub total_frames: u64,
}

impl PerformanceMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(window),
            window: window.max(1),
            last_frame_start: None,
            total_frames: 0,
        }
    }

    /// フレーム開始時刻を記録（ms）
    ///
    /// 前フレームの開始時刻があれば、その差をフレーム時間として窓に追加します。
    pub fn begin_frame(&mut self, now_ms: f64) {
        if let Some(previous) = self.last_frame_start.replace(now_ms) {
            self.record_frame_time((now_ms - previous).max(0.0));
        }
    }

    pub fn record_frame_time(&mut self, frame_ms: f64) {
        self.frame_times.push_back(frame_ms);
        while self.frame_times.len() > self.window {
            self.frame_times.pop_front();
        }
        self.total_frames += 1;
    }

    pub fn average_frame_time(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64
    }

    /// 平均フレーム時間から求めたFPS（計測なし・0msの場合は0）
    pub fn fps(&self) -> f64 {
        let average = self.average_frame_time();
        if average > 0.0 { 1000.0 / average } else { 0.0 }
    }

    pub fn report(&self) -> PerformanceReport {
        let min = self.frame_times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.frame_times.iter().copied().fold(0.0, f64::max);
        PerformanceReport {
            average_frame_ms: self.average_frame_time(),
            min_frame_ms: if min.is_finite() { min } else { 0.0 },
            max_frame_ms: max,
            fps: self.fps(),
            total_frames: self.total_frames,
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(FRAME_WINDOW)
    }
}
