use std::collections::{HashMap, VecDeque};
use tracing::debug;
use crate::models::{common::Vector3, hitbox::Hitbox};

/// 追跡記録の保持期間（ms）
pub const TRACK_RETENTION_MS: f64 = 5000.0;

/// 位置履歴の最大サンプル数
pub const MAX_HISTORY: usize = 10;

/// 速度算出の基準ティックレート（tick/s）
pub const TRACKER_TICK_RATE: f64 = 60.0;

/// 追跡中ターゲットの運動記録
///
/// ヒットボックス本体は保持せず、レジストリのキー（ID）で参照します。
#[derive(Debug, Clone)]
pub struct TrackedTarget {
    pub id: String,
    /// 初回観測時刻（ms）
    pub first_seen: f64,
    /// 最終観測時刻（ms）
    pub last_seen: f64,
    /// 直近の中心位置（古い順、最大10件）
    pub history: VecDeque<Vector3>,
    /// 推定速度（units/s）
    pub velocity: Vector3,
    pub is_hostile: bool,
    pub threat_score: f64,
}

impl TrackedTarget {
    fn new(id: String, center: Vector3, now_ms: f64) -> Self {
        let mut history = VecDeque::with_capacity(MAX_HISTORY);
        history.push_back(center);
        Self {
            id,
            first_seen: now_ms,
            last_seen: now_ms,
            history,
            velocity: Vector3::ZERO,
            is_hostile: true,
            threat_score: 0.0,
        }
    }

    /// 最新の観測位置
    pub fn latest_position(&self) -> Option<Vector3> {
        self.history.back().copied()
    }

    /// 追跡継続時間（ms）
    pub fn track_duration(&self) -> f64 {
        self.last_seen - self.first_seen
    }
}

/// ターゲット追跡器
///
/// ターゲットIDごとに短期の位置履歴を保持し、速度推定と位置予測を行います。
#[derive(Debug, Default)]
pub struct TargetTracker {
    targets: HashMap<String, TrackedTarget>,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// ターゲットの観測を記録
    ///
    /// 初回は記録を作成し、2回目以降は中心位置を履歴に追加して
    /// 直近2サンプルから速度を再計算します。
    ///
    /// # 引数
    ///
    /// * `id` - ターゲットID
    /// * `hitbox` - 観測したヒットボックス
    /// * `now_ms` - 現在時刻（ms）
    pub fn observe(&mut self, id: &str, hitbox: &Hitbox, now_ms: f64) {
        let Some(tracked) = self.targets.get_mut(id) else {
            debug!(target_id = %id, "TRACK_STARTED: ターゲットの追跡を開始しました");
            self.targets
                .insert(id.to_string(), TrackedTarget::new(id.to_string(), hitbox.center, now_ms));
            return;
        };

        tracked.history.push_back(hitbox.center);
        while tracked.history.len() > MAX_HISTORY {
            tracked.history.pop_front();
        }
        tracked.last_seen = now_ms;

        let len = tracked.history.len();
        if len >= 2 {
            let delta = tracked.history[len - 1] - tracked.history[len - 2];
            tracked.velocity = delta * TRACKER_TICK_RATE;
        }
    }

    /// 位置予測
    ///
    /// # 戻り値
    ///
    /// `最新位置 + 速度 × dt`、未知のIDの場合はNone
    pub fn predict(&self, id: &str, dt: f64) -> Option<Vector3> {
        let tracked = self.targets.get(id)?;
        let position = tracked.latest_position()?;
        Some(position + tracked.velocity * dt)
    }

    /// 古い追跡記録を削除
    ///
    /// # 戻り値
    ///
    /// 削除した記録の数
    pub fn evict(&mut self, now_ms: f64) -> usize {
        let before = self.targets.len();
        self.targets.retain(|id, tracked| {
            let keep = now_ms - tracked.last_seen <= TRACK_RETENTION_MS;
            if !keep {
                debug!(target_id = %id, "TRACK_EVICTED: 古い追跡記録を削除しました");
            }
            keep
        });
        before - self.targets.len()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedTarget> {
        self.targets.get(id)
    }

    /// 追跡中ターゲットの一覧（ID順）
    pub fn get_tracked_targets(&self) -> Vec<&TrackedTarget> {
        let mut targets: Vec<&TrackedTarget> = self.targets.values().collect();
        targets.sort_by(|a, b| a.id.cmp(&b.id));
        targets
    }

    pub fn set_threat(&mut self, id: &str, score: f64) {
        if let Some(tracked) = self.targets.get_mut(id) {
            tracked.threat_score = score;
        }
    }

    pub fn mark_hostile(&mut self, id: &str, hostile: bool) {
        if let Some(tracked) = self.targets.get_mut(id) {
            tracked.is_hostile = hostile;
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.targets.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        collider::ColliderDescriptor,
        hitbox::HitboxType,
        pose::AffineBindpose,
    };

    fn hitbox_at(center: Vector3) -> Hitbox {
        let descriptor = ColliderDescriptor::with_shape(Vector3::ONE, Vector3::ZERO, Vector3::ONE);
        Hitbox::new(
            &descriptor,
            Vector3::ZERO,
            &AffineBindpose::translation(center),
            None,
            None,
            HitboxType::Body,
        )
        .unwrap()
    }

    #[test]
    fn test_velocity_from_last_two_samples() {
        let mut tracker = TargetTracker::new();
        tracker.observe("t1", &hitbox_at(Vector3::new(0.0, 0.0, 10.0)), 0.0);
        assert_eq!(tracker.get("t1").unwrap().velocity, Vector3::ZERO);

        tracker.observe("t1", &hitbox_at(Vector3::new(0.1, 0.0, 10.0)), 16.0);
        let tracked = tracker.get("t1").unwrap();
        assert!(tracked.velocity.approx_eq(&Vector3::new(6.0, 0.0, 0.0), 1e-9));
        assert_eq!(tracked.last_seen, 16.0);

        let predicted = tracker.predict("t1", 0.5).unwrap();
        assert!(predicted.approx_eq(&Vector3::new(3.1, 0.0, 10.0), 1e-9));
    }

    #[test]
    fn test_predict_unknown_id() {
        let tracker = TargetTracker::new();
        assert!(tracker.predict("missing", 1.0).is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = TargetTracker::new();
        for i in 0..25 {
            tracker.observe("t1", &hitbox_at(Vector3::new(i as f64, 0.0, 0.0)), i as f64);
        }
        let tracked = tracker.get("t1").unwrap();
        assert_eq!(tracked.history.len(), MAX_HISTORY);
        assert_eq!(tracked.history.front().unwrap().x, 15.0);
        assert_eq!(tracked.latest_position().unwrap().x, 24.0);
    }

    #[test]
    fn test_stale_target_is_evicted() {
        let mut tracker = TargetTracker::new();
        tracker.observe("stale", &hitbox_at(Vector3::ZERO), 0.0);
        tracker.observe("fresh", &hitbox_at(Vector3::ZERO), 4000.0);

        assert_eq!(tracker.evict(5000.0), 0);
        assert_eq!(tracker.evict(5001.0), 1);

        let ids: Vec<&str> = tracker.get_tracked_targets().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[test]
    fn test_threat_and_hostility() {
        let mut tracker = TargetTracker::new();
        tracker.observe("t1", &hitbox_at(Vector3::ZERO), 0.0);
        tracker.set_threat("t1", 42.0);
        tracker.mark_hostile("t1", false);
        let tracked = tracker.get("t1").unwrap();
        assert_eq!(tracked.threat_score, 42.0);
        assert!(!tracked.is_hostile);
        assert!(tracker.remove("t1"));
        assert!(tracker.is_empty());
    }
}
