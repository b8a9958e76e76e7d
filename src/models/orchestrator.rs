//! # Orchestrator モジュール
//!
//! 照準補助の中核となるティック処理を提供します。
//!
//! 登録済みターゲットの評価・選択、カメラの照準制御、射撃制御、
//! 追跡記録の更新を1ティックごとに順番に実行します。
//!
//! ## ティック処理順序
//!
//! 1. **フレーム計測**: パフォーマンスモニタへフレーム開始を記録
//! 2. **候補評価**: 視線・距離判定、予測照準点、スコア計算
//! 3. **ターゲット選択**: 最大スコア（同点はリスト順で先勝ち）
//! 4. **照準保持**: クロスヘアが既に収まっていれば静止入力と自動射撃
//! 5. **照準移動**: 射撃中または自動射撃時にカメラを目標へ移動
//! 6. **追跡記録の整理**: 古い追跡記録の削除
//!
//! 候補リストはIDのみを保持するため、評価後にレジストリを参照し直します。

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use crate::models::{
    camera::{CameraModel, MIN_PROJECTION_DEPTH},
    collider::ColliderDescriptor,
    common::{Vector2, Vector3},
    hitbox::{Hitbox, HitboxError, HitboxType},
    performance::PerformanceMonitor,
    pose::TargetPose,
    tracker::TargetTracker,
    traits::{IActuator, IDebugRenderer, MarkerKind},
};

/// 射撃ごとに適用する固定リコイルパターン（ヨー, ピッチ、ラジアン）
///
/// 負のピッチは上方向です。射撃入力を離すと先頭に戻ります。
pub const RECOIL_PATTERN: [(f64, f64); 8] = [
    (0.0, -0.004),
    (0.001, -0.005),
    (-0.001, -0.006),
    (0.002, -0.006),
    (-0.002, -0.007),
    (0.001, -0.007),
    (-0.001, -0.008),
    (0.0, -0.008),
];

/// スコア計算の重み
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub distance: f64,
    pub angle: f64,
    pub priority: f64,
    pub hit_probability: f64,
    /// 直近に命中したターゲットのスコア倍率（ダメージ分散）
    pub recent_hit_multiplier: f64,
    /// 直近命中とみなす期間（ms）
    pub recent_hit_window_ms: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 50.0,
            angle: 30.0,
            priority: 10.0,
            hit_probability: 20.0,
            recent_hit_multiplier: 0.5,
            recent_hit_window_ms: 1000.0,
        }
    }
}

/// 照準補助の設定
///
/// ティック中は変更されない値として扱います。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AimSettings {
    pub enabled: bool,
    /// falseの場合はカメラを直接目標へ向ける
    pub smooth_aiming: bool,
    pub prediction: bool,
    /// 予測の先読みティック数
    pub prediction_ticks: f64,
    /// 視線判定を省略する
    pub see_through_walls: bool,
    pub recoil_pattern_enabled: bool,
    pub max_distance: f64,
    pub aim_assist_strength: f64,
    /// 射撃間隔の下限（ms）
    pub auto_fire_delay_ms: f64,
    pub crosshair_threshold: f64,
    /// この角度未満なら自動射撃する（ラジアン）
    pub fire_angle_threshold: f64,
    /// この角度を超える場合のみマウス移動を送出する（ラジアン）
    pub min_mouse_delta: f64,
    pub weights: ScoringWeights,
}

impl Default for AimSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            smooth_aiming: true,
            prediction: true,
            prediction_ticks: 3.0,
            see_through_walls: false,
            recoil_pattern_enabled: true,
            max_distance: 100.0,
            aim_assist_strength: 0.8,
            auto_fire_delay_ms: 100.0,
            crosshair_threshold: 0.15,
            fire_angle_threshold: 0.05,
            min_mouse_delta: 0.01,
            weights: ScoringWeights::default(),
        }
    }
}

/// 1ティック分の評価候補
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub target_id: String,
    pub score: f64,
    pub distance: f64,
    pub angle: f64,
    pub aim_point: Vector3,
}

/// ティック処理の結果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// 照準補助が無効
    Disabled,
    /// 評価候補なし
    NoCandidates,
    /// ターゲットを選択したが、射撃入力も自動射撃条件も無い
    Tracking { target_id: String },
    /// クロスヘアが既にターゲット内にあり、静止入力を送出
    HoldSteady { target_id: String, fired: bool },
    /// カメラをターゲットへ移動
    Steering { target_id: String, residual_angle: f64, fired: bool },
}

/// 照準補助の統計情報
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AimStatistics {
    pub ticks: u64,
    pub candidates_evaluated: u64,
    pub target_switches: u64,
    pub shots_fired: u64,
    pub hits_recorded: u64,
    pub mouse_emissions: u64,
    pub hold_steady_emissions: u64,
}

/// レジストリに登録されたターゲット
#[derive(Debug, Clone)]
pub struct RegisteredTarget {
    pub id: String,
    pub hitbox: Hitbox,
}

/// 照準補助オーケストレータ
///
/// カメラ、ターゲットレジストリ、追跡器、設定、統計、射撃制御を所有し、
/// `update` を1ティックにつき1回呼び出して使用します。
#[derive(Debug)]
pub struct AutoAimOrchestrator {
    camera: CameraModel,
    targets: Vec<RegisteredTarget>,
    tracker: TargetTracker,
    settings: AimSettings,
    statistics: AimStatistics,
    performance: PerformanceMonitor,

    fire_pressed: bool,
    auto_fire: bool,
    /// 正規化スクリーン座標のクロスヘア位置
    crosshair: Vector2,

    last_shot_time: Option<f64>,
    recoil_index: usize,
    current_target: Option<String>,
    target_counter: u32,
}

impl AutoAimOrchestrator {
    pub fn new(camera: CameraModel, settings: AimSettings) -> Self {
        Self {
            camera,
            targets: Vec::new(),
            tracker: TargetTracker::new(),
            settings,
            statistics: AimStatistics::default(),
            performance: PerformanceMonitor::default(),
            fire_pressed: false,
            auto_fire: false,
            crosshair: Vector2::new(0.5, 0.5),
            last_shot_time: None,
            recoil_index: 0,
            current_target: None,
            target_counter: 0,
        }
    }

    // ---- ターゲットレジストリ ----

    /// ターゲットを登録
    ///
    /// 同じIDが既に登録されている場合はその場で置き換えます（評価順は維持）。
    ///
    /// # 引数
    ///
    /// * `descriptor` - コライダー記述子
    /// * `pose` - ボーン姿勢
    /// * `kind` - 部位
    /// * `id` - ターゲットID（省略時は `target_NNN` を採番）
    ///
    /// # 戻り値
    ///
    /// 登録されたターゲットID、コライダー設定が無い場合はエラー
    pub fn register_target(
        &mut self,
        descriptor: &ColliderDescriptor,
        pose: &TargetPose,
        kind: HitboxType,
        id: Option<&str>,
    ) -> Result<String, HitboxError> {
        let hitbox = Hitbox::new(
            descriptor,
            pose.local_position,
            &pose.bindpose,
            pose.rotation.as_ref(),
            pose.scale.as_ref(),
            kind,
        )?;

        let id = match id {
            Some(id) => id.to_string(),
            None => {
                self.target_counter += 1;
                format!("target_{:03}", self.target_counter)
            }
        };

        info!(
            target_id = %id,
            kind = %kind,
            center_x = hitbox.center.x,
            center_y = hitbox.center.y,
            center_z = hitbox.center.z,
            radius = hitbox.radius,
            "TARGET_REGISTERED: ターゲットを登録しました"
        );

        match self.index_of(&id) {
            Some(index) => self.targets[index].hitbox = hitbox,
            None => self.targets.push(RegisteredTarget { id: id.clone(), hitbox }),
        }

        Ok(id)
    }

    /// 登録済みターゲットの姿勢を更新
    ///
    /// # 戻り値
    ///
    /// 更新した場合はtrue、未知のIDの場合はfalse
    pub fn update_target_pose(&mut self, id: &str, pose: &TargetPose, dt: f64) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let hitbox = &mut self.targets[index].hitbox;
        let center = pose.world_position() + hitbox.offset;
        hitbox.update_position(center, dt);
        true
    }

    /// ターゲットを削除
    ///
    /// 追跡記録は残り、保持期間の経過後に削除されます。
    pub fn remove_target(&mut self, id: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.targets.remove(index);
        if self.current_target.as_deref() == Some(id) {
            self.current_target = None;
        }
        info!(target_id = %id, "TARGET_REMOVED: ターゲットを削除しました");
        true
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.current_target = None;
    }

    pub fn get_target(&self, id: &str) -> Option<&Hitbox> {
        self.targets.iter().find(|t| t.id == id).map(|t| &t.hitbox)
    }

    pub fn targets(&self) -> &[RegisteredTarget] {
        &self.targets
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.targets.iter().position(|t| t.id == id)
    }

    // ---- 入力・設定 ----

    /// 射撃入力の状態を設定（離すとリコイルパターンが先頭に戻る）
    pub fn set_fire_pressed(&mut self, pressed: bool) {
        if !pressed {
            self.recoil_index = 0;
        }
        self.fire_pressed = pressed;
    }

    pub fn set_auto_fire(&mut self, enabled: bool) {
        self.auto_fire = enabled;
    }

    pub fn set_crosshair(&mut self, crosshair: Vector2) {
        self.crosshair = crosshair;
    }

    pub fn set_settings(&mut self, settings: AimSettings) {
        self.settings = settings;
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraModel {
        &mut self.camera
    }

    pub fn settings(&self) -> &AimSettings {
        &self.settings
    }

    pub fn statistics(&self) -> &AimStatistics {
        &self.statistics
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.performance
    }

    pub fn tracker(&self) -> &TargetTracker {
        &self.tracker
    }

    pub fn current_target(&self) -> Option<&str> {
        self.current_target.as_deref()
    }

    // ---- 射撃制御 ----

    /// 射撃
    ///
    /// 前回の射撃から `auto_fire_delay_ms` 未満の場合は何もせずfalseを返します。
    /// 成功時はリコイルパターンの次の段をカメラに加え、アクチュエータへ
    /// 射撃アクションを送出します。
    pub fn fire(&mut self, now_ms: f64, actuator: &mut dyn IActuator) -> bool {
        if let Some(last) = self.last_shot_time {
            if now_ms - last < self.settings.auto_fire_delay_ms {
                trace!(elapsed_ms = now_ms - last, "射撃間隔制限中のため射撃をスキップ");
                return false;
            }
        }

        self.last_shot_time = Some(now_ms);
        self.statistics.shots_fired += 1;

        if self.settings.recoil_pattern_enabled {
            let step = self.recoil_index.min(RECOIL_PATTERN.len() - 1);
            let (dx, dy) = RECOIL_PATTERN[step];
            self.camera.add_recoil(dx, dy);
            self.recoil_index = (self.recoil_index + 1).min(RECOIL_PATTERN.len());
        }

        actuator.trigger_fire();
        debug!(shots_fired = self.statistics.shots_fired, "FIRE: 射撃しました");
        true
    }

    /// 射撃して、成功したら選択中ターゲットに命中を記録
    fn fire_at(&mut self, target_id: &str, now_ms: f64, actuator: &mut dyn IActuator) -> bool {
        if !self.fire(now_ms, actuator) {
            return false;
        }
        if let Some(index) = self.index_of(target_id) {
            self.targets[index].hitbox.record_hit(now_ms);
            self.statistics.hits_recorded += 1;
        }
        true
    }

    // ---- ティック処理 ----

    /// 候補を1つ評価
    ///
    /// # 戻り値
    ///
    /// 評価候補、視線・距離条件を満たさない場合はNone
    fn evaluate_candidate(
        settings: &AimSettings,
        camera: &CameraModel,
        target: &RegisteredTarget,
        now_ms: f64,
        dt: f64,
    ) -> Option<Candidate> {
        let cam_pos = camera.get_position();
        let cam_dir = camera.get_direction();
        let hitbox = &target.hitbox;

        if !settings.see_through_walls
            && !hitbox.is_in_line_of_sight(cam_pos, cam_dir, settings.max_distance)
        {
            return None;
        }

        let distance = hitbox.center.distance(&cam_pos);
        if distance > settings.max_distance {
            return None;
        }

        let aim_point = if settings.prediction {
            hitbox.center + hitbox.velocity * (settings.prediction_ticks * dt)
        } else {
            hitbox.center
        };
        let angle = camera.angle_to(aim_point);

        let weights = &settings.weights;
        let mut score = weights.distance / distance.max(1.0)
            + weights.angle / angle.max(0.1)
            + weights.priority * hitbox.priority() as f64
            + weights.hit_probability * hitbox.hit_probability(cam_pos, cam_dir);

        if hitbox.was_hit_recently(now_ms, weights.recent_hit_window_ms) {
            score *= weights.recent_hit_multiplier;
        }

        Some(Candidate {
            target_id: target.id.clone(),
            score,
            distance,
            angle,
            aim_point,
        })
    }

    /// 全登録ターゲットを評価して候補リストを作成
    ///
    /// 評価と同時に全ターゲットを追跡器へ観測として記録します。
    pub fn build_candidates(&mut self, now_ms: f64, dt: f64) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for target in &self.targets {
            self.tracker.observe(&target.id, &target.hitbox, now_ms);
            if let Some(candidate) =
                Self::evaluate_candidate(&self.settings, &self.camera, target, now_ms, dt)
            {
                candidates.push(candidate);
            }
        }

        for candidate in &candidates {
            self.tracker.set_threat(&candidate.target_id, candidate.score);
        }
        self.statistics.candidates_evaluated += candidates.len() as u64;

        candidates
    }

    /// 最大スコアの候補を選択（同点は先勝ち）
    pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
        let mut best: Option<&Candidate> = None;
        for candidate in candidates {
            if best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    /// クロスヘアをターゲットの奥行き平面へ写した点
    ///
    /// カメラの右・上方向のずれをターゲット中心の (x, y) に足した値を返すため、
    /// `Hitbox::contains_crosshair` にそのまま渡せます。
    fn crosshair_in_target_plane(&self, hitbox: &Hitbox) -> Option<Vector2> {
        let cam_pos = self.camera.get_position();
        let depth = (hitbox.center - cam_pos).dot(&self.camera.get_direction());
        if depth < MIN_PROJECTION_DEPTH {
            return None;
        }

        let world = cam_pos + self.camera.crosshair_ray(self.crosshair) * depth;
        let offset = world - hitbox.center;
        Some(Vector2::new(
            hitbox.center.x + offset.dot(&self.camera.get_right()),
            hitbox.center.y + offset.dot(&self.camera.get_up()),
        ))
    }

    /// 1ティック分の処理
    ///
    /// # 引数
    ///
    /// * `now_ms` - 現在時刻（ms）
    /// * `dt` - 前ティックからの経過時間（秒）
    /// * `actuator` - マウス移動・射撃の送出先
    ///
    /// # 戻り値
    ///
    /// このティックで行った判断
    pub fn update(&mut self, now_ms: f64, dt: f64, actuator: &mut dyn IActuator) -> TickOutcome {
        self.performance.begin_frame(now_ms);
        self.statistics.ticks += 1;

        if !self.settings.enabled {
            return TickOutcome::Disabled;
        }

        let candidates = self.build_candidates(now_ms, dt);
        let Some(best) = Self::select_best(&candidates).cloned() else {
            self.tracker.evict(now_ms);
            return TickOutcome::NoCandidates;
        };

        if self.current_target.as_deref() != Some(best.target_id.as_str()) {
            self.statistics.target_switches += 1;
            info!(
                target_id = %best.target_id,
                score = best.score,
                distance = best.distance,
                angle = best.angle,
                "TARGET_ACQUIRED: ターゲットを選択しました"
            );
            self.current_target = Some(best.target_id.clone());
        }

        let outcome = self.engage(&best, now_ms, dt, actuator);
        self.tracker.evict(now_ms);
        outcome
    }

    /// 選択したターゲットへの照準保持・照準移動・射撃
    fn engage(
        &mut self,
        best: &Candidate,
        now_ms: f64,
        dt: f64,
        actuator: &mut dyn IActuator,
    ) -> TickOutcome {
        let Some(index) = self.index_of(&best.target_id) else {
            return TickOutcome::NoCandidates;
        };
        let target_id = best.target_id.clone();

        let hitbox = &self.targets[index].hitbox;
        let contained = self
            .crosshair_in_target_plane(hitbox)
            .is_some_and(|point| hitbox.contains_crosshair(point, self.settings.crosshair_threshold));

        if contained {
            actuator.send_mouse_delta(0.0, 0.0);
            self.statistics.hold_steady_emissions += 1;
            let fired = self.auto_fire && self.fire_at(&target_id, now_ms, actuator);
            return TickOutcome::HoldSteady { target_id, fired };
        }

        let cam_pos = self.camera.get_position();
        let in_sight = hitbox.is_in_line_of_sight(
            cam_pos,
            self.camera.get_direction(),
            self.settings.max_distance,
        );
        if !(self.fire_pressed || (self.auto_fire && in_sight)) {
            return TickOutcome::Tracking { target_id };
        }

        if self.settings.smooth_aiming {
            self.camera.aim_at(best.aim_point, dt);
        } else {
            self.camera.look_at(best.aim_point);
        }

        // 照準後の残差角。ヨーはワールド上方向、ピッチはカメラ右方向まわり
        let current = self.camera.get_direction();
        let desired = (best.aim_point - self.camera.get_position()).normalize();
        let axis = current.cross(&desired);
        let residual_angle = current.dot(&desired).clamp(-1.0, 1.0).acos();

        if residual_angle > self.settings.min_mouse_delta {
            let strength = self.settings.aim_assist_strength;
            let dx = axis.dot(&Vector3::UP) * strength;
            let dy = -axis.dot(&self.camera.get_right()) * strength;
            actuator.send_mouse_delta(dx, dy);
            self.statistics.mouse_emissions += 1;
            trace!(dx, dy, residual_angle, "MOUSE_DELTA: マウス移動を送出しました");
        }

        let fired = residual_angle < self.settings.fire_angle_threshold
            && self.auto_fire
            && self.fire_at(&target_id, now_ms, actuator);

        TickOutcome::Steering {
            target_id,
            residual_angle,
            fired,
        }
    }

    /// デバッグ描画
    ///
    /// 各ターゲット中心、移動中ターゲットの予測位置、クロスヘアを投影して
    /// 描画先へ渡します。カメラ後方の点は描画しません。
    pub fn render_debug(&self, renderer: &mut dyn IDebugRenderer) {
        for target in &self.targets {
            let kind = if self.current_target.as_deref() == Some(target.id.as_str()) {
                MarkerKind::Selected
            } else {
                MarkerKind::Target
            };
            if let Some(screen) = self.camera.project_to_screen(target.hitbox.center) {
                renderer.draw_marker(screen, kind);
            }
            if self.settings.prediction && target.hitbox.is_moving {
                if let Some(screen) = self.camera.project_to_screen(target.hitbox.predicted_position) {
                    renderer.draw_marker(screen, MarkerKind::Predicted);
                }
            }
        }
        renderer.draw_marker(self.crosshair, MarkerKind::Crosshair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{camera::CameraTuning, traits::RecordingActuator};

    const DT: f64 = 1.0 / 60.0;

    fn head_descriptor() -> ColliderDescriptor {
        ColliderDescriptor::with_shape(Vector3::ONE, Vector3::ZERO, Vector3::new(0.5, 0.5, 0.5))
    }

    fn orchestrator(settings: AimSettings) -> AutoAimOrchestrator {
        let camera = CameraModel::new(Vector3::ZERO, 0.0, 0.0, CameraTuning::default());
        AutoAimOrchestrator::new(camera, settings)
    }

    #[derive(Default)]
    struct MarkerLog(Vec<(Vector2, MarkerKind)>);

    impl IDebugRenderer for MarkerLog {
        fn draw_marker(&mut self, screen: Vector2, kind: MarkerKind) {
            self.0.push((screen, kind));
        }
    }

    #[test]
    fn test_register_and_auto_id() {
        let mut aim = orchestrator(AimSettings::default());
        let pose = TargetPose::at(Vector3::new(0.0, 0.0, 10.0));
        let first = aim.register_target(&head_descriptor(), &pose, HitboxType::Head, None).unwrap();
        let named = aim
            .register_target(&head_descriptor(), &pose, HitboxType::Body, Some("enemy"))
            .unwrap();
        assert_eq!(first, "target_001");
        assert_eq!(named, "enemy");
        assert_eq!(aim.target_count(), 2);

        // 同じIDは置き換え
        aim.register_target(&head_descriptor(), &pose, HitboxType::Limb, Some("enemy"))
            .unwrap();
        assert_eq!(aim.target_count(), 2);
        assert_eq!(aim.get_target("enemy").unwrap().kind, HitboxType::Limb);

        let missing = aim.register_target(
            &ColliderDescriptor::default(),
            &pose,
            HitboxType::Head,
            None,
        );
        assert_eq!(missing.unwrap_err(), HitboxError::MissingCollider);
    }

    #[test]
    fn test_clear_targets_is_idempotent() {
        let mut aim = orchestrator(AimSettings::default());
        let pose = TargetPose::at(Vector3::new(0.0, 0.0, 10.0));
        aim.register_target(&head_descriptor(), &pose, HitboxType::Head, None).unwrap();
        aim.clear_targets();
        assert_eq!(aim.target_count(), 0);
        aim.clear_targets();
        assert_eq!(aim.target_count(), 0);
        assert!(aim.current_target().is_none());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut aim = orchestrator(AimSettings::default());
        assert!(!aim.remove_target("ghost"));
        assert!(!aim.update_target_pose("ghost", &TargetPose::at(Vector3::ZERO), DT));
    }

    #[test]
    fn test_head_selected_over_body() {
        let mut aim = orchestrator(AimSettings::default());
        let pose = TargetPose::at(Vector3::new(0.0, 0.0, 5.0));
        aim.register_target(&head_descriptor(), &pose, HitboxType::Body, Some("body"))
            .unwrap();
        aim.register_target(&head_descriptor(), &pose, HitboxType::Head, Some("head"))
            .unwrap();

        let candidates = aim.build_candidates(0.0, DT);
        assert_eq!(candidates.len(), 2);
        assert!((candidates[1].score - candidates[0].score - 50.0).abs() < 1e-9);

        let best = AutoAimOrchestrator::select_best(&candidates).unwrap();
        assert_eq!(best.target_id, "head");
    }

    #[test]
    fn test_tie_prefers_first_registered() {
        let mut aim = orchestrator(AimSettings::default());
        let pose = TargetPose::at(Vector3::new(0.0, 0.0, 5.0));
        aim.register_target(&head_descriptor(), &pose, HitboxType::Head, Some("a")).unwrap();
        aim.register_target(&head_descriptor(), &pose, HitboxType::Head, Some("b")).unwrap();
        let candidates = aim.build_candidates(0.0, DT);
        assert_eq!(AutoAimOrchestrator::select_best(&candidates).unwrap().target_id, "a");
    }

    #[test]
    fn test_recent_hit_halves_score() {
        let mut aim = orchestrator(AimSettings::default());
        let pose = TargetPose::at(Vector3::new(0.0, 0.0, 5.0));
        aim.register_target(&head_descriptor(), &pose, HitboxType::Head, Some("a")).unwrap();
        let fresh = aim.build_candidates(0.0, DT)[0].score;

        aim.targets[0].hitbox.record_hit(0.0);
        let penalized = aim.build_candidates(500.0, DT)[0].score;
        assert!((penalized - fresh * 0.5).abs() < 1e-9);

        let recovered = aim.build_candidates(1500.0, DT)[0].score;
        assert!((recovered - fresh).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_and_out_of_sight_filtered() {
        let settings = AimSettings {
            max_distance: 20.0,
            ..AimSettings::default()
        };
        let mut aim = orchestrator(settings);
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, 50.0)), HitboxType::Head, Some("far"))
            .unwrap();
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, -5.0)), HitboxType::Head, Some("behind"))
            .unwrap();
        assert!(aim.build_candidates(0.0, DT).is_empty());

        // 遮蔽無視でも距離制限は残る
        aim.set_settings(AimSettings {
            see_through_walls: true,
            ..settings
        });
        let candidates = aim.build_candidates(0.0, DT);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_id, "behind");
    }

    #[test]
    fn test_fire_rate_limit() {
        let mut actuator = RecordingActuator::default();

        let mut aim = orchestrator(AimSettings {
            auto_fire_delay_ms: 0.0,
            ..AimSettings::default()
        });
        assert!(aim.fire(1000.0, &mut actuator));
        assert!(aim.fire(1000.0, &mut actuator));
        assert_eq!(aim.statistics().shots_fired, 2);

        let mut limited = orchestrator(AimSettings {
            auto_fire_delay_ms: 100.0,
            ..AimSettings::default()
        });
        assert!(limited.fire(1000.0, &mut actuator));
        assert!(!limited.fire(1050.0, &mut actuator));
        assert_eq!(limited.statistics().shots_fired, 1);
        assert!(limited.fire(1100.0, &mut actuator));

        assert_eq!(actuator.fire_count, 4);
    }

    #[test]
    fn test_recoil_pattern_resets_on_release() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings {
            auto_fire_delay_ms: 0.0,
            ..AimSettings::default()
        });
        aim.set_fire_pressed(true);
        aim.fire(0.0, &mut actuator);
        aim.fire(1.0, &mut actuator);
        let expected = RECOIL_PATTERN[0].1 + RECOIL_PATTERN[1].1;
        assert!((aim.camera.recoil_offset.y - expected).abs() < 1e-12);

        aim.set_fire_pressed(false);
        aim.camera.recoil_offset = Vector2::ZERO;
        aim.fire(2.0, &mut actuator);
        assert!((aim.camera.recoil_offset.y - RECOIL_PATTERN[0].1).abs() < 1e-12);
    }

    #[test]
    fn test_hold_steady_when_crosshair_on_target() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings::default());
        aim.set_auto_fire(true);
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, 10.0)), HitboxType::Head, Some("h"))
            .unwrap();

        let outcome = aim.update(0.0, DT, &mut actuator);
        assert_eq!(
            outcome,
            TickOutcome::HoldSteady { target_id: "h".to_string(), fired: true }
        );
        assert_eq!(actuator.mouse_deltas, vec![(0.0, 0.0)]);
        assert_eq!(actuator.fire_count, 1);
        assert_eq!(aim.get_target("h").unwrap().hit_count, 1);
        assert_eq!(aim.current_target(), Some("h"));
    }

    #[test]
    fn test_steering_toward_offset_target() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings {
            see_through_walls: true,
            ..AimSettings::default()
        });
        aim.set_fire_pressed(true);
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(2.0, 0.0, 10.0)), HitboxType::Head, Some("h"))
            .unwrap();
        let before = aim.camera.angle_to(Vector3::new(2.0, 0.0, 10.0));

        let outcome = aim.update(0.0, DT, &mut actuator);
        let TickOutcome::Steering { residual_angle, fired, .. } = outcome else {
            panic!("unexpected outcome: {:?}", outcome);
        };
        assert!(residual_angle < before);
        assert!(!fired);
        assert_eq!(actuator.nonzero_deltas(), 1);
        // 目標は +x 側（ヨー正方向）
        assert!(actuator.mouse_deltas[0].0 > 0.0);
    }

    #[test]
    fn test_tracking_without_fire_input() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings {
            see_through_walls: true,
            ..AimSettings::default()
        });
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(2.0, 0.0, 10.0)), HitboxType::Head, Some("h"))
            .unwrap();
        let outcome = aim.update(0.0, DT, &mut actuator);
        assert_eq!(outcome, TickOutcome::Tracking { target_id: "h".to_string() });
        assert!(actuator.mouse_deltas.is_empty());
    }

    #[test]
    fn test_snap_aiming_fires_immediately() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings {
            smooth_aiming: false,
            see_through_walls: true,
            ..AimSettings::default()
        });
        aim.set_fire_pressed(true);
        aim.set_auto_fire(true);
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(2.0, 0.0, 10.0)), HitboxType::Head, Some("h"))
            .unwrap();

        let outcome = aim.update(0.0, DT, &mut actuator);
        let TickOutcome::Steering { residual_angle, fired, .. } = outcome else {
            panic!("unexpected outcome: {:?}", outcome);
        };
        assert!(residual_angle < 1e-9);
        assert!(fired);
        assert_eq!(actuator.nonzero_deltas(), 0);
    }

    #[test]
    fn test_no_candidates_and_disabled() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings::default());
        assert_eq!(aim.update(0.0, DT, &mut actuator), TickOutcome::NoCandidates);

        aim.set_settings(AimSettings {
            enabled: false,
            ..AimSettings::default()
        });
        assert_eq!(aim.update(16.0, DT, &mut actuator), TickOutcome::Disabled);
        assert_eq!(aim.statistics().ticks, 2);
        assert_eq!(aim.performance().total_frames, 1);
    }

    #[test]
    fn test_removed_target_evicted_from_tracker() {
        let mut actuator = RecordingActuator::default();
        let mut aim = orchestrator(AimSettings::default());
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, 10.0)), HitboxType::Head, Some("h"))
            .unwrap();
        aim.update(0.0, DT, &mut actuator);
        assert!(aim.tracker().get("h").is_some());

        assert!(aim.remove_target("h"));
        aim.update(3000.0, DT, &mut actuator);
        assert!(aim.tracker().get("h").is_some());
        aim.update(6000.0, DT, &mut actuator);
        assert!(aim.tracker().get_tracked_targets().is_empty());
    }

    #[test]
    fn test_prediction_leads_moving_target() {
        let mut aim = orchestrator(AimSettings::default());
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, 10.0)), HitboxType::Head, Some("h"))
            .unwrap();
        assert!(aim.update_target_pose("h", &TargetPose::at(Vector3::new(0.1, 0.0, 10.0)), DT));

        let candidates = aim.build_candidates(0.0, DT);
        let expected_x = 0.1 + 6.0 * 3.0 * DT;
        assert!((candidates[0].aim_point.x - expected_x).abs() < 1e-9);
    }

    #[test]
    fn test_render_debug_markers() {
        let mut aim = orchestrator(AimSettings::default());
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, 10.0)), HitboxType::Head, Some("front"))
            .unwrap();
        aim.register_target(&head_descriptor(), &TargetPose::at(Vector3::new(0.0, 0.0, -10.0)), HitboxType::Head, Some("back"))
            .unwrap();
        let mut log = MarkerLog::default();
        aim.render_debug(&mut log);
        let kinds: Vec<MarkerKind> = log.0.iter().map(|(_, kind)| *kind).collect();
        assert_eq!(kinds, vec![MarkerKind::Target, MarkerKind::Crosshair]);
    }
}
