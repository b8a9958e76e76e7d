use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use crate::models::common::{math_utils, Vector2, Vector3};

/// 平滑化速度の基準ティックレート（tick/s）
///
/// `aim_at` の速度更新は `dt × REFERENCE_TICK_RATE` でスケールされます。
pub const REFERENCE_TICK_RATE: f64 = 60.0;

/// 画面投影の垂直視野角（ラジアン、45度）
pub const VERTICAL_FOV: f64 = std::f64::consts::FRAC_PI_4;

/// 投影可能な最小奥行き
pub const MIN_PROJECTION_DEPTH: f64 = 0.1;

/// カメラ制御のチューニング値
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraTuning {
    /// 平滑化係数
    pub smoothing: f64,
    /// 1回あたりの最大回転速度（ラジアン、軸ごと）
    pub max_smoothing_speed: f64,
    /// 速度の減衰率（毎回乗算）
    pub damping: f64,
    /// リコイルオフセットの減衰率（毎回乗算）
    pub recoil_decay: f64,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            smoothing: 0.22,
            max_smoothing_speed: 0.15,
            damping: 0.85,
            recoil_decay: 0.9,
        }
    }
}

/// 観測者（カメラ）モデル
///
/// 位置とヨー・ピッチ（ラジアン）で姿勢を保持します。ピッチは正で下向きです。
/// 姿勢を変更するのは `aim_at`・`look_at`・`add_recoil` のみで、
/// 位置はこのスコープでは固定です。
#[derive(Debug, Clone)]
pub struct CameraModel {
    pub position: Vector3,
    pub yaw: f64,
    pub pitch: f64,
    /// 平滑化速度（x: ヨー、y: ピッチ）
    pub velocity: Vector2,
    /// リコイルオフセット（x: ヨー、y: ピッチ）
    pub recoil_offset: Vector2,
    pub tuning: CameraTuning,
}

impl CameraModel {
    pub fn new(position: Vector3, yaw: f64, pitch: f64, tuning: CameraTuning) -> Self {
        Self {
            position,
            yaw: math_utils::normalize_angle(yaw),
            pitch: pitch.clamp(-FRAC_PI_2, FRAC_PI_2),
            velocity: Vector2::ZERO,
            recoil_offset: Vector2::ZERO,
            tuning,
        }
    }

    pub fn get_position(&self) -> Vector3 {
        self.position
    }

    /// 前方向の単位ベクトル
    pub fn get_direction(&self) -> Vector3 {
        let (yaw, pitch) = (self.yaw, self.pitch);
        Vector3::new(
            yaw.sin() * pitch.cos(),
            (-pitch).sin(),
            yaw.cos() * pitch.cos(),
        )
        .normalize()
    }

    /// 右方向（前方向 × ワールド上方向）
    pub fn get_right(&self) -> Vector3 {
        self.get_direction().cross(&Vector3::UP).normalize()
    }

    /// 上方向（右方向 × 前方向）
    pub fn get_up(&self) -> Vector3 {
        self.get_right().cross(&self.get_direction()).normalize()
    }

    /// 目標点へ向かう方向のヨー・ピッチを計算
    fn angles_towards(&self, target: Vector3) -> (f64, f64) {
        let dir = (target - self.position).normalize();
        let yaw = dir.x.atan2(dir.z);
        let pitch = -dir.y.clamp(-1.0, 1.0).asin();
        (yaw, pitch)
    }

    /// 目標点へ平滑化しながら照準を移動
    ///
    /// 1回の呼び出しで目標に到達することはなく、減衰付きの速度で
    /// 徐々に収束します。リコイルオフセットは回転に加算された後に減衰します。
    ///
    /// # 引数
    ///
    /// * `target` - 照準先のワールド座標
    /// * `dt` - 経過時間（秒）
    pub fn aim_at(&mut self, target: Vector3, dt: f64) {
        let (desired_yaw, desired_pitch) = self.angles_towards(target);

        let yaw_delta = math_utils::angle_difference(self.yaw, desired_yaw);
        let pitch_delta = desired_pitch - self.pitch;

        let gain = self.tuning.smoothing * dt * REFERENCE_TICK_RATE;
        self.velocity = self.velocity + Vector2::new(yaw_delta * gain, pitch_delta * gain);
        self.velocity = self
            .velocity
            .scale(self.tuning.damping)
            .clamp_per_axis(self.tuning.max_smoothing_speed);

        self.yaw = math_utils::normalize_angle(self.yaw + self.velocity.x + self.recoil_offset.x);
        self.pitch = (self.pitch + self.velocity.y + self.recoil_offset.y).clamp(-FRAC_PI_2, FRAC_PI_2);

        self.recoil_offset = self.recoil_offset.scale(self.tuning.recoil_decay);
    }

    /// 目標点へ即座に向ける（平滑化なし）
    pub fn look_at(&mut self, target: Vector3) {
        let (yaw, pitch) = self.angles_towards(target);
        self.yaw = yaw;
        self.pitch = pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
        self.velocity = Vector2::ZERO;
    }

    /// リコイルの衝撃を加算
    pub fn add_recoil(&mut self, dx: f64, dy: f64) {
        self.recoil_offset = self.recoil_offset + Vector2::new(dx, dy);
    }

    /// 方向ベクトルと前方向のなす角（ラジアン）
    pub fn angle_to(&self, point: Vector3) -> f64 {
        let dir = (point - self.position).normalize();
        dir.dot(&self.get_direction()).clamp(-1.0, 1.0).acos()
    }

    /// ワールド座標を正規化スクリーン座標へ投影
    ///
    /// 垂直視野角45度、アスペクト比1で、照準軸が (0.5, 0.5) に対応します。
    ///
    /// # 戻り値
    ///
    /// スクリーン座標、カメラ後方または奥行き0.1未満の場合はNone
    pub fn project_to_screen(&self, point: Vector3) -> Option<Vector2> {
        let rel = point - self.position;
        let depth = rel.dot(&self.get_direction());
        if depth < MIN_PROJECTION_DEPTH {
            return None;
        }

        let focal = 1.0 / (VERTICAL_FOV / 2.0).tan();
        let sx = rel.dot(&self.get_right()) * focal / depth;
        let sy = rel.dot(&self.get_up()) * focal / depth;

        Some(Vector2::new(0.5 + sx * 0.5, 0.5 - sy * 0.5))
    }

    /// スクリーン座標に対応するレイ方向（前方成分が1）
    ///
    /// `project_to_screen` の逆変換です。
    pub fn crosshair_ray(&self, screen: Vector2) -> Vector3 {
        let focal = 1.0 / (VERTICAL_FOV / 2.0).tan();
        let sx = (screen.x - 0.5) * 2.0 / focal;
        let sy = (0.5 - screen.y) * 2.0 / focal;

        self.get_direction() + self.get_right() * sx + self.get_up() * sy
    }
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 1.6, -2.0), 0.0, 0.0, CameraTuning::default())
    }
}
