use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::fs;
use std::str::FromStr;
use crate::models::{
    camera::CameraTuning,
    collider::ColliderDescriptor,
    common::{Vector2, Vector3},
    hitbox::{HitboxError, HitboxType},
    orchestrator::AimSettings,
    pose::TargetPose,
};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
}

/// カメラ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    pub position: Vector3,
    #[serde(default)]
    pub yaw_deg: f64,
    #[serde(default)]
    pub pitch_deg: f64,
    #[serde(default)]
    pub tuning: CameraTuning,
}

/// 射撃入力を押し続ける時間帯（秒）
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FireWindow {
    pub start_s: f64,
    pub end_s: f64,
}

impl FireWindow {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_s && time < self.end_s
    }
}

/// 入力設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub fire_pressed: bool,
    pub auto_fire: bool,
    pub crosshair: Vector2,
    /// 指定した場合は `fire_pressed` より優先
    pub fire_window: Option<FireWindow>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            fire_pressed: false,
            auto_fire: false,
            crosshair: Vector2::new(0.5, 0.5),
            fire_window: None,
        }
    }
}

impl InputConfig {
    /// 指定時刻に射撃入力が押されているか
    pub fn fire_pressed_at(&self, time: f64) -> bool {
        match &self.fire_window {
            Some(window) => window.contains(time),
            None => self.fire_pressed,
        }
    }
}

/// ターゲット設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    pub id: String,
    /// 部位 (head, chest, body, limb)
    pub kind: String,
    /// 省略時は `default_collider` を使用
    #[serde(default)]
    pub collider: Option<ColliderDescriptor>,
    pub pose: TargetPose,
    #[serde(default)]
    pub velocity: Vector3,
    #[serde(default)]
    pub spawn_time_s: f64,
    #[serde(default)]
    pub despawn_time_s: Option<f64>,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub camera: CameraConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub settings: AimSettings,
    #[serde(default)]
    pub default_collider: Option<ColliderDescriptor>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// 組み込みのデモシナリオ
    ///
    /// 正面の静止した頭部、横移動する胴体、遅れて出現する頭部の3体を配置します。
    pub fn demo() -> Self {
        let collider = ColliderDescriptor::with_shape(
            Vector3::ONE,
            Vector3::ZERO,
            Vector3::new(0.15, 0.15, 0.15),
        );

        let target = |id: &str, kind: &str, position: Vector3, velocity: Vector3, spawn: f64, despawn: Option<f64>| TargetConfig {
            id: id.to_string(),
            kind: kind.to_string(),
            collider: None,
            pose: TargetPose::at(position),
            velocity,
            spawn_time_s: spawn,
            despawn_time_s: despawn,
        };

        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "builtin_demo".to_string(),
                description: "組み込みデモ（静止・移動・遅延出現ターゲット）".to_string(),
            },
            sim: SimulationConfig {
                dt_s: 1.0 / 60.0,
                t_max_s: 3.0,
            },
            camera: CameraConfig {
                position: Vector3::new(0.0, 1.6, -2.0),
                yaw_deg: 0.0,
                pitch_deg: 0.0,
                tuning: CameraTuning::default(),
            },
            input: InputConfig {
                fire_pressed: false,
                auto_fire: true,
                crosshair: Vector2::new(0.5, 0.5),
                fire_window: Some(FireWindow { start_s: 0.5, end_s: 2.5 }),
            },
            settings: AimSettings::default(),
            default_collider: Some(collider),
            targets: vec![
                target("head_front", "head", Vector3::new(0.0, 1.7, 10.0), Vector3::ZERO, 0.0, Some(1.5)),
                target("body_strafe", "body", Vector3::new(-1.0, 1.2, 12.0), Vector3::new(0.8, 0.0, 0.0), 0.0, None),
                target("head_late", "head", Vector3::new(1.0, 1.7, 8.0), Vector3::ZERO, 1.0, None),
            ],
        }
    }

    /// ターゲットの部位文字列を解析
    pub fn target_kind(target: &TargetConfig) -> Result<HitboxType, ScenarioError> {
        HitboxType::from_str(&target.kind)
            .map_err(|e| ScenarioError::Target(target.id.clone(), e))
    }

    /// ターゲットに適用するコライダー記述子（個別 → 共通の順）
    pub fn target_collider<'a>(&'a self, target: &'a TargetConfig) -> Option<&'a ColliderDescriptor> {
        target.collider
            .as_ref()
            .filter(|c| c.select().is_some())
            .or(self.default_collider.as_ref())
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError("dt_s must be positive".to_string()));
        }
        if self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError("t_max_s must be positive".to_string()));
        }

        // クロスヘアは正規化スクリーン座標
        let crosshair = &self.input.crosshair;
        if !(0.0..=1.0).contains(&crosshair.x) || !(0.0..=1.0).contains(&crosshair.y) {
            return Err(ScenarioError::ValidationError(
                format!("crosshair ({}, {}) outside [0, 1]", crosshair.x, crosshair.y)
            ));
        }
        if let Some(window) = &self.input.fire_window {
            if window.start_s >= window.end_s {
                return Err(ScenarioError::ValidationError("Invalid fire_window".to_string()));
            }
        }

        // 照準設定の検証
        let settings = &self.settings;
        if settings.max_distance <= 0.0 {
            return Err(ScenarioError::ValidationError("max_distance must be positive".to_string()));
        }
        if settings.auto_fire_delay_ms < 0.0 || settings.prediction_ticks < 0.0 {
            return Err(ScenarioError::ValidationError(
                "auto_fire_delay_ms and prediction_ticks must not be negative".to_string()
            ));
        }

        let mut ids = HashSet::new();
        for target in &self.targets {
            if !ids.insert(target.id.as_str()) {
                return Err(ScenarioError::ValidationError(
                    format!("Duplicate target id {}", target.id)
                ));
            }

            Self::target_kind(target)?;

            if self.target_collider(target).is_none() {
                return Err(ScenarioError::Target(target.id.clone(), HitboxError::MissingCollider));
            }

            // ターゲットのスポーン時刻検証
            if target.spawn_time_s >= self.sim.t_max_s {
                return Err(ScenarioError::ValidationError(
                    format!("Target {} spawn time {} >= simulation time {}",
                            target.id, target.spawn_time_s, self.sim.t_max_s)
                ));
            }
            if target.despawn_time_s.is_some_and(|t| t <= target.spawn_time_s) {
                return Err(ScenarioError::ValidationError(
                    format!("Target {} despawns before it spawns", target.id)
                ));
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.4}秒 ({:.0} tick/s)", self.sim.dt_s, 1.0 / self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!();

        println!("=== カメラ・入力 ===");
        let p = &self.camera.position;
        println!("位置: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
        println!("ヨー/ピッチ: {:.1}° / {:.1}°", self.camera.yaw_deg, self.camera.pitch_deg);
        println!("自動射撃: {}", if self.input.auto_fire { "有効" } else { "無効" });
        if let Some(window) = &self.input.fire_window {
            println!("射撃入力: {:.2}〜{:.2}秒", window.start_s, window.end_s);
        } else {
            println!("射撃入力: {}", if self.input.fire_pressed { "常時" } else { "なし" });
        }
        println!();

        println!("=== 照準設定 ===");
        println!("平滑化: {}", self.settings.smooth_aiming);
        println!("予測: {} ({}ティック先)", self.settings.prediction, self.settings.prediction_ticks);
        println!("最大距離: {:.1}", self.settings.max_distance);
        println!("射撃間隔: {:.0}ms", self.settings.auto_fire_delay_ms);
        println!();

        println!("=== ターゲット ===");
        println!("ターゲット数: {}", self.targets.len());
        for target in &self.targets {
            let p = target.pose.world_position();
            println!("  {}: {} at ({:.2}, {:.2}, {:.2}) (出現時刻: {:.1}秒)",
                     target.id, target.kind, p.x, p.y, p.z, target.spawn_time_s);
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
    /// ターゲット定義からヒットボックスを作れない
    Target(String, HitboxError),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
            ScenarioError::Target(id, err) => {
                write!(f, "ターゲット定義エラー {}: {}", id, err)
            }
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::IoError(_, err) => Some(err),
            ScenarioError::ParseError(_, err) => Some(err),
            ScenarioError::Target(_, err) => Some(err),
            _ => None,
        }
    }
}
