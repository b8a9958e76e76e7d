// 基本的なデータ型と数学ユーティリティ
pub mod common;

// 外部協調者とエージェントのインターフェース（trait）定義
pub mod traits;

// 姿勢・コライダー・カメラの幾何モデル
pub mod pose;
pub mod collider;
pub mod camera;
pub mod hitbox;

// 追跡・計測
pub mod tracker;
pub mod performance;

// 照準補助の中核
pub mod orchestrator;

// シナリオ駆動のターゲットエージェント
pub mod target;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use pose::{AffineBindpose, TargetPose};
pub use collider::{ColliderDescriptor, ColliderShape};
pub use camera::{CameraModel, CameraTuning};
pub use hitbox::{BoundingBox, Hitbox, HitboxError, HitboxType, RayHit};
pub use tracker::{TargetTracker, TrackedTarget};
pub use performance::{PerformanceMonitor, PerformanceReport};
pub use orchestrator::{AimSettings, AimStatistics, AutoAimOrchestrator, Candidate, ScoringWeights, TickOutcome};
pub use target::{ScriptedTarget, TargetStatus};
