use crate::models::{
    collider::ColliderDescriptor,
    common::Vector3,
    hitbox::HitboxType,
    pose::TargetPose,
    traits::{IAgent, IMovable},
};

/// スクリプトターゲットの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// 出現前
    Pending,
    /// シーン内で移動中
    Active,
    /// 消滅済み
    Despawned,
}

/// スクリプトで動くターゲットエージェント
///
/// シナリオに記述された姿勢から出発し、バインドポーズの平行移動成分を
/// 等速で動かします。照準補助側から見ると、毎ティック姿勢を供給する
/// 外部データソースの代わりです。
#[derive(Debug, Clone)]
pub struct ScriptedTarget {
    /// ターゲットの一意識別子
    pub id: String,
    pub kind: HitboxType,
    pub collider: ColliderDescriptor,
    /// 現在のボーン姿勢
    pub pose: TargetPose,
    /// ワールド速度（units/s）
    pub velocity: Vector3,
    /// 出現時刻（秒）
    pub spawn_time: f64,
    /// 消滅時刻（秒）、Noneならシミュレーション終了まで残る
    pub despawn_time: Option<f64>,
    pub status: TargetStatus,
    /// 経過時間（秒）
    elapsed: f64,
}

impl ScriptedTarget {
    /// 新しいScriptedTargetインスタンスを作成
    ///
    /// # 引数
    ///
    /// * `id` - ターゲットの一意識別子
    /// * `kind` - 部位
    /// * `collider` - コライダー記述子
    /// * `pose` - 初期姿勢
    ///
    /// # 戻り値
    ///
    /// 時刻0に出現する静止ターゲット
    pub fn new(id: String, kind: HitboxType, collider: ColliderDescriptor, pose: TargetPose) -> Self {
        Self {
            id,
            kind,
            collider,
            pose,
            velocity: Vector3::ZERO,
            spawn_time: 0.0,
            despawn_time: None,
            status: TargetStatus::Pending,
            elapsed: 0.0,
        }
    }

    /// 出現・消滅時刻を設定
    pub fn with_schedule(mut self, spawn_time: f64, despawn_time: Option<f64>) -> Self {
        self.spawn_time = spawn_time;
        self.despawn_time = despawn_time;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3) -> Self {
        self.velocity = velocity;
        self
    }

    /// スポーン判定
    pub fn check_spawn(&mut self, current_time: f64) {
        if self.status == TargetStatus::Pending && current_time >= self.spawn_time {
            self.status = TargetStatus::Active;
        }
    }

    /// 消滅判定
    pub fn check_despawn(&mut self, current_time: f64) {
        if self.status == TargetStatus::Active
            && self.despawn_time.is_some_and(|t| current_time >= t)
        {
            self.status = TargetStatus::Despawned;
        }
    }

    pub fn is_despawned(&self) -> bool {
        self.status == TargetStatus::Despawned
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl IAgent for ScriptedTarget {
    fn initialize(&mut self, scenario_config: &crate::scenario::ScenarioConfig) {
        // 個別のコライダーが無ければシナリオ共通のものを使う
        if self.collider.select().is_none() {
            if let Some(default) = &scenario_config.default_collider {
                self.collider = default.clone();
            }
        }
        self.elapsed = 0.0;
        self.status = TargetStatus::Pending;
    }

    fn tick(&mut self, dt: f64) {
        self.elapsed += dt;
        self.check_spawn(self.elapsed);

        if self.status == TargetStatus::Active {
            self.move_agent(dt);
            self.check_despawn(self.elapsed);
        }
    }

    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.status == TargetStatus::Active
    }
}

impl IMovable for ScriptedTarget {
    fn move_agent(&mut self, dt: f64) {
        if self.status == TargetStatus::Active {
            // 等速直線運動
            let translation = self.pose.bindpose.translation_part() + self.velocity * dt;
            self.pose.bindpose = self.pose.bindpose.with_translation(translation);
        }
    }

    fn get_position(&self) -> Vector3 {
        self.pose.world_position()
    }

    fn get_velocity(&self) -> Vector3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vector3) {
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ScriptedTarget {
        ScriptedTarget::new(
            "T001".to_string(),
            HitboxType::Head,
            ColliderDescriptor::with_shape(Vector3::ONE, Vector3::ZERO, Vector3::ONE),
            TargetPose::at(Vector3::new(0.0, 1.6, 10.0)),
        )
    }

    #[test]
    fn test_spawn_and_despawn_schedule() {
        let mut target = target().with_schedule(0.5, Some(1.0));
        target.tick(0.25);
        assert_eq!(target.status, TargetStatus::Pending);
        target.tick(0.25);
        assert!(target.is_active());
        target.tick(0.5);
        assert!(target.is_despawned());
        assert!(!target.is_active());
    }

    #[test]
    fn test_moves_bindpose_translation() {
        let mut target = target().with_velocity(Vector3::new(2.0, 0.0, 0.0));
        target.tick(0.5);
        assert!(target.get_position().approx_eq(&Vector3::new(1.0, 1.6, 10.0), 1e-12));
    }

    #[test]
    fn test_pending_target_does_not_move() {
        let mut target = target()
            .with_schedule(10.0, None)
            .with_velocity(Vector3::new(2.0, 0.0, 0.0));
        target.move_agent(1.0);
        assert!(target.get_position().approx_eq(&Vector3::new(0.0, 1.6, 10.0), 1e-12));
    }
}
