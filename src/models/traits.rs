use crate::models::common::{Vector2, Vector3};

/// シーン内を動くスクリプトエージェントの基本インターフェース
pub trait IAgent {
    /// エージェントの初期化
    fn initialize(&mut self, scenario_config: &crate::scenario::ScenarioConfig);

    /// 1ティックの処理実行
    fn tick(&mut self, dt: f64);

    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// エージェントがアクティブかどうか
    fn is_active(&self) -> bool;
}

/// 移動可能なエージェントのインターフェース
pub trait IMovable {
    /// 移動処理
    fn move_agent(&mut self, dt: f64);

    /// 現在位置の取得
    fn get_position(&self) -> Vector3;

    /// 現在速度の取得
    fn get_velocity(&self) -> Vector3;

    /// 速度の設定
    fn set_velocity(&mut self, velocity: Vector3);
}

/// 入力アクチュエータ（外部協調者）
///
/// マウス移動と射撃を外部へ送出します。どちらもキューされず、
/// ティックごとの撃ちっぱなしです。
pub trait IActuator {
    /// マウス移動量の送出
    fn send_mouse_delta(&mut self, dx: f64, dy: f64);

    /// 射撃アクションの送出
    fn trigger_fire(&mut self);
}

/// デバッグ描画マーカーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// 登録済みターゲット
    Target,
    /// 選択中のターゲット
    Selected,
    /// 予測位置
    Predicted,
    /// クロスヘア
    Crosshair,
}

/// デバッグ描画（外部協調者）
///
/// 描画状態はコア側で保持しません。
pub trait IDebugRenderer {
    fn draw_marker(&mut self, screen: Vector2, kind: MarkerKind);
}

/// 送出されたアクションを記録するアクチュエータ
///
/// シミュレーションの集計とテストで使用します。
#[derive(Debug, Default, Clone)]
pub struct RecordingActuator {
    pub mouse_deltas: Vec<(f64, f64)>,
    pub fire_count: u32,
}

impl IActuator for RecordingActuator {
    fn send_mouse_delta(&mut self, dx: f64, dy: f64) {
        self.mouse_deltas.push((dx, dy));
    }

    fn trigger_fire(&mut self) {
        self.fire_count += 1;
    }
}

impl RecordingActuator {
    /// 非ゼロのマウス移動の件数
    pub fn nonzero_deltas(&self) -> usize {
        self.mouse_deltas
            .iter()
            .filter(|(dx, dy)| *dx != 0.0 || *dy != 0.0)
            .count()
    }

    pub fn clear(&mut self) {
        self.mouse_deltas.clear();
        self.fire_count = 0;
    }
}
