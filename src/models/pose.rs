use serde::{Deserialize, Serialize};
use crate::models::common::{Quaternion, Vector3};

/// ボーンのローカル空間をワールド空間へ写すアフィン変換（バインドポーズ）
///
/// 3行×4列の行優先行列です。同次座標の4行目は計算に使用しません
/// （入力に `e30`〜`e33` があっても無視されます）。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AffineBindpose {
    pub e00: f64, pub e01: f64, pub e02: f64, pub e03: f64,
    pub e10: f64, pub e11: f64, pub e12: f64, pub e13: f64,
    pub e20: f64, pub e21: f64, pub e22: f64, pub e23: f64,
}

impl AffineBindpose {
    /// 恒等変換
    pub fn identity() -> Self {
        Self::translation(Vector3::ZERO)
    }

    /// 平行移動のみの変換
    pub fn translation(offset: Vector3) -> Self {
        Self {
            e00: 1.0, e01: 0.0, e02: 0.0, e03: offset.x,
            e10: 0.0, e11: 1.0, e12: 0.0, e13: offset.y,
            e20: 0.0, e21: 0.0, e22: 1.0, e23: offset.z,
        }
    }

    /// 平行移動成分
    pub fn translation_part(&self) -> Vector3 {
        Vector3::new(self.e03, self.e13, self.e23)
    }

    /// 平行移動成分を置き換えた変換を返す
    pub fn with_translation(&self, offset: Vector3) -> Self {
        Self {
            e03: offset.x,
            e13: offset.y,
            e23: offset.z,
            ..*self
        }
    }

    /// 点にアフィン変換を適用
    pub fn apply(&self, p: Vector3) -> Vector3 {
        Vector3::new(
            self.e00 * p.x + self.e01 * p.y + self.e02 * p.z + self.e03,
            self.e10 * p.x + self.e11 * p.y + self.e12 * p.z + self.e13,
            self.e20 * p.x + self.e21 * p.y + self.e22 * p.z + self.e23,
        )
    }
}

impl Default for AffineBindpose {
    fn default() -> Self {
        Self::identity()
    }
}

/// ターゲット1体分のボーン姿勢
///
/// 外部のデータソースから毎フレーム供給される入力です。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TargetPose {
    pub local_position: Vector3,
    #[serde(default)]
    pub bindpose: AffineBindpose,
    #[serde(default)]
    pub rotation: Option<Quaternion>,
    #[serde(default)]
    pub scale: Option<Vector3>,
}

impl TargetPose {
    pub fn new(local_position: Vector3, bindpose: AffineBindpose) -> Self {
        Self {
            local_position,
            bindpose,
            rotation: None,
            scale: None,
        }
    }

    /// 平行移動のみのバインドポーズで原点に置いた姿勢
    pub fn at(world: Vector3) -> Self {
        Self::new(Vector3::ZERO, AffineBindpose::translation(world))
    }

    /// ワールド位置（オフセット適用前）
    pub fn world_position(&self) -> Vector3 {
        transform(
            self.local_position,
            &self.bindpose,
            self.rotation.as_ref(),
            self.scale.as_ref(),
        )
    }
}

/// ボーンローカル位置をワールド位置へ変換
///
/// 適用順序は固定です：(1) 軸ごとのスケール → (2) クォータニオン回転 →
/// (3) バインドポーズ。
///
/// # 引数
///
/// * `local` - ボーンローカル位置
/// * `bindpose` - バインドポーズ行列
/// * `rotation` - ボーン回転（省略可）
/// * `scale` - ボーンスケール（省略可）
///
/// # 戻り値
///
/// ワールド空間での位置
pub fn transform(
    local: Vector3,
    bindpose: &AffineBindpose,
    rotation: Option<&Quaternion>,
    scale: Option<&Vector3>,
) -> Vector3 {
    let mut pos = local;

    if let Some(scale) = scale {
        pos = pos.scale_by(scale);
    }

    if let Some(rotation) = rotation {
        pos = pos.rotate_by_quaternion(rotation);
    }

    bindpose.apply(pos)
}
