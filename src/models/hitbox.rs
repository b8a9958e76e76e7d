use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;
use std::str::FromStr;
use crate::models::{
    collider::ColliderDescriptor,
    common::{Quaternion, Vector2, Vector3},
    pose::{self, AffineBindpose},
};

/// 移動中と判定する速度の閾値（units/s）
pub const MOVING_SPEED_THRESHOLD: f64 = 0.1;

/// 等方半径の下限
pub const MIN_COLLISION_RADIUS: f64 = 0.1;

/// 視線判定の前方ドット積閾値（半角およそ60度）
pub const LINE_OF_SIGHT_MIN_DOT: f64 = 0.5;

/// 視線判定の垂直距離許容倍率
pub const LINE_OF_SIGHT_RADIUS_FACTOR: f64 = 1.2;

/// ヒットボックスの部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitboxType {
    Head,
    Chest,
    Body,
    Limb,
}

impl HitboxType {
    /// 部位ごとの優先度
    pub fn priority(&self) -> u32 {
        match self {
            HitboxType::Head => 10,
            HitboxType::Chest => 7,
            HitboxType::Body => 5,
            HitboxType::Limb => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HitboxType::Head => "head",
            HitboxType::Chest => "chest",
            HitboxType::Body => "body",
            HitboxType::Limb => "limb",
        }
    }
}

impl FromStr for HitboxType {
    type Err = HitboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head" => Ok(HitboxType::Head),
            "chest" => Ok(HitboxType::Chest),
            "body" => Ok(HitboxType::Body),
            "limb" => Ok(HitboxType::Limb),
            _ => Err(HitboxError::UnknownType(s.to_string())),
        }
    }
}

impl std::fmt::Display for HitboxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 軸平行境界ボックス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3,
    pub max: Vector3,
}

impl BoundingBox {
    pub fn from_center_half_extents(center: Vector3, half: Vector3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn contains(&self, p: Vector3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }
}

/// レイとの交差結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// レイ原点からの距離
    pub distance: f64,
    /// 交点
    pub point: Vector3,
    /// 外向き法線
    pub normal: Vector3,
}

/// ヒットボックス生成エラー
#[derive(Debug, Clone, PartialEq)]
pub enum HitboxError {
    /// 優先・デフォルトどちらのコライダー設定も無い
    MissingCollider,
    /// 未知の部位文字列
    UnknownType(String),
}

impl std::fmt::Display for HitboxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HitboxError::MissingCollider => {
                write!(f, "コライダー設定がありません (boneColliderProperty / defaultBoneColliderProperty)")
            }
            HitboxError::UnknownType(kind) => {
                write!(f, "未知のヒットボックス種別: {} (head, chest, body, limb)", kind)
            }
        }
    }
}

impl std::error::Error for HitboxError {}

/// ターゲットの交戦対象領域（ヒットボックス）
///
/// 登録時に一度だけ形状パラメータを決定し、以後は `update_position`
/// による移動のみを受け付けます。
#[derive(Debug, Clone)]
pub struct Hitbox {
    /// ワールド中心
    pub center: Vector3,
    /// 記述子のオフセット（姿勢更新時に再適用）
    pub offset: Vector3,
    /// 等方衝突半径
    pub radius: f64,
    pub radius_x: f64,
    pub radius_y: f64,
    pub radius_z: f64,
    pub bounding_box: BoundingBox,
    pub kind: HitboxType,
    /// 速度（units/s）
    pub velocity: Vector3,
    pub is_moving: bool,
    pub predicted_position: Vector3,
    /// 最後に命中を記録した時刻（ms）
    pub last_hit_time: Option<f64>,
    pub hit_count: u32,
}

impl Hitbox {
    /// 記述子とボーン姿勢からヒットボックスを作成
    ///
    /// # 引数
    ///
    /// * `descriptor` - コライダー記述子
    /// * `local` - ボーンローカル位置
    /// * `bindpose` - バインドポーズ
    /// * `rotation` - ボーン回転（省略可）
    /// * `scale` - ボーンスケール（省略可）
    /// * `kind` - 部位
    ///
    /// # 戻り値
    ///
    /// 作成されたヒットボックス、コライダー設定が無い場合はエラー
    pub fn new(
        descriptor: &ColliderDescriptor,
        local: Vector3,
        bindpose: &AffineBindpose,
        rotation: Option<&Quaternion>,
        scale: Option<&Vector3>,
        kind: HitboxType,
    ) -> Result<Self, HitboxError> {
        let shape = descriptor.resolve_shape().ok_or(HitboxError::MissingCollider)?;
        let thickness = shape.min_thickness;

        let center = pose::transform(local, bindpose, rotation, scale) + shape.offset;
        let radius = thickness.x.max(thickness.z).max(MIN_COLLISION_RADIUS);
        let half = thickness.scale_by(&shape.scale);

        Ok(Self {
            center,
            offset: shape.offset,
            radius,
            radius_x: half.x,
            radius_y: half.y,
            radius_z: half.z,
            bounding_box: BoundingBox::from_center_half_extents(center, half),
            kind,
            velocity: Vector3::ZERO,
            is_moving: false,
            predicted_position: center,
            last_hit_time: None,
            hit_count: 0,
        })
    }

    pub fn priority(&self) -> u32 {
        self.kind.priority()
    }

    fn half_extents(&self) -> Vector3 {
        Vector3::new(self.radius_x, self.radius_y, self.radius_z)
    }

    /// 位置を更新し、速度・予測位置・境界ボックスを再計算
    ///
    /// `dt` が0以下の場合は速度を0とします。
    pub fn update_position(&mut self, new_center: Vector3, dt: f64) {
        self.velocity = if dt > 0.0 {
            (new_center - self.center).scale(1.0 / dt)
        } else {
            Vector3::ZERO
        };
        self.is_moving = self.velocity.length() > MOVING_SPEED_THRESHOLD;
        self.center = new_center;
        self.predicted_position = new_center + self.velocity * (2.0 * dt.max(0.0));
        self.bounding_box = BoundingBox::from_center_half_extents(new_center, self.half_extents());
    }

    /// クロスヘアがどれだけ中心に寄っているか（0〜1）
    ///
    /// スクリーン平面の (x, y) で比較します。半径の外側ならNone。
    pub fn crosshair_accuracy(&self, crosshair: Vector2) -> Option<f64> {
        if self.radius_x <= 0.0 || self.radius_y <= 0.0 {
            return None;
        }

        let dx = (crosshair.x - self.center.x).abs();
        let dy = (crosshair.y - self.center.y).abs();
        if dx < self.radius_x && dy < self.radius_y {
            let percent_x = 1.0 - dx / self.radius_x;
            let percent_y = 1.0 - dy / self.radius_y;
            Some((percent_x + percent_y) / 2.0)
        } else {
            None
        }
    }

    /// クロスヘア包含判定
    ///
    /// 半径内にあり、かつ中心度が `threshold` 以上の場合にtrue。
    pub fn contains_crosshair(&self, crosshair: Vector2, threshold: f64) -> bool {
        self.crosshair_accuracy(crosshair)
            .is_some_and(|accuracy| accuracy >= threshold)
    }

    /// 視線判定
    ///
    /// 距離、前方角度（ドット積0.5）、照準レイからの垂直距離
    /// （半径×1.2以内）の順に判定します。
    pub fn is_in_line_of_sight(&self, cam_pos: Vector3, cam_dir: Vector3, max_distance: f64) -> bool {
        let to_center = self.center - cam_pos;
        if to_center.length() > max_distance {
            return false;
        }

        if to_center.normalize().dot(&cam_dir) < LINE_OF_SIGHT_MIN_DOT {
            return false;
        }

        let projection = to_center.dot(&cam_dir);
        let closest = cam_pos + cam_dir * projection;
        closest.distance(&self.center) <= self.radius * LINE_OF_SIGHT_RADIUS_FACTOR
    }

    /// レイと衝突球の交差判定
    ///
    /// # 戻り値
    ///
    /// 最も近い正の交点、判別式が負または両解が0以下の場合はNone
    pub fn intersect_ray(&self, origin: Vector3, direction: Vector3) -> Option<RayHit> {
        let a = direction.dot(&direction);
        if a <= 0.0 {
            return None;
        }

        let oc = origin - self.center;
        let b = 2.0 * oc.dot(&direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let near = (-b - sqrt_d) / (2.0 * a);
        let far = (-b + sqrt_d) / (2.0 * a);
        let t = if near > 0.0 {
            near
        } else if far > 0.0 {
            far
        } else {
            return None;
        };

        let point = origin + direction * t;
        Some(RayHit {
            distance: t * a.sqrt(),
            point,
            normal: (point - self.center).normalize(),
        })
    }

    /// 命中しやすさのヒューリスティック（0〜1）
    ///
    /// 距離減衰 × 角度減衰 × 移動ペナルティ × サイズ係数。統計的な確率ではありません。
    pub fn hit_probability(&self, cam_pos: Vector3, cam_dir: Vector3) -> f64 {
        let to_center = self.center - cam_pos;
        let distance = to_center.length();
        let angle = to_center.normalize().dot(&cam_dir).clamp(-1.0, 1.0).acos();

        let distance_factor = (1.0 - distance / 100.0).max(0.1);
        let angle_factor = (1.0 - angle / FRAC_PI_4).max(0.1);
        let movement_factor = if self.is_moving { 0.7 } else { 1.0 };
        let size_factor = (self.radius / 0.1).min(1.0);

        (distance_factor * angle_factor * movement_factor * size_factor).clamp(0.0, 1.0)
    }

    /// 命中を記録
    pub fn record_hit(&mut self, now_ms: f64) {
        self.last_hit_time = Some(now_ms);
        self.hit_count += 1;
    }

    /// 直近 `window_ms` 以内に命中記録があるか
    pub fn was_hit_recently(&self, now_ms: f64, window_ms: f64) -> bool {
        self.last_hit_time
            .is_some_and(|t| now_ms - t < window_ms)
    }
}
