use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// 比較時のデフォルト許容誤差
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// 3次元ベクトルを表す構造体
///
/// 値型として扱い、すべての演算は新しいインスタンスを返します。
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vector3 = Vector3 { x: 1.0, y: 1.0, z: 1.0 };
    /// ワールド座標系の上方向
    pub const UP: Vector3 = Vector3 { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn subtract(&self, other: &Vector3) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    /// 成分ごとの積（非等方スケール用）
    pub fn scale_by(&self, other: &Vector3) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// 単位ベクトル化
    ///
    /// 長さ0のベクトルはゼロベクトルを返します（0除算しない）。
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self.scale(1.0 / len)
        } else {
            Self::ZERO
        }
    }

    pub fn distance(&self, other: &Vector3) -> f64 {
        self.subtract(other).length()
    }

    pub fn distance_squared(&self, other: &Vector3) -> f64 {
        self.subtract(other).length_squared()
    }

    /// 線形補間
    ///
    /// `t` はクランプしません（0〜1の範囲は呼び出し側の責任）。
    pub fn lerp(&self, other: &Vector3, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// 許容誤差付きの等価判定
    pub fn approx_eq(&self, other: &Vector3, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
    }

    /// デフォルト許容誤差（1e-6）での等価判定
    pub fn equals(&self, other: &Vector3) -> bool {
        self.approx_eq(other, DEFAULT_EPSILON)
    }

    /// クォータニオンによる回転（q * v * q⁻¹）
    ///
    /// 展開した中間項の式で計算します。`q` は単位クォータニオンであること
    /// （正規化は行わない）。
    pub fn rotate_by_quaternion(&self, q: &Quaternion) -> Self {
        let (x, y, z) = (self.x, self.y, self.z);
        let (qx, qy, qz, qw) = (q.x, q.y, q.z, q.w);

        // q * v
        let ix = qw * x + qy * z - qz * y;
        let iy = qw * y + qz * x - qx * z;
        let iz = qw * z + qx * y - qy * x;
        let iw = -qx * x - qy * y - qz * z;

        // (q * v) * q⁻¹
        Self::new(
            ix * qw + iw * -qx + iy * -qz - iz * -qy,
            iy * qw + iw * -qy + iz * -qx - ix * -qz,
            iz * qw + iw * -qz + ix * -qy - iy * -qx,
        )
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        self.subtract(&other)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        self.scale(scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}

/// 2次元ベクトル
///
/// スクリーン座標、カメラの平滑化速度、リコイルオフセットに使用します。
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    pub fn scale(&self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// 各軸を ±limit にクリップ
    pub fn clamp_per_axis(&self, limit: f64) -> Self {
        Self::new(self.x.clamp(-limit, limit), self.y.clamp(-limit, limit))
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// 回転クォータニオン (x, y, z, w)
///
/// 内部で正規化はしません。呼び出し側が単位クォータニオンを渡す前提です。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// 軸と角度（ラジアン）から作成
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let axis = axis.normalize();
        let (s, c) = (angle / 2.0).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use std::f64::consts::PI;

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / PI
    }

    /// 角度を (-π, π] の範囲に正規化（ラジアン）
    pub fn normalize_angle(angle: f64) -> f64 {
        let mut normalized = angle % (2.0 * PI);
        if normalized > PI {
            normalized -= 2.0 * PI;
        } else if normalized <= -PI {
            normalized += 2.0 * PI;
        }
        normalized
    }

    /// 2つの角度の最短差分（from → to、ラジアン）
    pub fn angle_difference(from: f64, to: f64) -> f64 {
        normalize_angle(to - from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_unit_length() {
        let samples = [
            Vector3::new(3.0, 4.0, 0.0),
            Vector3::new(-1.0, 2.5, 7.0),
            Vector3::new(1e-4, 0.0, -1e-4),
            Vector3::new(120.0, -80.0, 33.0),
        ];
        for v in samples {
            assert!((v.normalize().length() - 1.0).abs() < DEFAULT_EPSILON);
        }
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);
    }

    #[test]
    fn test_cross_and_dot() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert!(x.cross(&y).equals(&Vector3::new(0.0, 0.0, 1.0)));
        assert_eq!(x.dot(&y), 0.0);
        assert_eq!(Vector3::new(1.0, 2.0, 3.0).dot(&Vector3::new(4.0, 5.0, 6.0)), 32.0);
    }

    #[test]
    fn test_lerp_is_not_clamped() {
        let a = Vector3::ZERO;
        let b = Vector3::new(10.0, 0.0, 0.0);
        assert!(a.lerp(&b, 0.5).equals(&Vector3::new(5.0, 0.0, 0.0)));
        assert!(a.lerp(&b, 1.5).equals(&Vector3::new(15.0, 0.0, 0.0)));
    }

    #[test]
    fn test_distance() {
        let a = Vector3::new(1.0, 1.0, 1.0);
        let b = Vector3::new(4.0, 5.0, 1.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance_squared(&b), 25.0);
    }

    #[test]
    fn test_identity_quaternion_rotation() {
        let v = Vector3::new(-0.0457, -0.00447, -0.02004);
        assert!(v.rotate_by_quaternion(&Quaternion::identity()).equals(&v));
    }

    #[test]
    fn test_quaternion_quarter_turn_about_y() {
        let q = Quaternion::from_axis_angle(Vector3::UP, FRAC_PI_2);
        let rotated = Vector3::new(1.0, 0.0, 0.0).rotate_by_quaternion(&q);
        assert!(rotated.approx_eq(&Vector3::new(0.0, 0.0, -1.0), 1e-9));
    }

    #[test]
    fn test_normalize_angle() {
        assert!((math_utils::normalize_angle(2.0 * PI + 0.5) - 0.5).abs() < 1e-12);
        assert!((math_utils::normalize_angle(-2.0 * PI - 0.5) + 0.5).abs() < 1e-12);
        assert!((math_utils::normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((math_utils::angle_difference(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-9);
    }
}
