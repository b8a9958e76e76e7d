use serde::{Deserialize, Serialize};
use crate::models::common::Vector3;

/// ボーンコライダー記述子
///
/// 外部ツールが出力するコライダー設定です。本クレートが読むのは
/// `reducerProperty` の `scale`・`offset`・`minThickness` のみで、
/// それ以外のフィールドは読み飛ばします。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColliderDescriptor {
    /// 優先して使用するコライダー設定
    #[serde(default)]
    pub bone_collider_property: Option<BoneColliderProperty>,
    /// 優先設定が無い場合に使用するデフォルト設定
    #[serde(default)]
    pub default_bone_collider_property: Option<BoneColliderProperty>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneColliderProperty {
    #[serde(default)]
    pub reducer_property: Option<ReducerProperty>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducerProperty {
    #[serde(default)]
    pub scale: Option<Vector3>,
    #[serde(default)]
    pub offset: Option<Vector3>,
    #[serde(default)]
    pub min_thickness: Option<Vector3>,
}

/// 記述子から解決したコライダー形状パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderShape {
    pub scale: Vector3,
    pub offset: Vector3,
    pub min_thickness: Vector3,
}

impl ColliderShape {
    pub const DEFAULT_SCALE: Vector3 = Vector3 { x: 1.0, y: 1.0, z: 1.0 };
    pub const DEFAULT_OFFSET: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const DEFAULT_MIN_THICKNESS: Vector3 = Vector3 { x: 0.01, y: 0.01, z: 0.01 };
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            offset: Self::DEFAULT_OFFSET,
            min_thickness: Self::DEFAULT_MIN_THICKNESS,
        }
    }
}

impl ColliderDescriptor {
    /// 単一のコライダー設定から記述子を作成
    pub fn with_shape(scale: Vector3, offset: Vector3, min_thickness: Vector3) -> Self {
        Self {
            bone_collider_property: Some(BoneColliderProperty {
                reducer_property: Some(ReducerProperty {
                    scale: Some(scale),
                    offset: Some(offset),
                    min_thickness: Some(min_thickness),
                }),
            }),
            default_bone_collider_property: None,
        }
    }

    /// 使用するサブレコードを選択（優先設定 → デフォルト設定）
    ///
    /// # 戻り値
    ///
    /// 選択されたサブレコード、どちらも無い場合はNone
    pub fn select(&self) -> Option<&BoneColliderProperty> {
        self.bone_collider_property
            .as_ref()
            .or(self.default_bone_collider_property.as_ref())
    }

    /// 形状パラメータを解決
    ///
    /// 個別のトリプルが欠けている場合はデフォルト値
    /// （scale=1, offset=0, minThickness=0.01）を使用します。
    /// サブレコード自体が無い場合はNoneを返します。
    pub fn resolve_shape(&self) -> Option<ColliderShape> {
        let property = self.select()?;
        let reducer = property.reducer_property.clone().unwrap_or_default();

        Some(ColliderShape {
            scale: reducer.scale.unwrap_or(ColliderShape::DEFAULT_SCALE),
            offset: reducer.offset.unwrap_or(ColliderShape::DEFAULT_OFFSET),
            min_thickness: reducer.min_thickness.unwrap_or(ColliderShape::DEFAULT_MIN_THICKNESS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD_CONFIG: &str = r#"
boneColliderProperty:
  boneProperty:
    recursivery: 0
  reducerProperty:
    shapeType: 3
    scale: { x: 1.0, y: 1.2, z: 1.0 }
    minThickness: { x: 0.12, y: 0.15, z: 0.1 }
    offset: { x: 0.0, y: 0.05, z: 0.0 }
    thicknessA: { x: 0.0, y: 0.0, z: 0.0 }
  rigidbodyProperty:
    mass: 1.0
defaultBoneColliderProperty:
  reducerProperty:
    scale: { x: 2.0, y: 2.0, z: 2.0 }
"#;

    #[test]
    fn test_primary_preferred_over_default() {
        let descriptor: ColliderDescriptor = serde_yaml::from_str(HEAD_CONFIG).unwrap();
        let shape = descriptor.resolve_shape().unwrap();
        assert_eq!(shape.scale, Vector3::new(1.0, 1.2, 1.0));
        assert_eq!(shape.min_thickness, Vector3::new(0.12, 0.15, 0.1));
        assert_eq!(shape.offset, Vector3::new(0.0, 0.05, 0.0));
    }

    #[test]
    fn test_default_record_used_when_primary_missing() {
        let yaml = r#"
defaultBoneColliderProperty:
  reducerProperty:
    scale: { x: 2.0, y: 2.0, z: 2.0 }
"#;
        let descriptor: ColliderDescriptor = serde_yaml::from_str(yaml).unwrap();
        let shape = descriptor.resolve_shape().unwrap();
        assert_eq!(shape.scale, Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(shape.offset, ColliderShape::DEFAULT_OFFSET);
        assert_eq!(shape.min_thickness, ColliderShape::DEFAULT_MIN_THICKNESS);
    }

    #[test]
    fn test_missing_records() {
        let descriptor = ColliderDescriptor::default();
        assert!(descriptor.select().is_none());
        assert!(descriptor.resolve_shape().is_none());
    }
}
