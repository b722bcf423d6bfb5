/// Lights and the Phong material used for displayed meshes
use nalgebra::{Point3, Vector3};

use crate::color::Color;

pub const AMBIENT_INTENSITY: f32 = 0.5;
pub const KEY_INTENSITY: f32 = 1.0;
pub const FILL_INTENSITY: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    /// Shines from `position` toward the origin
    Directional {
        position: Point3<f32>,
        color: Color,
        intensity: f32,
    },
}

impl Light {
    pub fn ambient(intensity: f32) -> Self {
        Light::Ambient {
            color: Color::WHITE,
            intensity,
        }
    }

    pub fn directional(position: Point3<f32>, intensity: f32) -> Self {
        Light::Directional {
            position,
            color: Color::WHITE,
            intensity,
        }
    }

    /// Ambient plus a key light from (1, 1, 1) and a dimmer fill from (-1, -1, -1)
    pub fn studio_rig() -> Vec<Light> {
        vec![
            Light::ambient(AMBIENT_INTENSITY),
            Light::directional(Point3::new(1.0, 1.0, 1.0), KEY_INTENSITY),
            Light::directional(Point3::new(-1.0, -1.0, -1.0), FILL_INTENSITY),
        ]
    }
}

/// Blinn-Phong surface description
#[derive(Debug, Clone, PartialEq)]
pub struct PhongMaterial {
    pub color: Color,
    pub specular: Color,
    pub shininess: f32,
}

impl PhongMaterial {
    pub const SPECULAR: u32 = 0x111111;
    pub const SHININESS: f32 = 200.0;

    pub fn new(color: Color) -> Self {
        Self {
            color,
            specular: Color::from_hex(Self::SPECULAR),
            shininess: Self::SHININESS,
        }
    }

    /// Flat-shade a facet with unit `normal`, seen along unit `view_dir`
    /// (surface toward eye).
    pub fn shade(&self, lights: &[Light], normal: &Vector3<f32>, view_dir: &Vector3<f32>) -> Color {
        let mut diffuse = Color::BLACK;
        let mut specular = Color::BLACK;

        for light in lights {
            match light {
                Light::Ambient { color, intensity } => {
                    diffuse = diffuse + color.scale(*intensity);
                }
                Light::Directional {
                    position,
                    color,
                    intensity,
                } => {
                    let Some(to_light) = position.coords.try_normalize(f32::EPSILON) else {
                        continue;
                    };
                    let lambert = normal.dot(&to_light).max(0.0);
                    diffuse = diffuse + color.scale(intensity * lambert);

                    if lambert > 0.0 {
                        if let Some(half) = (to_light + view_dir).try_normalize(f32::EPSILON) {
                            let highlight = normal.dot(&half).max(0.0).powf(self.shininess);
                            specular = specular + color.scale(intensity * highlight);
                        }
                    }
                }
            }
        }

        (self.color.modulate(diffuse) + self.specular.modulate(specular)).clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_studio_rig_layout() {
        let rig = Light::studio_rig();
        assert_eq!(rig.len(), 3);
        assert!(matches!(rig[0], Light::Ambient { .. }));
        match &rig[2] {
            Light::Directional {
                position, intensity, ..
            } => {
                assert_eq!(*position, Point3::new(-1.0, -1.0, -1.0));
                assert!(*intensity < KEY_INTENSITY);
            }
            other => panic!("unexpected light {:?}", other),
        }
    }

    #[test]
    fn test_lit_face_is_brighter_than_unlit() {
        let material = PhongMaterial::new(Color::from_hex(0x00bcd4));
        let rig = Light::studio_rig();
        let toward_key = Vector3::new(1.0, 1.0, 1.0).normalize();
        let toward_fill = -toward_key;

        let bright = material.shade(&rig, &toward_key, &toward_key);
        let dim = material.shade(&rig, &toward_fill, &toward_fill);
        assert!(bright.luminance() > dim.luminance());
    }

    #[test]
    fn test_ambient_only_scales_base_color() {
        let material = PhongMaterial::new(Color::WHITE);
        let lit = material.shade(&[Light::ambient(0.5)], &Vector3::z(), &Vector3::z());
        assert!((lit.r - 0.5).abs() < 1e-6);
        assert!((lit.g - 0.5).abs() < 1e-6);
    }
}
