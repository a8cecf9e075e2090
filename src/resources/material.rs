use glam::Vec4;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Texture handle issued by the asset layer.
///
/// The pipeline never loads or owns textures; it only forwards these ids to
/// the GPU abstraction when binding texture channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub Uuid);

impl TextureId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TextureId {
    fn default() -> Self {
        Self::new()
    }
}

/// How the diffuse alpha channel is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlphaMode {
    /// Alpha ignored.
    #[default]
    Opaque = 0,
    /// Alpha blended over the frame.
    Blend = 1,
    /// Alpha tested against a cutoff.
    Mask = 2,
    /// Alpha drives the emissive mask.
    Emissive = 3,
}

impl AlphaMode {
    /// Index used when building material slot masks.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn is_blended(self) -> bool {
        matches!(self, Self::Blend)
    }
}

/// Which skinning role a face plays on its owning instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FaceRole {
    /// A face of a rigged attachment, bucketed by material signature.
    #[default]
    Rigged,
    /// A face of the avatar's own skinned body mesh.
    AvatarSkinned,
    /// A rigidly attached body part (eyes, teeth) that follows one joint.
    AvatarRigid,
}

/// Material description of one face, as far as bucketing and vertex writing
/// care about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSignature {
    pub diffuse: Option<TextureId>,
    pub normal_map: Option<TextureId>,
    pub specular_map: Option<TextureId>,
    pub alpha_mode: AlphaMode,
    pub fullbright: bool,
    /// Legacy environment shine.
    pub shiny: bool,
    /// Legacy bump without a normal map texture.
    pub bump: bool,
    /// Fixed emissive glow, `0.0..=1.0`.
    pub glow: f32,
    /// Flat material color broadcast to every vertex.
    pub color: Vec4,
}

impl Default for MaterialSignature {
    fn default() -> Self {
        Self {
            diffuse: None,
            normal_map: None,
            specular_map: None,
            alpha_mode: AlphaMode::Opaque,
            fullbright: false,
            shiny: false,
            bump: false,
            glow: 0.0,
            color: Vec4::ONE,
        }
    }
}

impl MaterialSignature {
    /// Whether the face carries an advanced material (specular or normal map).
    #[inline]
    #[must_use]
    pub fn has_material_maps(&self) -> bool {
        self.normal_map.is_some() || self.specular_map.is_some()
    }

    /// Material slot in `0..16`: bit 0 = specular map, bit 1 = normal map,
    /// bits 2..4 = alpha mode.
    #[inline]
    #[must_use]
    pub fn material_slot(&self) -> u8 {
        let spec = u8::from(self.specular_map.is_some());
        let norm = u8::from(self.normal_map.is_some()) << 1;
        spec | norm | (self.alpha_mode.index() << 2)
    }

    /// Whether only the per-vertex color or emissive channel changed.
    #[must_use]
    pub fn color_differs(&self, other: &Self) -> bool {
        self.color != other.color || self.glow != other.glow
    }
}
