//! Face Bucket Registry
//!
//! Every face lives in exactly one bucket, chosen by [`classify`] from its
//! role and material signature. Buckets are flat lists of [`FaceKey`]s; a
//! face remembers its own index so removal is a swap-remove.

use slotmap::SlotMap;

use crate::errors::{Result, RiggedError};
use crate::resources::{AlphaMode, FaceRole, MaterialSignature};
use crate::scene::{BucketSlot, FaceKey, MeshFace};

/// Number of material slots: 2 bits of map presence x 4 alpha modes.
pub const MATERIAL_SLOT_COUNT: u8 = 16;

const MATERIAL_NAMES: [&str; MATERIAL_SLOT_COUNT as usize] = [
    "material-opaque",
    "material-opaque-spec",
    "material-opaque-norm",
    "material-opaque-spec-norm",
    "material-blend",
    "material-blend-spec",
    "material-blend-norm",
    "material-blend-spec-norm",
    "material-mask",
    "material-mask-spec",
    "material-mask-norm",
    "material-mask-spec-norm",
    "material-emissive",
    "material-emissive-spec",
    "material-emissive-norm",
    "material-emissive-spec-norm",
];

/// Pass bucket a face is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketId {
    /// Avatar body parts rigidly attached to one joint.
    Rigid,
    /// The avatar's skinned body mesh.
    Skinned,
    Simple,
    Fullbright,
    Shiny,
    FullbrightShiny,
    Alpha,
    FullbrightAlpha,
    Glow,
    Bump,
    /// Advanced material, indexed by [`MaterialSignature::material_slot`].
    Material(u8),
}

impl BucketId {
    const FIXED: [Self; 10] = [
        Self::Rigid,
        Self::Skinned,
        Self::Simple,
        Self::Fullbright,
        Self::Shiny,
        Self::FullbrightShiny,
        Self::Alpha,
        Self::FullbrightAlpha,
        Self::Glow,
        Self::Bump,
    ];

    /// Total number of buckets.
    pub const COUNT: usize = Self::FIXED.len() + MATERIAL_SLOT_COUNT as usize;

    /// Dense index in `0..COUNT`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Rigid => 0,
            Self::Skinned => 1,
            Self::Simple => 2,
            Self::Fullbright => 3,
            Self::Shiny => 4,
            Self::FullbrightShiny => 5,
            Self::Alpha => 6,
            Self::FullbrightAlpha => 7,
            Self::Glow => 8,
            Self::Bump => 9,
            Self::Material(slot) => Self::FIXED.len() + usize::from(slot % MATERIAL_SLOT_COUNT),
        }
    }

    /// Every bucket in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::FIXED
            .into_iter()
            .chain((0..MATERIAL_SLOT_COUNT).map(Self::Material))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Rigid => "rigid",
            Self::Skinned => "skinned",
            Self::Simple => "simple",
            Self::Fullbright => "fullbright",
            Self::Shiny => "shiny",
            Self::FullbrightShiny => "fullbright-shiny",
            Self::Alpha => "alpha",
            Self::FullbrightAlpha => "fullbright-alpha",
            Self::Glow => "glow",
            Self::Bump => "bump",
            Self::Material(slot) => MATERIAL_NAMES[usize::from(slot % MATERIAL_SLOT_COUNT)],
        }
    }

    /// Alpha mode encoded in a material slot.
    #[must_use]
    pub fn material_alpha_mode(slot: u8) -> AlphaMode {
        match (slot >> 2) & 0b11 {
            1 => AlphaMode::Blend,
            2 => AlphaMode::Mask,
            3 => AlphaMode::Emissive,
            _ => AlphaMode::Opaque,
        }
    }
}

/// Picks the one bucket a face belongs to. Pure function of role and
/// material; the first matching rule wins.
#[must_use]
pub fn classify(role: FaceRole, material: &MaterialSignature) -> BucketId {
    match role {
        FaceRole::AvatarRigid => return BucketId::Rigid,
        FaceRole::AvatarSkinned => return BucketId::Skinned,
        FaceRole::Rigged => {}
    }

    if material.has_material_maps() {
        return BucketId::Material(material.material_slot());
    }

    if material.alpha_mode.is_blended() {
        return if material.fullbright {
            BucketId::FullbrightAlpha
        } else {
            BucketId::Alpha
        };
    }

    if material.glow > 0.0 {
        return BucketId::Glow;
    }

    match (material.fullbright, material.shiny) {
        (true, true) => BucketId::FullbrightShiny,
        (false, true) => BucketId::Shiny,
        (true, false) => BucketId::Fullbright,
        (false, false) if material.bump => BucketId::Bump,
        (false, false) => BucketId::Simple,
    }
}

/// Per-bucket ordered face lists.
///
/// The registry holds keys only; faces are owned by the renderer's face
/// arena and carry their [`BucketSlot`] back-reference.
#[derive(Debug)]
pub struct BucketRegistry {
    buckets: Vec<Vec<FaceKey>>,
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: vec![Vec::new(); BucketId::COUNT],
        }
    }

    /// Faces of `bucket`, in draw order.
    #[inline]
    #[must_use]
    pub fn faces(&self, bucket: BucketId) -> &[FaceKey] {
        &self.buckets[bucket.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Classifies `key` and appends it to its bucket.
    ///
    /// Adding a face that is already registered is a programming error:
    /// asserted in debug builds, logged and ignored in release builds.
    pub fn add_face(
        &mut self,
        faces: &mut SlotMap<FaceKey, MeshFace>,
        key: FaceKey,
    ) -> Result<BucketId> {
        let face = faces.get_mut(key).ok_or(RiggedError::UnknownFace)?;
        if let Some(slot) = face.bucket {
            return misuse(RiggedError::AlreadyRegistered(slot.bucket.name()));
        }

        let bucket = classify(face.role, &face.material);
        let list = &mut self.buckets[bucket.index()];
        face.bucket = Some(BucketSlot {
            bucket,
            index: list.len(),
        });
        list.push(key);
        Ok(bucket)
    }

    /// Removes `key` from its bucket in O(1): the last face of the bucket is
    /// swapped into the vacated slot and its stored index fixed up.
    ///
    /// Removing a face that is not registered is asserted in debug builds
    /// and ignored in release builds.
    pub fn remove_face(
        &mut self,
        faces: &mut SlotMap<FaceKey, MeshFace>,
        key: FaceKey,
    ) -> Result<BucketId> {
        let face = faces.get_mut(key).ok_or(RiggedError::UnknownFace)?;
        let Some(slot) = face.bucket else {
            return misuse(RiggedError::NotRegistered);
        };

        let list = &mut self.buckets[slot.bucket.index()];
        if list.get(slot.index) != Some(&key) {
            return misuse(RiggedError::NotRegistered);
        }
        face.bucket = None;

        list.swap_remove(slot.index);
        if let Some(&moved) = list.get(slot.index)
            && let Some(moved_face) = faces.get_mut(moved)
            && let Some(moved_slot) = moved_face.bucket.as_mut()
        {
            moved_slot.index = slot.index;
        }
        Ok(slot.bucket)
    }

    /// Moves a face whose material changed to its new bucket. A face that
    /// still classifies the same stays where it is.
    pub fn reclassify(
        &mut self,
        faces: &mut SlotMap<FaceKey, MeshFace>,
        key: FaceKey,
    ) -> Result<BucketId> {
        let face = faces.get(key).ok_or(RiggedError::UnknownFace)?;
        let target = classify(face.role, &face.material);
        if let Some(slot) = face.bucket
            && slot.bucket == target
        {
            return Ok(target);
        }
        if face.bucket.is_some() {
            self.remove_face(faces, key)?;
        }
        self.add_face(faces, key)
    }

    /// Checks that every listed face points back at its exact position and
    /// every registered face is listed. Returns the first violation found.
    pub fn check_invariants(&self, faces: &SlotMap<FaceKey, MeshFace>) -> std::result::Result<(), String> {
        let mut listed = 0usize;
        for bucket in BucketId::all() {
            for (index, &key) in self.faces(bucket).iter().enumerate() {
                let Some(face) = faces.get(key) else {
                    return Err(format!("{} slot {index}: dangling face key", bucket.name()));
                };
                if face.bucket != Some(BucketSlot { bucket, index }) {
                    return Err(format!(
                        "{} slot {index}: face records {:?}",
                        bucket.name(),
                        face.bucket
                    ));
                }
                listed += 1;
            }
        }
        let registered = faces.values().filter(|f| f.bucket.is_some()).count();
        if registered != listed {
            return Err(format!("{registered} faces registered but {listed} listed"));
        }
        Ok(())
    }
}

fn misuse<T>(error: RiggedError) -> Result<T> {
    log::error!("Bucket registry misuse: {error}");
    debug_assert!(false, "bucket registry misuse: {error}");
    Err(error)
}
