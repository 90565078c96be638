//! Per-villager billboard state: orientation bucket, animation frame and the
//! texture or atlas rectangle to draw each tick.
//!
//! A billboard reads from an immutable [`TextureSet`] or [`AtlasLayout`] shared
//! through the caches; it never mutates them.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use engine_core::{planar_direction, signed_planar_angle_deg, Vec2, Vec3};
use thiserror::Error;

use crate::archive::{AtlasLayout, UvRect};
use crate::cache::TextureSet;
use crate::geometry::RecordGeometry;
use crate::texture::TextureHandle;

pub const NUM_ORIENTATIONS: usize = 8;
pub const ANGLE_PER_ORIENTATION: f32 = 360.0 / NUM_ORIENTATIONS as f32;
pub const MOVE_ANIM_SPEED: f32 = 4.0;
pub const IDLE_ANIM_SPEED: f32 = 1.0;

/// One orientation of an animation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobileAnimation {
    pub record: usize,
    pub fps: f32,
    pub flip: bool,
}

const fn anim(record: usize, fps: f32, flip: bool) -> MobileAnimation {
    MobileAnimation { record, fps, flip }
}

/// Walking, one entry per orientation starting face-on. The east half mirrors the west.
pub const MOVE_ANIMS: [MobileAnimation; NUM_ORIENTATIONS] = [
    anim(0, MOVE_ANIM_SPEED, false),
    anim(1, MOVE_ANIM_SPEED, false),
    anim(2, MOVE_ANIM_SPEED, false),
    anim(3, MOVE_ANIM_SPEED, false),
    anim(4, MOVE_ANIM_SPEED, false),
    anim(3, MOVE_ANIM_SPEED, true),
    anim(2, MOVE_ANIM_SPEED, true),
    anim(1, MOVE_ANIM_SPEED, true),
];
/// Idle always faces the viewer.
pub const IDLE_ANIMS: [MobileAnimation; 1] = [anim(5, IDLE_ANIM_SPEED, false)];
pub const GUARD_IDLE_ANIMS: [MobileAnimation; 1] = [anim(15, IDLE_ANIM_SPEED, false)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimState {
    Idle,
    Move,
}

/// What the billboard draws from, in fallback order.
#[derive(Debug, Clone)]
pub enum Appearance {
    /// Custom villager or guard skin.
    Variant(Arc<TextureSet>),
    /// Plain per-frame replacement images.
    Replacement(Arc<TextureSet>),
    /// The archive's packed atlas.
    Atlas(Arc<AtlasLayout>),
    Untextured,
}

impl Appearance {
    pub fn layer(&self) -> &'static str {
        match self {
            Appearance::Variant(_) => "variant",
            Appearance::Replacement(_) => "replacement",
            Appearance::Atlas(_) => "atlas",
            Appearance::Untextured => "untextured",
        }
    }

    pub fn texture_set(&self) -> Option<&Arc<TextureSet>> {
        match self {
            Appearance::Variant(set) | Appearance::Replacement(set) => Some(set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{what} index {index} out of range (len {len}) for archive {archive:03}")]
    IndexOutOfRange {
        archive: u32,
        what: &'static str,
        index: usize,
        len: usize,
    },
}

/// Camera and placement inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillboardView {
    pub camera_position: Vec3,
    pub position: Vec3,
    /// Forward of the entity the billboard belongs to.
    pub parent_forward: Vec3,
}

/// Quad UVs in vertex order: top-left, top-right, bottom-left, bottom-right.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadUvRaw {
    pub uvs: [[f32; 2]; 4],
}

impl QuadUvRaw {
    pub fn from_uvs(uvs: &[Vec2; 4]) -> Self {
        Self {
            uvs: uvs.map(|uv| uv.to_array()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Everything the host needs to redraw the quad.
#[derive(Debug, Clone)]
pub struct RenderUpdate {
    pub record: usize,
    pub frame: usize,
    pub orientation: usize,
    pub scale: Vec2,
    pub uvs: [Vec2; 4],
    pub texture: Option<TextureHandle>,
    pub emission: Option<TextureHandle>,
}

impl RenderUpdate {
    pub fn uv_raw(&self) -> QuadUvRaw {
        QuadUvRaw::from_uvs(&self.uvs)
    }
}

/// UVs for a rectangle, swapping left and right when mirrored.
pub fn quad_uvs(rect: UvRect, flip: bool) -> [Vec2; 4] {
    let (left, right) = if flip {
        (rect.x_max(), rect.x)
    } else {
        (rect.x, rect.x_max())
    };
    [
        Vec2::new(left, rect.y_max()),
        Vec2::new(right, rect.y_max()),
        Vec2::new(left, rect.y),
        Vec2::new(right, rect.y),
    ]
}

/// Orientation bucket in `0..8` for a signed facing angle in degrees.
pub fn orientation_for_angle(facing_deg: f32) -> usize {
    let bucket = -((facing_deg / ANGLE_PER_ORIENTATION).round_ties_even() as i32);
    bucket.rem_euclid(NUM_ORIENTATIONS as i32) as usize
}

/// Orientation of the camera relative to the parent's facing.
pub fn view_orientation(view: &BillboardView) -> usize {
    let dir = planar_direction(view.position, view.camera_position);
    orientation_for_angle(signed_planar_angle_deg(dir, view.parent_forward))
}

#[derive(Debug, Clone)]
pub struct BillboardState {
    appearance: Appearance,
    geometry: Arc<RecordGeometry>,
    is_guard: bool,
    anim_state: AnimState,
    last_orientation: Option<usize>,
    current_frame: usize,
    anim_timer: f32,
    anim_speed: f32,
}

impl BillboardState {
    /// A billboard starts walking with no orientation drawn yet.
    pub fn new(appearance: Appearance, geometry: Arc<RecordGeometry>, is_guard: bool) -> Self {
        Self {
            appearance,
            geometry,
            is_guard,
            anim_state: AnimState::Move,
            last_orientation: None,
            current_frame: 0,
            anim_timer: 0.0,
            anim_speed: MOVE_ANIMS[0].fps,
        }
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn geometry(&self) -> &RecordGeometry {
        &self.geometry
    }

    pub fn is_guard(&self) -> bool {
        self.is_guard
    }

    pub fn anim_state(&self) -> AnimState {
        self.anim_state
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn last_orientation(&self) -> Option<usize> {
        self.last_orientation
    }

    /// Billboard size in world units, taken from record 0.
    pub fn size(&self) -> Vec2 {
        self.geometry.size(0).unwrap_or(Vec2::ZERO)
    }

    fn anims(&self) -> &'static [MobileAnimation] {
        match (self.anim_state, self.is_guard) {
            (AnimState::Move, _) => &MOVE_ANIMS,
            (AnimState::Idle, false) => &IDLE_ANIMS,
            (AnimState::Idle, true) => &GUARD_IDLE_ANIMS,
        }
    }

    /// Switch between idle and moving. Only an actual change resets playback.
    pub fn set_idle(&mut self, idle: bool) {
        let next = if idle { AnimState::Idle } else { AnimState::Move };
        if next == self.anim_state {
            return;
        }
        self.anim_state = next;
        self.current_frame = 0;
        self.last_orientation = None;
        self.anim_timer = 0.0;
        self.anim_speed = self.anims()[0].fps;
    }

    /// Advance by `dt` seconds. Returns an update when the drawn frame changed.
    pub fn tick(&mut self, dt: f32, view: &BillboardView) -> Option<RenderUpdate> {
        let mut update = None;

        let orientation = self.clamp_orientation(view_orientation(view));
        if self.last_orientation != Some(orientation) {
            update = self.render(orientation);
        }

        self.anim_timer += dt;
        if self.anim_timer > 1.0 / self.anim_speed {
            let orientation = self.last_orientation.unwrap_or(orientation);
            let frames = self.frame_count(orientation);
            self.current_frame += 1;
            if self.current_frame >= frames {
                self.current_frame = 0;
            }
            update = self.render(orientation).or(update);
            self.anim_timer = 0.0;
        }

        update
    }

    /// Idle has a single orientation.
    fn clamp_orientation(&self, orientation: usize) -> usize {
        match self.anim_state {
            AnimState::Idle => 0,
            AnimState::Move => orientation,
        }
    }

    fn frame_count(&self, orientation: usize) -> usize {
        self.anims()
            .get(orientation)
            .and_then(|anim| self.geometry.frame_count(anim.record))
            .unwrap_or(0)
    }

    /// Build the update for `orientation`, logging and skipping it when any index is out of range.
    pub fn render(&mut self, orientation: usize) -> Option<RenderUpdate> {
        let orientation = self.clamp_orientation(orientation);
        self.last_orientation = Some(orientation);
        match self.build_update(orientation) {
            Ok(update) => Some(update),
            Err(e) => {
                log::warn!("Skipping {} billboard update: {}", self.appearance.layer(), e);
                None
            }
        }
    }

    fn build_update(&self, orientation: usize) -> Result<RenderUpdate, RenderError> {
        let archive = self.geometry.archive;
        let out_of_range = |what, index, len| RenderError::IndexOutOfRange {
            archive,
            what,
            index,
            len,
        };

        let anims = self.anims();
        let anim = anims
            .get(orientation)
            .ok_or_else(|| out_of_range("orientation", orientation, anims.len()))?;
        let record = anim.record;
        let frame = self.current_frame;
        let scale = self
            .geometry
            .size(record)
            .ok_or_else(|| out_of_range("record", record, self.geometry.record_count()))?;

        let (uvs, texture, emission) = match &self.appearance {
            Appearance::Variant(set) | Appearance::Replacement(set) => {
                let frames = set
                    .frame_count(record)
                    .ok_or_else(|| out_of_range("record", record, set.record_count()))?;
                let texture = set
                    .albedo(record, frame)
                    .ok_or_else(|| out_of_range("frame", frame, frames))?
                    .clone();
                let emission = set.emission(record, frame).cloned();
                (quad_uvs(UvRect::FULL, anim.flip), Some(texture), emission)
            }
            Appearance::Atlas(layout) => {
                let index = layout
                    .indices
                    .get(record)
                    .ok_or_else(|| out_of_range("record", record, layout.indices.len()))?;
                if frame >= index.frame_count {
                    return Err(out_of_range("frame", frame, index.frame_count));
                }
                let slot = index.start_index + frame;
                let rect = layout
                    .rects
                    .get(slot)
                    .ok_or_else(|| out_of_range("atlas rect", slot, layout.rects.len()))?;
                (quad_uvs(*rect, anim.flip), None, None)
            }
            Appearance::Untextured => (quad_uvs(UvRect::FULL, anim.flip), None, None),
        };

        Ok(RenderUpdate {
            record,
            frame,
            orientation,
            scale,
            uvs,
            texture,
            emission,
        })
    }
}
