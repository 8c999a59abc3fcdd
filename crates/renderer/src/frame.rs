//! Per-frame orchestration: slot checkout, camera update, draw traversal,
//! submission.

use asset::mesh::IndexType;
use corelib::camera::Camera;
use glam::Mat4;

use crate::device::{BufferHandle, MaterialId, TextureId};
use crate::gpu_types::Uniforms;
use crate::pacing::{FramePacer, InFlightPermit};
use crate::scene::Scene;
use crate::uniform_ring::{MAX_FRAMES_IN_FLIGHT, UniformRing};

/// One indexed triangle-list draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedDraw {
    pub index_buffer: BufferHandle,
    /// Byte offset of the first index.
    pub index_offset: u64,
    pub index_count: u32,
    pub index_type: IndexType,
}

/// Command sink the draw traversal records into. Implemented by the wgpu
/// render pass wrapper and by test recorders.
pub trait RenderEncoder {
    /// Bind the frame's ring slot (fragment-visible uniforms).
    fn bind_frame_uniforms(&mut self, slot: usize, offset: u64);
    /// Per-model uniforms for the draws that follow. Returns `false` when
    /// they could not be bound; the model's draws are then skipped.
    fn set_draw_uniforms(&mut self, uniforms: &Uniforms) -> bool;
    fn set_vertex_buffer(&mut self, index: u32, buffer: BufferHandle);
    /// Material binding for the draws that follow; `texture` is `None` when
    /// the submesh is untextured.
    fn set_material(&mut self, material: MaterialId, texture: Option<TextureId>);
    fn draw_indexed(&mut self, draw: &IndexedDraw);
}

/// A frame between [`FrameRenderer::begin_frame`] and [`FrameRenderer::end_frame`].
///
/// Dropping it without ending it gives the slot back immediately.
#[derive(Debug)]
pub struct ActiveFrame {
    pub number: u64,
    pub slot: usize,
    pub uniform_offset: u64,
    permit: InFlightPermit,
}

/// Returned by [`FrameRenderer::end_frame`]; complete it once the GPU has
/// finished the frame's commands.
#[derive(Debug)]
#[must_use = "the frame slot stays checked out until the completion fires"]
pub struct FrameCompletion {
    pub number: u64,
    permit: InFlightPermit,
}

impl FrameCompletion {
    pub fn complete(self) {
        log::trace!("frame {} completed on GPU", self.number);
        drop(self.permit);
    }
}

pub struct FrameRenderer {
    ring: UniformRing,
    pacer: FramePacer,
    camera: Camera,
    projection: Mat4,
    frames_begun: u64,
}

impl FrameRenderer {
    pub fn new(camera: Camera) -> Self {
        Self {
            ring: UniformRing::new(),
            pacer: FramePacer::new(MAX_FRAMES_IN_FLIGHT),
            projection: camera.proj(),
            camera,
            frames_begun: 0,
        }
    }

    /// Check out the next ring slot, blocking while every slot is in flight.
    pub fn begin_frame(&mut self) -> ActiveFrame {
        let permit = self.pacer.acquire();
        self.start(permit)
    }

    /// Like [`Self::begin_frame`], but runs `wait_for_gpu` first when no
    /// slot is free. Backends whose completions are delivered by polling
    /// pass their blocking poll here.
    pub fn begin_frame_or_wait(&mut self, wait_for_gpu: impl FnOnce()) -> ActiveFrame {
        let permit = match self.pacer.try_acquire() {
            Some(permit) => permit,
            None => {
                wait_for_gpu();
                self.pacer.acquire()
            }
        };
        self.start(permit)
    }

    fn start(&mut self, permit: InFlightPermit) -> ActiveFrame {
        let slot = self.ring.advance();
        let number = self.frames_begun;
        self.frames_begun += 1;
        ActiveFrame {
            number,
            slot,
            uniform_offset: self.ring.offset(),
            permit,
        }
    }

    /// Write the camera matrices into the frame's slot. Other open frames
    /// keep their slots untouched.
    pub fn update_camera(&mut self, frame: &ActiveFrame, projection: Mat4, view: Mat4) {
        let slot = self.ring.slot_mut(frame.slot);
        slot.projection_matrix = projection.to_cols_array_2d();
        slot.model_view_matrix = view.to_cols_array_2d();
    }

    /// Advance the turntable and write the resulting camera into the slot.
    pub fn update_game_state(&mut self, frame: &ActiveFrame) {
        self.camera.advance();
        let (projection, view) = (self.projection, self.camera.view());
        self.update_camera(frame, projection, view);
    }

    /// Record draws for every submesh of every model, in scene order.
    pub fn draw<E: RenderEncoder + ?Sized>(&self, frame: &ActiveFrame, scene: &Scene, encoder: &mut E) {
        encoder.bind_frame_uniforms(frame.slot, frame.uniform_offset);
        let base = *self.ring.slot(frame.slot);

        for model in scene.models() {
            if !encoder.set_draw_uniforms(&base.with_model_matrix(model.pose())) {
                continue;
            }

            for mesh in model.meshes() {
                for (index, buffer) in mesh.vertex_buffers().iter().enumerate() {
                    encoder.set_vertex_buffer(index as u32, *buffer);
                }
                for submesh in mesh.submeshes() {
                    encoder.set_material(submesh.binding(), submesh.texture());
                    encoder.draw_indexed(&IndexedDraw {
                        index_buffer: submesh.index_buffer(),
                        index_offset: submesh.index_buffer_offset(),
                        index_count: submesh.index_count(),
                        index_type: submesh.index_type(),
                    });
                }
            }
        }
    }

    /// Close the frame. The slot returns to the pool when the returned
    /// completion is completed (or dropped).
    pub fn end_frame(&mut self, frame: ActiveFrame) -> FrameCompletion {
        FrameCompletion {
            number: frame.number,
            permit: frame.permit,
        }
    }

    /// New surface size: only the projection changes; in-flight slots keep
    /// what was already written.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
        self.projection = self.camera.proj();
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn uniforms(&self, slot: usize) -> &Uniforms {
        self.ring.slot(slot)
    }

    pub fn free_slots(&self) -> usize {
        self.pacer.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BufferId, GpuDevice};
    use crate::model::Model;
    use crate::pacing::InFlightSubmissions;
    use crate::testing::{Recorded, RecordingDevice, RecordingEncoder, quad_mesh};
    use crate::texture_cache::TextureCache;
    use crate::uniform_ring::ALIGNED_UNIFORMS_SIZE;
    use std::sync::Arc;
    use std::time::Duration;

    fn renderer() -> FrameRenderer {
        FrameRenderer::new(Camera::for_viewport(800, 600))
    }

    fn single_quad_scene(device: &mut RecordingDevice, pose: Mat4) -> Scene {
        let root = tempfile::tempdir().unwrap();
        let mut textures = TextureCache::new(root.path(), "png");
        let model =
            Model::from_imported(device, &mut textures, "quad", &[quad_mesh("quad", None)], pose)
                .unwrap();
        Scene::from_models(vec![model])
    }

    #[test]
    fn one_untextured_submesh_yields_one_draw() {
        let mut device = RecordingDevice::default();
        let pose = Mat4::from_translation(glam::Vec3::new(0.0, 4.0, 0.0));
        let scene = single_quad_scene(&mut device, pose);
        let mut renderer = renderer();
        let mut encoder = RecordingEncoder::default();

        let frame = renderer.begin_frame();
        renderer.update_camera(&frame, Mat4::IDENTITY, Mat4::IDENTITY);
        renderer.draw(&frame, &scene, &mut encoder);
        renderer.end_frame(frame).complete();

        let draws = encoder.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 6);
        assert_eq!(draws[0].index_type, IndexType::U16);
        assert_eq!(encoder.textures(), vec![None]);
        assert_eq!(
            encoder.draw_uniforms()[0].model_matrix,
            pose.to_cols_array_2d()
        );
        assert_eq!(renderer.free_slots(), MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn commands_follow_model_mesh_submesh_order() {
        let mut device = RecordingDevice::default();
        let scene = single_quad_scene(&mut device, Mat4::IDENTITY);
        let mut renderer = renderer();
        let mut encoder = RecordingEncoder::default();

        let frame = renderer.begin_frame();
        renderer.draw(&frame, &scene, &mut encoder);

        let kinds: Vec<&'static str> = encoder.commands.iter().map(Recorded::kind).collect();
        assert_eq!(
            kinds,
            vec!["frame_uniforms", "draw_uniforms", "vertex_buffer", "material", "draw"]
        );
        assert!(matches!(
            encoder.commands[0],
            Recorded::FrameUniforms { slot: 0, offset: 0 }
        ));
        assert!(matches!(
            encoder.commands[2],
            Recorded::VertexBuffer { index: 0, .. }
        ));
    }

    #[test]
    fn model_without_bound_uniforms_is_not_drawn() {
        let mut device = RecordingDevice::default();
        let root = tempfile::tempdir().unwrap();
        let mut textures = TextureCache::new(root.path(), "png");
        let models: Vec<Model> = ["first", "second"]
            .into_iter()
            .map(|name| {
                Model::from_imported(
                    &mut device,
                    &mut textures,
                    name,
                    &[quad_mesh(name, None)],
                    Mat4::IDENTITY,
                )
                .unwrap()
            })
            .collect();
        let scene = Scene::from_models(models);
        let mut renderer = renderer();
        let mut encoder = RecordingEncoder {
            draw_uniform_capacity: Some(1),
            ..Default::default()
        };

        let frame = renderer.begin_frame();
        renderer.draw(&frame, &scene, &mut encoder);

        assert_eq!(encoder.draw_uniforms().len(), 1);
        assert_eq!(encoder.draws().len(), 1);
        assert_eq!(
            encoder.commands.last().map(Recorded::kind),
            Some("draw")
        );
    }

    #[test]
    fn draw_uniforms_carry_the_slot_camera() {
        let mut device = RecordingDevice::default();
        let scene = single_quad_scene(&mut device, Mat4::IDENTITY);
        let mut renderer = renderer();
        let mut encoder = RecordingEncoder::default();
        let view = Mat4::from_translation(glam::Vec3::new(0.0, 0.0, -8.0));

        let frame = renderer.begin_frame();
        let projection = renderer.projection();
        renderer.update_camera(&frame, projection, view);
        renderer.draw(&frame, &scene, &mut encoder);

        let uniforms = encoder.draw_uniforms()[0];
        assert_eq!(uniforms.model_view_matrix, view.to_cols_array_2d());
        assert_eq!(uniforms.projection_matrix, projection.to_cols_array_2d());
    }

    #[test]
    fn camera_update_targets_the_given_frame_slot() {
        let mut renderer = renderer();
        let older = renderer.begin_frame();
        let newer = renderer.begin_frame();
        assert_eq!((older.slot, newer.slot), (0, 1));
        let view = Mat4::from_translation(glam::Vec3::new(0.0, 0.0, -8.0));

        renderer.update_camera(&older, Mat4::IDENTITY, view);

        assert_eq!(
            renderer.uniforms(older.slot).model_view_matrix,
            view.to_cols_array_2d()
        );
        assert_eq!(renderer.uniforms(newer.slot), &Uniforms::identity());
    }

    #[test]
    fn frame_offsets_follow_the_ring() {
        let mut renderer = renderer();
        for k in 0..6u64 {
            let frame = renderer.begin_frame();
            assert_eq!(frame.number, k);
            assert_eq!(frame.uniform_offset, (k % 3) * ALIGNED_UNIFORMS_SIZE);
            renderer.end_frame(frame).complete();
        }
    }

    #[test]
    fn fourth_frame_waits_for_a_completion() {
        let mut renderer = renderer();
        let mut pending: Vec<FrameCompletion> = (0..3)
            .map(|_| {
                let frame = renderer.begin_frame();
                renderer.end_frame(frame)
            })
            .collect();
        assert_eq!(renderer.free_slots(), 0);

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let first = pending.remove(0);
        let gpu_events = Arc::clone(&events);
        let gpu = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            gpu_events.lock().push("frame 0 completed");
            first.complete();
        });

        let fourth = renderer.begin_frame();
        events.lock().push("frame 3 began");
        gpu.join().unwrap();

        assert_eq!(*events.lock(), vec!["frame 0 completed", "frame 3 began"]);
        assert_eq!(fourth.slot, 0);
        drop(pending);
    }

    #[test]
    fn wait_hook_runs_only_when_slots_are_exhausted() {
        let mut renderer = renderer();
        let mut waited = false;
        let frame = renderer.begin_frame_or_wait(|| waited = true);
        assert!(!waited);

        let held: Vec<_> = (0..2).map(|_| renderer.begin_frame()).collect();
        let mut completions: Vec<_> = std::iter::once(frame)
            .chain(held)
            .map(|f| renderer.end_frame(f))
            .collect();
        let oldest = completions.remove(0);

        let mut oldest = Some(oldest);
        let _next = renderer.begin_frame_or_wait(|| {
            waited = true;
            if let Some(c) = oldest.take() {
                c.complete();
            }
        });
        assert!(waited);
    }

    #[test]
    fn blocked_frame_waits_for_the_oldest_submission_only() {
        let mut renderer = renderer();
        let mut submitted = InFlightSubmissions::new(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let frame = renderer.begin_frame();
            submitted.push(renderer.end_frame(frame));
        }

        let mut completed = Vec::new();
        let fourth = renderer.begin_frame_or_wait(|| {
            if let Some(oldest) = submitted.take_oldest() {
                completed.push(oldest.number);
                oldest.complete();
            }
        });

        assert_eq!(completed, vec![0]);
        assert_eq!(fourth.slot, 0);
        assert_eq!(submitted.len(), 2);
        assert_eq!(renderer.free_slots(), 0);
    }

    #[test]
    fn dropped_frame_returns_its_slot() {
        let mut renderer = renderer();
        let frame = renderer.begin_frame();
        assert_eq!(renderer.free_slots(), 2);
        drop(frame);
        assert_eq!(renderer.free_slots(), 3);
    }

    #[test]
    fn resize_recomputes_only_the_projection() {
        let mut renderer = renderer();
        let before = renderer.projection();
        renderer.resize(1600, 600);
        let after = renderer.projection();
        assert!((after.x_axis.x - before.x_axis.x / 2.0).abs() < 1e-5);
        assert_eq!(after.y_axis.y, before.y_axis.y);
        assert_eq!(after.z_axis.z, before.z_axis.z);
        assert_eq!(after.w_axis.z, before.w_axis.z);
    }

    #[test]
    fn textured_submesh_binds_its_texture() {
        let mut device = RecordingDevice::default();
        let texture = device
            .upload_texture(
                "t",
                &asset::texture::TextureData::white(),
                &crate::device::TextureOptions::MODEL,
            )
            .unwrap();
        let material = device.create_material(&Default::default(), Some(texture));
        let index_buffer = device.create_buffer("ib", crate::device::BufferUsage::Index, &[0; 12]);
        let submesh = crate::model::SubMesh::new(
            6,
            IndexType::U16,
            index_buffer,
            0,
            Default::default(),
            Some(texture),
            material,
        )
        .unwrap();
        let mesh = crate::model::Mesh::new(
            vec![submesh],
            vec![BufferHandle {
                id: BufferId(99),
                size: 128,
            }],
        );
        let scene = Scene::from_models(vec![Model::new("t", vec![mesh], Mat4::IDENTITY)]);

        let mut renderer = renderer();
        let mut encoder = RecordingEncoder::default();
        let frame = renderer.begin_frame();
        renderer.draw(&frame, &scene, &mut encoder);
        assert_eq!(encoder.textures(), vec![Some(texture)]);
    }
}
