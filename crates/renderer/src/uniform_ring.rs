//! Ring of per-frame uniform slots.

use crate::gpu_types::Uniforms;

/// Frames the CPU may run ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Dynamic uniform offsets must be multiples of this.
pub const UNIFORM_ALIGNMENT: u64 = 256;

/// Round `size` up to the next multiple of `alignment` (a power of two).
pub const fn align_to(size: u64, alignment: u64) -> u64 {
    (size + alignment - 1) & !(alignment - 1)
}

/// Byte stride of one [`Uniforms`] slot.
pub const ALIGNED_UNIFORMS_SIZE: u64 =
    align_to(std::mem::size_of::<Uniforms>() as u64, UNIFORM_ALIGNMENT);

/// Slot used by frame number `frame` (0-based).
pub const fn slot_for_frame(frame: u64) -> usize {
    (frame % MAX_FRAMES_IN_FLIGHT as u64) as usize
}

/// Byte offset of the slot used by frame number `frame`.
pub const fn uniform_buffer_offset(frame: u64) -> u64 {
    slot_for_frame(frame) as u64 * ALIGNED_UNIFORMS_SIZE
}

/// CPU copy of the uniform ring; the backend mirrors slot `i` at
/// `i * ALIGNED_UNIFORMS_SIZE` in its GPU buffer.
#[derive(Debug)]
pub struct UniformRing {
    slots: [Uniforms; MAX_FRAMES_IN_FLIGHT],
    index: usize,
}

impl UniformRing {
    /// Total GPU buffer size backing the ring.
    pub const BUFFER_SIZE: u64 = ALIGNED_UNIFORMS_SIZE * MAX_FRAMES_IN_FLIGHT as u64;

    pub fn new() -> Self {
        Self {
            slots: [Uniforms::identity(); MAX_FRAMES_IN_FLIGHT],
            // The first advance lands on slot 0.
            index: MAX_FRAMES_IN_FLIGHT - 1,
        }
    }

    /// Move to the next slot and return its index.
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + 1) % MAX_FRAMES_IN_FLIGHT;
        self.index
    }

    pub fn offset(&self) -> u64 {
        self.index as u64 * ALIGNED_UNIFORMS_SIZE
    }

    pub fn slot(&self, index: usize) -> &Uniforms {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut Uniforms {
        &mut self.slots[index]
    }

}

impl Default for UniformRing {
    fn default() -> Self {
        Self::new()
    }
}
