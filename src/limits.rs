//! Configuration for a [`crate::vm::Vm`] instance.
//!
//! A plain struct of finite caps so a hostile or buggy script faults with a
//! [`crate::error::VmError`] instead of exhausting host memory or recursing
//! the Rust stack.

/// Runtime limits enforced by the interpreter and arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmLimits {
    /// Maximum live frame-stack depth.
    pub max_frame_depth: usize,

    /// Maximum number of heap records (objects/arrays/functions/regexps)
    /// the arena will hand out before returning a `MemoryError`.
    pub max_arena_records: usize,

    /// Maximum logical length an array may grow to.
    pub max_array_length: u32,

    /// Maximum number of own properties a single object's table may hold.
    pub max_properties_per_object: usize,

    /// Cap on implicit-conversion trap reentry attempts: on the third
    /// attempt a TypeError is raised.
    pub max_trap_reentry: u8,

    /// Maximum nested try handler depth per frame.
    pub max_handler_depth: usize,
}

impl Default for VmLimits {
    fn default() -> Self {
        Self {
            max_frame_depth: 1024,
            max_arena_records: 1_000_000,
            max_array_length: u32::MAX >> 1,
            max_properties_per_object: 1 << 20,
            max_trap_reentry: 2,
            max_handler_depth: 256,
        }
    }
}
