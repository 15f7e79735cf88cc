//! WebAssembly bindings for `pendulum_core`.
//!
//! Configurations arrive as plain JS objects (any missing field takes its
//! default), results leave either as serialized objects or as flat
//! `Float64Array` row buffers suitable for driving an animation loop.

mod system;

pub use system::WasmPendulum;
