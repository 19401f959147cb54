/// Rendered frame buffers.
pub mod backend;
/// `vello_cpu` raster adapter.
pub mod cpu;
