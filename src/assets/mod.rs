/// Background media cache.
pub mod cache;
/// Image decoding.
pub mod decode;
/// Media loaders.
pub mod loader;
/// Video probing and frame decoding.
pub mod media;
