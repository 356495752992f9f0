pub mod api;
pub mod playback;
pub mod sse;
