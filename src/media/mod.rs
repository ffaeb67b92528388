pub mod video;

pub use video::{VideoEvent, VideoHandle, VideoRegistry};
