pub mod batch;
pub mod batcher;
pub mod bitmap;
pub mod camera;
pub mod classify;
pub mod config;
pub mod error;
pub mod material;
pub mod mesh;
pub mod renderer;
pub mod shader;
pub mod shadow;
pub mod texture_array;
pub mod water;

pub use batch::{RectParams, MAX_DRAW_Z, SHADOW_SET};
pub use batcher::{FlushOutcome, LayerState, TileBatcher};
pub use bitmap::Bitmap;
pub use config::{RenderMode, TileConfig};
pub use error::TileError;
pub use material::{MaterialVariant, RenderContext};
pub use renderer::TileLayer;
pub use shadow::ShadowSwitch;
pub use water::{NoWater, PresetWater, WaterClassifier, WaterUniforms};
