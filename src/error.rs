use std::path::PathBuf;

/// Errors raised at the fallible edges of the crate (configuration, image
/// loading, device acquisition).  The per-frame batching path never fails.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tile configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to decode tileset {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no suitable GPU adapter found: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("tileset folder {0:?} contains no PNG files")]
    EmptyTilesetFolder(PathBuf),
}
