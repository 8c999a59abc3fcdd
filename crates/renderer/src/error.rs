use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),
    #[error("request_device failed: {0}")]
    Device(String),
    #[error("render pipeline build failed: {0}")]
    Pipeline(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("texture upload failed: {0}")]
    TextureUpload(String),
    #[error(
        "submesh reads {needed} bytes of index data but the index buffer holds {available}"
    )]
    IndexRange { needed: u64, available: u64 },
}

pub type RenderResult<T> = Result<T, RenderError>;
