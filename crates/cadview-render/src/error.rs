//! Errors raised while creating or using GPU resources.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// No adapter matched the request.
    #[error("no suitable graphics adapter")]
    AdapterCreationFailed,

    #[error("could not open graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    #[error("invalid shader: {0}")]
    ShaderCompilationFailed(String),

    #[error("invalid render pipeline: {0}")]
    PipelineCreationFailed(String),

    /// A vertex or index buffer could not be allocated or grown.
    #[error("could not allocate buffer {0}")]
    BufferCreationFailed(String),

    /// Reading back the pick framebuffer failed.
    #[error("pick readback failed: {0}")]
    BufferMapFailed(#[from] wgpu::BufferAsyncError),

    #[error("pick framebuffer has no attachments")]
    FramebufferMissing,

    /// A resource was used before `initialize`.
    #[error("'{0}' is not initialized")]
    NotInitialized(&'static str),

    /// The device stopped responding while waiting for submitted work.
    #[error("timed out waiting for the GPU")]
    Timeout,
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
