//! Core types shared by the asset and renderer crates: backend/stage enums,
//! matrix basis conversion, errors.

pub use glam::{Mat4, Vec3, Vec4};

pub mod backend;
pub mod basis;

pub use backend::{GraphicsBackend, ShaderStage};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown graphics backend '{0}'")]
    UnknownBackend(String),
    #[error("Unknown shader stage '{0}'")]
    UnknownShaderStage(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
