//! Registration errors.

use thiserror::Error;

use crate::ClassFileError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("class '{0}' is already registered")]
    DuplicateClass(String),

    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}
