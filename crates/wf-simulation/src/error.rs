use wf_core::{ThingRef, WorldError};

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error("{0} is not standing in a place")]
    NotInPlace(ThingRef),

    #[error("system error: {0}")]
    SystemError(String),
}
