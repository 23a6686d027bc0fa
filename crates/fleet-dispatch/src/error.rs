use thiserror::Error;

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The submitted task type tag is not recognized.
    /// The message matches the response surface of the submission service.
    #[error("Task type is invalid")]
    InvalidTaskType,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
}
