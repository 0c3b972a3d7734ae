use shared::{
    domain::{ConversationId, MessageId},
    error::{ErrorCode, RpcError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("transport failure: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("no conversation is open")]
    NotOpen,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("conversation {0:?} is no longer the active target")]
    Stale(ConversationId),
    #[error("message {0:?} is not in the open conversation")]
    UnknownMessage(MessageId),
}

impl ClientError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Rpc(err) => Some(err.code()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Rpc(RpcError::Unauthorized(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Rpc(RpcError::NotFound(_)))
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
