use shared::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Joining needs a room id in the session context.
    #[error("no game room id in the session context")]
    MissingRoomContext,
    #[error("no account in the session context")]
    MissingIdentity,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("session store I/O: {0}")]
    SessionIo(#[from] std::io::Error),
    #[error("session store encoding: {0}")]
    SessionEncoding(#[from] bincode::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}
