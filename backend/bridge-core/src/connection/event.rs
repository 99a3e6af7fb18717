use crate::error::CredentialError;
use crate::scheduler::TimerHandle;

use models::Credential;

use tokio::sync::oneshot;
use url::Url;

pub type CredentialsReply = oneshot::Sender<Result<Vec<Credential>, CredentialError>>;
pub type WriteReply = oneshot::Sender<Result<(), CredentialError>>;

/// Everything the connection manager reacts to, in arrival order.
#[derive(Debug)]
pub enum BridgeEvent {
    Command(BridgeCommand),
    TimerFired(TimerHandle),
    MessageReceived { generation: u64, data: Vec<u8> },
    ProcessTerminated { generation: u64 },
    FrameStreamCorrupted { generation: u64 },
}

/// Requests coming from the application through the handle.
#[derive(Debug)]
pub enum BridgeCommand {
    InitCommunication,
    SendHandshake,
    RefreshStatusIfNeeded,
    CancelCommunication,
    RetrieveCredentials { url: Url, reply: CredentialsReply },
    CreateCredential { credential: Credential, reply: WriteReply },
    UpdateCredential { credential: Credential, reply: WriteReply },
    Shutdown,
}

impl From<BridgeCommand> for BridgeEvent {
    fn from(command: BridgeCommand) -> Self {
        BridgeEvent::Command(command)
    }
}
