//! Cloneable façade turn logic uses to invoke server-side actions.
//!
//! [`ServerHandle`] hides the channel plumbing to the session controller. A
//! call suspends the caller until the server's reply has been received and
//! every delta that preceded it has been applied.
use game_state::{EntityId, Value};
use tokio::sync::{mpsc, oneshot};

use super::errors::{ClientError, Result};
use crate::rpc::CallRequest;

#[derive(Clone, Debug)]
pub struct ServerHandle {
    call_tx: mpsc::Sender<CallRequest>,
}

impl ServerHandle {
    pub(crate) fn new(call_tx: mpsc::Sender<CallRequest>) -> Self {
        Self { call_tx }
    }

    /// Invokes `action` on `target` and waits for the server's result.
    ///
    /// Argument order is preserved on the wire. Names are given in snake_case.
    ///
    /// # Errors
    ///
    /// [`ClientError::ActionRejected`] when the server refuses the action; the
    /// session keeps going. Any other error is fatal and the session is
    /// already shutting down when it is returned.
    pub async fn call<'a>(
        &self,
        target: &EntityId,
        action: &str,
        args: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<Value> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = CallRequest {
            target: target.clone(),
            action: action.to_owned(),
            args: args
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
            reply: reply_tx,
        };

        self.call_tx
            .send(request)
            .await
            .map_err(|_| ClientError::SessionClosed)?;

        reply_rx.await.map_err(ClientError::ReplyChannelClosed)?
    }
}
