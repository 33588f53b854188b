//! Single-flight bookkeeping for remote action calls.
//!
//! The [`Dispatcher`] holds at most one [`PendingCall`]. It checks the calling
//! contract before a request reaches the wire and routes the server's reply
//! back to the suspended caller.
use std::fmt;

use game_state::{EntityId, Registry, Value};
use tokio::sync::oneshot;
use tracing::debug;

use crate::api::{ClientError, Result};

/// A call handed over by [`ServerHandle`](crate::ServerHandle).
pub struct CallRequest {
    pub target: EntityId,
    pub action: String,
    pub args: Vec<(String, Value)>,
    pub reply: oneshot::Sender<Result<Value>>,
}

impl fmt::Debug for CallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRequest")
            .field("target", &self.target)
            .field("action", &self.action)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl CallRequest {
    /// Fails the caller. A caller that already gave up is ignored.
    pub fn fail(self, error: ClientError) {
        if self.reply.send(Err(error)).is_err() {
            debug!(action = %self.action, "call reply channel closed (caller dropped)");
        }
    }
}

/// The one call currently awaiting the server.
#[derive(Debug)]
pub struct PendingCall {
    target: EntityId,
    action: String,
    reply: oneshot::Sender<Result<Value>>,
}

impl PendingCall {
    pub fn target(&self) -> &EntityId {
        &self.target
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    pending: Option<PendingCall>,
    completed: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingCall> {
        self.pending.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Calls resolved so far, rejections included.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Accepts `request` as the pending call.
    ///
    /// A second concurrent call, or one aimed at an entity that is not live,
    /// fails both the caller and the session. Returns the target, action and
    /// arguments to put on the wire.
    pub fn begin(
        &mut self,
        request: CallRequest,
        registry: &Registry,
    ) -> Result<(EntityId, String, Vec<(String, Value)>)> {
        if self.pending.is_some() {
            return Err(self.refuse_concurrent(request));
        }

        if !registry.contains(&request.target) {
            let (action, target) = (request.action.clone(), request.target.clone());
            request.fail(ClientError::DeadTarget {
                action: action.clone(),
                target: target.clone(),
            });
            return Err(ClientError::DeadTarget { action, target });
        }

        let CallRequest {
            target,
            action,
            args,
            reply,
        } = request;
        self.pending = Some(PendingCall {
            target: target.clone(),
            action: action.clone(),
            reply,
        });
        Ok((target, action, args))
    }

    /// Fails `request` because another call is already awaiting its reply.
    ///
    /// Returns the error that ends the session.
    pub fn refuse_concurrent(&self, request: CallRequest) -> ClientError {
        let pending = self
            .pending
            .as_ref()
            .map(|pending| pending.action.clone())
            .unwrap_or_default();
        let requested = request.action.clone();
        request.fail(ClientError::CallInFlight {
            pending: pending.clone(),
            requested: requested.clone(),
        });
        ClientError::CallInFlight { pending, requested }
    }

    /// Delivers the server's verdict to the suspended caller.
    ///
    /// Returns the target and action of the completed call, or `None` when no
    /// call was pending.
    pub fn resolve(&mut self, outcome: Result<Value>) -> Option<(EntityId, String)> {
        let PendingCall {
            target,
            action,
            reply,
        } = self.pending.take()?;
        self.completed += 1;
        if reply.send(outcome).is_err() {
            debug!(%action, "call reply channel closed (caller dropped)");
        }
        Some((target, action))
    }

    /// Fails the pending call, if any, because the session is going away.
    pub fn abort(&mut self) {
        if let Some(pending) = self.pending.take()
            && pending.reply.send(Err(ClientError::SessionEnded)).is_err()
        {
            debug!(action = %pending.action, "call reply channel closed (caller dropped)");
        }
    }
}
