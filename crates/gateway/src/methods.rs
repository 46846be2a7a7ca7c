use {
    lansite_protocol::{ClientFrame, ErrorShape, ServerFrame, error_codes},
    lansite_sessions::Connection,
    secrecy::Secret,
    tracing::{debug, info, warn},
};

use crate::{boxes::BoxEvent, error::StreamError, state::GatewayState, stream::Stream};

// ── Types ────────────────────────────────────────────────────────────────────

/// The identity a socket speaks for, once logged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Binding {
    pub identity: Option<u64>,
    /// Bound to the admin stream rather than the main stream.
    pub admin: bool,
}

/// Per-socket state threaded through every frame.
#[derive(Debug)]
pub struct SocketContext {
    pub conn: Connection,
    pub binding: Binding,
}

impl SocketContext {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            binding: Binding::default(),
        }
    }

    pub fn conn_id(&self) -> &str {
        self.conn.conn_id()
    }

    pub fn reply(&self, frame: &ServerFrame) -> bool {
        match frame.to_json() {
            Ok(json) => self.conn.send(&json),
            Err(e) => {
                warn!(event = frame.event(), error = %e, "failed to encode reply");
                false
            },
        }
    }
}

// ── Authorization ────────────────────────────────────────────────────────────

const PUBLIC_METHODS: &[&str] = &["session.login", "session.adminLogin"];

const MEMBER_METHODS: &[&str] = &[
    "session.areWeOp",
    "event.join",
    "event.leave",
    "event.create",
    "pm.send",
];

const ADMIN_STREAM_METHODS: &[&str] = &["request.resolve"];

const ADMIN_METHODS: &[&str] = &["box.remove", "session.setPrivileged", "pm.setEnabled"];

fn is_in(method: &str, list: &[&str]) -> bool {
    list.contains(&method)
}

/// Check a frame against the socket's binding. Returns None if authorized.
pub fn authorize_method(method: &str, binding: &Binding, privileged: bool) -> Option<ErrorShape> {
    if is_in(method, PUBLIC_METHODS) {
        return None;
    }
    if binding.identity.is_none() {
        return Some(ErrorShape::new(
            error_codes::AUTHENTICATION_FAILED,
            "not logged in",
        ));
    }
    if is_in(method, MEMBER_METHODS) {
        return None;
    }
    if is_in(method, ADMIN_STREAM_METHODS) {
        if binding.admin && privileged {
            return None;
        }
        return Some(ErrorShape::new(
            error_codes::PERMISSION_DENIED,
            "requests can only be resolved from the admin stream",
        ));
    }
    if is_in(method, ADMIN_METHODS) {
        if privileged {
            return None;
        }
        return Some(ErrorShape::new(
            error_codes::PERMISSION_DENIED,
            "You do not have permission to do that!",
        ));
    }
    Some(ErrorShape::new(
        error_codes::INVALID_REQUEST,
        format!("unknown method: {method}"),
    ))
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// Authorize and apply one client frame.
pub async fn dispatch(state: &GatewayState, ctx: &mut SocketContext, frame: ClientFrame) {
    let method = frame.method();
    let mut stream = state.stream.lock().await;
    let privileged = ctx
        .binding
        .identity
        .and_then(|id| stream.sessions().find(id))
        .is_some_and(|i| i.privileged);

    if let Some(err) = authorize_method(method, &ctx.binding, privileged) {
        warn!(method, conn_id = %ctx.conn_id(), code = %err.code, "frame denied");
        ctx.reply(&ServerFrame::Error(err));
        return;
    }

    debug!(method, conn_id = %ctx.conn_id(), "dispatching frame");
    let result = match frame {
        ClientFrame::Login { id, secret } => login(state, &mut stream, ctx, id, &secret),
        ClientFrame::AdminLogin { id, secret } => admin_login(&mut stream, ctx, id, &secret),
        member => match ctx.binding.identity {
            Some(id) => apply(&mut stream, ctx, id, privileged, member),
            None => Err(StreamError::AuthenticationFailed),
        },
    };
    if let Err(err) = result {
        report(ctx, method, &err);
    }
}

fn login(
    state: &GatewayState,
    stream: &mut Stream,
    ctx: &mut SocketContext,
    id: u64,
    secret: &str,
) -> Result<(), StreamError> {
    stream
        .sessions_mut()
        .reconnect(id, secret, ctx.conn.clone())?;
    let next = Binding {
        identity: Some(id),
        admin: false,
    };
    if ctx.binding != next {
        unbind(stream, ctx.binding, ctx.conn.conn_id());
    }
    if state.config.auth.auto_op_first_user && stream.sessions().len() == 1 {
        stream.sessions_mut().set_privileged(id, true)?;
        info!(id, "first identity promoted to admin");
    }
    ctx.binding = next;
    info!(id, conn_id = %ctx.conn_id(), "session bound");
    stream.resync(id)
}

fn admin_login(
    stream: &mut Stream,
    ctx: &mut SocketContext,
    id: u64,
    secret: &str,
) -> Result<(), StreamError> {
    let identity = stream
        .sessions()
        .check_credentials(id, secret)
        .ok_or(StreamError::AuthenticationFailed)?;
    if !identity.privileged {
        return Err(StreamError::PermissionDenied(
            "The admin stream requires admin privileges.".into(),
        ));
    }
    let display_name = identity.display_name.clone();
    let external = identity.external.clone();
    if stream.admin_stream().is_none() {
        return Err(no_admin_stream());
    }

    let next = Binding {
        identity: Some(id),
        admin: true,
    };
    if ctx.binding != next {
        unbind(stream, ctx.binding, ctx.conn.conn_id());
    }
    let admin = stream.admin_stream_mut().ok_or_else(no_admin_stream)?;
    admin
        .sessions_mut()
        .adopt(id, Secret::new(secret.to_string()), &display_name, external);
    admin.sessions_mut().set_privileged(id, true)?;
    admin
        .sessions_mut()
        .reconnect(id, secret, ctx.conn.clone())?;
    ctx.binding = next;
    info!(id, conn_id = %ctx.conn_id(), "admin stream bound");
    admin.resync(id)
}

fn no_admin_stream() -> StreamError {
    StreamError::PermissionDenied("This gateway has no admin stream.".into())
}

/// Detach `conn_id` from the stream `binding` points at. A socket is bound to
/// at most one stream at a time.
fn unbind(stream: &mut Stream, binding: Binding, conn_id: &str) {
    let Some(id) = binding.identity else {
        return;
    };
    if binding.admin {
        if let Some(admin) = stream.admin_stream_mut()
            && admin.sessions_mut().disconnect(id, conn_id)
        {
            admin.broadcast_roster();
        }
    } else if stream.sessions_mut().disconnect(id, conn_id) {
        stream.broadcast_roster();
    }
    debug!(id, admin = binding.admin, conn_id, "socket unbound");
}

fn apply(
    stream: &mut Stream,
    ctx: &SocketContext,
    id: u64,
    privileged: bool,
    frame: ClientFrame,
) -> Result<(), StreamError> {
    match frame {
        ClientFrame::AreWeOp => {
            ctx.reply(&ServerFrame::SessionOp(privileged));
            Ok(())
        },
        ClientFrame::JoinEvent { event_unique } => stream
            .handle_box_event(id, &event_unique, BoxEvent::Join)
            .map(drop),
        ClientFrame::LeaveEvent { event_unique } => stream
            .handle_box_event(id, &event_unique, BoxEvent::Leave)
            .map(drop),
        ClientFrame::CreateEvent { title, capacity } => stream
            .request_event_creation(id, &title, capacity)
            .map(drop),
        ClientFrame::SendMessage { to, message } => {
            stream.send_private_message(id, to, &message).map(drop)
        },
        ClientFrame::ResolveRequest { unique, accepted } => stream
            .resolve_request(&unique, accepted)
            .map(drop)
            .ok_or_else(|| StreamError::NotFound(format!("request {unique}"))),
        ClientFrame::RemoveBox { unique } => {
            if !stream.remove(&unique) {
                return Err(StreamError::NotFound(format!("box {unique}")));
            }
            info!(unique, by = id, "box removed");
            stream.broadcast_stream();
            Ok(())
        },
        ClientFrame::SetPrivileged {
            id: target,
            privileged,
        } => {
            stream.sessions_mut().set_privileged(target, privileged)?;
            if let Some(admin) = stream.admin_stream_mut()
                && admin.sessions().find(target).is_some()
            {
                admin.sessions_mut().set_privileged(target, privileged)?;
            }
            info!(target, privileged, by = id, "privilege changed");
            stream.broadcast_roster();
            Ok(())
        },
        ClientFrame::SetPrivateMessaging { enabled } => {
            stream.set_private_messaging(enabled);
            Ok(())
        },
        ClientFrame::Login { .. } | ClientFrame::AdminLogin { .. } => Ok(()),
    }
}

/// Tell the client about surfaced failures; log the rest.
fn report(ctx: &SocketContext, method: &str, err: &StreamError) {
    match err {
        StreamError::AuthenticationFailed => {
            warn!(method, conn_id = %ctx.conn_id(), "authentication failed");
            ctx.reply(&ServerFrame::AuthFailed {
                reason: err.to_string(),
            });
        },
        StreamError::PermissionDenied(_) => {
            warn!(method, conn_id = %ctx.conn_id(), error = %err, "permission denied");
            ctx.reply(&ServerFrame::Error(err.to_error_shape()));
        },
        StreamError::InvalidArgument(_) => {
            warn!(method, conn_id = %ctx.conn_id(), error = %err, "frame refused");
        },
        StreamError::NotFound(_) | StreamError::CapacityExceeded(_) => {
            debug!(method, conn_id = %ctx.conn_id(), error = %err, "frame had no effect");
        },
    }
}

/// Release the socket's bindings and tell the affected streams.
pub async fn disconnect(state: &GatewayState, ctx: &SocketContext) {
    if ctx.binding.identity.is_none() {
        return;
    }
    let mut stream = state.stream.lock().await;
    unbind(&mut stream, ctx.binding, ctx.conn_id());
}
