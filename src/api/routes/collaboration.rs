//! WebSocket gateway for real-time multi-user diagram editing.
//!
//! One logical room per diagram id. Clients connect once, optionally
//! presenting an access token in the query string (WebSocket upgrades cannot
//! send custom headers), then join a room and exchange live-preview events.
//! Live-preview traffic is relayed verbatim to the other room members and is
//! never the source of truth; the persisted diagram is updated separately via
//! the save paths.

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade, ws},
    response::Response,
    routing::get,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::app_state::AppState;
use super::rooms::Participant;
use crate::models::{DiagramContent, DiagramPatch};

/// Identity attached to a connection that authenticated at handshake.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub display_name: String,
}

/// Frame published to a room channel.
///
/// `origin` is the sending connection; subscribers drop frames that carry
/// their own id, which is what keeps relayed events from echoing back to the
/// sender. Server-originated frames have no origin and reach everyone.
#[derive(Debug, Clone)]
pub struct RoomFrame {
    pub origin: Option<Uuid>,
    pub event: ServerEvent,
}

/// Messages accepted from clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// `join-diagram` is the older spelling some clients still send.
    #[serde(alias = "join-diagram")]
    JoinRoom {
        room_id: String,
    },
    LeaveRoom,
    GetOnlineUsers {
        room_id: String,
    },
    UpdateDiagram {
        room_id: String,
        diagram: Value,
    },
    MoveClass {
        room_id: String,
        class_id: String,
        position: Value,
    },
    MouseMove {
        room_id: String,
        mouse_x: f64,
        mouse_y: f64,
    },
    AddClass {
        room_id: String,
        new_class: Value,
    },
    UpdateClass {
        room_id: String,
        class_id: String,
        updated_data: Value,
    },
    DeleteClass {
        room_id: String,
        class_id: String,
    },
    AddRelation {
        room_id: String,
        new_relation: Value,
    },
    UpdateRelation {
        room_id: String,
        relation_id: String,
        updated_data: Value,
    },
    DeleteRelation {
        room_id: String,
        relation_id: String,
    },
}

/// Messages emitted to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    JoinedRoom {
        room_id: String,
        online_users: Vec<Participant>,
    },
    OnlineUsers {
        online_users: Vec<Participant>,
    },
    PresenceUpdate {
        online_users: Vec<Participant>,
    },
    UserJoined {
        #[serde(flatten)]
        user: Participant,
    },
    UserLeft {
        #[serde(flatten)]
        user: Participant,
    },
    DiagramUpdated {
        diagram: Value,
    },
    ClassMoved {
        class_id: String,
        position: Value,
    },
    MouseMoved {
        mouse_x: f64,
        mouse_y: f64,
    },
    ClassAdded {
        new_class: Value,
    },
    ClassUpdated {
        class_id: String,
        updated_data: Value,
    },
    ClassDeleted {
        class_id: String,
    },
    RelationAdded {
        new_relation: Value,
    },
    RelationUpdated {
        relation_id: String,
        updated_data: Value,
    },
    RelationDeleted {
        relation_id: String,
    },
    AgentUpdate {
        #[serde(rename = "type")]
        kind: String,
        patch: DiagramPatch,
        updated_diagram: DiagramContent,
        message: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

/// WebSocket connection query parameters
#[derive(Deserialize)]
struct WebSocketQuery {
    token: Option<String>,
}

/// Per-connection state held by the gateway.
struct Connection {
    id: Uuid,
    identity: Option<AuthenticatedUser>,
    room: Option<String>,
    forwarder: Option<JoinHandle<()>>,
}

impl Connection {
    fn participant(&self) -> Participant {
        match &self.identity {
            Some(user) => Participant {
                connection_id: self.id,
                user_id: user.user_id.clone(),
                display_name: user.display_name.clone(),
            },
            None => Participant::anonymous(self.id),
        }
    }
}

/// Create the collaboration router
pub fn collaboration_router() -> Router<AppState> {
    Router::new().route("/realtime", get(handle_websocket))
}

/// Handle WebSocket upgrade and connection
async fn handle_websocket(
    Query(query): Query<WebSocketQuery>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    // Opportunistic authentication: a bad or missing token downgrades the
    // connection to anonymous, it never rejects the upgrade. Viewers without
    // an account are allowed to watch.
    let identity = query.token.as_deref().and_then(|token| {
        match state.jwt.validate_token(token) {
            Ok(claims) => Some(AuthenticatedUser {
                user_id: claims.sub,
                display_name: claims.username,
            }),
            Err(e) => {
                warn!("[Collaboration] Handshake token rejected, continuing anonymously: {e}");
                None
            }
        }
    });

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Handle a WebSocket connection for its whole lifetime.
async fn handle_socket(socket: ws::WebSocket, state: AppState, identity: Option<AuthenticatedUser>) {
    let mut conn = Connection {
        id: Uuid::new_v4(),
        identity,
        room: None,
        forwarder: None,
    };
    info!("[Collaboration] Connection {} opened", conn.id);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: everything addressed to this client funnels through one
    // mpsc queue, whether it is a direct reply or forwarded room traffic.
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if ws_sender.send(ws::Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            ws::Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_client_event(&state, &mut conn, &out_tx, event).await,
                Err(e) => {
                    // Malformed frames get an error reply; the connection and
                    // the registry are left untouched.
                    let _ = out_tx.send(ServerEvent::Error {
                        message: format!("malformed request: {e}"),
                    });
                }
            },
            ws::Message::Close(_) => break,
            _ => {}
        }
    }

    // Runs exactly once per connection, whether the client left explicitly,
    // closed the socket, or vanished.
    leave_current_room(&state, &mut conn).await;
    writer.abort();
    info!("[Collaboration] Connection {} closed", conn.id);
}

/// Dispatch one client frame.
async fn handle_client_event(
    state: &AppState,
    conn: &mut Connection,
    out: &mpsc::UnboundedSender<ServerEvent>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::JoinRoom { room_id } => join_room(state, conn, out, room_id).await,
        ClientEvent::LeaveRoom => leave_current_room(state, conn).await,
        ClientEvent::GetOnlineUsers { room_id } => {
            let online_users = state.rooms.lock().await.participants(&room_id);
            let _ = out.send(ServerEvent::OnlineUsers { online_users });
        }
        ClientEvent::UpdateDiagram { room_id, diagram } => {
            relay(state, &room_id, conn.id, ServerEvent::DiagramUpdated { diagram }).await;
        }
        ClientEvent::MoveClass {
            room_id,
            class_id,
            position,
        } => {
            relay(
                state,
                &room_id,
                conn.id,
                ServerEvent::ClassMoved { class_id, position },
            )
            .await;
        }
        ClientEvent::MouseMove {
            room_id,
            mouse_x,
            mouse_y,
        } => {
            relay(
                state,
                &room_id,
                conn.id,
                ServerEvent::MouseMoved { mouse_x, mouse_y },
            )
            .await;
        }
        ClientEvent::AddClass { room_id, new_class } => {
            relay(state, &room_id, conn.id, ServerEvent::ClassAdded { new_class }).await;
        }
        ClientEvent::UpdateClass {
            room_id,
            class_id,
            updated_data,
        } => {
            relay(
                state,
                &room_id,
                conn.id,
                ServerEvent::ClassUpdated {
                    class_id,
                    updated_data,
                },
            )
            .await;
        }
        ClientEvent::DeleteClass { room_id, class_id } => {
            relay(state, &room_id, conn.id, ServerEvent::ClassDeleted { class_id }).await;
        }
        ClientEvent::AddRelation {
            room_id,
            new_relation,
        } => {
            relay(
                state,
                &room_id,
                conn.id,
                ServerEvent::RelationAdded { new_relation },
            )
            .await;
        }
        ClientEvent::UpdateRelation {
            room_id,
            relation_id,
            updated_data,
        } => {
            relay(
                state,
                &room_id,
                conn.id,
                ServerEvent::RelationUpdated {
                    relation_id,
                    updated_data,
                },
            )
            .await;
        }
        ClientEvent::DeleteRelation {
            room_id,
            relation_id,
        } => {
            relay(
                state,
                &room_id,
                conn.id,
                ServerEvent::RelationDeleted { relation_id },
            )
            .await;
        }
    }
}

/// Join a room, leaving the current one first if it differs.
///
/// A connection belongs to at most one room; joining a second room is an
/// implicit leave of the first, so no membership entry is ever orphaned.
/// Re-joining the same room replaces the registry entry without duplicating
/// it and without re-announcing the participant.
async fn join_room(
    state: &AppState,
    conn: &mut Connection,
    out: &mpsc::UnboundedSender<ServerEvent>,
    room_id: String,
) {
    let rejoin = conn.room.as_deref() == Some(room_id.as_str());
    if !rejoin {
        leave_current_room(state, conn).await;
    }

    let participant = conn.participant();
    let online_users = {
        let mut rooms = state.rooms.lock().await;
        rooms.upsert(&room_id, participant.clone());
        rooms.participants(&room_id)
    };

    if !rejoin {
        let tx = get_or_create_broadcast_tx(state, &room_id).await;
        let rx = tx.subscribe();
        conn.forwarder = Some(spawn_forwarder(rx, out.clone(), conn.id));
        conn.room = Some(room_id.clone());

        info!(
            "[Collaboration] Connection {} joined room {}",
            conn.id, room_id
        );
        broadcast_frame(
            state,
            &room_id,
            Some(conn.id),
            ServerEvent::UserJoined {
                user: participant.clone(),
            },
        )
        .await;
        broadcast_frame(
            state,
            &room_id,
            Some(conn.id),
            ServerEvent::PresenceUpdate {
                online_users: online_users.clone(),
            },
        )
        .await;
    }

    let _ = out.send(ServerEvent::JoinedRoom {
        room_id,
        online_users,
    });
}

/// Leave the connection's current room, if any.
///
/// Safe to call twice: the registry removal is guarded, so an explicit leave
/// followed by the disconnect path announces the departure only once.
async fn leave_current_room(state: &AppState, conn: &mut Connection) {
    let Some(room_id) = conn.room.take() else {
        return;
    };
    if let Some(forwarder) = conn.forwarder.take() {
        forwarder.abort();
    }

    let (removed, online_users, room_gone) = {
        let mut rooms = state.rooms.lock().await;
        let removed = rooms.remove(&room_id, conn.id);
        let online_users = rooms.participants(&room_id);
        (removed, online_users, !rooms.room_exists(&room_id))
    };

    let Some(participant) = removed else {
        return;
    };
    info!(
        "[Collaboration] Connection {} left room {}",
        conn.id, room_id
    );

    if room_gone {
        // Drop the channel with the room so empty rooms do not accumulate.
        state.room_channels.lock().await.remove(&room_id);
        return;
    }

    broadcast_frame(
        state,
        &room_id,
        Some(conn.id),
        ServerEvent::UserLeft { user: participant },
    )
    .await;
    broadcast_frame(
        state,
        &room_id,
        Some(conn.id),
        ServerEvent::PresenceUpdate { online_users },
    )
    .await;
}

/// Forward room frames to one connection, dropping its own echoes.
fn spawn_forwarder(
    mut rx: broadcast::Receiver<RoomFrame>,
    out: mpsc::UnboundedSender<ServerEvent>,
    connection_id: Uuid,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(frame) = rx.recv().await {
            if !should_deliver(&frame, connection_id) {
                continue;
            }
            if out.send(frame.event).is_err() {
                break;
            }
        }
    })
}

/// Broadcast exclusivity rule: a frame goes to every subscriber except its
/// origin connection.
fn should_deliver(frame: &RoomFrame, connection_id: Uuid) -> bool {
    frame.origin != Some(connection_id)
}

/// Relay a live-preview event to the other members of a room.
///
/// Payloads are forwarded verbatim; they are advisory traffic, not the source
/// of truth. A room nobody has joined simply has no subscribers.
async fn relay(state: &AppState, room_id: &str, origin: Uuid, event: ServerEvent) {
    broadcast_frame(state, room_id, Some(origin), event).await;
}

/// Publish a frame to a room's channel, if the room is live.
async fn broadcast_frame(
    state: &AppState,
    room_id: &str,
    origin: Option<Uuid>,
    event: ServerEvent,
) {
    let channels = state.room_channels.lock().await;
    if let Some(tx) = channels.get(room_id) {
        // A send error just means no subscribers are left - that's okay.
        let _ = tx.send(RoomFrame { origin, event });
    }
}

/// Notify a diagram's room that an authoritative save happened.
///
/// Server-originated: no sender to exclude, every member receives it. Clients
/// must treat this as superseding any live-preview state for the diagram.
pub async fn broadcast_agent_update(
    state: &AppState,
    diagram_id: &str,
    patch: DiagramPatch,
    updated_diagram: DiagramContent,
    message: String,
) {
    info!(
        "[Collaboration] Broadcasting agent update to room {} ({} classes, {} relations)",
        diagram_id,
        updated_diagram.classes.len(),
        updated_diagram.relations.len()
    );
    broadcast_frame(
        state,
        diagram_id,
        None,
        ServerEvent::AgentUpdate {
            kind: "diagram_modified".to_string(),
            patch,
            updated_diagram,
            message,
            timestamp: Utc::now(),
        },
    )
    .await;
}

/// Get or create the broadcast channel for a room
async fn get_or_create_broadcast_tx(
    state: &AppState,
    room_id: &str,
) -> broadcast::Sender<RoomFrame> {
    let mut channels = state.room_channels.lock().await;

    if let Some(tx) = channels.get(room_id) {
        tx.clone()
    } else {
        let (tx, _rx) = broadcast::channel::<RoomFrame>(1000);
        channels.insert(room_id.to_string(), tx.clone());
        info!("[Collaboration] Created broadcast channel for room {room_id}");
        tx
    }
}
