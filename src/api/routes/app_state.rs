//! Application state management.
//!
//! Defines the AppState struct that holds all shared application state: the
//! diagram store, the room registry and broadcast channels owned by the
//! realtime gateway, the save coordinator, and the agent/jwt services.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use super::collaboration::RoomFrame;
use super::rooms::RoomRegistry;
use crate::services::{AgentService, JwtService, SaveCoordinator};
use crate::storage::{DiagramStore, InMemoryDiagramStore, PostgresDiagramStore, StorageError};

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Durable diagram store (PostgreSQL or in-memory)
    pub store: Arc<dyn DiagramStore>,
    /// Room membership registry, owned by the realtime gateway
    pub rooms: Arc<Mutex<RoomRegistry>>,
    /// Broadcast channels (room id -> channel)
    pub room_channels: Arc<Mutex<HashMap<String, broadcast::Sender<RoomFrame>>>>,
    /// Per-diagram save serialization
    pub save: Arc<SaveCoordinator>,
    /// Assistant agent client
    pub agent: Arc<AgentService>,
    /// Token validation for handshake auth and the HTTP routes
    pub jwt: Arc<JwtService>,
}

impl AppState {
    /// Create application state from environment configuration.
    ///
    /// Starts on the in-memory store; call `init_storage()` to switch to
    /// PostgreSQL when DATABASE_URL is set.
    pub fn new() -> Self {
        Self::with_components(
            Arc::new(InMemoryDiagramStore::new()),
            AgentService::from_env(),
            JwtService::from_env(),
        )
    }

    /// Create application state from explicit components.
    ///
    /// Each call builds an independent gateway instance (own registry, own
    /// channels), which is what tests rely on.
    pub fn with_components(
        store: Arc<dyn DiagramStore>,
        agent: AgentService,
        jwt: JwtService,
    ) -> Self {
        Self {
            store,
            rooms: Arc::new(Mutex::new(RoomRegistry::new())),
            room_channels: Arc::new(Mutex::new(HashMap::new())),
            save: Arc::new(SaveCoordinator::new()),
            agent: Arc::new(agent),
            jwt: Arc::new(jwt),
        }
    }

    /// Initialize storage backend from environment configuration.
    ///
    /// Connects to PostgreSQL if DATABASE_URL is set, otherwise keeps the
    /// in-memory store.
    pub async fn init_storage(&mut self) -> Result<(), StorageError> {
        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            match sqlx::PgPool::connect(&database_url).await {
                Ok(pool) => {
                    let store = PostgresDiagramStore::new(pool);
                    store.init_schema().await?;
                    self.store = Arc::new(store);
                    Ok(())
                }
                Err(e) => Err(StorageError::ConnectionError(format!(
                    "Failed to connect to database: {}",
                    e
                ))),
            }
        } else {
            Ok(())
        }
    }
}
