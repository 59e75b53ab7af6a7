//! Room admin client
//!
//! Guarantees a named room exists before anyone joins it. The lookup/create
//! pair is not transactional: two processes racing through
//! [`RoomAdmin::ensure_room_exists`] can both attempt the create, and the
//! outcome of the duplicate is delegated to the room service.

use crate::error::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Room metadata returned by the admin surface of the room service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Room name
    pub name: String,
    /// Number of participants currently joined
    #[serde(default)]
    pub num_participants: u64,
}

/// Result of ensuring a room exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomIdentity {
    /// Room name
    pub name: String,
    /// Whether this call created the room
    pub newly_created: bool,
}

/// Transport seam for the room service admin API
///
/// Production code talks HTTP through [`HttpRoomDirectory`]; tests drive
/// [`RoomAdmin`] with in-memory fakes.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Look a room up by name, `None` if it does not exist
    async fn get_room(&self, name: &str) -> Result<Option<RoomInfo>, ProbeError>;

    /// Create a room by name
    async fn create_room(&self, name: &str) -> Result<RoomInfo, ProbeError>;
}

/// HTTP-backed room directory
#[derive(Debug, Clone)]
pub struct HttpRoomDirectory {
    http: reqwest::Client,
    base_url: String,
    bearer: String,
}

impl HttpRoomDirectory {
    /// Build a directory client for the admin surface of `service_url`
    ///
    /// `bearer` is an access token carrying the room-create grant.
    pub fn new(service_url: &str, bearer: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: admin_base_url(service_url),
            bearer: bearer.to_string(),
        }
    }

    fn room_url(&self, name: &str) -> String {
        format!("{}/admin/rooms/{}", self.base_url, name)
    }
}

#[async_trait]
impl RoomDirectory for HttpRoomDirectory {
    async fn get_room(&self, name: &str) -> Result<Option<RoomInfo>, ProbeError> {
        let response = self
            .http
            .get(self.room_url(name))
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(|e| ProbeError::Admin {
                room: name.to_string(),
                reason: format!("room lookup failed: {}", e),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status().map_err(|e| ProbeError::Admin {
            room: name.to_string(),
            reason: format!("room lookup returned {}", e),
        })?;

        let info = response
            .json::<RoomInfo>()
            .await
            .map_err(|e| ProbeError::Admin {
                room: name.to_string(),
                reason: format!("room lookup body was malformed: {}", e),
            })?;
        Ok(Some(info))
    }

    async fn create_room(&self, name: &str) -> Result<RoomInfo, ProbeError> {
        #[derive(Serialize)]
        struct CreateRoom<'a> {
            name: &'a str,
        }

        let response = self
            .http
            .post(format!("{}/admin/rooms", self.base_url))
            .bearer_auth(&self.bearer)
            .json(&CreateRoom { name })
            .send()
            .await
            .map_err(|e| ProbeError::Admin {
                room: name.to_string(),
                reason: format!("room create failed: {}", e),
            })?
            .error_for_status()
            .map_err(|e| ProbeError::Admin {
                room: name.to_string(),
                reason: format!("room create returned {}", e),
            })?;

        response.json::<RoomInfo>().await.map_err(|e| ProbeError::Admin {
            room: name.to_string(),
            reason: format!("room create body was malformed: {}", e),
        })
    }
}

/// Room admin client, generic over the directory transport
#[derive(Debug)]
pub struct RoomAdmin<D: RoomDirectory> {
    directory: D,
}

impl<D: RoomDirectory> RoomAdmin<D> {
    /// Create an admin client over a directory transport
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Ensure `name` exists, creating it when absent
    ///
    /// Idempotent from the caller's perspective: an existing room issues no
    /// create call.
    pub async fn ensure_room_exists(&self, name: &str) -> Result<RoomIdentity, ProbeError> {
        if let Some(existing) = self.directory.get_room(name).await? {
            debug!(room = %existing.name, participants = existing.num_participants, "room already exists");
            return Ok(RoomIdentity {
                name: existing.name,
                newly_created: false,
            });
        }

        let created = self.directory.create_room(name).await?;
        info!(room = %created.name, "room created");
        Ok(RoomIdentity {
            name: created.name,
            newly_created: true,
        })
    }
}

/// Map a room service URL onto the HTTP base of its admin API
pub fn admin_base_url(service_url: &str) -> String {
    let trimmed = service_url.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        trimmed.to_string()
    }
}
