use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    client::{ConfigurationItem, SchedulerClient},
    error::{StoreError, TransportError},
    labels::{NodeLabel, normalize_node_labels},
    queue::{self, Properties, QueueRecord},
};


/// One immutable point-in-time value of the remote configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    pub tag: String,
    pub cluster_name: String,
    pub properties: Properties,
}

impl From<ConfigurationItem> for ConfigSnapshot {
    fn from(item: ConfigurationItem) -> Self {
        Self {
            tag: item.tag,
            cluster_name: item.config.cluster_name,
            properties: item.properties,
        }
    }
}

/// An edit on its way to the service. Lives for the duration of one `submit_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub base_tag: Option<String>,
    pub new_tag: String,
    pub properties: Properties,
    pub note: Option<String>,
}

impl PendingUpdate {
    pub fn new(
        base_tag: Option<String>,
        properties: Properties,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            base_tag,
            new_tag: new_tag(now),
            properties,
            note,
        }
    }
}

/// Tags only have second resolution; two updates within one second share a tag and the
/// service decides which one wins.
pub fn new_tag(now: DateTime<Utc>) -> String {
    format!("version{}", now.timestamp())
}

#[derive(Debug, Clone)]
enum SyncState {
    Uninitialized,
    Synced {
        /// Tag local edits are made against.
        base_tag: String,
        snapshot: ConfigSnapshot,
    },
}

/// Cached view of the `capacity-scheduler` configuration of one view instance.
///
/// The store only hands out copies of its snapshot. Mutating operations take `&mut self`,
/// so callers that share a store serialize their calls through a lock.
#[derive(Debug)]
pub struct QueueConfigStore {
    client: SchedulerClient,
    state: SyncState,
    save_mark: Option<String>,
    activation: Option<JoinHandle<Result<(), TransportError>>>,
}

impl QueueConfigStore {
    pub fn new(client: SchedulerClient) -> Self {
        Self {
            client,
            state: SyncState::Uninitialized,
            save_mark: None,
            activation: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SyncState::Synced { .. })
    }

    /// Latest tag observed on the service.
    pub fn tag(&self) -> Option<&str> {
        match &self.state {
            SyncState::Uninitialized => None,
            SyncState::Synced { snapshot, .. } => Some(&snapshot.tag),
        }
    }

    pub fn base_tag(&self) -> Option<&str> {
        match &self.state {
            SyncState::Uninitialized => None,
            SyncState::Synced { base_tag, .. } => Some(base_tag),
        }
    }

    /// True once a fetch has observed a tag other than the one local edits are based on.
    pub fn has_remote_changes(&self) -> bool {
        match &self.state {
            SyncState::Uninitialized => false,
            SyncState::Synced { base_tag, snapshot } => *base_tag != snapshot.tag,
        }
    }

    pub fn snapshot(&self) -> Option<ConfigSnapshot> {
        match &self.state {
            SyncState::Uninitialized => None,
            SyncState::Synced { snapshot, .. } => Some(snapshot.clone()),
        }
    }

    pub fn properties(&self) -> Properties {
        match &self.state {
            SyncState::Uninitialized => Properties::new(),
            SyncState::Synced { snapshot, .. } => snapshot.properties.clone(),
        }
    }

    pub fn save_mark(&self) -> Option<&str> {
        self.save_mark.as_deref()
    }

    /// Records an endpoint to activate after the next successful update.
    pub fn set_save_mark(&mut self, marker: impl Into<String>) {
        let marker = marker.into();
        self.save_mark = if marker.trim().is_empty() {
            None
        } else {
            Some(marker)
        };
    }

    pub async fn fetch_all(&mut self) -> Result<Properties, StoreError> {
        let snapshot = ConfigSnapshot::from(self.client.get_configuration().await?);
        let base_tag = match &self.state {
            SyncState::Uninitialized => {
                info!(tag = %snapshot.tag, cluster = %snapshot.cluster_name, "configuration loaded");
                snapshot.tag.clone()
            }
            SyncState::Synced { base_tag, .. } => {
                if *base_tag != snapshot.tag {
                    info!(base_tag = %base_tag, remote_tag = %snapshot.tag, "remote configuration tag differs");
                }
                base_tag.clone()
            }
        };
        let properties = snapshot.properties.clone();
        self.state = SyncState::Synced { base_tag, snapshot };
        Ok(properties)
    }

    /// Read-only lookup of a historical version.
    pub async fn fetch_by_tag(&self, tag: &str) -> Result<ConfigSnapshot, StoreError> {
        Ok(self.client.get_configuration_by_tag(tag).await?.into())
    }

    /// Replaces the whole configuration with `edits` under a fresh tag.
    pub async fn submit_update(
        &mut self,
        edits: Properties,
        note: Option<String>,
    ) -> Result<Properties, StoreError> {
        queue::validate(&edits)?;

        let pending = PendingUpdate::new(
            self.base_tag().map(str::to_string),
            edits,
            note,
            Utc::now(),
        );
        let applied = self
            .client
            .put_configuration(&pending.new_tag, pending.note.as_deref(), &pending.properties)
            .await?;

        info!(
            base_tag = pending.base_tag.as_deref().unwrap_or(""),
            new_tag = %pending.new_tag,
            "configuration updated"
        );
        let cluster_name = match &self.state {
            SyncState::Uninitialized => String::new(),
            SyncState::Synced { snapshot, .. } => snapshot.cluster_name.clone(),
        };
        self.state = SyncState::Synced {
            base_tag: pending.new_tag.clone(),
            snapshot: ConfigSnapshot {
                tag: pending.new_tag,
                cluster_name,
                properties: pending.properties,
            },
        };

        if let Some(marker) = self.save_mark.take() {
            self.spawn_activation(marker);
        }
        Ok(applied)
    }

    fn spawn_activation(&mut self, marker: String) {
        let client = self.client.clone();
        self.activation = Some(tokio::spawn(async move {
            let res = client.put_save(&marker).await;
            if let Err(err) = &res {
                warn!(%err, marker = %marker, "activation of staged configuration failed");
            }
            res
        }));
    }

    /// Waits for the activation request spawned by the last update, if any.
    ///
    /// Returns `None` when nothing was pending, otherwise whether activation succeeded.
    pub async fn settle_activation(&mut self) -> Option<bool> {
        let handle = self.activation.take()?;
        match handle.await {
            Ok(res) => Some(res.is_ok()),
            Err(join_err) => {
                warn!(%join_err, "activation task join error");
                Some(false)
            }
        }
    }

    pub async fn node_labels(&self) -> Result<Vec<NodeLabel>, StoreError> {
        let payload = self.client.get_node_labels().await?;
        Ok(normalize_node_labels(&payload)?)
    }

    pub async fn privilege(&self) -> Result<Value, StoreError> {
        Ok(self.client.get_privilege().await?)
    }

    pub async fn list_tags(&self) -> Result<Value, StoreError> {
        Ok(self.client.get_all_tags().await?)
    }

    pub fn queues(&self) -> Vec<QueueRecord> {
        match &self.state {
            SyncState::Uninitialized => queue::queues(&Properties::new()),
            SyncState::Synced { snapshot, .. } => queue::queues(&snapshot.properties),
        }
    }

    pub fn find_queue(&self, id: &str) -> Option<QueueRecord> {
        queue::find_queue(&self.properties(), id)
    }

    pub async fn create_queue(
        &mut self,
        parent_path: &str,
        name: &str,
        note: Option<String>,
    ) -> Result<Properties, StoreError> {
        let edits = queue::create_queue(&self.properties(), parent_path, name)?;
        self.submit_update(edits, note).await
    }

    pub async fn delete_queue(
        &mut self,
        path: &str,
        note: Option<String>,
    ) -> Result<Properties, StoreError> {
        let edits = queue::delete_queue(&self.properties(), path)?;
        self.submit_update(edits, note).await
    }
}
