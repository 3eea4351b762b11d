//! Change-notification feed
//!
//! Record mutations are announced as `{table, op, owner_id}` payloads.
//! Delivery is at-least-once: consumers must treat duplicates and receiver
//! lag as "state changed, re-read" rather than applying deltas.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Channel name for PostgreSQL LISTEN/NOTIFY on record mutations.
pub const CHANGE_NOTIFY_CHANNEL: &str = "diligence_record_change";

/// Buffered notifications per subscriber before the receiver lags.
pub const FEED_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Documents,
    Analyses,
    RedFlags,
    Activities,
}

impl ChangeTable {
    /// Whether changes to this table feed the aggregate statistics.
    pub fn is_monitored(&self) -> bool {
        matches!(
            self,
            ChangeTable::Documents | ChangeTable::Analyses | ChangeTable::RedFlags
        )
    }
}

impl Display for ChangeTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ChangeTable::Documents => write!(f, "documents"),
            ChangeTable::Analyses => write!(f, "analyses"),
            ChangeTable::RedFlags => write!(f, "red_flags"),
            ChangeTable::Activities => write!(f, "activities"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One mutation announcement, scoped to the owner whose records changed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeNotification {
    pub table: ChangeTable,
    pub op: ChangeOp,
    pub owner_id: Uuid,
}

/// Push channel of record mutations.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification>;
}

/// Change feed backed by PostgreSQL LISTEN/NOTIFY.
///
/// Database triggers (see the migrations) notify on every insert, update,
/// and delete; this feed decodes the payloads and rebroadcasts them.
/// The listener reconnects with a fixed backoff if the connection drops, so
/// notifications during an outage are lost; subscribers recover because the
/// next successful recomputation reads current state.
pub struct PgChangeFeed {
    tx: broadcast::Sender<ChangeNotification>,
}

impl PgChangeFeed {
    pub fn start(pool: sqlx::PgPool) -> Self {
        let (tx, _rx) = broadcast::channel(FEED_BUFFER);
        let sender = tx.clone();

        tokio::spawn(async move {
            loop {
                match sqlx::postgres::PgListener::connect_with(&pool).await {
                    Ok(mut listener) => {
                        if let Err(e) = listener.listen(CHANGE_NOTIFY_CHANNEL).await {
                            tracing::warn!(error = %e, "LISTEN failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                        while let Ok(notification) = listener.recv().await {
                            match serde_json::from_str::<ChangeNotification>(notification.payload())
                            {
                                Ok(change) => {
                                    let _ = sender.send(change);
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        error = %e,
                                        payload = notification.payload(),
                                        "Ignoring malformed change payload"
                                    );
                                }
                            }
                        }
                        tracing::warn!("Change listener connection lost, reconnecting");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "PgListener connect failed, will retry");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        Self { tx }
    }
}

impl ChangeFeed for PgChangeFeed {
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }
}
