//! Domain event contract shared by both aggregates.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

/// A fact that has already happened to an aggregate.
///
/// Events are transient: they live in the owning aggregate's buffer until
/// the caller drains them and hands them to the messaging layer. They are
/// never persisted by the domain layer.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Dot-namespaced event name (e.g. `order.shipped`).
    ///
    /// Doubles as the broker routing key.
    fn event_name(&self) -> &'static str;

    /// Identifier of the aggregate the event happened to.
    fn aggregate_id(&self) -> String;

    /// When the event occurred.
    fn occurred_on(&self) -> DateTime<Utc>;
}
