use std::sync::Arc;

use crate::aggregate::SamplingAggregator;
use crate::config::StatsConfig;
use crate::resolve::NameIndex;
use crate::snapshot::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: SamplingAggregator,
    pub snapshots: Arc<SnapshotStore>,
    pub resolver: Arc<NameIndex>,
    pub stats: StatsConfig,
}
