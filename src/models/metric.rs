//! Metric models.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::project::ProjectRef;
use crate::hydrate::{Hydrate, JsonObject};

/// One metric value for one entity of one file.
#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    #[serde(skip)]
    project: ProjectRef,
    pub file: String,
    pub entity: String,
    pub entity_id: u64,
    pub tag: String,
    pub value: f64,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricWire {
    file_path: String,
    entity: String,
    #[serde(rename = "entity_id")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    entity_id: u64,
    tag: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    metric_value: f64,
}

impl Hydrate for Metric {
    type Owner = ProjectRef;
    const KIND: &'static str = "metric";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: MetricWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            project: owner.clone(),
            file: wire.file_path,
            entity: wire.entity,
            entity_id: wire.entity_id,
            tag: wire.tag,
            value: wire.metric_value,
        })
    }
}

impl Metric {
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}  {}", self.tag, self.value, self.file)
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

// Tag first, so sorted metrics group by tag.
impl PartialOrd for Metric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let by_key = self
            .tag
            .cmp(&other.tag)
            .then_with(|| self.file.cmp(&other.file))
            .then_with(|| self.entity.cmp(&other.entity))
            .then_with(|| self.entity_id.cmp(&other.entity_id));
        match by_key {
            Ordering::Equal => self.value.partial_cmp(&other.value),
            unequal => Some(unequal),
        }
    }
}

/// Per-tag aggregate returned by `metrics` with `aggregate=true`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsStatistics {
    #[serde(skip)]
    project: ProjectRef,
    pub tag: String,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub entries: u64,
}

#[derive(Deserialize)]
struct MetricsStatisticsWire {
    tag: String,
    sum: f64,
    min: f64,
    max: f64,
    entries: u64,
}

impl Hydrate for MetricsStatistics {
    type Owner = ProjectRef;
    const KIND: &'static str = "metrics statistics";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: MetricsStatisticsWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            project: owner.clone(),
            tag: wire.tag,
            sum: wire.sum,
            min: wire.min,
            max: wire.max,
            entries: wire.entries,
        })
    }
}

impl MetricsStatistics {
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    /// Mean over all entries, `None` when there are none.
    pub fn mean(&self) -> Option<f64> {
        (self.entries > 0).then(|| self.sum / self.entries as f64)
    }
}

impl fmt::Display for MetricsStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl PartialEq for MetricsStatistics {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for MetricsStatistics {}

impl PartialOrd for MetricsStatistics {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricsStatistics {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag.cmp(&other.tag)
    }
}
