use finsight_core::{MetricTable, Period};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub entity: String,
    pub points: Vec<SeriesPoint>,
}

/// All entities' yearly values for one metric, ready for a grouped bar or line chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    pub entities: Vec<EntitySeries>,
}

/// Pivot yearly rows into per-metric, per-entity series.
///
/// Metrics and entities keep first-seen order; points are sorted by year ascending.
pub fn chart_series(table: &MetricTable) -> Vec<MetricSeries> {
    let mut series: Vec<MetricSeries> = Vec::new();

    for row in table.iter().filter(|r| r.period == Period::Yearly) {
        let Some(year) = row.year else { continue };

        let metric_idx = match series.iter().position(|s| s.metric == row.metric) {
            Some(i) => i,
            None => {
                series.push(MetricSeries {
                    metric: row.metric.clone(),
                    entities: Vec::new(),
                });
                series.len() - 1
            }
        };

        let entities = &mut series[metric_idx].entities;
        let entity_idx = match entities.iter().position(|e| e.entity == row.entity) {
            Some(i) => i,
            None => {
                entities.push(EntitySeries {
                    entity: row.entity.clone(),
                    points: Vec::new(),
                });
                entities.len() - 1
            }
        };

        entities[entity_idx].points.push(SeriesPoint {
            year,
            value: row.value,
        });
    }

    for metric in &mut series {
        for entity in &mut metric.entities {
            entity.points.sort_by_key(|p| p.year);
        }
    }

    series
}
