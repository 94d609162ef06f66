use finsight_core::{MetricTable, ReportError, ReportResult};
use serde::{Deserialize, Serialize};

/// One entity's contribution to a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub name: String,
    pub row_count: usize,
}

/// Main entity and competitors merged into one display-ordered table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub table: MetricTable,
    /// Main entity first, then competitors in input order. Zero-row entities included.
    pub entities: Vec<EntityGroup>,
}

impl Comparison {
    pub fn main_name(&self) -> Option<&str> {
        self.entities.first().map(|e| e.name.as_str())
    }

    pub fn main_rows(&self) -> MetricTable {
        match self.main_name() {
            Some(main) => self.table.filter_entity(main),
            None => MetricTable::new(),
        }
    }

    pub fn competitor_rows(&self) -> MetricTable {
        let main = self.main_name().unwrap_or_default();
        self.table
            .iter()
            .filter(|r| r.entity != main)
            .cloned()
            .collect()
    }

    /// Entities that contributed no rows
    pub fn missing_entities(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| e.row_count == 0)
            .map(|e| e.name.as_str())
            .collect()
    }
}

/// Merge the main table with competitor tables for charting and comparison prompts.
///
/// Every row is stamped with the name of the table it came from, so each
/// source contributes all of its rows and cannot overwrite another's. Source
/// names must be distinct. Rows are sorted by metric, then year descending;
/// entity order within a group follows input order.
pub fn build_comparison<I>(main_name: &str, main: MetricTable, competitors: I) -> ReportResult<Comparison>
where
    I: IntoIterator<Item = (String, MetricTable)>,
{
    let mut table = MetricTable::new();
    let mut names: Vec<String> = Vec::new();

    let sources = std::iter::once((main_name.to_string(), main)).chain(competitors);
    for (name, source) in sources {
        if names.contains(&name) {
            return Err(ReportError::InvalidRequest(format!(
                "'{}' appears more than once in the comparison",
                name
            )));
        }
        table.extend(source.with_entity(&name));
        names.push(name);
    }

    table.sort_for_display();

    let entities = names
        .into_iter()
        .map(|name| EntityGroup {
            row_count: table.iter().filter(|r| r.entity == name).count(),
            name,
        })
        .collect();

    Ok(Comparison { table, entities })
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::MetricRow;

    fn table(entity: &str, rows: &[(i32, &str, f64)]) -> MetricTable {
        rows.iter()
            .map(|(year, metric, value)| MetricRow::new(entity, Some(*year), *metric, Some(*value)))
            .collect()
    }

    #[test]
    fn test_row_count_is_sum_of_inputs() {
        let main = table("", &[(2023, "Revenue", 10.0), (2022, "Revenue", 9.0)]);
        let rivals = vec![
            ("Beta".to_string(), table("BETA", &[(2023, "Revenue", 5.0)])),
            ("Gamma".to_string(), MetricTable::new()),
        ];
        let comparison = build_comparison("Acme", main, rivals).unwrap();

        assert_eq!(comparison.table.len(), 3);
        assert_eq!(
            comparison.entities,
            vec![
                EntityGroup { name: "Acme".to_string(), row_count: 2 },
                EntityGroup { name: "Beta".to_string(), row_count: 1 },
                EntityGroup { name: "Gamma".to_string(), row_count: 0 },
            ]
        );
        assert_eq!(comparison.missing_entities(), vec!["Gamma"]);
    }

    #[test]
    fn test_zero_competitors() {
        let main = table("", &[(2023, "EBITDA", 1.0)]);
        let comparison = build_comparison("Acme", main, Vec::new()).unwrap();
        assert_eq!(comparison.table.len(), 1);
        assert_eq!(comparison.table.rows()[0].entity, "Acme");
        assert!(comparison.competitor_rows().is_empty());
    }

    #[test]
    fn test_source_name_replaces_existing_stamp() {
        let rival = table("BETA", &[(2023, "Revenue", 5.0)]);
        let comparison =
            build_comparison("Acme", MetricTable::new(), vec![("Beta".to_string(), rival)]).unwrap();
        assert_eq!(comparison.table.rows()[0].entity, "Beta");
        assert_eq!(comparison.entities[1].row_count, 1);
    }

    #[test]
    fn test_competitor_stamped_as_main_does_not_overwrite_main() {
        let main = table("", &[(2023, "Revenue", 10.0)]);
        let rival = table("Acme", &[(2023, "Revenue", 5.0)]);
        let comparison = build_comparison("Acme", main, vec![("Beta".to_string(), rival)]).unwrap();

        assert_eq!(comparison.table.len(), 2);
        assert_eq!(comparison.table.value("Acme", "Revenue", 2023), Some(10.0));
        assert_eq!(comparison.table.value("Beta", "Revenue", 2023), Some(5.0));
        let counts: Vec<usize> = comparison.entities.iter().map(|e| e.row_count).collect();
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn test_duplicate_source_names_are_rejected() {
        let rivals = vec![
            ("Beta".to_string(), table("", &[(2023, "Revenue", 5.0)])),
            ("Beta".to_string(), table("", &[(2023, "Revenue", 4.0)])),
        ];
        assert!(matches!(
            build_comparison("Acme", MetricTable::new(), rivals),
            Err(ReportError::InvalidRequest(_))
        ));
        assert!(matches!(
            build_comparison("Acme", MetricTable::new(), vec![("Acme".to_string(), MetricTable::new())]),
            Err(ReportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_display_order() {
        let main = table("", &[(2022, "Revenue", 9.0), (2023, "Revenue", 10.0), (2023, "EBITDA", 2.0)]);
        let rival = table("", &[(2023, "Revenue", 5.0)]);
        let comparison = build_comparison("Acme", main, vec![("Beta".to_string(), rival)]).unwrap();

        let order: Vec<(&str, Option<i32>, &str)> = comparison
            .table
            .iter()
            .map(|r| (r.metric.as_str(), r.year, r.entity.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("EBITDA", Some(2023), "Acme"),
                ("Revenue", Some(2023), "Acme"),
                ("Revenue", Some(2023), "Beta"),
                ("Revenue", Some(2022), "Acme"),
            ]
        );
    }

    #[test]
    fn test_main_and_competitor_split() {
        let main = table("", &[(2023, "Revenue", 10.0)]);
        let rivals = vec![
            ("Beta".to_string(), table("", &[(2023, "Revenue", 5.0)])),
            ("Gamma".to_string(), table("", &[(2023, "Revenue", 4.0)])),
        ];
        let comparison = build_comparison("Acme", main, rivals).unwrap();

        assert_eq!(comparison.main_rows().len(), 1);
        assert_eq!(comparison.competitor_rows().entities(), vec!["Beta", "Gamma"]);
    }
}
