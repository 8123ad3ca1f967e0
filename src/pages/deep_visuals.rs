use super::optional;
use crate::aggregate::{self, GroupSum, Reduction, PROMOTION_LABEL};
use crate::dataset::columns::{
    CATEGORY, HOLIDAY_PROMOTION, INVENTORY_LEVEL, PRICE, PRODUCT_ID, REGION, UNITS_SOLD,
    WEATHER_CONDITION,
};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::statistics::{correlation_matrix, distribution_by, CorrelationMatrix, GroupDistribution};
use serde::Serialize;

/// One region of the Region → Category units hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub region: String,
    pub units_sold: f64,
    pub categories: Vec<GroupSum>,
}

/// Per (category, product) summary: mean price, total units, mean inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubblePoint {
    pub category: String,
    pub product_id: String,
    pub mean_price: Option<f64>,
    pub units_sold: f64,
    pub mean_inventory: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepVisualsReport {
    pub correlation: CorrelationMatrix,
    pub hierarchy: Option<Vec<HierarchyNode>>,
    pub bubbles: Option<Vec<BubblePoint>>,
    /// Units sold distribution per weather condition.
    pub weather: Option<Vec<GroupDistribution>>,
    /// Units sold distribution on promotion days vs normal days.
    pub promotion: Option<Vec<GroupDistribution>>,
    pub warnings: Vec<String>,
}

pub fn deep_visuals(dataset: &Dataset) -> Result<DeepVisualsReport> {
    let mut warnings = Vec::new();

    let correlation = correlation_matrix(dataset)?;
    let hierarchy = optional(hierarchy(dataset), "Region/category hierarchy", &mut warnings)?;
    let bubbles = optional(bubbles(dataset), "Price/demand bubbles", &mut warnings)?;

    let weather = if dataset.has_column(WEATHER_CONDITION) {
        optional(
            distribution_by(dataset, WEATHER_CONDITION, UNITS_SOLD),
            "Weather distribution",
            &mut warnings,
        )?
    } else {
        warnings.push(format!("Dataset has no {} column", WEATHER_CONDITION));
        None
    };

    let promotion = if dataset.has_column(HOLIDAY_PROMOTION) {
        optional(
            aggregate::promotion_labels(dataset)
                .and_then(|labelled| distribution_by(&labelled, PROMOTION_LABEL, UNITS_SOLD)),
            "Promotion distribution",
            &mut warnings,
        )?
    } else {
        warnings.push(format!("Dataset has no {} column", HOLIDAY_PROMOTION));
        None
    };

    Ok(DeepVisualsReport {
        correlation,
        hierarchy,
        bubbles,
        weather,
        promotion,
        warnings,
    })
}

fn hierarchy(dataset: &Dataset) -> Result<Vec<HierarchyNode>> {
    let table = aggregate::aggregate_by(dataset, &[REGION, CATEGORY], &[Reduction::sum(UNITS_SOLD)])?;
    let mut nodes: Vec<HierarchyNode> = Vec::new();
    // Rows arrive sorted by region, then category.
    for row in table.rows {
        let mut key = row.key.into_iter();
        let (Some(region), Some(category)) = (key.next(), key.next()) else {
            continue;
        };
        let sum = row.values[0].unwrap_or(0.0);
        match nodes.last_mut() {
            Some(node) if node.region == region => {
                node.units_sold += sum;
                node.categories.push(GroupSum { group: category, sum });
            }
            _ => nodes.push(HierarchyNode {
                region,
                units_sold: sum,
                categories: vec![GroupSum { group: category, sum }],
            }),
        }
    }
    Ok(nodes)
}

fn bubbles(dataset: &Dataset) -> Result<Vec<BubblePoint>> {
    let table = aggregate::aggregate_by(
        dataset,
        &[CATEGORY, PRODUCT_ID],
        &[
            Reduction::mean(PRICE),
            Reduction::sum(UNITS_SOLD),
            Reduction::mean(INVENTORY_LEVEL),
        ],
    )?;
    Ok(table
        .rows
        .into_iter()
        .filter_map(|row| {
            let mut key = row.key.into_iter();
            Some(BubblePoint {
                category: key.next()?,
                product_id: key.next()?,
                mean_price: row.values[0],
                units_sold: row.values[1].unwrap_or(0.0),
                mean_inventory: row.values[2],
            })
        })
        .collect())
}
