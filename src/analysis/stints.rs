use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::Lap;

/// Lap range covered by one tyre stint. `end_lap` is one past the last lap so a
/// single-lap stint still spans a visible width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StintRange {
    pub driver: String,
    pub stint: u32,
    pub compound: String,
    pub start_lap: u32,
    pub end_lap: u32,
}

/// Groups laps by `(driver, stint, compound)` and reports each group's lap range.
///
/// Laps missing either the stint number or the compound are left out. When a
/// stint reports two compounds each compound gets its own range. Ranges come
/// out in the order their group was first seen.
pub fn build_stints(laps: &[Lap]) -> Vec<StintRange> {
    let mut ranges: Vec<StintRange> = Vec::new();
    let mut index: HashMap<(&str, u32, &str), usize> = HashMap::new();

    for lap in laps {
        let (Some(stint), Some(compound)) = (lap.stint, lap.compound.as_deref()) else {
            continue;
        };
        match index.get(&(lap.driver.as_str(), stint, compound)) {
            Some(&i) => {
                let range = &mut ranges[i];
                range.start_lap = range.start_lap.min(lap.lap_number);
                range.end_lap = range.end_lap.max(lap.lap_number + 1);
            }
            None => {
                index.insert((lap.driver.as_str(), stint, compound), ranges.len());
                ranges.push(StintRange {
                    driver: lap.driver.clone(),
                    stint,
                    compound: compound.to_string(),
                    start_lap: lap.lap_number,
                    end_lap: lap.lap_number + 1,
                });
            }
        }
    }

    ranges
}
