use std::{collections::HashMap, sync::Arc};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTotal {
    pub team: String,
    pub points: f64,
}

/// Championship points per team, kept in the order teams were first encountered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPoints {
    totals: Vec<TeamTotal>,
}

impl TeamPoints {
    pub fn get(&self, team: &str) -> Option<f64> {
        self.totals.iter().find(|t| t.team == team).map(|t| t.points)
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Totals in first-encounter order.
    pub fn totals(&self) -> &[TeamTotal] {
        &self.totals
    }

    /// Totals sorted by points, highest first. Teams with equal points keep
    /// their encounter order.
    pub fn ranked(&self) -> Vec<TeamTotal> {
        self.totals
            .iter()
            .cloned()
            .sorted_by(|a, b| b.points.total_cmp(&a.points))
            .collect()
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.totals
            .iter()
            .map(|t| (t.team.clone(), t.points))
            .collect()
    }
}

/// Sums points per team across sessions.
///
/// Missing sessions and sessions without a classification are skipped. Each
/// team's contributions are summed in ascending order, so totals are bit for bit
/// the same whatever order the sessions are passed in, fractional points included.
pub fn aggregate(sessions: &[Option<Arc<Session>>]) -> TeamPoints {
    let mut contributions: Vec<(String, Vec<f64>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for session in sessions.iter().flatten() {
        if session.results.is_empty() {
            continue;
        }
        for result in &session.results {
            match index.get(&result.team_name) {
                Some(&i) => contributions[i].1.push(result.points),
                None => {
                    index.insert(result.team_name.clone(), contributions.len());
                    contributions.push((result.team_name.clone(), vec![result.points]));
                }
            }
        }
    }

    let totals = contributions
        .into_iter()
        .map(|(team, points)| TeamTotal {
            team,
            points: points.into_iter().sorted_by(f64::total_cmp).sum(),
        })
        .collect();
    TeamPoints { totals }
}
