//! Aggregate counts behind the dashboard's overview screen.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Constable, Duty, Station};
use crate::status::DutyStatus;

const UNASSIGNED: &str = "(unassigned)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total_stations: usize,
    pub total_constables: usize,
    pub total_duties: usize,
    pub duties_by_status: BTreeMap<DutyStatus, usize>,
    pub duties_by_station: BTreeMap<String, usize>,
    pub constables_by_station: BTreeMap<String, usize>,
    pub constables_by_rank: BTreeMap<String, usize>,
}

impl Overview {
    pub fn compute(
        stations: &[Station],
        constables: &[Constable],
        duties: &[Duty],
        today: NaiveDate,
    ) -> Self {
        let mut duties_by_status: BTreeMap<DutyStatus, usize> =
            DutyStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut duties_by_station = BTreeMap::new();
        for duty in duties {
            *duties_by_status.entry(duty.display_status(today)).or_default() += 1;
            *duties_by_station
                .entry(bucket(&duty.police_station))
                .or_default() += 1;
        }

        // Every known station shows up, even with no constables.
        let mut constables_by_station: BTreeMap<String, usize> = stations
            .iter()
            .filter_map(|s| s.name.clone())
            .map(|name| (name, 0))
            .collect();
        let mut constables_by_rank = BTreeMap::new();
        for constable in constables {
            *constables_by_station
                .entry(bucket(&constable.police_station))
                .or_default() += 1;
            *constables_by_rank.entry(bucket(&constable.rank)).or_default() += 1;
        }

        Self {
            total_stations: stations.len(),
            total_constables: constables.len(),
            total_duties: duties.len(),
            duties_by_status,
            duties_by_station,
            constables_by_station,
            constables_by_rank,
        }
    }

    pub fn status_count(&self, status: DutyStatus) -> usize {
        self.duties_by_status.get(&status).copied().unwrap_or(0)
    }
}

fn bucket(value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNASSIGNED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_station_and_status() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let stations = vec![
            Station::new("Central Station", "Ward 1"),
            Station::new("North Station", "Ward 9"),
        ];
        let constables = vec![
            Constable::new("A", "B-1", "Central Station").with_rank("Constable"),
            Constable::new("B", "B-2", "Central Station"),
        ];
        let duties = vec![
            Duty::new("B-1", "Central Station").on("2024-06-01"),
            Duty::new("B-2", "Central Station").between("2024-06-09", "2024-06-12"),
            Duty::new("B-2", "").on("2024-06-30"),
        ];

        let overview = Overview::compute(&stations, &constables, &duties, today);
        assert_eq!(overview.total_duties, 3);
        assert_eq!(overview.status_count(DutyStatus::Completed), 1);
        assert_eq!(overview.status_count(DutyStatus::InProgress), 1);
        assert_eq!(overview.status_count(DutyStatus::Pending), 1);
        assert_eq!(overview.duties_by_station["Central Station"], 2);
        assert_eq!(overview.duties_by_station[UNASSIGNED], 1);
        assert_eq!(overview.constables_by_station["North Station"], 0);
        assert_eq!(overview.constables_by_station["Central Station"], 2);
        assert_eq!(overview.constables_by_rank[UNASSIGNED], 1);
    }

    #[test]
    fn serializes_status_labels() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let overview = Overview::compute(&[], &[], &[], today);
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["duties_by_status"]["In Progress"], 0);
    }
}
