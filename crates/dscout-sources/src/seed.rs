//! Bootstrap district set. Districts are created exactly once, here, with a
//! synthetic id; every later pass only mutates them.

use chrono::Utc;
use dscout_core::{District, Snapshot};

struct SeedRow {
    name: &'static str,
    state: &'static str,
    city: &'static str,
    enrollment: u32,
    kind: &'static str,
    website: &'static str,
}

const SEED_ROWS: &[SeedRow] = &[
    SeedRow { name: "Seattle Public Schools", state: "WA", city: "Seattle", enrollment: 49000, kind: "Urban", website: "https://www.seattleschools.org" },
    SeedRow { name: "Spokane Public Schools", state: "WA", city: "Spokane", enrollment: 28000, kind: "Urban", website: "https://www.spokaneschools.org" },
    SeedRow { name: "Tacoma Public Schools", state: "WA", city: "Tacoma", enrollment: 27000, kind: "Urban", website: "https://www.tacomaschools.org" },
    SeedRow { name: "Kent School District", state: "WA", city: "Kent", enrollment: 25000, kind: "Suburban", website: "https://www.kent.k12.wa.us" },
    SeedRow { name: "Federal Way Public Schools", state: "WA", city: "Federal Way", enrollment: 22000, kind: "Suburban", website: "https://www.fwps.org" },
    SeedRow { name: "Lake Washington School District", state: "WA", city: "Kirkland", enrollment: 32000, kind: "Suburban", website: "https://www.lwsd.org" },
    SeedRow { name: "Northshore School District", state: "WA", city: "Bothell", enrollment: 23000, kind: "Suburban", website: "https://www.nsd.org" },
    SeedRow { name: "Bellevue School District", state: "WA", city: "Bellevue", enrollment: 19000, kind: "Suburban", website: "https://bsd405.org" },
    SeedRow { name: "Los Angeles USD", state: "CA", city: "Los Angeles", enrollment: 420000, kind: "Urban", website: "https://www.lausd.org" },
    SeedRow { name: "San Diego USD", state: "CA", city: "San Diego", enrollment: 97000, kind: "Urban", website: "https://www.sandiegounified.org" },
    SeedRow { name: "Houston ISD", state: "TX", city: "Houston", enrollment: 187000, kind: "Urban", website: "https://www.houstonisd.org" },
    SeedRow { name: "Dallas ISD", state: "TX", city: "Dallas", enrollment: 140000, kind: "Urban", website: "https://www.dallasisd.org" },
    SeedRow { name: "Austin ISD", state: "TX", city: "Austin", enrollment: 72000, kind: "Urban", website: "https://www.austinisd.org" },
    SeedRow { name: "New York City DOE", state: "NY", city: "New York", enrollment: 915000, kind: "Urban", website: "https://www.schools.nyc.gov" },
    SeedRow { name: "Portland Public Schools", state: "OR", city: "Portland", enrollment: 43000, kind: "Urban", website: "https://www.pps.net" },
    SeedRow { name: "Miami-Dade County", state: "FL", city: "Miami", enrollment: 334000, kind: "Urban", website: "https://www.dadeschools.net" },
];

pub fn seed_districts() -> Vec<District> {
    SEED_ROWS
        .iter()
        .map(|row| {
            let mut d = District::new(row.name, row.state);
            d.city = Some(row.city.to_string());
            d.enrollment = Some(row.enrollment);
            d.kind = Some(row.kind.to_string());
            d.website = Some(row.website.to_string());
            d
        })
        .collect()
}

pub fn seed_snapshot() -> Snapshot {
    let districts = seed_districts();
    let mut states: Vec<String> = districts.iter().map(|d| d.state.clone()).collect();
    states.sort();
    states.dedup();

    let mut snapshot = Snapshot {
        districts,
        ..Snapshot::default()
    };
    snapshot.meta.updated = Some(Utc::now());
    snapshot.meta.sources = vec!["USASpending.gov".into(), "NCES".into()];
    snapshot.meta.states = states;
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_assigns_unique_ids() {
        let districts = seed_districts();
        let mut ids: Vec<_> = districts.iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), districts.len());
    }

    #[test]
    fn seed_snapshot_stamps_meta() {
        let snapshot = seed_snapshot();
        assert!(snapshot.meta.updated.is_some());
        assert!(snapshot.meta.states.contains(&"WA".to_string()));
        assert_eq!(snapshot.districts.len(), 16);
        assert!(snapshot.districts.iter().all(|d| d.contacts.is_empty()));
        assert!(snapshot.districts.iter().all(|d| d.website.is_some()));
    }
}
