use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Above this many distinct names, participants are relabelled by rank.
pub const MAX_NAMED_PARTICIPANTS: usize = 100;

pub const FULL_TURN: f64 = 360.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub name: String,
    pub weight: f64,
}

/// Half-open angular range `[start, end)` owned by one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sector {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

impl Sector {
    pub fn contains(&self, angle: f64) -> bool {
        self.start <= angle && angle < self.end
    }

    pub fn size(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("participant list is empty")]
    Empty,
    #[error("participant {name} has an invalid weight")]
    InvalidWeight { name: String },
    #[error("total participant weight is zero")]
    ZeroTotalWeight,
}

/// Weight parsing used by participant sources: anything unparsable counts as 1.
pub fn parse_weight(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(w) if w.is_finite() => w,
        _ => 1.0,
    }
}

/// Immutable wheel layout built once at startup.
#[derive(Debug, Clone)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
    sectors: Vec<Sector>,
    total_weight: f64,
}

impl ParticipantRegistry {
    pub fn new<I, S>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        // BTreeMap gives us duplicate aggregation and name ordering in one pass.
        let mut by_name: BTreeMap<String, f64> = BTreeMap::new();
        for (name, weight) in entries {
            let name = name.into();
            if !weight.is_finite() || weight < 0.0 {
                return Err(RegistryError::InvalidWeight { name });
            }
            *by_name.entry(name).or_insert(0.0) += weight;
        }

        if by_name.is_empty() {
            return Err(RegistryError::Empty);
        }

        let anonymize = by_name.len() > MAX_NAMED_PARTICIPANTS;
        let participants: Vec<Participant> = by_name
            .into_iter()
            .enumerate()
            .map(|(rank, (name, weight))| Participant {
                name: if anonymize { (rank + 1).to_string() } else { name },
                weight,
            })
            .collect();

        let total_weight: f64 = participants.iter().map(|p| p.weight).sum();
        if total_weight <= 0.0 {
            return Err(RegistryError::ZeroTotalWeight);
        }

        let sectors = build_sectors(&participants, total_weight);
        Ok(Self {
            participants,
            sectors,
            total_weight,
        })
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

fn build_sectors(participants: &[Participant], total_weight: f64) -> Vec<Sector> {
    let mut sectors = Vec::with_capacity(participants.len());
    let mut cursor = 0.0;
    for participant in participants {
        let end = cursor + participant.weight / total_weight * FULL_TURN;
        sectors.push(Sector {
            name: participant.name.clone(),
            start: cursor,
            end,
        });
        cursor = end;
    }
    // Pin the last edge so float drift never leaves a sliver uncovered.
    if let Some(last) = sectors.last_mut() {
        last.end = FULL_TURN;
    }
    sectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sectors_are_proportional_and_name_sorted() {
        let registry = ParticipantRegistry::new(vec![("B", 3.0), ("A", 1.0)]).unwrap();
        let sectors = registry.sectors();

        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].name, "A");
        assert_eq!(sectors[0].start, 0.0);
        assert_eq!(sectors[0].end, 90.0);
        assert_eq!(sectors[1].name, "B");
        assert_eq!(sectors[1].start, 90.0);
        assert_eq!(sectors[1].end, 360.0);
        assert_eq!(registry.total_weight(), 4.0);
    }

    #[test]
    fn duplicate_names_are_summed() {
        let registry =
            ParticipantRegistry::new(vec![("kim", 2.0), ("lee", 1.0), ("kim", 1.0)]).unwrap();

        assert_eq!(
            registry.participants(),
            &[
                Participant {
                    name: "kim".into(),
                    weight: 3.0
                },
                Participant {
                    name: "lee".into(),
                    weight: 1.0
                },
            ]
        );
        assert_eq!(registry.sectors()[0].end, 270.0);
    }

    #[test]
    fn sectors_partition_the_circle() {
        let entries: Vec<(String, f64)> = (0..37)
            .map(|i| (format!("p{i:02}"), (i % 5 + 1) as f64 * 0.7))
            .collect();
        let registry = ParticipantRegistry::new(entries).unwrap();
        let sectors = registry.sectors();

        assert_eq!(sectors.first().unwrap().start, 0.0);
        assert_eq!(sectors.last().unwrap().end, FULL_TURN);
        for pair in sectors.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].size() > 0.0);
        }
    }

    #[test]
    fn large_lists_are_relabelled_by_rank() {
        let entries: Vec<(String, f64)> = (0..101).map(|i| (format!("user{i:03}"), 1.0)).collect();
        let registry = ParticipantRegistry::new(entries).unwrap();
        let names: Vec<&str> = registry
            .participants()
            .iter()
            .map(|p| p.name.as_str())
            .collect();

        assert_eq!(names[0], "1");
        assert_eq!(names[9], "10");
        assert_eq!(names[100], "101");
        // order follows the original names, not the new labels
        assert_eq!(registry.sectors()[1].name, "2");
        assert_eq!(registry.sectors()[100].end, FULL_TURN);
    }

    #[test]
    fn exactly_one_hundred_names_are_kept() {
        let entries: Vec<(String, f64)> = (0..100).map(|i| (format!("user{i:03}"), 1.0)).collect();
        let registry = ParticipantRegistry::new(entries).unwrap();
        assert_eq!(registry.participants()[0].name, "user000");
    }

    #[test]
    fn rejects_empty_and_zero_weight_lists() {
        let empty: Vec<(&str, f64)> = Vec::new();
        assert_eq!(
            ParticipantRegistry::new(empty).unwrap_err(),
            RegistryError::Empty
        );
        assert_eq!(
            ParticipantRegistry::new(vec![("a", 0.0), ("b", 0.0)]).unwrap_err(),
            RegistryError::ZeroTotalWeight
        );
        assert_eq!(
            ParticipantRegistry::new(vec![("a", -1.0)]).unwrap_err(),
            RegistryError::InvalidWeight { name: "a".into() }
        );
    }

    #[test]
    fn unparsable_weights_default_to_one() {
        assert_eq!(parse_weight("3"), 3.0);
        assert_eq!(parse_weight(" 2.5 "), 2.5);
        assert_eq!(parse_weight("many"), 1.0);
        assert_eq!(parse_weight("NaN"), 1.0);
    }
}
