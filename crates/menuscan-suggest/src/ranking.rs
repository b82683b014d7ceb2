//! Suggestion ordering.
//!
//! Records are ordered by, in precedence:
//!
//! 1. distance group (closer group first),
//! 2. menu data availability (`has_data` first),
//! 3. rating (higher first, missing counts as 0).
//!
//! Groups are built by walking the records nearest first. Each group starts at
//! its nearest member (the leader) and takes every following record within
//! 50 m of that leader. Grouping depends only on the set of distances, so
//! ranking an already ranked list leaves it unchanged. The sort is stable:
//! records equal under all three rules keep their input order.

use std::cmp::Ordering;

use menuscan_core::PlaceRecord;

use crate::error::SuggestError;

/// Two records this close to their group's leader count as equally near.
pub const DISTANCE_TOLERANCE_M: f64 = 50.0;

/// Sorts `records` into suggestion order.
///
/// # Errors
///
/// Returns [`SuggestError::InvalidInput`] if any record has a negative or
/// non-finite distance. Nothing is reordered in that case.
pub fn rank(records: Vec<PlaceRecord>) -> Result<Vec<PlaceRecord>, SuggestError> {
    for record in &records {
        validate(record)?;
    }
    let groups = distance_groups(&records);
    let mut keyed: Vec<(usize, PlaceRecord)> = groups.into_iter().zip(records).collect();
    keyed.sort_by(|(ga, a), (gb, b)| ga.cmp(gb).then_with(|| tie_break(a, b)));
    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

/// Distance group of each record, parallel to `records`. Lower groups are
/// closer. Assumes every distance passed validation.
#[must_use]
pub fn distance_groups(records: &[PlaceRecord]) -> Vec<usize> {
    let mut nearest_first: Vec<usize> = (0..records.len()).collect();
    nearest_first.sort_by(|&a, &b| records[a].distance_m.total_cmp(&records[b].distance_m));

    let mut groups = vec![0; records.len()];
    let mut group = 0;
    let mut leader: Option<f64> = None;
    for index in nearest_first {
        let distance = records[index].distance_m;
        if !leader.is_some_and(|l| distance - l <= DISTANCE_TOLERANCE_M) {
            group += 1;
            leader = Some(distance);
        }
        groups[index] = group;
    }
    groups
}

/// Order between two records in the same distance group.
#[must_use]
pub fn tie_break(a: &PlaceRecord, b: &PlaceRecord) -> Ordering {
    b.has_data
        .cmp(&a.has_data)
        .then_with(|| b.rating_or_zero().total_cmp(&a.rating_or_zero()))
}

fn validate(record: &PlaceRecord) -> Result<(), SuggestError> {
    if !record.distance_m.is_finite() {
        return Err(SuggestError::InvalidInput {
            place_id: record.id.clone(),
            reason: format!("distance is not finite ({})", record.distance_m),
        });
    }
    if record.distance_m < 0.0 {
        return Err(SuggestError::InvalidInput {
            place_id: record.id.clone(),
            reason: format!("distance is negative ({} m)", record.distance_m),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use menuscan_core::Coordinate;

    use super::*;

    fn place(id: &str, distance_m: f64) -> PlaceRecord {
        PlaceRecord::new(id, id.to_uppercase(), Coordinate::new(37.7749, -122.4194), distance_m)
    }

    fn ids(records: &[PlaceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(rank(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn single_record_yields_itself() {
        let only = place("a", 120.0).with_rating(4.0);
        assert_eq!(rank(vec![only.clone()]).unwrap(), vec![only]);
    }

    #[test]
    fn distance_dominates_rating_outside_tolerance() {
        let near = place("near", 40.0).with_rating(3.0);
        let far = place("far", 100.0).with_rating(4.5);
        let ranked = rank(vec![far, near]).unwrap();
        assert_eq!(ids(&ranked), ["near", "far"]);
    }

    #[test]
    fn rating_wins_within_tolerance() {
        let near = place("near", 40.0).with_rating(3.0);
        let far = place("far", 80.0).with_rating(4.5);
        let ranked = rank(vec![near, far]).unwrap();
        assert_eq!(ids(&ranked), ["far", "near"]);
    }

    #[test]
    fn menu_data_wins_inside_group() {
        let closer = place("closer", 40.0);
        let with_data = place("with_data", 70.0).with_menu_data(4);
        let ranked = rank(vec![closer, with_data]).unwrap();
        assert_eq!(ids(&ranked), ["with_data", "closer"]);
    }

    #[test]
    fn rating_breaks_tie_inside_group() {
        let low = place("low", 110.0).with_rating(3.9);
        let high = place("high", 120.0).with_rating(4.7);
        let unrated = place("unrated", 105.0);
        let ranked = rank(vec![unrated, low, high]).unwrap();
        assert_eq!(ids(&ranked), ["high", "low", "unrated"]);
    }

    #[test]
    fn equal_records_keep_input_order() {
        let a = place("a", 200.0).with_rating(4.0);
        let b = place("b", 210.0).with_rating(4.0);
        let c = place("c", 190.0).with_rating(4.0);
        let ranked = rank(vec![a, b, c]).unwrap();
        assert_eq!(ids(&ranked), ["a", "b", "c"]);
    }

    #[test]
    fn scenario_nearby_three_places() {
        let a = place("a", 30.0).with_menu_data(5).with_rating(4.2);
        let b = place("b", 35.0).with_rating(4.8);
        let c = place("c", 500.0).with_menu_data(9).with_rating(5.0);
        let ranked = rank(vec![c, b, a]).unwrap();
        assert_eq!(ids(&ranked), ["a", "b", "c"]);
    }

    #[test]
    fn close_pairs_tie_at_any_distance() {
        for base in [24.0, 74.0, 124.0, 499.0] {
            let plain = place("plain", base);
            let with_data = place("with_data", base + 2.0).with_menu_data(3);
            let ranked = rank(vec![plain, with_data]).unwrap();
            assert_eq!(ids(&ranked), ["with_data", "plain"], "at {base} m");
        }
    }

    #[test]
    fn groups_are_measured_from_their_nearest_member() {
        let a = place("a", 0.0);
        let b = place("b", 40.0);
        let c = place("c", 80.0).with_menu_data(2).with_rating(5.0);
        let d = place("d", 120.0).with_rating(1.0);
        assert_eq!(distance_groups(&[a.clone(), b.clone(), c.clone(), d.clone()]), [1, 1, 2, 2]);

        let ranked = rank(vec![d, c, b, a]).unwrap();
        assert_eq!(ids(&ranked), ["b", "a", "c", "d"]);
    }

    #[test]
    fn ranking_is_idempotent_and_ordered() {
        let records = vec![
            place("a", 310.0).with_rating(2.0),
            place("b", 12.0),
            place("c", 330.0).with_menu_data(1),
            place("d", 90.0).with_rating(4.9),
            place("e", 0.0).with_rating(4.0),
            place("f", 95.0).with_menu_data(0).with_rating(1.0),
            place("g", 12.0).with_rating(3.3),
            place("h", 1_000.0),
        ];
        let once = rank(records).unwrap();
        let twice = rank(once.clone()).unwrap();
        assert_eq!(once, twice);
        for pair in once.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if (a.distance_m - b.distance_m).abs() > 2.0 * DISTANCE_TOLERANCE_M {
                assert!(a.distance_m < b.distance_m, "{} before {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn text_search_records_at_zero_distance_rank_by_data_then_rating() {
        let a = place("a", 0.0).with_rating(4.9);
        let b = place("b", 0.0).with_menu_data(2).with_rating(3.0);
        let ranked = rank(vec![a, b]).unwrap();
        assert_eq!(ids(&ranked), ["b", "a"]);
    }

    #[test]
    fn negative_distance_is_rejected() {
        let err = rank(vec![place("ok", 10.0), place("bad", -1.0)]).unwrap_err();
        assert!(
            matches!(err, SuggestError::InvalidInput { ref place_id, .. } if place_id == "bad"),
            "got {err:?}"
        );
    }

    #[test]
    fn nan_distance_is_rejected() {
        let err = rank(vec![place("nan", f64::NAN)]).unwrap_err();
        assert!(matches!(err, SuggestError::InvalidInput { .. }));
    }
}
