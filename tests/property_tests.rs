use concise::ConciseSet;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn build(values: &[u32]) -> ConciseSet {
    values.iter().copied().collect()
}

fn model(values: &[u32]) -> BTreeSet<u32> {
    values.iter().copied().collect()
}

/// Raw words of the serialized form, for encoding-level assertions.
fn decode_words(bytes: &[u8]) -> Vec<u32> {
    bytes[13..]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

proptest! {
    #[test]
    fn test_roundtrip_sorted_dedup(values in prop::collection::vec(0..100_000u32, 0..200)) {
        let set = build(&values);
        let mut expected = values.clone();
        expected.sort_unstable();
        expected.dedup();

        prop_assert_eq!(set.to_vec(), expected.clone());
        prop_assert_eq!(set.len(), expected.len());
        prop_assert_eq!(set.first(), expected.first().copied());
        prop_assert_eq!(set.last(), expected.last().copied());
        for &e in &expected {
            prop_assert!(set.contains(e));
        }
    }

    #[test]
    fn test_point_mutation_matches_model(
        initial in prop::collection::vec(0..2_000u32, 0..100),
        ops in prop::collection::vec((0..3u8, 0..2_000u32), 0..100),
    ) {
        let mut set = build(&initial);
        let mut reference: BTreeSet<u32> = model(&initial);
        for &(kind, e) in &ops {
            match kind {
                0 => prop_assert_eq!(set.add(e).unwrap(), reference.insert(e)),
                1 => prop_assert_eq!(set.remove(e), reference.remove(&e)),
                _ => {
                    set.flip(e).unwrap();
                    if !reference.remove(&e) {
                        reference.insert(e);
                    }
                }
            }
            prop_assert_eq!(set.len(), reference.len());
            prop_assert_eq!(set.last(), reference.last().copied());
        }
        prop_assert_eq!(set.to_vec(), reference.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_algebra_matches_model(
        a in prop::collection::vec(0..5_000u32, 0..150),
        b in prop::collection::vec(0..5_000u32, 0..150),
        c in prop::collection::vec(0..5_000u32, 0..150),
    ) {
        let (sa, sb, sc) = (build(&a), build(&b), build(&c));
        let (ma, mb) = (model(&a), model(&b));

        prop_assert_eq!(
            sa.union(&sb).to_vec(),
            ma.union(&mb).copied().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            sa.intersection(&sb).to_vec(),
            ma.intersection(&mb).copied().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            sa.difference(&sb).to_vec(),
            ma.difference(&mb).copied().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            sa.symmetric_difference(&sb).to_vec(),
            ma.symmetric_difference(&mb).copied().collect::<Vec<_>>()
        );

        // Structural laws.
        prop_assert_eq!(sa.union(&sb), sb.union(&sa));
        prop_assert_eq!(sa.union(&sb).union(&sc), sa.union(&sb.union(&sc)));
        prop_assert_eq!(
            sa.intersection(&sb.union(&sc)),
            sa.intersection(&sb).union(&sa.intersection(&sc))
        );
        prop_assert_eq!(
            sa.symmetric_difference(&sb),
            sa.union(&sb).difference(&sa.intersection(&sb))
        );
    }

    #[test]
    fn test_size_identities(
        a in prop::collection::vec(0..5_000u32, 0..150),
        b in prop::collection::vec(0..5_000u32, 0..150),
    ) {
        let (sa, sb) = (build(&a), build(&b));
        prop_assert_eq!(sa.intersection_size(&sb), sa.intersection(&sb).len());
        prop_assert_eq!(sa.union_size(&sb), sa.union(&sb).len());
        prop_assert_eq!(sa.difference_size(&sb), sa.difference(&sb).len());
        prop_assert_eq!(
            sa.symmetric_difference_size(&sb),
            sa.symmetric_difference(&sb).len()
        );
        prop_assert_eq!(
            sa.complement_size(),
            sa.last().map_or(0, |l| l as usize + 1 - sa.len())
        );
    }

    #[test]
    fn test_positional_queries(values in prop::collection::vec(0..50_000u32, 0..150)) {
        let set = build(&values);
        for i in 0..set.len() {
            let e = set.get(i).unwrap();
            prop_assert_eq!(set.index_of(e), Some(i));
        }
        prop_assert!(set.get(set.len()).is_err());
        for e in &set {
            prop_assert_eq!(set.get(set.index_of(e).unwrap()).unwrap(), e);
        }
    }

    #[test]
    fn test_complement_matches_model(values in prop::collection::vec(0..3_000u32, 1..100)) {
        let set = build(&values);
        let reference = model(&values);
        let max = *reference.iter().next_back().unwrap();

        let complement = set.complemented();
        let expected: Vec<u32> = (0..=max).filter(|e| !reference.contains(e)).collect();
        prop_assert_eq!(complement.to_vec(), expected);

        // Applying it again complements over the *new* maximum.
        if let Some(new_max) = complement.last() {
            let twice: Vec<u32> = (0..=new_max)
                .filter(|e| reference.contains(e))
                .collect();
            prop_assert_eq!(complement.complemented().to_vec(), twice);
        }
    }

    #[test]
    fn test_iteration_and_skip(
        values in prop::collection::vec(0..6_000u32, 0..150),
        probe in 0..7_000u32,
    ) {
        let set = build(&values);
        let reference = model(&values);
        let sorted: Vec<u32> = reference.iter().copied().collect();

        prop_assert_eq!(set.iter().collect::<Vec<_>>(), sorted.clone());
        prop_assert_eq!(
            set.reverse_iter().collect::<Vec<_>>(),
            sorted.iter().rev().copied().collect::<Vec<_>>()
        );

        let mut it = set.iter();
        it.skip_all_before(probe);
        prop_assert_eq!(it.next(), reference.range(probe..).next().copied());

        let mut rit = set.reverse_iter();
        rit.skip_all_before(probe);
        prop_assert_eq!(rit.next(), reference.range(..=probe).next_back().copied());
    }

    #[test]
    fn test_containment_matches_model(
        a in prop::collection::vec(0..4_000u32, 0..120),
        b in prop::collection::vec(0..4_000u32, 0..120),
        threshold in 1..10usize,
    ) {
        let (sa, sb) = (build(&a), build(&b));
        let (ma, mb) = (model(&a), model(&b));
        prop_assert_eq!(sa.contains_all(&sb), mb.is_subset(&ma));
        prop_assert_eq!(
            sa.contains_any(&sb),
            mb.is_empty() || !ma.is_disjoint(&mb)
        );
        prop_assert_eq!(
            sa.contains_at_least(&sb, threshold).unwrap(),
            ma.intersection(&mb).count() >= threshold
        );
    }

    #[test]
    fn test_bulk_mutation_matches_model(
        a in prop::collection::vec(0..4_000u32, 0..120),
        b in prop::collection::vec(0..4_000u32, 0..120),
    ) {
        let sb = build(&b);
        let (ma, mb) = (model(&a), model(&b));

        let mut added = build(&a);
        added.add_all(&sb);
        prop_assert_eq!(added.to_vec(), ma.union(&mb).copied().collect::<Vec<_>>());

        let mut removed = build(&a);
        removed.remove_all(&sb);
        prop_assert_eq!(removed.to_vec(), ma.difference(&mb).copied().collect::<Vec<_>>());

        let mut retained = build(&a);
        retained.retain_all(&sb);
        prop_assert_eq!(
            retained.to_vec(),
            ma.intersection(&mb).copied().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_range_fill_clear_matches_model(
        ranges in prop::collection::vec((0..40_000u32, 0..200u32), 0..16),
        clears in prop::collection::vec((0..40_000u32, 0..200u32), 0..8),
    ) {
        let mut set = ConciseSet::new();
        let mut reference = BTreeSet::new();
        for &(start, len) in &ranges {
            set.fill_range(start, start + len).unwrap();
            reference.extend(start..=start + len);
        }
        for &(start, len) in &clears {
            set.clear_range(start, start + len).unwrap();
            for e in start..=start + len {
                reference.remove(&e);
            }
        }
        prop_assert_eq!(set.to_vec(), reference.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_canonical_form_is_construction_independent(
        values in prop::collection::vec(0..8_000u32, 0..120),
    ) {
        // The same element set must produce the same words no matter how
        // it was built.
        let collected = build(&values);
        let mut incremental = ConciseSet::new();
        for &e in values.iter().rev() {
            incremental.add(e).unwrap();
        }
        prop_assert_eq!(&collected, &incremental);
        prop_assert_eq!(collected.to_bytes(), incremental.to_bytes());
    }

    #[test]
    fn test_bytes_roundtrip(values in prop::collection::vec(0..50_000u32, 0..150)) {
        let set = build(&values);
        let back = ConciseSet::from_bytes(&set.to_bytes()).unwrap();
        prop_assert_eq!(&back, &set);
        prop_assert_eq!(back.len(), set.len());
        prop_assert_eq!(back.last(), set.last());
    }

    #[test]
    fn test_wah_equivalence(
        a in prop::collection::vec(0..5_000u32, 0..120),
        b in prop::collection::vec(0..5_000u32, 0..120),
    ) {
        let (ca, cb) = (build(&a), build(&b));
        let mut wa = ConciseSet::new_wah();
        let mut wb = ConciseSet::new_wah();
        for &e in &a {
            wa.add(e).unwrap();
        }
        for &e in &b {
            wb.add(e).unwrap();
        }

        prop_assert_eq!(ca.to_vec(), wa.to_vec());
        prop_assert_eq!(ca.union(&cb).to_vec(), wa.union(&wb).to_vec());
        prop_assert_eq!(ca.intersection(&cb).to_vec(), wa.intersection(&wb).to_vec());
        prop_assert_eq!(ca.difference(&cb).to_vec(), wa.difference(&wb).to_vec());
        prop_assert_eq!(
            ca.symmetric_difference(&cb).to_vec(),
            wa.symmetric_difference(&wb).to_vec()
        );

        // WAH words never carry a flip position.
        for w in decode_words(&wa.to_bytes()) {
            if w & 0x8000_0000 == 0 {
                prop_assert_eq!((w >> 25) & 0x1F, 0);
            }
        }
    }
}
