#![no_main]
use concise::ConciseSet;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

fuzz_target!(|data: (Vec<u16>, Vec<u16>)| {
    let (a_raw, b_raw) = data;
    let a_values: Vec<u32> = a_raw.iter().map(|&v| u32::from(v)).collect();
    let b_values: Vec<u32> = b_raw.iter().map(|&v| u32::from(v)).collect();

    let sa: ConciseSet = a_values.iter().copied().collect();
    let sb: ConciseSet = b_values.iter().copied().collect();
    let ma: BTreeSet<u32> = a_values.iter().copied().collect();
    let mb: BTreeSet<u32> = b_values.iter().copied().collect();

    assert_eq!(sa.to_vec(), ma.iter().copied().collect::<Vec<_>>());
    assert_eq!(sa.len(), ma.len());

    assert_eq!(
        sa.union(&sb).to_vec(),
        ma.union(&mb).copied().collect::<Vec<_>>()
    );
    assert_eq!(
        sa.intersection(&sb).to_vec(),
        ma.intersection(&mb).copied().collect::<Vec<_>>()
    );
    assert_eq!(
        sa.difference(&sb).to_vec(),
        ma.difference(&mb).copied().collect::<Vec<_>>()
    );
    assert_eq!(
        sa.symmetric_difference(&sb).to_vec(),
        ma.symmetric_difference(&mb).copied().collect::<Vec<_>>()
    );

    assert_eq!(sa.intersection_size(&sb), ma.intersection(&mb).count());
    assert_eq!(sa.contains_all(&sb), mb.is_subset(&ma));

    for (i, e) in sa.iter().enumerate() {
        assert_eq!(sa.get(i).unwrap(), e);
        assert_eq!(sa.index_of(e), Some(i));
    }

    let back = ConciseSet::from_bytes(&sa.to_bytes()).unwrap();
    assert_eq!(back, sa);
});
