use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::discovery::CaseEntry;

/// `min(count, total)` cases, reproducibly sampled when `seed` is given
/// (spec §4.9). `count == 0` or `count >= total` returns every case, in
/// discovery order.
pub fn select_cases(cases: Vec<CaseEntry>, count: usize, seed: Option<u64>) -> Vec<CaseEntry> {
    if count == 0 || count >= cases.len() {
        return cases;
    }

    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut pool = cases;
    let (chosen, _) = pool.partial_shuffle(&mut rng, count);
    chosen.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cases(n: usize) -> Vec<CaseEntry> {
        (0..n)
            .map(|i| CaseEntry {
                name: format!("case_{i}"),
                plan_path: PathBuf::from(format!("case_{i}.json")),
            })
            .collect()
    }

    #[test]
    fn same_seed_yields_same_sample() {
        let a = select_cases(cases(10), 3, Some(42));
        let b = select_cases(cases(10), 3, Some(42));
        let names_a: Vec<_> = a.iter().map(|c| c.name.clone()).collect();
        let names_b: Vec<_> = b.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(names_a.len(), 3);
    }

    #[test]
    fn count_at_or_above_total_returns_everything() {
        let selected = select_cases(cases(4), 10, None);
        assert_eq!(selected.len(), 4);
    }
}
