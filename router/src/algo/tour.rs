pub trait Distances {
    fn len(&self) -> usize;
    fn get(&self, a: usize, b: usize) -> u64;
}

pub fn tour_cost<D: Distances + ?Sized>(d: &D, tour: &[usize]) -> u64 {
    if tour.is_empty() {
        return 0;
    }
    let mut cost = d.get(0, tour[0]);
    for w in tour.windows(2) {
        cost += d.get(w[0], w[1]);
    }
    cost + d.get(tour[tour.len() - 1], 0)
}

pub fn nearest_neighbor<D: Distances + ?Sized>(d: &D) -> Vec<usize> {
    let n = d.len();
    if n <= 1 {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    visited[0] = true;
    let mut tour = Vec::with_capacity(n - 1);
    let mut current = 0;

    for _ in 1..n {
        let mut best: Option<(usize, u64)> = None;
        for (j, seen) in visited.iter().enumerate() {
            if *seen {
                continue;
            }
            let dist = d.get(current, j);
            if best.is_none_or(|(_, bd)| dist < bd) {
                best = Some((j, dist));
            }
        }
        let Some((next, _)) = best else { break };
        visited[next] = true;
        tour.push(next);
        current = next;
    }
    tour
}

// Only strictly improving reversals are applied, so the cost never rises.
pub fn two_opt<D: Distances + ?Sized>(d: &D, tour: &mut [usize], max_passes: usize) -> usize {
    let m = tour.len();
    if m < 2 {
        return 0;
    }

    // Position p in the closed sequence [0, tour..., 0].
    let at = |tour: &[usize], p: usize| -> usize {
        if p == 0 || p == m + 1 { 0 } else { tour[p - 1] }
    };

    let mut applied = 0;
    for pass in 0..max_passes {
        let mut improved = false;
        for i in 1..m {
            for k in (i + 1)..=m {
                let a = at(tour, i - 1);
                let b = at(tour, i);
                let c = at(tour, k);
                let e = at(tour, k + 1);
                let before = d.get(a, b) + d.get(c, e);
                let after = d.get(a, c) + d.get(b, e);
                if after < before {
                    tour[i - 1..k].reverse();
                    improved = true;
                    applied += 1;
                }
            }
        }
        if !improved {
            log::trace!("2-opt converged after {} passes", pass + 1);
            break;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Matrix(Vec<Vec<u64>>);

    impl Distances for Matrix {
        fn len(&self) -> usize {
            self.0.len()
        }
        fn get(&self, a: usize, b: usize) -> u64 {
            self.0[a][b]
        }
    }

    fn line(xs: &[i64]) -> Matrix {
        Matrix(
            xs.iter()
                .map(|a| xs.iter().map(|b| (a - b).unsigned_abs()).collect())
                .collect(),
        )
    }

    #[test]
    fn nearest_neighbor_walks_outward() {
        let d = line(&[0, 5, 1, 3]);
        assert_eq!(nearest_neighbor(&d), vec![2, 3, 1]);
        assert_eq!(tour_cost(&d, &[2, 3, 1]), 10);
    }

    #[test]
    fn empty_and_single_node() {
        let d = line(&[0]);
        assert!(nearest_neighbor(&d).is_empty());
        assert_eq!(tour_cost(&d, &[]), 0);

        let d = line(&[0, 4]);
        let mut tour = nearest_neighbor(&d);
        assert_eq!(tour, vec![1]);
        assert_eq!(two_opt(&d, &mut tour, 10), 0);
    }

    #[test]
    fn two_opt_untangles_crossing() {
        // Unit square plus one point to the right; order 1,2,3,4 zig-zags
        // across the square.
        let pts = [(0i64, 0i64), (0, 1), (1, 0), (1, 1), (2, 0)];
        let d = Matrix(
            pts.iter()
                .map(|a| {
                    pts.iter()
                        .map(|b| ((a.0 - b.0).abs() + (a.1 - b.1).abs()) as u64)
                        .collect()
                })
                .collect(),
        );
        let mut tour = vec![1, 2, 3, 4];
        let before = tour_cost(&d, &tour);
        let moves = two_opt(&d, &mut tour, 50);
        let after = tour_cost(&d, &tour);
        assert!(moves > 0);
        assert!(after < before);
        assert_eq!(after, 6);
    }

    #[test]
    fn zero_passes_leaves_tour_alone() {
        let d = line(&[0, 9, 1, 8, 2]);
        let mut tour = vec![1, 2, 3, 4];
        assert_eq!(two_opt(&d, &mut tour, 0), 0);
        assert_eq!(tour, vec![1, 2, 3, 4]);
    }
}
