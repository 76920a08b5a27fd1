use crate::model::TimeWindow;
use chrono::Duration;

/// Vrai si les deux créneaux se chevauchent ou si le repos entre eux est
/// inférieur à `min_rest_minutes`.
pub(crate) fn rest_conflict(a: &TimeWindow, b: &TimeWindow, min_rest_minutes: i64) -> bool {
    if a.overlaps(b) {
        return true;
    }
    let rest = Duration::minutes(min_rest_minutes);
    let (first, second) = if a.start <= b.start { (a, b) } else { (b, a) };
    second.start < first.end + rest
}

/// Fusionne les fenêtres contiguës ou chevauchantes (entrée quelconque).
pub(crate) fn merge_windows(windows: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut sorted: Vec<TimeWindow> = windows.to_vec();
    sorted.sort();
    let mut out: Vec<TimeWindow> = Vec::with_capacity(sorted.len());
    for w in sorted {
        match out.last_mut() {
            Some(last) if w.start <= last.end => last.end = last.end.max(w.end),
            _ => out.push(w),
        }
    }
    out
}

/// Une fenêtre fusionnée doit couvrir entièrement `window`.
pub(crate) fn covered_by(merged: &[TimeWindow], window: &TimeWindow) -> bool {
    merged.iter().any(|w| w.contains(window))
}

/// Partition en cliques du graphe de conflit (chevauchement ou repos
/// insuffisant) : balayage par début sur les intervalles étendus
/// `[start, end + rest)`. Une garde rejoint le bloc courant tant qu'elle
/// commence avant la plus petite fin étendue du bloc, tous les membres d'un
/// bloc se gênent donc deux à deux. Les conflits entre blocs voisins restent
/// possibles et sont traités après résolution.
/// `windows` est indexé par l'appelant ; renvoie des groupes d'indices.
pub(crate) fn conflict_cliques(windows: &[TimeWindow], min_rest_minutes: i64) -> Vec<Vec<usize>> {
    let rest = Duration::minutes(min_rest_minutes.max(0));
    let mut order: Vec<usize> = (0..windows.len()).collect();
    order.sort_by_key(|&i| (windows[i].start, windows[i].end, i));

    let mut cliques: Vec<Vec<usize>> = Vec::new();
    let mut limit = None;
    for i in order {
        let w = &windows[i];
        match (limit, cliques.last_mut()) {
            (Some(shared), Some(current)) if w.start < shared => {
                current.push(i);
                limit = Some(shared.min(w.end + rest));
            }
            _ => {
                cliques.push(vec![i]);
                limit = Some(w.end + rest);
            }
        }
    }
    for c in cliques.iter_mut() {
        c.sort_unstable();
    }
    cliques
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window(day: u32, from: u32, hours: i64) -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2025, 10, day, from, 0, 0).unwrap();
        TimeWindow::new(start, start + Duration::hours(hours)).unwrap()
    }

    #[test]
    fn day_night_day_chain_splits_into_two_cliques() {
        // jour 08-20, nuit 20-08, jour 08-20, repos 11 h
        let windows = [window(1, 8, 12), window(1, 20, 12), window(2, 8, 12)];
        let cliques = conflict_cliques(&windows, 11 * 60);
        assert_eq!(cliques, vec![vec![0, 1], vec![2]]);
        assert!(rest_conflict(&windows[1], &windows[2], 11 * 60));
        assert!(!rest_conflict(&windows[0], &windows[2], 11 * 60));
    }

    #[test]
    fn every_clique_is_pairwise_conflicting() {
        let windows: Vec<TimeWindow> = (1..=10)
            .flat_map(|d| [window(d, 8, 12), window(d, 20, 12)])
            .collect();
        for clique in conflict_cliques(&windows, 11 * 60) {
            for (k, &a) in clique.iter().enumerate() {
                for &b in &clique[k + 1..] {
                    assert!(rest_conflict(&windows[a], &windows[b], 11 * 60));
                }
            }
        }
    }

    #[test]
    fn merge_joins_touching_windows() {
        let merged = merge_windows(&[window(2, 0, 24), window(1, 0, 24), window(5, 0, 24)]);
        assert_eq!(merged.len(), 2);
        assert!(covered_by(&merged, &window(1, 20, 12)));
        assert!(!covered_by(&merged, &window(2, 20, 12)));
    }
}
