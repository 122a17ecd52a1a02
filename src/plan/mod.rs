//! Course planner: score every scraped course and pick the best set that
//! satisfies one specialization's requirements.

pub mod catalog;
pub mod score;

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::record::CourseRecord;
use catalog::Specialization;
use score::Weights;

pub const DEFAULT_PLAN_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub course: &'a CourseRecord,
    pub codes: Vec<String>,
    pub interest: u8,
    pub score: f64,
}

impl Candidate<'_> {
    fn in_group(&self, group: &[&str]) -> bool {
        self.codes.iter().any(|c| group.contains(&c.as_str()))
    }
}

#[derive(Debug)]
pub struct Plan<'a> {
    pub specialization: &'static str,
    /// Highest score first.
    pub courses: Vec<&'a Candidate<'a>>,
    pub total: f64,
}

/// Score `records` for planning. Duplicate `codes` keep their first
/// occurrence; courses whose score isn't a finite number are dropped.
/// `interest` overrides a record's interest by course code.
pub fn candidates<'a>(
    records: &'a [CourseRecord],
    weights: &Weights,
    interest: &HashMap<String, u8>,
) -> Vec<Candidate<'a>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(records.len());

    for course in records {
        if !seen.insert(course.codes.trim()) {
            debug!("Skipping duplicate {}", course.codes);
            continue;
        }

        let codes = course.code_list();
        let interest = codes
            .iter()
            .find_map(|c| interest.get(c).copied())
            .unwrap_or(course.interest);
        let score = score::score(course, interest, weights);
        if !score.is_finite() {
            warn!(
                "Leaving out {} ({}): incomplete ratings",
                course.course_name, course.codes
            );
            continue;
        }

        out.push(Candidate {
            course,
            codes,
            interest,
            score,
        });
    }

    out
}

/// Past this many courses that sit in two or more groups, the lowest scoring
/// ones are left out of the search.
const MAX_BRIDGES: usize = 16;

/// Best `size`-course plan for `spec`, or `None` if its requirements can't
/// be met from `candidates`.
///
/// A course counts toward every group one of its codes is in. Courses in a
/// single group (or none) are taken greedily: the top `min` of each group,
/// then the best of whatever is left. That is exact once it is settled which
/// multi-group courses are in the plan, so every subset of those is tried.
pub fn solve<'a>(
    candidates: &'a [Candidate<'a>],
    spec: &Specialization,
    size: usize,
) -> Option<Plan<'a>> {
    let membership: Vec<Vec<usize>> = candidates
        .iter()
        .map(|c| {
            spec.requirements
                .iter()
                .enumerate()
                .filter(|(_, req)| c.in_group(req.codes))
                .map(|(g, _)| g)
                .collect()
        })
        .collect();

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| candidates[b].score.total_cmp(&candidates[a].score));

    let (mut bridges, singles): (Vec<usize>, Vec<usize>) =
        order.iter().partition(|&&i| membership[i].len() > 1);
    if bridges.len() > MAX_BRIDGES {
        for &i in &bridges[MAX_BRIDGES..] {
            warn!(
                "{}: leaving out {} ({}), too many courses span several groups",
                spec.name, candidates[i].course.course_name, candidates[i].course.codes
            );
        }
        bridges.truncate(MAX_BRIDGES);
    }

    let mut best: Option<(f64, Vec<usize>)> = None;
    for mask in 0u32..(1 << bridges.len()) {
        let picked: Vec<usize> = bridges
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, &i)| i)
            .collect();
        if picked.len() > size {
            continue;
        }

        let mut need: Vec<usize> = spec.requirements.iter().map(|r| r.min).collect();
        for &i in &picked {
            for &g in &membership[i] {
                need[g] = need[g].saturating_sub(1);
            }
        }

        let Some(rest) = fill(&singles, &membership, need, size - picked.len()) else {
            continue;
        };
        let chosen: Vec<usize> = picked.into_iter().chain(rest).collect();
        let total: f64 = chosen.iter().map(|&i| candidates[i].score).sum();
        if best.as_ref().map_or(true, |(t, _)| total > *t) {
            best = Some((total, chosen));
        }
    }

    let Some((total, chosen)) = best else {
        debug!("{}: requirements can't be met with {} courses", spec.name, size);
        return None;
    };

    let courses: Vec<&Candidate> = order
        .iter()
        .filter(|&&i| chosen.contains(&i))
        .map(|&i| &candidates[i])
        .collect();

    Some(Plan {
        specialization: spec.name,
        courses,
        total,
    })
}

/// Greedy pick of `slots` courses from `order` (best first, each in at most
/// one group) meeting the remaining per-group `need`.
fn fill(
    order: &[usize],
    membership: &[Vec<usize>],
    mut need: Vec<usize>,
    slots: usize,
) -> Option<Vec<usize>> {
    if need.iter().sum::<usize>() > slots {
        return None;
    }

    let mut chosen = Vec::with_capacity(slots);
    for &i in order {
        if let Some(&g) = membership[i].first() {
            if need[g] > 0 {
                need[g] -= 1;
                chosen.push(i);
            }
        }
    }
    if need.iter().any(|&n| n > 0) {
        return None;
    }

    for &i in order {
        if chosen.len() == slots {
            break;
        }
        if !chosen.contains(&i) {
            chosen.push(i);
        }
    }
    (chosen.len() == slots).then_some(chosen)
}

/// Solve every specialization and keep the highest total. Ties go to the
/// earlier specialization.
pub fn best_plan<'a>(
    candidates: &'a [Candidate<'a>],
    specs: &[Specialization],
    size: usize,
) -> Option<Plan<'a>> {
    let mut best: Option<Plan> = None;
    for spec in specs {
        let Some(plan) = solve(candidates, spec, size) else {
            continue;
        };
        debug!("{}: total {:.2}", plan.specialization, plan.total);
        if best.as_ref().map_or(true, |b| plan.total > b.total) {
            best = Some(plan);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::catalog::{builtin, Requirement};
    use super::*;

    fn rec(code: &str, rating: f64) -> CourseRecord {
        let rating = rating.to_string();
        CourseRecord::from_cells(code, code, [rating.as_str(), "3", "10", "100"])
    }

    fn spec(requirements: Vec<Requirement>) -> Specialization {
        Specialization {
            name: "Test",
            requirements,
        }
    }

    fn picked<'a>(plan: &Plan<'a>) -> Vec<&'a str> {
        plan.courses.iter().map(|c| c.course.codes.as_str()).collect()
    }

    #[test]
    fn requirements_beat_raw_score() {
        let records = vec![
            rec("A-1", 5.0),
            rec("A-2", 4.9),
            rec("A-3", 4.8),
            rec("B-1", 1.0),
            rec("B-2", 2.0),
        ];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());
        let s = spec(vec![Requirement { label: "b", codes: &["B-1", "B-2"], min: 1 }]);

        let plan = solve(&cands, &s, 3).unwrap();
        assert_eq!(picked(&plan), ["A-1", "A-2", "B-2"]);
    }

    #[test]
    fn group_members_can_fill_free_slots() {
        let records = vec![rec("B-1", 5.0), rec("B-2", 4.0), rec("A-1", 1.0)];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());
        let s = spec(vec![Requirement { label: "b", codes: &["B-1", "B-2"], min: 1 }]);

        let plan = solve(&cands, &s, 2).unwrap();
        assert_eq!(picked(&plan), ["B-1", "B-2"]);
    }

    #[test]
    fn infeasible_group() {
        let records = vec![rec("A-1", 5.0), rec("B-1", 4.0), rec("A-2", 3.0)];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());
        let s = spec(vec![Requirement { label: "b", codes: &["B-1", "B-2"], min: 2 }]);
        assert!(solve(&cands, &s, 3).is_none());
    }

    #[test]
    fn too_few_courses() {
        let records = vec![rec("A-1", 5.0), rec("A-2", 4.0)];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());
        assert!(solve(&cands, &spec(Vec::new()), 3).is_none());
    }

    #[test]
    fn picks_better_specialization() {
        let mut records = vec![rec("CS-6515", 3.0)];
        for code in ["CS-6601", "CS-7641", "CS-6750", "CS-7643"] {
            records.push(rec(code, 5.0));
        }
        for code in ["CS-6250", "CS-6210", "CS-6200", "CS-6340", "CS-6035"] {
            records.push(rec(code, 1.0));
        }
        for code in ["XX-1001", "XX-1002", "XX-1003", "XX-1004", "XX-1005"] {
            records.push(rec(code, 4.0));
        }
        let cands = candidates(&records, &Weights::default(), &HashMap::new());

        let plan = best_plan(&cands, &builtin(), 10).unwrap();
        assert_eq!(plan.specialization, "Interactive Intelligence");
        assert_eq!(plan.courses.len(), 10);
        assert!(plan.courses.iter().all(|c| c.course.rating >= 3.0));

        let systems = solve(&cands, &catalog::computing_systems(), 10).unwrap();
        assert!(plan.total > systems.total);
    }

    #[test]
    fn every_requirement_met() {
        let records: Vec<CourseRecord> = [
            "CS-6515", "CS-6210", "CS-6250", "CS-6290", "CS-6035", "CS-6200", "CS-6238",
            "CS-6601", "CS-7641", "CS-6750", "CS-7643", "CS-6460", "CS-6476",
        ]
        .iter()
        .enumerate()
        .map(|(i, code)| rec(code, 1.0 + i as f64 * 0.25))
        .collect();
        let cands = candidates(&records, &Weights::default(), &HashMap::new());

        for spec in builtin() {
            let plan = solve(&cands, &spec, 10).unwrap();
            assert_eq!(plan.courses.len(), 10);
            for req in &spec.requirements {
                let n = plan.courses.iter().filter(|c| c.in_group(req.codes)).count();
                assert!(n >= req.min, "{} {}: {} < {}", spec.name, req.label, n, req.min);
            }
        }
    }

    #[test]
    fn nan_and_duplicates_left_out() {
        let mut bad = rec("CS-1111", 4.0);
        bad.rating = f64::NAN;
        let records = vec![rec("CS-2222", 4.0), bad, rec("CS-2222", 1.0)];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].course.rating, 4.0);
    }

    #[test]
    fn interest_override_applies_by_code() {
        let records = vec![rec("CS-6515", 4.0), rec("CS-6601", 4.0)];
        let interest = HashMap::from([("CS-6601".to_string(), 1)]);
        let cands = candidates(&records, &Weights::default(), &interest);
        assert_eq!(cands[0].interest, 5);
        assert_eq!(cands[1].interest, 1);
        assert!(cands[0].score > cands[1].score);
    }

    fn two_groups() -> Specialization {
        spec(vec![
            Requirement { label: "x", codes: &["XX-1001", "XX-1002"], min: 1 },
            Requirement { label: "y", codes: &["YY-1001", "YY-1002"], min: 1 },
        ])
    }

    #[test]
    fn cross_listed_course_counts_for_both_groups() {
        let records = vec![rec("XX-1001 / YY-1001", 3.0), rec("ZZ-1001", 5.0)];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());

        let plan = solve(&cands, &two_groups(), 2).unwrap();
        assert_eq!(picked(&plan), ["ZZ-1001", "XX-1001 / YY-1001"]);

        let plan = solve(&cands, &two_groups(), 1).unwrap();
        assert_eq!(picked(&plan), ["XX-1001 / YY-1001"]);
    }

    #[test]
    fn cross_listed_course_skipped_when_worse() {
        let records = vec![
            rec("XX-1001 / YY-1001", 1.0),
            rec("XX-1002", 5.0),
            rec("YY-1002", 5.0),
        ];
        let cands = candidates(&records, &Weights::default(), &HashMap::new());

        let plan = solve(&cands, &two_groups(), 2).unwrap();
        assert_eq!(picked(&plan), ["XX-1002", "YY-1002"]);
        let expected: f64 = cands[1].score + cands[2].score;
        assert!((plan.total - expected).abs() < 1e-9);
    }
}
