//! Task urgency scoring engine.
//!
//! Urgency is an integer in `[1, 10]` built from four additive sub-scores:
//!
//! | Sub-score          | Range | Source                                          |
//! |--------------------|-------|-------------------------------------------------|
//! | Base               | 1–3   | user-assigned priority, verbatim                |
//! | Deadline pressure  | 0–4   | task deadline, falling back to the goal's       |
//! | Goal lag           | 0–2   | goal completion ratio, only under pressure      |
//! | Staleness          | 0–1   | idle time relative to time left before deadline |
//!
//! The sum is clamped into `[1, 10]`. Scoring has no error cases and no side
//! effects; the only ambient input is the wall clock, which the `*_at`
//! variants take explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

use crate::goal::{Goal, GoalProgress};
use crate::task::Task;

pub const MIN_URGENCY: u8 = 1;
pub const MAX_URGENCY: u8 = 10;

const MAX_DEADLINE_PRESSURE: u8 = 4;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Per-component view of one urgency computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyBreakdown {
    pub base: i64,
    pub deadline_pressure: u8,
    pub goal_lag: u8,
    pub staleness: u8,
    /// Clamped total
    pub score: u8,
}

/// Urgency of `task` right now.
pub fn score(task: &Task, goal: &Goal, total_tasks: u32, completed_tasks: u32) -> u8 {
    breakdown_at(
        task,
        goal,
        GoalProgress::new(total_tasks, completed_tasks),
        Utc::now(),
    )
    .score
}

/// Full breakdown of the urgency of `task` as of `now`.
pub fn breakdown_at(
    task: &Task,
    goal: &Goal,
    progress: GoalProgress,
    now: DateTime<Utc>,
) -> UrgencyBreakdown {
    let base = task.user_priority;
    let deadline_pressure = deadline_pressure(task, goal, now);
    let goal_lag = goal_lag(progress, deadline_pressure);
    let staleness = staleness(task, now);

    let total = base.saturating_add(i64::from(deadline_pressure + goal_lag + staleness));
    let score = total.clamp(i64::from(MIN_URGENCY), i64::from(MAX_URGENCY)) as u8;

    UrgencyBreakdown {
        base,
        deadline_pressure,
        goal_lag,
        staleness,
        score,
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MS_PER_DAY
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MS_PER_HOUR
}

/// Deadline pressure (0–4).
///
/// An overdue task always scores the maximum. A task without its own
/// deadline inherits the goal's, measured over the goal's lifetime.
pub fn deadline_pressure(task: &Task, goal: &Goal, now: DateTime<Utc>) -> u8 {
    if let Some(deadline) = task.deadline {
        if deadline < now {
            return MAX_DEADLINE_PRESSURE;
        }
        return window_pressure(task.created_at, deadline, now);
    }

    match goal.deadline {
        Some(deadline) => window_pressure(goal.created_at, deadline, now),
        None => 0,
    }
}

fn window_pressure(start: DateTime<Utc>, deadline: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    let days_left = days_between(now, deadline);
    if days_left <= 1.0 {
        return MAX_DEADLINE_PRESSURE;
    }
    if days_left <= 3.0 {
        return 3;
    }

    let span = hours_between(start, deadline);
    if span <= 0.0 {
        return MAX_DEADLINE_PRESSURE;
    }

    let used = hours_between(start, now) / span;
    if used < 0.25 {
        0
    } else if used < 0.50 {
        1
    } else if used < 0.75 {
        2
    } else if used < 0.90 {
        3
    } else {
        MAX_DEADLINE_PRESSURE
    }
}

/// Goal lag (0–2). Zero whenever there is no deadline pressure.
pub fn goal_lag(progress: GoalProgress, deadline_pressure: u8) -> u8 {
    if deadline_pressure == 0 || progress.total_tasks == 0 {
        return 0;
    }

    let completion = f64::from(progress.completed_tasks) / f64::from(progress.total_tasks);
    if completion >= 0.75 {
        0
    } else if completion >= 0.50 {
        1
    } else {
        2
    }
}

/// Staleness (0–1): the task has sat untouched for at least a quarter of the
/// time between its last update and its deadline.
pub fn staleness(task: &Task, now: DateTime<Utc>) -> u8 {
    let deadline = match task.deadline {
        Some(deadline) if deadline >= now => deadline,
        _ => return 0,
    };

    let idle_days = days_between(task.updated_at, now);
    let days_left = days_between(now, deadline);
    let idle_ratio = idle_days / (idle_days + days_left);

    // NaN (no idle time, deadline == now) compares false and scores 0
    if idle_ratio >= 0.25 {
        1
    } else {
        0
    }
}

/// A task with its computed urgency.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTask {
    #[serde(flatten)]
    pub task: Task,
    pub urgency: u8,
    pub breakdown: UrgencyBreakdown,
}

/// Total and completed task counts per goal.
pub fn goal_progress(tasks: &[Task]) -> HashMap<Uuid, GoalProgress> {
    let mut counts: HashMap<Uuid, GoalProgress> = HashMap::new();
    for task in tasks {
        let entry = counts.entry(task.goal_id).or_default();
        entry.total_tasks += 1;
        if task.is_completed {
            entry.completed_tasks += 1;
        }
    }
    counts
}

/// Scores every task against its goal, most urgent first.
///
/// Goal counts are derived from `tasks`, so pass the user's full task list.
/// Tasks whose goal is not in `goals` are left out.
pub fn score_tasks(goals: &[Goal], tasks: &[Task], now: DateTime<Utc>) -> Vec<ScoredTask> {
    let goals_by_id: HashMap<Uuid, &Goal> = goals.iter().map(|g| (g.id, g)).collect();
    let progress = goal_progress(tasks);

    let mut scored: Vec<ScoredTask> = tasks
        .iter()
        .filter_map(|task| {
            let Some(goal) = goals_by_id.get(&task.goal_id) else {
                tracing::warn!(task_id = %task.id, goal_id = %task.goal_id, "task references unknown goal, not scored");
                return None;
            };
            let counts = progress.get(&task.goal_id).copied().unwrap_or_default();
            let breakdown = breakdown_at(task, goal, counts, now);
            Some(ScoredTask {
                task: task.clone(),
                urgency: breakdown.score,
                breakdown,
            })
        })
        .collect();

    scored.sort_by(compare_scored);
    scored
}

fn compare_scored(a: &ScoredTask, b: &ScoredTask) -> Ordering {
    b.urgency
        .cmp(&a.urgency)
        .then_with(|| match (a.task.deadline, b.task.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.task.title.cmp(&b.task.title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::GoalType;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn goal(created_days_ago: i64, deadline_in_days: Option<i64>) -> Goal {
        let mut g = Goal::new(Uuid::new_v4(), "Goal", GoalType::Deadline);
        g.created_at = now() - Duration::days(created_days_ago);
        g.deadline = deadline_in_days.map(|d| now() + Duration::days(d));
        g
    }

    fn task(
        goal: &Goal,
        priority: i64,
        deadline_in_days: Option<i64>,
        created_days_ago: i64,
        updated_days_ago: i64,
    ) -> Task {
        let mut t = Task::new(goal.user_id, goal.id, "Task", priority);
        t.deadline = deadline_in_days.map(|d| now() + Duration::days(d));
        t.created_at = now() - Duration::days(created_days_ago);
        t.updated_at = now() - Duration::days(updated_days_ago);
        t
    }

    fn breakdown(t: &Task, g: &Goal, total: u32, completed: u32) -> UrgencyBreakdown {
        breakdown_at(t, g, GoalProgress::new(total, completed), now())
    }

    #[test]
    fn low_priority_without_deadlines_is_base_only() {
        let g = goal(7, None);
        let t = task(&g, 1, None, 7, 0);
        let b = breakdown(&t, &g, 10, 1);
        assert_eq!(b.deadline_pressure, 0);
        assert_eq!(b.goal_lag, 0);
        assert_eq!(b.staleness, 0);
        assert_eq!(b.score, 1);
    }

    #[test]
    fn high_priority_due_in_three_days_half_done() {
        let g = goal(30, Some(14));
        let t = task(&g, 3, Some(3), 14, 0);
        let b = breakdown(&t, &g, 8, 4);
        assert_eq!(b.deadline_pressure, 3);
        assert_eq!(b.goal_lag, 1);
        assert_eq!(b.staleness, 0);
        assert_eq!(b.score, 7);
    }

    #[test]
    fn overdue_task_takes_max_pressure_and_no_staleness() {
        let g = goal(60, Some(14));
        let t = task(&g, 2, Some(-2), 30, 10);
        let b = breakdown(&t, &g, 5, 1);
        assert_eq!(b.deadline_pressure, 4);
        assert_eq!(b.goal_lag, 2);
        assert_eq!(b.staleness, 0);
        assert_eq!(b.score, 8);
    }

    #[test]
    fn due_tomorrow_and_stale_saturates() {
        let g = goal(60, Some(7));
        let t = task(&g, 3, Some(1), 30, 14);
        let b = breakdown(&t, &g, 10, 1);
        assert_eq!(b.deadline_pressure, 4);
        assert_eq!(b.goal_lag, 2);
        assert_eq!(b.staleness, 1);
        assert_eq!(b.score, MAX_URGENCY);
    }

    #[test]
    fn plenty_of_time_scores_base() {
        let g = goal(10, Some(90));
        let t = task(&g, 2, Some(60), 5, 0);
        assert_eq!(breakdown(&t, &g, 6, 3).score, 2);
    }

    #[test]
    fn goal_deadline_is_the_fallback() {
        // 10 of 20 days used: second quarter bucket
        let g = goal(10, Some(10));
        let t = task(&g, 1, None, 1, 0);
        assert_eq!(deadline_pressure(&t, &g, now()), 2);

        let overdue_goal = goal(10, Some(-2));
        assert_eq!(deadline_pressure(&t, &overdue_goal, now()), 4);
    }

    #[test]
    fn goal_without_tasks_has_no_lag() {
        let g = goal(5, Some(30));
        let t = task(&g, 2, None, 0, 0);
        let b = breakdown(&t, &g, 0, 0);
        assert_eq!(b.goal_lag, 0);
        assert_eq!(b.score, 2);
    }

    #[test]
    fn percentage_buckets() {
        let g = goal(0, None);
        // 100 day span, deadline 100 days after creation
        let cases = [(10, 0), (30, 1), (60, 2), (80, 3), (95, 4)];
        for (elapsed, expected) in cases {
            let mut t = task(&g, 1, Some(100 - elapsed), elapsed, 0);
            t.updated_at = now();
            assert_eq!(
                deadline_pressure(&t, &g, now()),
                expected,
                "elapsed {elapsed} of 100 days"
            );
        }
    }

    #[test]
    fn day_thresholds_override_percentage() {
        let g = goal(0, None);
        // Created moments ago, so the percentage would be ~0
        let mut t = task(&g, 1, None, 0, 0);
        t.deadline = Some(now() + Duration::hours(20));
        assert_eq!(deadline_pressure(&t, &g, now()), 4);
        t.deadline = Some(now() + Duration::hours(60));
        assert_eq!(deadline_pressure(&t, &g, now()), 3);
    }

    #[test]
    fn non_positive_span_is_max_pressure() {
        let g = goal(0, None);
        let mut t = task(&g, 1, Some(5), 0, 0);
        t.created_at = now() + Duration::days(10);
        assert_eq!(deadline_pressure(&t, &g, now()), 4);
    }

    #[test]
    fn lag_requires_pressure() {
        assert_eq!(goal_lag(GoalProgress::new(10, 0), 0), 0);
        assert_eq!(goal_lag(GoalProgress::new(10, 0), 1), 2);
        assert_eq!(goal_lag(GoalProgress::new(4, 2), 1), 1);
        assert_eq!(goal_lag(GoalProgress::new(4, 3), 1), 0);
    }

    #[test]
    fn staleness_threshold_is_inclusive() {
        let g = goal(30, None);
        // idle 1 day, 3 days left: ratio exactly 0.25
        let t = task(&g, 1, Some(3), 10, 1);
        assert_eq!(staleness(&t, now()), 1);

        let mut fresh = t.clone();
        fresh.updated_at = now() - Duration::hours(21);
        assert_eq!(staleness(&fresh, now()), 0);

        let no_deadline = task(&g, 1, None, 10, 9);
        assert_eq!(staleness(&no_deadline, now()), 0);
    }

    #[test]
    fn worked_example() {
        // priority 2, due in 2 days, created 30 days ago, 1 of 5 tasks done
        let g = goal(60, Some(30));
        let t = task(&g, 2, Some(2), 30, 0);
        let b = breakdown(&t, &g, 5, 1);
        assert_eq!(b.deadline_pressure, 3);
        assert_eq!(b.goal_lag, 2);
        assert_eq!(b.staleness, 0);
        assert_eq!(b.score, 7);

        let stale = task(&g, 2, Some(2), 30, 30);
        assert_eq!(breakdown(&stale, &g, 5, 1).score, 8);
    }

    #[test]
    fn out_of_range_priority_is_clamped() {
        let g = goal(60, None);
        let t = task(&g, 9, Some(-1), 30, 0);
        assert_eq!(breakdown(&t, &g, 10, 0).score, MAX_URGENCY);

        let t = task(&g, -5, None, 30, 0);
        assert_eq!(breakdown(&t, &g, 10, 0).score, MIN_URGENCY);
    }

    #[test]
    fn score_tasks_orders_by_urgency_and_skips_orphans() {
        let g = goal(10, None);
        let mut calm = task(&g, 1, None, 1, 0);
        calm.title = "calm".into();
        let mut pressing = task(&g, 3, Some(-1), 5, 0);
        pressing.title = "pressing".into();
        let orphan = Task::new(g.user_id, Uuid::new_v4(), "orphan", 3);

        let scored = score_tasks(&[g], &[calm, pressing, orphan], now());
        let titles: Vec<_> = scored.iter().map(|s| s.task.title.as_str()).collect();
        assert_eq!(titles, ["pressing", "calm"]);
        assert_eq!(scored[0].urgency, scored[0].breakdown.score);
    }

    #[test]
    fn goal_progress_counts_completion() {
        let g = goal(1, None);
        let mut done = task(&g, 1, None, 1, 0);
        done.is_completed = true;
        let open = task(&g, 1, None, 1, 0);
        let counts = goal_progress(&[done, open]);
        assert_eq!(counts[&g.id], GoalProgress::new(2, 1));
    }
}
