//! Task statistics for dashboards
//!
//! Pure reductions over task lists. Results don't depend on input order, and
//! "today" is passed in so overdue counts are reproducible.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::task::{Task, TaskStatus};

/// Number of tasks in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub todo: u64,
    pub in_progress: u64,
    pub review: u64,
    pub done: u64,
    pub paused: u64,
}

impl StatusBreakdown {
    pub fn record(&mut self, status: TaskStatus) {
        self.add(status, 1);
    }

    pub fn add(&mut self, status: TaskStatus, count: u64) {
        let slot = match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Review => &mut self.review,
            TaskStatus::Done => &mut self.done,
            TaskStatus::Paused => &mut self.paused,
        };
        *slot += count;
    }

    pub fn total(&self) -> u64 {
        self.todo + self.in_progress + self.review + self.done + self.paused
    }
}

/// One user's numbers on the team dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTaskStats {
    pub user_id: Uuid,

    /// Distinct tasks the user created or is assigned to
    pub task_count: u64,
    pub created_count: u64,
    pub assigned_count: u64,
    pub completed_count: u64,

    /// Percentage of `task_count` that is done, rounded
    pub completion_rate: u32,
    pub overdue_count: u64,
}

/// Whole-team totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamStats {
    pub member_count: u64,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub status_breakdown: StatusBreakdown,

    /// Rounded mean of the members' completion rates
    pub average_completion_rate: u32,
}

/// `round(completed / total × 100)`, 0 when there are no tasks
pub fn completion_rate(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Drops repeated task IDs, keeping the first occurrence
fn distinct(tasks: &[Task]) -> impl Iterator<Item = &Task> {
    let mut seen = HashSet::new();
    tasks.iter().filter(move |t| seen.insert(t.id))
}

pub fn compute_user_stats(user_id: Uuid, tasks: &[Task], today: NaiveDate) -> UserTaskStats {
    let mut stats = UserTaskStats {
        user_id,
        task_count: 0,
        created_count: 0,
        assigned_count: 0,
        completed_count: 0,
        completion_rate: 0,
        overdue_count: 0,
    };

    for task in distinct(tasks).filter(|t| t.involves(user_id)) {
        stats.task_count += 1;
        if task.created_by == user_id {
            stats.created_count += 1;
        }
        if task.assigned_to == Some(user_id) {
            stats.assigned_count += 1;
        }
        if task.status.is_done() {
            stats.completed_count += 1;
        }
        if task.is_overdue(today) {
            stats.overdue_count += 1;
        }
    }

    stats.completion_rate = completion_rate(stats.completed_count, stats.task_count);
    stats
}

/// Team totals over all tasks plus the given members' individual stats
pub fn compute_team_stats(members: &[UserTaskStats], tasks: &[Task], today: NaiveDate) -> TeamStats {
    let mut breakdown = StatusBreakdown::default();
    let mut overdue_tasks = 0;

    for task in distinct(tasks) {
        breakdown.record(task.status);
        if task.is_overdue(today) {
            overdue_tasks += 1;
        }
    }

    let average_completion_rate = if members.is_empty() {
        0
    } else {
        let sum: u64 = members.iter().map(|m| u64::from(m.completion_rate)).sum();
        (sum as f64 / members.len() as f64).round() as u32
    };

    TeamStats {
        member_count: members.len() as u64,
        total_tasks: breakdown.total(),
        completed_tasks: breakdown.done,
        overdue_tasks,
        status_breakdown: breakdown,
        average_completion_rate,
    }
}
