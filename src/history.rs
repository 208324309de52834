// Roll historical work orders up into plan-vs-actual execution records.
//
// One record per (PM, department, interval, job type, craft, due month).
// Rates, deviation and tier come from the same functions used for the
// pre-aggregated execution table.
use crate::metrics::{self, InstanceOutcome, MetricsConfig};
use crate::types::{ExecutionRecord, IntervalCategory, WorkOrderInstance};
use crate::util::{mean, month_key};
use chrono::Duration;
use std::collections::HashMap;
use tracing::debug;

/// Completed on or before `due + grace_days`. A window reaching past the
/// last representable date is open-ended.
pub fn outcome(instance: &WorkOrderInstance, grace_days: i64) -> InstanceOutcome {
    match instance.completed_date {
        Some(done) => InstanceOutcome {
            completed: true,
            on_time: Duration::try_days(grace_days)
                .and_then(|grace| instance.due_date.checked_add_signed(grace))
                .map_or(true, |deadline| done <= deadline),
        },
        None => InstanceOutcome {
            completed: false,
            on_time: false,
        },
    }
}

type GroupKey = (
    String,
    Option<String>,
    IntervalCategory,
    Option<String>,
    Option<String>,
    String,
);

fn group_key(w: &WorkOrderInstance) -> GroupKey {
    (
        w.pmnum.clone(),
        w.department.clone(),
        w.interval_category,
        w.job_type.clone(),
        w.labor_craft.clone(),
        month_key(w.due_date),
    )
}

/// Build execution records in first-seen group order.
pub fn build_execution_records(
    instances: &[WorkOrderInstance],
    cfg: &MetricsConfig,
) -> Vec<ExecutionRecord> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Vec<&WorkOrderInstance>)> = Vec::new();
    for w in instances {
        let key = group_key(w);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(w),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![w]));
            }
        }
    }

    let records: Vec<ExecutionRecord> = groups
        .into_iter()
        .map(|(key, members)| {
            let (pmnum, department, interval_category, job_type, labor_craft, due_month) = key;
            let outcomes: Vec<InstanceOutcome> = members
                .iter()
                .map(|w| outcome(w, cfg.on_time_grace_days))
                .collect();
            let completed = outcomes.iter().filter(|o| o.completed).count() as u32;
            let on_time = outcomes.iter().filter(|o| o.completed && o.on_time).count() as u32;

            let completion_rate = metrics::completion_rate(&outcomes);
            let on_time_rate = metrics::on_time_rate(&outcomes);
            let avg_planned_hrs = mean(members.iter().map(|w| w.planned_hrs));
            // actual hours only exist for completed work
            let avg_actual_hrs = mean(
                members
                    .iter()
                    .filter(|w| w.completed_date.is_some())
                    .map(|w| w.actual_hrs),
            );
            let hour_deviation_pct = metrics::hour_deviation_pct(avg_planned_hrs, avg_actual_hrs);

            ExecutionRecord {
                pmnum,
                department,
                interval_category,
                job_type,
                labor_craft,
                scheduled_count: Some(outcomes.len() as u32),
                completed_count: Some(completed),
                on_time_count: Some(on_time),
                avg_planned_hrs,
                avg_actual_hrs,
                due_month: Some(due_month),
                completion_rate,
                on_time_rate,
                hour_deviation_pct,
                performance_tier: metrics::performance_tier(
                    completion_rate,
                    hour_deviation_pct,
                    &cfg.tiers,
                ),
            }
        })
        .collect();

    debug!(
        instances = instances.len(),
        groupings = records.len(),
        "work orders rolled up"
    );
    records
}
