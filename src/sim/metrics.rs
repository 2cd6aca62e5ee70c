use average::{Estimate, Mean};
use serde::{Deserialize, Serialize};

use super::job::ProcessResult;
use crate::core::Time;

/// Aggregate figures for one finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingMetrics {
    pub average_waiting_time: Time,
    pub average_turnaround_time: Time,
    pub average_response_time: Time,
    /// Percent of `total_time` spent executing or switching.
    pub cpu_utilization: f64,
    /// Completed processes per time unit.
    pub throughput: f64,
    pub context_switches: usize,
    pub total_time: Time,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    values.collect::<Mean>().estimate()
}

impl SchedulingMetrics {
    pub fn compute(results: &[ProcessResult], context_switches: usize, switch_cost: Time) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let total_time = results
            .iter()
            .map(|r| r.completion_time)
            .fold(0.0, f64::max);
        let busy = results.iter().map(|r| r.burst_time).sum::<f64>()
            + context_switches as f64 * switch_cost;

        let (cpu_utilization, throughput) = if total_time > 0.0 {
            (
                100.0 * busy / total_time,
                results.len() as f64 / total_time,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            average_waiting_time: mean(results.iter().map(|r| r.waiting_time)),
            average_turnaround_time: mean(results.iter().map(|r| r.turnaround_time)),
            average_response_time: mean(results.iter().map(|r| r.response_time)),
            cpu_utilization,
            throughput,
            context_switches,
            total_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(pid: u64, arrival: f64, burst: f64, first_run: f64, completion: f64) -> ProcessResult {
        let turnaround_time = completion - arrival;
        ProcessResult {
            pid,
            arrival_time: arrival,
            burst_time: burst,
            priority: 0,
            completion_time: completion,
            turnaround_time,
            waiting_time: turnaround_time - burst,
            response_time: first_run - arrival,
        }
    }

    #[test]
    fn empty_results_give_zero_metrics() {
        assert_eq!(SchedulingMetrics::compute(&[], 0, 0.5), SchedulingMetrics::default());
    }

    #[test]
    fn averages_and_rates() {
        let results = [
            result(1, 0.0, 4.0, 0.0, 4.0),
            result(2, 1.0, 2.0, 4.5, 6.5),
            result(3, 2.0, 3.0, 7.0, 10.0),
        ];
        let metrics = SchedulingMetrics::compute(&results, 2, 0.5);

        assert_eq!(metrics.total_time, 10.0);
        assert_eq!(metrics.context_switches, 2);
        assert!((metrics.average_turnaround_time - (4.0 + 5.5 + 8.0) / 3.0).abs() < 1e-9);
        assert!((metrics.average_waiting_time - (0.0 + 3.5 + 5.0) / 3.0).abs() < 1e-9);
        assert!((metrics.average_response_time - (0.0 + 3.5 + 5.0) / 3.0).abs() < 1e-9);
        assert!((metrics.cpu_utilization - 100.0).abs() < 1e-9);
        assert!((metrics.throughput - 0.3).abs() < 1e-9);
    }

    #[test]
    fn idle_time_lowers_utilization() {
        let results = [result(1, 0.0, 2.0, 0.0, 2.0), result(2, 6.0, 2.0, 6.0, 8.0)];
        let metrics = SchedulingMetrics::compute(&results, 1, 0.0);
        assert_eq!(metrics.cpu_utilization, 50.0);
        assert_eq!(metrics.throughput, 0.25);
    }
}
