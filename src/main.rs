use std::{env, fs, process::ExitCode};

use cpu_sched_model::{
    Algorithm, MlfqConfig, Policy, PriorityMode, ProcessSpec, RrVariation, SchedCoreEvent,
    Scheduler, SchedulingConfig, SchedulingMetrics, SchedulingRequest, SchedulingResult, Sim,
    simulate,
};
use rand::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match env::args().nth(1) {
        Some(path) => run_file(&path),
        None => {
            run_presets();
            compare_random(500, 0.3, 0.3, 2.0, 6.0, 0);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let input = match fs::read_to_string(path) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("error: cannot read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let request: SchedulingRequest = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("error: invalid request: {err}");
            return ExitCode::FAILURE;
        }
    };

    match simulate(&request) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn demo_workload(priorities: bool) -> Vec<ProcessSpec> {
    let specs = [
        (1, 0.0, 8.0, 3),
        (2, 1.0, 4.0, 1),
        (3, 2.0, 2.0, 0),
        (4, 3.0, 1.0, 2),
        (5, 4.0, 3.0, 1),
    ];
    specs
        .into_iter()
        .map(|(pid, arrival, burst, priority)| {
            let spec = ProcessSpec::new(pid, arrival, burst);
            if priorities {
                spec.with_priority(priority)
            } else {
                spec
            }
        })
        .collect()
}

fn rr_workload() -> Vec<ProcessSpec> {
    vec![
        ProcessSpec::new(1, 0.0, 8.0),
        ProcessSpec::new(2, 1.0, 4.0),
        ProcessSpec::new(3, 2.0, 6.0),
        ProcessSpec::new(4, 3.0, 3.0),
    ]
}

fn run_presets() {
    let fcfs = vec![
        ProcessSpec::new(1, 0.0, 8.0),
        ProcessSpec::new(2, 1.0, 4.0),
        ProcessSpec::new(3, 2.0, 9.0),
        ProcessSpec::new(4, 3.0, 5.0),
    ];
    let presets = vec![
        (
            "fcfs",
            SchedulingRequest::new(fcfs, Algorithm::Fcfs).with_config(SchedulingConfig {
                context_switch_cost: 1.0,
                ..SchedulingConfig::default()
            }),
        ),
        ("sjf", SchedulingRequest::new(demo_workload(false), Algorithm::Sjf)),
        (
            "srtf",
            SchedulingRequest::new(demo_workload(false), Algorithm::Sjf).with_config(
                SchedulingConfig {
                    preemptive: true,
                    ..SchedulingConfig::default()
                },
            ),
        ),
        ("priority", SchedulingRequest::new(demo_workload(true), Algorithm::Priority)),
        (
            "priority-preemptive",
            SchedulingRequest::new(demo_workload(true), Algorithm::Priority).with_config(
                SchedulingConfig {
                    preemptive: true,
                    ..SchedulingConfig::default()
                },
            ),
        ),
        ("rr-small-quantum", rr_request(2.0)),
        ("rr-medium-quantum", rr_request(4.0)),
        // Behaves like FCFS
        ("rr-large-quantum", rr_request(10.0)),
    ];

    for (label, request) in presets {
        match simulate(&request) {
            Ok(result) => print_result(label, &result),
            Err(err) => eprintln!("{label}: {err}"),
        }
    }
}

fn rr_request(quantum: f64) -> SchedulingRequest {
    SchedulingRequest::new(rr_workload(), Algorithm::RoundRobin).with_config(SchedulingConfig {
        context_switch_cost: 0.0,
        time_quantum: Some(quantum),
        ..SchedulingConfig::default()
    })
}

fn print_result(label: &str, result: &SchedulingResult) {
    println!("== {label} ({})", result.algorithm);
    for entry in &result.schedule {
        let who = entry
            .process_id
            .map_or_else(|| "-".to_string(), |pid| format!("P{pid}"));
        println!(
            "  [{:>6.2}, {:>6.2}) {:<4} {:?}",
            entry.start_time, entry.end_time, who, entry.kind
        );
    }
    let m = &result.metrics;
    println!(
        "  avg wait {:.2}, avg turnaround {:.2}, avg response {:.2}, util {:.1}%, switches {}",
        m.average_waiting_time,
        m.average_turnaround_time,
        m.average_response_time,
        m.cpu_utilization,
        m.context_switches
    );
}

/// Run one random workload under every policy and compare them.
fn compare_random(
    ticks: u64,
    p_arrival: f64,
    p_short: f64,
    short_burst: f64,
    long_burst: f64,
    seed: u64,
) {
    let processes = bernoulli_jobs(ticks, p_arrival, p_short, short_burst, long_burst, seed);
    println!("== random workload: {} processes, seed {seed}", processes.len());

    let base = SchedulingConfig {
        time_quantum: Some(4.0),
        mlfq_config: Some(MlfqConfig::default()),
        ..SchedulingConfig::default()
    };
    let mut configs = Algorithm::ALL
        .iter()
        .map(|&algorithm| (algorithm, base.clone()))
        .collect::<Vec<_>>();
    configs.push((
        Algorithm::Priority,
        SchedulingConfig {
            priority_mode: PriorityMode::Dynamic,
            ..base.clone()
        },
    ));
    configs.push((
        Algorithm::RoundRobin,
        SchedulingConfig {
            rr_variation: RrVariation::Deficit,
            ..base.clone()
        },
    ));

    for (algorithm, config) in configs {
        let request = SchedulingRequest::new(processes.clone(), algorithm).with_config(config);
        let policy = match request.validate() {
            Ok(policy) => policy,
            Err(err) => {
                eprintln!("{algorithm}: {err}");
                continue;
            }
        };
        let mut sim =
            match Sim::<Policy>::new(&request.processes, request.config.context_switch_cost, &policy)
            {
                Ok(sim) => sim,
                Err(err) => {
                    eprintln!("{algorithm}: {err}");
                    continue;
                }
            };

        let mut idle_time = 0.0;
        let mut longest_idle: f64 = 0.0;
        while !sim.all_jobs_completed() {
            for event in sim.step() {
                if let SchedCoreEvent::CpuIdle { from, until } = event {
                    idle_time += until - from;
                    longest_idle = longest_idle.max(until - from);
                }
            }
        }

        let ctx = &sim.core.ctx;
        let metrics =
            SchedulingMetrics::compute(&sim.results(), ctx.context_switches(), ctx.switch_cost());
        println!(
            "  {:<32} avg wait {:>8.2}  avg response {:>8.2}  end {:>8.1}  idle {:.1} (longest {:.1})",
            sim.core.scheduler.name(),
            metrics.average_waiting_time,
            metrics.average_response_time,
            metrics.total_time,
            idle_time,
            longest_idle
        );
    }
}

fn bernoulli_jobs(
    ticks: u64,
    p_arrival: f64,
    p_short: f64,
    short_burst: f64,
    long_burst: f64,
    seed: u64,
) -> Vec<ProcessSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut jobs = Vec::new();

    for t in 0..ticks {
        if rng.random::<f64>() < p_arrival {
            let burst = if rng.random::<f64>() < p_short {
                short_burst
            } else {
                long_burst
            };

            let pid = jobs.len() as u64 + 1;
            let spec = ProcessSpec::new(pid, t as f64, burst)
                .with_priority(rng.random_range(0..5))
                .with_nice(rng.random_range(-5..=5));
            jobs.push(spec);
        }
    }

    jobs
}
