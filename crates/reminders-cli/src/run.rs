use crate::output::{print_json, print_table};
use crate::Cli;
use anyhow::Context;
use rand::Rng;
use reminders_core::caldav::CaldavClient;
use reminders_core::clock::{Clock, RngSource, SystemClock};
use reminders_core::config::{CaldavConfig, RunOptions};
use reminders_core::ntfy::NtfyDispatcher;
use reminders_core::orchestrator::{Orchestrator, RunSummary};
use std::time::Duration;

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let dispatcher = NtfyDispatcher::new(&cli.topic)?;
    startup_jitter(cli.startup_jitter);

    let options = RunOptions {
        catalog_path: cli.input_csv.clone(),
        history_path: cli.states_path.clone(),
        delivery_delay_secs: cli.delay,
        min_dispatch_spacing_secs: cli.min_spacing,
        verbose: cli.verbose,
        sync_task_list: cli.also_add_to_caldav,
    };

    let mut orch = Orchestrator::new(options, dispatcher, SystemClock, RngSource::thread());
    if cli.also_add_to_caldav {
        match CaldavConfig::from_env() {
            Some(config) => {
                let source = cli.input_csv.display().to_string();
                match CaldavClient::new(config, source) {
                    Ok(client) => orch = orch.with_task_list(Box::new(client)),
                    Err(e) => tracing::warn!(error = %e, "CalDAV client unavailable"),
                }
            }
            None => tracing::warn!("CalDAV sync requested but CALDAV_TASKS_API_URL is not set"),
        }
    }

    match orch.run() {
        Ok(summary) => report(&summary, cli),
        Err(e) => {
            orch.report_failure(&e);
            Err(e).context("reminder run failed")
        }
    }
}

fn startup_jitter(max_secs: u64) {
    if max_secs == 0 {
        return;
    }
    let wait = Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..max_secs as f64));
    tracing::debug!(wait_secs = wait.as_secs(), "startup jitter");
    SystemClock.sleep(wait);
}

fn report(summary: &RunSummary, cli: &Cli) -> anyhow::Result<()> {
    if cli.json {
        return print_json(summary);
    }
    if cli.verbose {
        let rows = summary
            .outcomes
            .iter()
            .map(|o| {
                vec![
                    o.task.clone(),
                    o.reason.to_string(),
                    if o.fired { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        print_table(&["TASK", "REASON", "FIRED"], rows);
    }
    Ok(())
}
