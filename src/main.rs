/*
 *  main.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Disk, load and menu pages on a 2.13" e-paper HAT, plus the case fan
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::future;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError};

use nasink::config::{self, Cli, Config};
use nasink::display::{DisplayError, DisplayService, EpaperDisplay, ExitAction, Lifecycle, SharedDisplay};
use nasink::pages::{build_scheduler, run_fan_control};
use nasink::ui::{PageScheduler, SchedulerError};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli)?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} status panel", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    info!("Disks: {}", cfg.disks.join(", "));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(&cli, &cfg));
    // key pollers stay blocked on their lines, do not wait for them
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn serve(cli: &Cli, cfg: &Config) -> anyhow::Result<()> {
    let service = Arc::new(DisplayService::open(cfg.board.clone()));
    let display: SharedDisplay = service.clone();
    let lifecycle = Arc::new(Lifecycle::new(Arc::clone(&display)));
    let mut scheduler = build_scheduler(cfg, Arc::clone(&lifecycle));

    if let Some(path) = cli.dump_page.as_ref() {
        if !scheduler.dump_index_page(path)? {
            warn!("Index page skipped its draw, nothing written");
        }
        return Ok(());
    }

    let outcome = run(cfg, service, display, &lifecycle, scheduler).await;

    // the scheduler has finished by now; this covers the routes where it
    // never got to blank the panel itself
    if let Err(e) = lifecycle.shutdown() {
        error!("Panel shutdown failed: {}", e);
    }

    match outcome {
        Ok(action) => {
            info!("Exit: {:?}", action);
            action.run()?;
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}

fn scheduler_result(joined: Result<Result<ExitAction, SchedulerError>, JoinError>) -> Result<ExitAction, SchedulerError> {
    joined.unwrap_or_else(|e| Err(SchedulerError::Background(format!("scheduler task: {e}"))))
}

/// Everything that ends the run without the scheduler deciding it
enum Interrupt {
    Stop,
    Failed(SchedulerError),
}

// a poller only ends cleanly once the scheduler has dropped the queue
fn key_poller_ended(joined: Result<Result<(), DisplayError>, JoinError>) -> Interrupt {
    match joined {
        Ok(Ok(())) => Interrupt::Stop,
        Ok(Err(e)) => Interrupt::Failed(SchedulerError::Display(e)),
        Err(e) => Interrupt::Failed(SchedulerError::Background(format!("key poller: {e}"))),
    }
}

async fn run(
    cfg: &Config,
    service: Arc<DisplayService>,
    display: SharedDisplay,
    lifecycle: &Lifecycle,
    mut scheduler: PageScheduler,
) -> Result<ExitAction, SchedulerError> {
    service.init_board()?;

    let (tx, mut rx) = mpsc::channel(cfg.ui.button_queue);
    let mut pollers = service.spawn_button_pollers(tx)?;
    info!("{} key pollers running", pollers.len());

    let mut worker = task::spawn_blocking(move || scheduler.run(&mut rx));

    let fan = async {
        if cfg.fan.enabled {
            run_fan_control(Arc::clone(&display), cfg.fan.clone()).await
        } else {
            info!("Fan control disabled");
            future::pending().await
        }
    };

    let interrupt = tokio::select! {
        joined = &mut worker => return scheduler_result(joined),
        Some(joined) = pollers.join_next() => key_poller_ended(joined),
        result = fan => {
            let reason = match result {
                Ok(()) => "fan control stopped".to_string(),
                Err(e) => format!("fan control: {e:#}"),
            };
            Interrupt::Failed(SchedulerError::Background(reason))
        }
        result = signal_handler() => match result {
            Ok(()) => Interrupt::Stop,
            Err(e) => Interrupt::Failed(SchedulerError::Background(format!("signal setup: {e}"))),
        },
    };

    // the scheduler blanks the panel between draws, wait for it
    lifecycle.request_stop();
    let stopped = scheduler_result(worker.await);

    match interrupt {
        Interrupt::Stop => stopped,
        Interrupt::Failed(e) => {
            if let Err(stop_err) = stopped {
                warn!("Scheduler also failed while stopping: {}", stop_err);
            }
            Err(e)
        }
    }
}
