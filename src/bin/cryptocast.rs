use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use cryptocast::cli::{parse_command, Args, Command};
use cryptocast::manager::{AppState, Event, Notification, Task, TaskManager, TaskOutput, TaskResult};
use cryptocast::scheduler::RefreshScheduler;
use cryptocast::services::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.config();
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create {}", config.output_dir.display()))?;

    let source = config.source.build()?;
    let refresh = config.refresh_interval;
    let state = Arc::new(AppState::new(config.initial_asset));
    let (manager, events) = TaskManager::new(Pipeline::new(source, config), state);

    match args.command {
        Command::Chart => run_once(&manager, Task::ShowChart).await,
        Command::Stationarity => run_once(&manager, Task::StationarityTest).await,
        Command::Forecast => run_once(&manager, Task::Forecast).await,
        Command::Watch => watch(manager, events, refresh).await,
    }
}

async fn run_once(manager: &TaskManager, task: Task) -> Result<()> {
    match manager.submit_task(task).await {
        TaskResult::Success(output) => {
            print_output(&output);
            Ok(())
        }
        TaskResult::Failure(e) => bail!("{}: {}", e.title(), e),
        TaskResult::Unavailable => bail!("task {:?} did not complete", task),
    }
}

async fn watch(
    manager: TaskManager,
    mut events: mpsc::UnboundedReceiver<Event>,
    refresh: Duration,
) -> Result<()> {
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });
    let scheduler = RefreshScheduler::new(manager.clone(), refresh).spawn();

    println!("Commands: chart | adf | forecast | select <SYMBOL> | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let task = match parse_command(&line) {
            Ok(Some(task)) => task,
            Ok(None) => break,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };
        if let TaskResult::Success(output @ TaskOutput::Forecast(_)) =
            manager.submit_task(task).await
        {
            print_output(&output);
        }
    }

    info!("Shutting down");
    scheduler.shutdown().await;
    drop(manager);
    printer.await?;
    Ok(())
}

fn print_output(output: &TaskOutput) {
    match output {
        TaskOutput::Chart(report) => {
            println!("{}: {} hourly bars", report.asset, report.bars);
            if let Some(close) = report.last_close {
                println!("  last close {:.2}", close);
            }
            if let Some(rsi) = report.last_rsi {
                println!("  RSI {:.1}", rsi);
            }
            if let Some(path) = &report.chart_path {
                println!("  chart: {}", path.display());
            }
        }
        TaskOutput::Stationarity(asset, verdict) => {
            println!("{}: {}", asset, verdict);
            println!(
                "  ADF statistic {:.4} (lag {}, {} obs)",
                verdict.statistic, verdict.used_lag, verdict.nobs
            );
            let cv = &verdict.critical_values;
            println!(
                "  critical values 1%: {:.4}  5%: {:.4}  10%: {:.4}",
                cv.one_pct, cv.five_pct, cv.ten_pct
            );
        }
        TaskOutput::Forecast(report) => {
            println!("{} forecast:", report.asset);
            for (step, price) in report.forecast.steps() {
                println!("  +{:>2}h  {:.2}", step, price);
            }
            println!("Forecast saved to {}", report.csv_path.display());
        }
        TaskOutput::Selected(asset) => println!("Selected {}", asset),
    }
}

fn print_event(event: &Event) {
    match event {
        Event::ChartUpdated(report) => match &report.chart_path {
            Some(path) => println!("Chart for {} updated: {}", report.asset, path.display()),
            None => println!("Indicators for {} updated", report.asset),
        },
        Event::Notification(Notification::Info { title, message }) => {
            println!("[{}] {}", title, message)
        }
        Event::Notification(Notification::Error { title, message }) => {
            eprintln!("[{}] {}", title, message)
        }
    }
}
