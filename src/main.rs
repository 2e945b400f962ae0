//! # BPU link demo
//! Periodic producers (sensor, heartbeat, telemetry, command) feed a bounded
//! processing unit that coalesces, frames, and paces their events onto a
//! virtual UART. A wire monitor validates every frame coming off the line.
//!
//! ## Usage
//! `bpu_link [duration_secs] [wire_bytes_per_tick]`
//! - duration_secs: how long to run (default 10)
//! - wire_bytes_per_tick: line drain rate; small values provoke backpressure
//!   and degrade behavior (default 1843, a 921600-baud line at a 20 ms tick)
//!
//! ## Outputs
//! - `data/bpu_summary.csv`: final counters for the run
//! - `data/bpu_history.csv`: sampled counter snapshots for trending

use bpu_link::host::{
    export::export_summary_csv,
    link::VirtualUart,
    producer::spawn_producer,
    task::{LinkTask, TaskReport},
};
use bpu_link::unit::{Config, EventKind};

use crossbeam::channel::bounded;
use log::info;
use std::{
    env,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

const TICK_MS: u64 = 20;

const SENSOR_MS: u64 = 80;
const HB_MS: u64 = 200;
const TELEM_MS: u64 = 1000;
const CMD_MS: u64 = 2500;

// virtual driver buffer, mirrors a typical UART TX buffer setup
const UART_CAPACITY: usize = 2048;
const UART_RESERVE: usize = 96;
const UART_CHUNK: usize = 128;

const DEFAULT_DURATION_SECS: u64 = 10;
const DEFAULT_WIRE_RATE: usize = 1843;

const STIMULUS_CHANNEL_CAP: usize = 256;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let duration_secs: u64 = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or(DEFAULT_DURATION_SECS);
    let wire_rate: usize = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or(DEFAULT_WIRE_RATE);

    info!("=== BPU LINK DEMO START ===");
    info!(
        "duration={}s tick={}ms wire_rate={}B/tick",
        duration_secs, TICK_MS, wire_rate
    );

    let cfg = Config::default();
    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = bounded(STIMULUS_CHANNEL_CAP);

    let producers = vec![
        spawn_producer("Sensor", EventKind::Sensor, SENSOR_MS, tx.clone(), running.clone()),
        spawn_producer("Heartbeat", EventKind::Hb, HB_MS, tx.clone(), running.clone()),
        spawn_producer("Telemetry", EventKind::Telem, TELEM_MS, tx.clone(), running.clone()),
        spawn_producer("Command", EventKind::Cmd, CMD_MS, tx.clone(), running.clone()),
    ];
    drop(tx);

    // the task thread owns the unit; nothing else touches it
    let task_handle = {
        let uart = VirtualUart::new(UART_CAPACITY, UART_RESERVE, UART_CHUNK);
        let running = running.clone();
        thread::spawn(move || {
            let task = LinkTask::new(cfg, uart, rx, running, TICK_MS, wire_rate);
            task.run()
        })
    };

    thread::sleep(Duration::from_secs(duration_secs));
    info!("[main] time's up, stopping");
    running.store(false, Ordering::Release);

    for p in producers {
        let _ = p.join();
    }
    let report = match task_handle.join() {
        Ok(r) => r,
        Err(_) => {
            log::error!("[main] task thread panicked");
            return;
        }
    };

    print_summary(&report);
    export(&report);

    info!("=== BPU LINK DEMO FINISHED ===");
}

fn print_summary(report: &TaskReport) {
    let st = &report.stats;
    println!("\n──── run summary ────");
    println!("ticks               {}", st.tick);
    println!("events in/out       {}/{}", st.ev_in, st.ev_out);
    println!("event merges        {}", st.ev_merge);
    println!("event drops         {}", st.ev_drop);
    println!("job merges          {}", st.job_merge);
    println!("frames sent         {}", st.tx_frame_sent);
    println!("frames partial      {}", st.tx_frame_partial);
    println!("bytes on wire       {}", st.tx_bytes);
    println!("budget skips        {}", st.tx_skip_budget);
    println!("backpressure skips  {}", st.tx_skip_backpressure);
    println!("degrade drop/requeue {}/{}", st.degrade_drop, st.degrade_requeue);
    println!("aged at schedule    {}", st.pick_aged);
    println!("work us last/max    {}/{}", st.work_us_last, st.work_us_max);
    println!("monitor ok/bad      {}/{}", report.frames_ok, report.frames_bad);
    println!("task overruns       {}", report.overruns);
}

fn export(report: &TaskReport) {
    export_summary_csv(
        &report.stats,
        report.frames_ok,
        report.frames_bad,
        report.overruns,
        Path::new("data/bpu_summary.csv"),
    );
    report.history.export_csv(Path::new("data/bpu_history.csv"));
}
