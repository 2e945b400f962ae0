//! export.rs
//! Run artifacts: a per-tick counter history (csv crate + serde rows) and a
//! human-oriented summary CSV.
//! - `data/bpu_history.csv`: sampled counter snapshots for trending
//! - `data/bpu_summary.csv`: metric,value,description rows for one run

use csv::Writer;
use log::{error, info};
use serde::Serialize;
use std::{fs, path::Path};

use crate::unit::stats::Stats;

/// One sampled snapshot of the counters that move during a run.
#[derive(Debug, Serialize)]
struct HistoryRow {
    tick: u32,
    ev_in: u32,
    ev_merge: u32,
    ev_drop: u32,
    job_merge: u32,
    job_drop: u32,
    tx_frame_sent: u32,
    tx_frame_partial: u32,
    tx_bytes: u32,
    tx_skip_budget: u32,
    tx_skip_backpressure: u32,
    degrade_drop: u32,
    degrade_requeue: u32,
    work_us_last: u32,
}

/// Bounded history of stats snapshots, sampled every `every` ticks.
pub struct StatsHistory {
    rows: Vec<HistoryRow>,
    every: u32,
}

impl StatsHistory {
    pub fn new(every: u32) -> Self {
        Self {
            rows: Vec::new(),
            every: every.max(1),
        }
    }

    /// Record a snapshot when the sampling interval comes due.
    pub fn sample(&mut self, st: &Stats) {
        if st.tick % self.every != 0 {
            return;
        }
        self.rows.push(HistoryRow {
            tick: st.tick,
            ev_in: st.ev_in,
            ev_merge: st.ev_merge,
            ev_drop: st.ev_drop,
            job_merge: st.job_merge,
            job_drop: st.job_drop,
            tx_frame_sent: st.tx_frame_sent,
            tx_frame_partial: st.tx_frame_partial,
            tx_bytes: st.tx_bytes,
            tx_skip_budget: st.tx_skip_budget,
            tx_skip_backpressure: st.tx_skip_backpressure,
            degrade_drop: st.degrade_drop,
            degrade_requeue: st.degrade_requeue,
            work_us_last: st.work_us_last,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write all snapshots to `path`.
    pub fn export_csv(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                error!("Failed to create export directory {:?}: {}", dir, e);
                return;
            }
        }
        let mut wtr = match Writer::from_path(path) {
            Ok(w) => w,
            Err(e) => {
                error!("Failed to create history CSV: {}", e);
                return;
            }
        };
        for row in &self.rows {
            if let Err(e) = wtr.serialize(row) {
                error!("Failed to write history row: {}", e);
                return;
            }
        }
        if let Err(e) = wtr.flush() {
            error!("Failed to flush history CSV: {}", e);
            return;
        }
        info!("History exported to: {:?} ({} snapshots)", path, self.rows.len());
    }
}

/// Export the final counters as metric,value,description rows.
pub fn export_summary_csv(st: &Stats, frames_ok: u64, frames_bad: u64, overruns: u64, path: &Path) {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            error!("Failed to create export directory {:?}: {}", dir, e);
            return;
        }
    }

    let mut csv_content = String::from("metric,value,description\n");
    csv_content.push_str(&format!("ticks,{},Completed unit ticks\n", st.tick));
    csv_content.push_str(&format!("ev_in,{},Events admitted\n", st.ev_in));
    csv_content.push_str(&format!("ev_merge,{},Event slots coalesced\n", st.ev_merge));
    csv_content.push_str(&format!("ev_drop,{},Events dropped at admission\n", st.ev_drop));
    csv_content.push_str(&format!("job_merge,{},Job slots coalesced\n", st.job_merge));
    csv_content.push_str(&format!("job_drop,{},Jobs dropped at admission\n", st.job_drop));
    csv_content.push_str(&format!("tx_frame_sent,{},Frames fully transmitted\n", st.tx_frame_sent));
    csv_content.push_str(&format!("tx_frame_partial,{},Ticks ending with a partial frame\n", st.tx_frame_partial));
    csv_content.push_str(&format!("tx_bytes,{},Bytes handed to the link\n", st.tx_bytes));
    csv_content.push_str(&format!("tx_skip_budget,{},Jobs deferred by the byte budget\n", st.tx_skip_budget));
    csv_content.push_str(&format!("tx_skip_backpressure,{},Transmit stalls from the link\n", st.tx_skip_backpressure));
    csv_content.push_str(&format!("degrade_drop,{},Telemetry jobs shed under pressure\n", st.degrade_drop));
    csv_content.push_str(&format!("degrade_requeue,{},Jobs requeued for a later tick\n", st.degrade_requeue));
    csv_content.push_str(&format!("pick_aged,{},Events scheduled past the age threshold\n", st.pick_aged));
    csv_content.push_str(&format!("work_us_max,{},Longest tick in microseconds\n", st.work_us_max));
    csv_content.push_str(&format!("frames_ok,{},Frames validated by the monitor\n", frames_ok));
    csv_content.push_str(&format!("frames_bad,{},Frames rejected by the monitor\n", frames_bad));
    csv_content.push_str(&format!("task_overruns,{},Task wake-ups past their deadline\n", overruns));

    match fs::write(path, csv_content) {
        Ok(_) => info!("Summary metrics exported to: {:?}", path),
        Err(e) => error!("Failed to export summary: {}", e),
    }
}
