use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::board::Board;
use crate::clock::RefreshTimes;
use crate::feed::PayloadSource;
use crate::logging;
use crate::model::{FetchedPayload, PayloadShape};
use crate::render::Renderer;

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub rows: usize,
    pub shape: PayloadShape,
    pub times: RefreshTimes,
    /// Table generation after the rebuild.
    pub generation: u64,
}

/// Fetch-and-render loop. Cycles run one after another in a single task, so a
/// slow fetch delays the next cycle instead of overlapping with it.
pub struct Poller<S> {
    source: S,
    renderer: Renderer,
    board: Arc<Board>,
    times: watch::Sender<RefreshTimes>,
    interval: Duration,
    cycles: u64,
    failures: u64,
}

impl<S: PayloadSource> Poller<S> {
    pub fn new(
        source: S,
        renderer: Renderer,
        board: Arc<Board>,
        times: watch::Sender<RefreshTimes>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            renderer,
            board,
            times,
            interval,
            cycles: 0,
            failures: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// One fetch, then a full table rebuild and a refresh-time update. On
    /// failure the previous table is left untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let cycle = self.cycles;
        let started = Instant::now();

        match self.apply(cycle).await {
            Ok(report) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                logging::log_cycle_ok(cycle, report.rows, report.shape.as_str(), elapsed_ms);
                Ok(report)
            }
            Err(err) => {
                self.failures += 1;
                logging::log_cycle_failed(cycle, &self.source.describe(), &err);
                Err(err)
            }
        }
    }

    async fn apply(&self, cycle: u64) -> Result<CycleReport> {
        let FetchedPayload { payload, shape } = self.source.fetch().await?;
        if shape == PayloadShape::Legacy {
            logging::log_legacy_payload(&self.source.describe(), payload.rows.len());
        }

        let rendered = self.renderer.render(&payload.rows);
        let rows = rendered.len();
        let times = RefreshTimes::from_payload(&payload, Utc::now(), self.interval);

        let generation = self.board.update(|page| {
            page.replace_rows(rendered);
            page.generation()
        })?;
        // the clock only learns of refreshes that reached the published page
        self.times.send_replace(times);
        logging::log_table(rows, generation);

        Ok(CycleReport {
            cycle,
            rows,
            shape,
            times,
            generation,
        })
    }

    /// First cycle immediately, then one per interval. Ticks missed while a
    /// fetch is in flight are skipped. Never returns.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // failures are logged inside; the loop keeps going
            let _ = self.run_cycle().await;
        }
    }
}
