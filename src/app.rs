//! Wires the poller, the clock and the published page together.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::board::{Board, HtmlFileSink};
use crate::clock::{refresh_channel, Clock};
use crate::config::Config;
use crate::feed::{CycleReport, HttpSource, PayloadSource, Poller};
use crate::logging;
use crate::page::Page;
use crate::render::Renderer;

pub struct Dashboard<S> {
    cfg: Config,
    board: Arc<Board>,
    poller: Poller<S>,
    clock: Option<Clock>,
}

impl Dashboard<HttpSource> {
    /// Production wiring: HTTP source, page published to `OUTPUT_PATH`.
    pub fn from_config(cfg: Config) -> Result<Self> {
        let source = HttpSource::from_config(&cfg)?;
        let sink = HtmlFileSink::new(&cfg.output_path);
        Ok(Self::new(cfg, source, Some(sink)))
    }
}

impl<S: PayloadSource> Dashboard<S> {
    pub fn new(cfg: Config, source: S, sink: Option<HtmlFileSink>) -> Self {
        let page = if cfg.clock_enabled {
            Page::with_clock(&cfg.title)
        } else {
            Page::new(&cfg.title)
        };
        let board = Arc::new(Board::new(page, sink));
        let (times_tx, times_rx) = refresh_channel();
        let clock = cfg
            .clock_enabled
            .then(|| Clock::new(cfg.clock_format, times_rx));
        let poller = Poller::new(
            source,
            Renderer::new(cfg.render_options()),
            board.clone(),
            times_tx,
            cfg.poll_interval(),
        );
        Self {
            cfg,
            board,
            poller,
            clock,
        }
    }

    pub fn board(&self) -> Arc<Board> {
        self.board.clone()
    }

    /// Repaint the clock elements (if any) and publish.
    fn paint_clock(&self) -> Result<()> {
        let now = Utc::now();
        self.board.update(|page| {
            if let Some(clock) = &self.clock {
                clock.paint(page, now);
            }
        })
    }

    /// One cycle followed by a clock repaint, for one-shot runs.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        let report = self.poller.run_cycle().await?;
        self.paint_clock()?;
        Ok(report)
    }

    /// Run both loops until Ctrl-C, or a single cycle in one-shot mode.
    pub async fn run(mut self) -> Result<()> {
        logging::log_startup(
            &self.cfg.endpoint_url(),
            self.cfg.poll_secs,
            &self.cfg.output_path,
            self.cfg.oneshot,
        );

        if self.cfg.oneshot {
            let result = self.run_once().await;
            logging::log_shutdown(self.poller.cycles(), self.poller.failures());
            return result.map(|_| ());
        }

        // publish the empty shell so the page exists before the first response
        self.paint_clock()?;

        let clock_task = self
            .clock
            .take()
            .map(|clock| tokio::spawn(clock.run(self.board.clone(), self.cfg.clock_period())));

        let stopped = tokio::select! {
            _ = self.poller.run() => Ok(()),
            signal = tokio::signal::ctrl_c() => signal.context("listening for ctrl-c"),
        };

        if let Some(task) = clock_task {
            task.abort();
        }
        logging::log_shutdown(self.poller.cycles(), self.poller.failures());
        stopped
    }
}
