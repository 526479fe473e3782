//! Display sink and the in-memory model behind the summary screen.
//!
//! The session accumulator only ever talks to a [`DisplaySink`]. Updates are
//! fire-and-forget: the sink records them and the owner redraws when it
//! chooses to. [`DisplayManager`] pairs a [`DisplayModel`] with a concrete
//! `DrawTarget` and redraws the [`SummaryScreen`] only when something changed.

use core::fmt::Write;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use heapless::Deque;
use log::{debug, trace, warn};

use crate::readings::{MEASUREMENT_TYPE_COUNT, MeasurementType};
use crate::widgets::SummaryScreen;

/// Points kept per chart series
pub const CHART_POINTS: usize = 64;

/// Longest summary line
pub const SUMMARY_CAPACITY: usize = 64;

/// Where the accumulator sends what the user should see.
pub trait DisplaySink {
    fn set_summary_text(&mut self, text: &str);

    fn push_chart_point(&mut self, series: MeasurementType, value: f32);

    /// `percent` is clamped to 0..=100.
    fn set_progress(&mut self, percent: u8);

    fn set_send_enabled(&mut self, enabled: bool);

    /// Present pending updates. Called once per control-loop tick.
    fn flush(&mut self) {}
}

/// Format a summary line, cutting whatever does not fit.
pub fn summary_line(args: core::fmt::Arguments<'_>) -> heapless::String<SUMMARY_CAPACITY> {
    let mut line = heapless::String::new();
    line.write_fmt(args).ok();
    line
}

impl<T: DisplaySink + ?Sized> DisplaySink for &mut T {
    fn set_summary_text(&mut self, text: &str) {
        (**self).set_summary_text(text)
    }

    fn push_chart_point(&mut self, series: MeasurementType, value: f32) {
        (**self).push_chart_point(series, value)
    }

    fn set_progress(&mut self, percent: u8) {
        (**self).set_progress(percent)
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        (**self).set_send_enabled(enabled)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}

/// Current screen contents.
#[derive(Debug, Clone)]
pub struct DisplayModel {
    summary: heapless::String<SUMMARY_CAPACITY>,
    progress: u8,
    send_enabled: bool,
    series: [Deque<f32, CHART_POINTS>; MEASUREMENT_TYPE_COUNT],
    dirty: bool,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayModel {
    pub const fn new() -> Self {
        Self {
            summary: heapless::String::new(),
            progress: 0,
            send_enabled: false,
            series: [const { Deque::new() }; MEASUREMENT_TYPE_COUNT],
            dirty: true,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    /// Points of `series`, oldest first.
    pub fn chart(&self, series: MeasurementType) -> impl Iterator<Item = f32> + '_ {
        self.series[series.index()].iter().copied()
    }

    pub fn chart_len(&self, series: MeasurementType) -> usize {
        self.series[series.index()].len()
    }

    /// Whether anything changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}

impl DisplaySink for DisplayModel {
    fn set_summary_text(&mut self, text: &str) {
        if self.summary.as_str() == text {
            return;
        }
        self.summary.clear();
        // Overlong text is cut at the last whole char that fits.
        for c in text.chars() {
            if self.summary.push(c).is_err() {
                break;
            }
        }
        self.dirty = true;
    }

    fn push_chart_point(&mut self, series: MeasurementType, value: f32) {
        let points = &mut self.series[series.index()];
        if points.is_full() {
            points.pop_front();
        }
        points.push_back(value).ok();
        self.dirty = true;
    }

    fn set_progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.progress != percent {
            self.progress = percent;
            self.dirty = true;
        }
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        if self.send_enabled != enabled {
            debug!("Send button {}", if enabled { "enabled" } else { "disabled" });
            self.send_enabled = enabled;
            self.dirty = true;
        }
    }
}

/// Owns the draw target and redraws the summary screen on change.
pub struct DisplayManager<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    display: D,
    model: DisplayModel,
    screen: SummaryScreen,
}

impl<D> DisplayManager<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(display: D) -> Self {
        let screen = SummaryScreen::new(display.bounding_box());
        Self {
            display,
            model: DisplayModel::new(),
            screen,
        }
    }

    pub fn model(&self) -> &DisplayModel {
        &self.model
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Redraw if the model changed. Returns whether a frame was drawn.
    pub fn render(&mut self) -> Result<bool, D::Error> {
        if !self.model.take_dirty() {
            return Ok(false);
        }
        trace!("Redrawing summary screen");
        self.screen.draw(&self.model, &mut self.display)?;
        Ok(true)
    }
}

impl<D> DisplaySink for DisplayManager<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    fn set_summary_text(&mut self, text: &str) {
        self.model.set_summary_text(text)
    }

    fn push_chart_point(&mut self, series: MeasurementType, value: f32) {
        self.model.push_chart_point(series, value)
    }

    fn set_progress(&mut self, percent: u8) {
        self.model.set_progress(percent)
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.model.set_send_enabled(enabled)
    }

    fn flush(&mut self) {
        if let Err(e) = self.render() {
            warn!("Summary screen redraw failed: {:?}", e);
        }
    }
}
