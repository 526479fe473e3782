//! Headless summary screen that writes PNG snapshots of each redraw.

use std::path::PathBuf;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettings, OutputSettingsBuilder, SimulatorDisplay};
use log::{info, warn};

use parkit_core::display_manager::{DisplayManager, DisplaySink};
use parkit_core::readings::MeasurementType;

pub const DISPLAY_WIDTH_PX: u32 = 320;
pub const DISPLAY_HEIGHT_PX: u32 = 240;

const SNAPSHOT_SCALE: u32 = 2;

/// A [`DisplayManager`] over an in-memory framebuffer.
///
/// With a snapshot directory set, every redraw overwrites `summary.png` and
/// each completed session is kept as `session-NNN.png`.
pub struct SnapshotDisplay {
    manager: DisplayManager<SimulatorDisplay<Rgb565>>,
    output: OutputSettings,
    dir: Option<PathBuf>,
    sessions: u32,
    send_was_enabled: bool,
}

impl SnapshotDisplay {
    pub fn new(dir: Option<PathBuf>) -> Self {
        let display = SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX));

        if let Some(dir) = &dir {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("Snapshot directory {} unavailable: {}", dir.display(), e);
            } else {
                info!("Writing summary snapshots to {}", dir.display());
            }
        }

        Self {
            manager: DisplayManager::new(display),
            output: OutputSettingsBuilder::new().scale(SNAPSHOT_SCALE).build(),
            dir,
            sessions: 0,
            send_was_enabled: false,
        }
    }

    fn save(&self, name: &str) {
        let Some(dir) = &self.dir else {
            return;
        };

        let path = dir.join(name);
        let image = self.manager.display().to_rgb_output_image(&self.output);
        if let Err(e) = image.save_png(&path) {
            warn!("Snapshot {} not written: {}", path.display(), e);
        }
    }
}

impl DisplaySink for SnapshotDisplay {
    fn set_summary_text(&mut self, text: &str) {
        self.manager.set_summary_text(text);
    }

    fn push_chart_point(&mut self, series: MeasurementType, value: f32) {
        self.manager.push_chart_point(series, value);
    }

    fn set_progress(&mut self, percent: u8) {
        self.manager.set_progress(percent);
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.manager.set_send_enabled(enabled);
    }

    fn flush(&mut self) {
        let drawn = match self.manager.render() {
            Ok(drawn) => drawn,
            Err(e) => match e {},
        };
        if !drawn {
            return;
        }

        self.save("summary.png");

        let send_enabled = self.manager.model().send_enabled();
        if send_enabled && !self.send_was_enabled {
            self.sessions += 1;
            self.save(&format!("session-{:03}.png", self.sessions));
        }
        self.send_was_enabled = send_enabled;
    }
}
