//! Summary screen: live summary line, session progress bar, Send button and
//! a line chart of the most recent samples.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Polyline, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle,
};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::display_manager::{CHART_POINTS, DisplayModel};
use crate::readings::MeasurementType;

const MARGIN: i32 = 8;
const SUMMARY_HEIGHT: u32 = 24;
const PROGRESS_HEIGHT: u32 = 12;
const BUTTON_HEIGHT: u32 = 28;
const BUTTON_WIDTH: u32 = 72;

const COLOR_BACKGROUND: Rgb565 = Rgb565::BLACK;
const COLOR_TEXT: Rgb565 = Rgb565::WHITE;
const COLOR_PROGRESS: Rgb565 = Rgb565::CSS_LIME_GREEN;
const COLOR_FRAME: Rgb565 = Rgb565::CSS_DIM_GRAY;

const fn series_color(series: MeasurementType) -> Rgb565 {
    match series {
        MeasurementType::Gsr => Rgb565::CSS_ORANGE,
        MeasurementType::Mic => Rgb565::CSS_VIOLET,
        MeasurementType::Roll | MeasurementType::AccelX => Rgb565::CSS_TOMATO,
        MeasurementType::Yaw | MeasurementType::AccelY => Rgb565::CSS_LIME_GREEN,
        MeasurementType::Pitch | MeasurementType::AccelZ => Rgb565::CSS_DODGER_BLUE,
    }
}

/// Fixed layout carved out of the display bounds.
#[derive(Debug, Clone, Copy)]
pub struct SummaryScreen {
    bounds: Rectangle,
    summary: Rectangle,
    progress: Rectangle,
    chart: Rectangle,
    button: Rectangle,
}

impl SummaryScreen {
    pub fn new(bounds: Rectangle) -> Self {
        let width = bounds.size.width.saturating_sub(2 * MARGIN as u32);
        let height = bounds.size.height;
        let left = bounds.top_left.x + MARGIN;
        let top = bounds.top_left.y + MARGIN;

        let summary = Rectangle::new(Point::new(left, top), Size::new(width, SUMMARY_HEIGHT));
        let progress = Rectangle::new(
            Point::new(left, top + SUMMARY_HEIGHT as i32 + 4),
            Size::new(width, PROGRESS_HEIGHT),
        );
        let button = Rectangle::new(
            Point::new(
                left + width as i32 - BUTTON_WIDTH as i32,
                bounds.top_left.y + height as i32 - MARGIN - BUTTON_HEIGHT as i32,
            ),
            Size::new(BUTTON_WIDTH, BUTTON_HEIGHT),
        );

        let chart_top = progress.top_left.y + PROGRESS_HEIGHT as i32 + MARGIN;
        let chart_bottom = button.top_left.y - MARGIN;
        let chart = Rectangle::new(
            Point::new(left, chart_top),
            Size::new(width, (chart_bottom - chart_top).max(0) as u32),
        );

        Self {
            bounds,
            summary,
            progress,
            chart,
            button,
        }
    }

    pub fn draw<D>(&self, model: &DisplayModel, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.bounds
            .into_styled(PrimitiveStyle::with_fill(COLOR_BACKGROUND))
            .draw(target)?;

        Text::with_baseline(
            model.summary(),
            self.summary.top_left,
            MonoTextStyle::new(&FONT_10X20, COLOR_TEXT),
            Baseline::Top,
        )
        .draw(target)?;

        self.draw_progress(model.progress(), target)?;
        self.draw_chart(model, target)?;
        self.draw_button(model.send_enabled(), target)
    }

    fn draw_progress<D>(&self, percent: u8, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.progress
            .into_styled(PrimitiveStyle::with_stroke(COLOR_FRAME, 1))
            .draw(target)?;

        let filled = self.progress.size.width * u32::from(percent.min(100)) / 100;
        if filled > 0 {
            Rectangle::new(
                self.progress.top_left,
                Size::new(filled, self.progress.size.height),
            )
            .into_styled(PrimitiveStyle::with_fill(COLOR_PROGRESS))
            .draw(target)?;
        }

        Ok(())
    }

    fn draw_chart<D>(&self, model: &DisplayModel, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.chart
            .into_styled(PrimitiveStyle::with_stroke(COLOR_FRAME, 1))
            .draw(target)?;

        let inner = self.chart.offset(-2);
        if inner.size.width < 2 || inner.size.height < 2 {
            return Ok(());
        }

        for series in MeasurementType::ALL {
            if model.chart_len(series) < 2 {
                continue;
            }

            let (min, max) = model
                .chart(series)
                .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let span = if max > min { max - min } else { 1.0 };

            let step = inner.size.width as f32 / (CHART_POINTS - 1) as f32;
            let bottom = inner.top_left.y + inner.size.height as i32 - 1;
            let scale = (inner.size.height - 1) as f32 / span;

            let mut points: heapless::Vec<Point, CHART_POINTS> = heapless::Vec::new();
            for (i, v) in model.chart(series).enumerate() {
                let x = inner.top_left.x + (i as f32 * step) as i32;
                let y = bottom - ((v - min) * scale) as i32;
                points.push(Point::new(x, y)).ok();
            }

            Polyline::new(&points)
                .into_styled(PrimitiveStyle::with_stroke(series_color(series), 1))
                .draw(target)?;
        }

        Ok(())
    }

    fn draw_button<D>(&self, enabled: bool, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let fill = if enabled {
            Rgb565::CSS_DODGER_BLUE
        } else {
            Rgb565::CSS_DARK_GRAY
        };
        let style = PrimitiveStyleBuilder::new()
            .fill_color(fill)
            .stroke_color(COLOR_TEXT)
            .stroke_width(2)
            .build();

        RoundedRectangle::with_equal_corners(self.button, Size::new(8, 8))
            .into_styled(style)
            .draw(target)?;

        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(
            "Send",
            self.button.center(),
            MonoTextStyle::new(&FONT_6X10, COLOR_TEXT),
            text_style,
        )
        .draw(target)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_manager::DisplaySink;
    use embedded_graphics::mock_display::MockDisplay;

    fn display() -> MockDisplay<Rgb565> {
        let mut display = MockDisplay::new();
        display.set_allow_overdraw(true);
        display.set_allow_out_of_bounds_drawing(true);
        display
    }

    #[test]
    fn test_layout_fits_full_screen() {
        let screen = SummaryScreen::new(Rectangle::new(Point::zero(), Size::new(320, 240)));
        assert!(screen.chart.size.height > 100);
        assert!(screen.chart.bottom_right().unwrap().y < screen.button.top_left.y);
        assert_eq!(screen.button.top_left, Point::new(240, 204));
    }

    #[test]
    fn test_progress_bar_fills_proportionally() {
        let bounds = Rectangle::new(Point::zero(), Size::new(64, 64));
        let screen = SummaryScreen::new(bounds);
        let mut target = display();

        screen.draw_progress(50, &mut target).unwrap();

        // 48 px wide bar, half filled
        let y = screen.progress.top_left.y + 2;
        let x = screen.progress.top_left.x;
        assert_eq!(target.get_pixel(Point::new(x + 10, y)), Some(COLOR_PROGRESS));
        assert_ne!(target.get_pixel(Point::new(x + 40, y)), Some(COLOR_PROGRESS));
    }

    #[test]
    fn test_draws_chart_and_button() {
        let screen = SummaryScreen::new(Rectangle::new(Point::zero(), Size::new(64, 64)));
        let mut model = DisplayModel::new();
        model.set_summary_text("Mic 42");
        model.set_send_enabled(true);
        for v in [1.0, 5.0, 3.0] {
            model.push_chart_point(MeasurementType::Mic, v);
        }

        let mut target = display();
        screen.draw(&model, &mut target).unwrap();
        assert!(target.affected_area().size.width > 0);
    }
}
