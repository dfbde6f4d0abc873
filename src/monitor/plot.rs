use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::monitor::buffer::WaveformFrame;
use crate::monitor::error::MonitorError;
use crate::monitor::sample::DefectMarker;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    /// One colour per channel, in channel order.
    pub palette: Vec<RGBColor>,
    pub marker: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(16, 16, 16),
            palette: vec![RGBColor(0, 255, 136), RGBColor(0, 191, 255)],
            marker: RGBColor(255, 51, 51),
        }
    }
}

/// Renders a buffer snapshot plus defect markers to a PNG.
///
/// Channel opacity from the frame is mixed into the line colour, so the
/// de-emphasised channel draws dimmed the way the operator chart shows it.
pub fn render_waveform_png(
    frame: &WaveformFrame,
    markers: &[DefectMarker],
    style: PlotStyle,
) -> Result<Vec<u8>, MonitorError> {
    if frame.traces.iter().all(|t| t.samples.is_empty()) {
        return Err(MonitorError::Plot("waveform frame has no samples".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;

        let all_samples = frame.traces.iter().flat_map(|t| t.samples.iter());
        let (mut t_min, mut t_max) = (f64::MAX, f64::MIN);
        let (mut y_min, mut y_max) = (f64::MAX, f64::MIN);
        for s in all_samples {
            t_min = t_min.min(s.timestamp_secs);
            t_max = t_max.max(s.timestamp_secs);
            if s.amplitude_mv.is_finite() {
                y_min = y_min.min(s.amplitude_mv);
                y_max = y_max.max(s.amplitude_mv);
            }
        }
        if t_max <= t_min {
            t_max = t_min + 1.0;
        }
        let (y_min, y_max) = if y_min >= y_max {
            (-50.0, 50.0)
        } else {
            let pad = (y_max - y_min) * 0.1;
            (y_min - pad, y_max + pad)
        };

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "Magnetic Signal Waveform",
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(t_min..t_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .x_desc("time (s)")
            .y_desc("amplitude (mV)")
            .axis_desc_style(("sans-serif", 14).into_font().color(&WHITE))
            .draw()?;

        for trace in &frame.traces {
            if trace.samples.is_empty() {
                continue;
            }
            let color = style
                .palette
                .get(trace.channel.index())
                .copied()
                .unwrap_or(WHITE)
                .mix(trace.opacity.max(0.05));
            let label = trace.channel.to_string();
            let series = trace
                .samples
                .iter()
                .map(|s| (s.timestamp_secs, s.amplitude_mv));
            let legend_color = color;
            chart
                .draw_series(LineSeries::new(series, color.stroke_width(2)))?
                .label(label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], legend_color.stroke_width(2))
                });
        }

        if !markers.is_empty() {
            chart
                .draw_series(markers.iter().map(|m| {
                    Circle::new(
                        (m.timestamp_secs, m.amplitude_mv),
                        5,
                        style.marker.filled(),
                    )
                }))?
                .label("defects")
                .legend({
                    let marker = style.marker;
                    move |(x, y)| Circle::new((x + 10, y), 4, marker.filled())
                });
        }

        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .label_font(("sans-serif", 13).into_font().color(&WHITE))
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MonitorError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| MonitorError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::buffer::WaveformBuffer;
    use crate::monitor::sample::{Channel, Sample};

    #[test]
    fn renders_png_with_markers() {
        let mut buffer = WaveformBuffer::new(100).unwrap();
        let samples: Vec<Sample> = (0..50)
            .map(|i| Sample::new(i as f64 * 0.01, Channel::One, (i as f64 * 0.3).sin() * 50.0))
            .collect();
        buffer.append(Channel::One, &samples);
        let markers = [DefectMarker {
            timestamp_secs: 0.25,
            amplitude_mv: 40.0,
            channel: Channel::One,
        }];
        let png = render_waveform_png(&buffer.frame(), &markers, PlotStyle::default()).unwrap();
        assert!(!png.is_empty());
        // PNG signature.
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn empty_frame_is_an_error() {
        let buffer = WaveformBuffer::new(10).unwrap();
        assert!(render_waveform_png(&buffer.frame(), &[], PlotStyle::default()).is_err());
    }
}
