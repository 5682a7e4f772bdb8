//! Backend-neutral figure model. Rendering lives with the caller; the
//! library only describes what to draw.

use serde::{Deserialize, Serialize};

use crate::signal::{Events, TimeSeries};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

/// Thin dense series down to roughly `max_points` for drawing.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

pub fn figure_from_timeseries(
    title: &str,
    series: &TimeSeries,
    max_points: usize,
    color: u32,
) -> Figure {
    let dt = 1.0 / series.fs.max(1.0);
    let points: Vec<[f64; 2]> = series
        .data
        .iter()
        .enumerate()
        .map(|(i, value)| [i as f64 * dt, *value])
        .collect();
    let mut fig = Figure::new(Some(title.into()));
    fig.add_series(Series::Line(LineSeries {
        name: title.into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            color: Color(color),
        },
    }));
    fig
}

/// Signal trace with detected beats overlaid as markers.
pub fn figure_with_beats(
    title: &str,
    series: &TimeSeries,
    beats: &Events,
    max_points: usize,
) -> Figure {
    let mut fig = figure_from_timeseries(title, series, max_points, 0x2266CC);
    let dt = 1.0 / series.fs.max(1.0);
    let markers: Vec<[f64; 2]> = beats
        .indices
        .iter()
        .filter(|&&idx| idx < series.len())
        .map(|&idx| [idx as f64 * dt, series.data[idx]])
        .collect();
    fig.add_series(Series::Markers(MarkerSeries {
        name: "beats".into(),
        points: markers,
        style: Style {
            width: 3.0,
            color: Color(0xCC2222),
        },
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimation_caps_point_count() {
        let points: Vec<[f64; 2]> = (0..5000).map(|i| [i as f64, 0.0]).collect();
        let thin = decimate_points(&points, 1024);
        assert!(thin.len() <= 1024);
        assert_eq!(thin[0], [0.0, 0.0]);
    }

    #[test]
    fn beat_overlay_skips_out_of_range_indices() {
        let ts = TimeSeries {
            fs: 4.0,
            data: vec![0.0, 1.0, 0.5, 2.0],
        };
        let beats = Events::from_indices(vec![1, 3, 99]);
        let fig = figure_with_beats("ecg", &ts, &beats, 1024);
        let Series::Markers(markers) = &fig.series[1] else {
            panic!("expected marker series");
        };
        assert_eq!(markers.points.len(), 2);
        assert_eq!(markers.points[1], [0.75, 2.0]);
    }
}
