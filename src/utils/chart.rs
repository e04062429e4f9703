// src/utils/chart.rs

use plotters::prelude::*;
use std::ops::Range;

/// Y axis range covering every value, padded when the values are all equal.
pub fn value_range(values: &[f64]) -> Option<Range<f64>> {
    let finite = values.iter().cloned().filter(|v| v.is_finite());
    let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        None => Some((v, v)),
    })?;

    if (max - min).abs() < f64::EPSILON {
        Some((min - 1.0)..(max + 1.0))
    } else {
        Some(min..max)
    }
}

/// Points of the forecast series, starting from the last historical close so
/// the two lines join up.
pub fn forecast_points(history: &[f64], forecast: &[f64]) -> Vec<(usize, f64)> {
    let anchor = history.last().map(|last| (history.len() - 1, *last));
    anchor
        .into_iter()
        .chain(forecast.iter().enumerate().map(|(i, y)| (history.len() + i, *y)))
        .collect()
}

/// Renders historical closes and forecast values as an SVG line chart.
pub fn render_forecast_svg(history: &[f64], forecast: &[f64]) -> Result<String, Box<dyn std::error::Error>> {
    let all: Vec<f64> = history.iter().chain(forecast).cloned().collect();
    let y_range = value_range(&all).ok_or("nothing to plot")?;
    let x_end = all.len().max(2);

    let mut svg = String::new();
    {
        let root_area = SVGBackend::with_string(&mut svg, (800, 600)).into_drawing_area();
        root_area.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root_area)
            .caption("Stock Price Prediction", ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0..x_end, y_range)?;
        chart.configure_mesh().x_desc("Time").y_desc("Close Price").draw()?;

        chart
            .draw_series(LineSeries::new(
                history.iter().enumerate().map(|(x, y)| (x, *y)),
                &BLUE,
            ))?
            .label("Historical Close")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        if !forecast.is_empty() {
            let points = forecast_points(history, forecast);
            chart
                .draw_series(LineSeries::new(points.clone(), &GREEN))?
                .label("Predicted Close")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));
            chart.draw_series(
                points
                    .iter()
                    .skip(usize::from(!history.is_empty()))
                    .map(|p| Circle::new(*p, 4, GREEN.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        root_area.present()?;
    }

    Ok(svg)
}
