//! Chart Builder: renders count charts over a view as SVG documents.

use crate::analytics::{AGE_BAND_LABEL, age_band_counts, average_age_by_department};
use crate::columns::{COUNT_LABEL, Field};
use crate::error::{DashboardError, Result};
use crate::report::{CrossTab, aggregate, crosstab};
use crate::store::View;
use chrono::NaiveDate;
use plotters::prelude::*;

/// Bucket that collects the tail when a chart has more categories than bars
pub const OTHER_LABEL: &str = "أخرى";

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,

    /// Keep the largest `n` categories and fold the rest into one bar
    pub max_bars: Option<usize>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_label: String::new(),
            y_label: COUNT_LABEL.to_string(),
            width: 800,
            height: 500,
            max_bars: None,
        }
    }
}

impl GraphOptions {
    /// Defaults titled for the distribution of `field`
    pub fn for_field(field: Field) -> Self {
        Self {
            title: format!("توزيع الموظفين حسب {}", field.label()),
            x_label: field.label().to_string(),
            ..Self::default()
        }
    }
}

/// Bar chart of employee counts per value of a categorical field, largest
/// first. An empty view renders axes with no bars.
///
/// # Examples
/// ```
/// use hr_dashboard::columns::Field;
/// use hr_dashboard::graph::{GraphOptions, category_chart};
/// use hr_dashboard::store::RecordStore;
///
/// let store = RecordStore::empty();
/// let svg = category_chart(&store.full_view(), Field::Department, &GraphOptions::default()).unwrap();
/// assert!(svg.starts_with("<svg"));
/// ```
pub fn category_chart(view: &View, field: Field, options: &GraphOptions) -> Result<String> {
    if !field.is_categorical() {
        return Err(DashboardError::validation(format!(
            "`{}` is not a categorical column",
            field.label()
        )));
    }
    let mut counts: Vec<(String, usize)> = aggregate(view, &[field])?
        .rows
        .into_iter()
        .map(|row| (row.keys.concat(), row.count))
        .collect();
    // stable: ties keep first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    if let Some(max) = options.max_bars {
        if counts.len() > max {
            let other: usize = counts.drain(max..).map(|(_, n)| n).sum();
            counts.push((OTHER_LABEL.to_string(), other));
        }
    }
    bar_chart(&counts, options)
}

/// Employees per age band, youngest band first
pub fn age_histogram(view: &View, today: NaiveDate, options: &GraphOptions) -> Result<String> {
    let counts: Vec<(String, usize)> = age_band_counts(view, today)
        .into_iter()
        .map(|(band, n)| (band.to_string(), n))
        .collect();
    let options = GraphOptions {
        x_label: if options.x_label.is_empty() {
            AGE_BAND_LABEL.to_string()
        } else {
            options.x_label.clone()
        },
        ..options.clone()
    };
    bar_chart(&counts, &options)
}

/// Grouped bars of one categorical field against another: a group per
/// `row` value, one colored bar per `col` value
pub fn crosstab_chart(view: &View, row: Field, col: Field, options: &GraphOptions) -> Result<String> {
    for field in [row, col] {
        if !field.is_categorical() {
            return Err(DashboardError::validation(format!(
                "`{}` is not a categorical column",
                field.label()
            )));
        }
    }
    grouped_bar_chart(&crosstab(view, row, col, false)?, options)
}

/// Average age per department in first-seen order; departments without a
/// usable birth date are left out
pub fn average_age_chart(view: &View, today: NaiveDate, options: &GraphOptions) -> Result<String> {
    let data = average_age_by_department(view, today);
    let bars = u32::try_from(data.len().max(1))
        .map_err(|_| DashboardError::Chart("too many categories".into()))?;
    let y_top = data.iter().map(|(_, age)| *age).fold(0.0, f64::max) * 1.1 + 1.0;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..bars).into_segmented(), 0f64..y_top)?;

        let label_of = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => data
                .get(*i as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(data.len().max(1))
            .x_label_formatter(&label_of)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(RGBColor(0x2E, 0x8B, 0x57).filled())
                .margin(8)
                .data(data.iter().enumerate().map(|(i, (_, age))| (i as u32, *age))),
        )?;

        root.present()?;
    }
    Ok(svg)
}

/// Render a cross-tabulation as grouped bars with a legend of column labels
pub fn grouped_bar_chart(tab: &CrossTab, options: &GraphOptions) -> Result<String> {
    let groups = tab.row_labels.len().max(1);
    let width = 0.8 / tab.col_labels.len().max(1) as f64;
    let max_y = tab.counts.iter().flatten().copied().max().unwrap_or(0);
    let y_top = u32::try_from(max_y + 1 + max_y / 10)
        .map_err(|_| DashboardError::Chart("count too large to plot".into()))?;
    let centers: Vec<f64> = (0..tab.row_labels.len()).map(|i| i as f64 + 0.5).collect();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(50)
            .build_cartesian_2d((0f64..groups as f64).with_key_points(centers), 0u32..y_top)?;

        let label_of = |v: &f64| {
            tab.row_labels
                .get(v.floor().max(0.0) as usize)
                .cloned()
                .unwrap_or_default()
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&label_of)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        for (c, label) in tab.col_labels.iter().enumerate() {
            let color = Palette99::pick(c).to_rgba();
            chart
                .draw_series(tab.counts.iter().enumerate().map(|(r, row)| {
                    let x0 = r as f64 + 0.1 + c as f64 * width;
                    let n = row.get(c).copied().unwrap_or(0) as u32;
                    Rectangle::new([(x0, 0), (x0 + width, n)], color.filled())
                }))?
                .label(label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        if !tab.col_labels.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        root.present()?;
    }
    Ok(svg)
}

/// Render labelled counts as a vertical bar chart
pub fn bar_chart(data: &[(String, usize)], options: &GraphOptions) -> Result<String> {
    let bars = u32::try_from(data.len().max(1))
        .map_err(|_| DashboardError::Chart("too many categories".into()))?;
    let max_y = data.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let y_top = u32::try_from(max_y + 1 + max_y / 10)
        .map_err(|_| DashboardError::Chart("count too large to plot".into()))?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..bars).into_segmented(), 0u32..y_top)?;

        let label_of = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => data
                .get(*i as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(data.len().max(1))
            .x_label_formatter(&label_of)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(RGBColor(0x0E, 0x4C, 0x92).filled())
                .margin(8)
                .data(
                    data.iter()
                        .enumerate()
                        .map(|(i, (_, n))| (i as u32, *n as u32)),
                ),
        )?;

        root.present()?;
    }
    Ok(svg)
}
