use std::{
    fs,
    path::{Path, PathBuf},
};

use motor_tasks::Trajectory;
use plotters::{
    coord::{types::RangedCoordf64, Shift},
    prelude::*,
};

use crate::{error::backend, PlotError, PlotFormat, PreparedSeries, Result, Series};

/// Name of the overview figure inside the results directory, without extension
pub const OVERALL_FILE_STEM: &str = "Overall";

const PURPLE: RGBColor = RGBColor(128, 0, 128);
const GREY: RGBColor = RGBColor(128, 128, 128);
const PANEL_HEIGHT: u32 = 320;
const WIDTH: u32 = 1600;
const DISTINCT_DIMS: (u32, u32) = (1000, 700);
/// Only every tenth testing point is drawn in the distinct trajectory figure
const DISTINCT_STRIDE: usize = 10;

/// Describes the run in the figure title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotInfo {
    pub task_type: u8,
    pub n_segs: usize,
    pub seed: u64,
}

struct Line<'a> {
    points: Series,
    style: ShapeStyle,
    label: &'a str,
}

impl<'a> Line<'a> {
    fn over_time(values: &[f64], style: ShapeStyle, label: &'a str) -> Self {
        Self {
            points: values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect(),
            style,
            label,
        }
    }
}

/// Render the overview figure of a run into `dir`, returning its path.
///
/// Panels from top to bottom: endpoint trajectory while testing, readout
/// norm, distance from target, x and y coordinate, joint angles of small
/// arms, cost of the costed arm.
pub fn plot_overall(
    prepared: &PreparedSeries,
    target: &Trajectory,
    info: &PlotInfo,
    dir: &Path,
    format: PlotFormat,
) -> Result<PathBuf> {
    check_inputs(prepared, target)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", OVERALL_FILE_STEM, format.extension()));
    let panels = overall_panels(prepared, info);
    let dims = (WIDTH, PANEL_HEIGHT * panels.len() as u32);
    info!("plotting {} points per series into {}", prepared.len(), path.display());

    if format.is_bitmap() {
        draw(BitMapBackend::new(&path, dims).into_drawing_area(), &panels, prepared, target, info)?;
    } else {
        draw(SVGBackend::new(&path, dims).into_drawing_area(), &panels, prepared, target, info)?;
    }

    info!("successfully plotted to {}", path.display());
    Ok(path)
}

/// Render every panel of a run as a figure of its own into `dir`, returning
/// the paths in the order they were written.
///
/// Files are named after their content: TimeSeries, W_norm, MSE, CoordinateX,
/// CoordinateY, then Cost for the costed arm and Theta0, Theta1, .. for small
/// arms.
pub fn plot_distinct(
    prepared: &PreparedSeries,
    target: &Trajectory,
    info: &PlotInfo,
    dir: &Path,
    format: PlotFormat,
) -> Result<Vec<PathBuf>> {
    check_inputs(prepared, target)?;

    fs::create_dir_all(dir)?;
    let tiled = target.tiled(prepared.n_trials());
    let mut paths = Vec::new();
    for panel in distinct_panels(prepared, info) {
        let path = dir.join(format!("{}.{}", panel.file_stem(), format.extension()));
        if format.is_bitmap() {
            let root = BitMapBackend::new(&path, DISTINCT_DIMS).into_drawing_area();
            draw_single(root, panel, prepared, target, &tiled)?;
        } else {
            let root = SVGBackend::new(&path, DISTINCT_DIMS).into_drawing_area();
            draw_single(root, panel, prepared, target, &tiled)?;
        }
        debug!("plotted {}", path.display());
        paths.push(path);
    }

    info!("successfully plotted {} figures into {}", paths.len(), dir.display());
    Ok(paths)
}

fn check_inputs(prepared: &PreparedSeries, target: &Trajectory) -> Result<()> {
    if prepared.is_empty() {
        return Err(PlotError::EmptySeries("prepared series"));
    }
    if target.len() != prepared.n_timesteps() {
        return Err(PlotError::InvalidInput(format!(
            "target has {} points but trials are {} timesteps long",
            target.len(),
            prepared.n_timesteps()
        )));
    }

    Ok(())
}

/// What a single panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    /// Endpoint in the plane. Every `stride`th testing point is drawn, the
    /// last training trial is greyed in when `last_training` is set.
    Trajectory { stride: usize, last_training: bool },
    WeightNorm,
    Distance,
    /// 0 for x, 1 for y
    Coordinate(usize),
    /// One joint angle, with its perturbed counterpart when `exploratory`
    Theta { index: usize, exploratory: bool },
    Cost,
}

impl Panel {
    fn file_stem(&self) -> String {
        match self {
            Panel::Trajectory { .. } => "TimeSeries".to_string(),
            Panel::WeightNorm => "W_norm".to_string(),
            Panel::Distance => "MSE".to_string(),
            Panel::Coordinate(0) => "CoordinateX".to_string(),
            Panel::Coordinate(_) => "CoordinateY".to_string(),
            Panel::Theta { index, .. } => format!("Theta{}", index),
            Panel::Cost => "Cost".to_string(),
        }
    }
}

fn shows_joint_angles(prepared: &PreparedSeries, info: &PlotInfo) -> bool {
    info.task_type != 1 && prepared.n_out() <= 4
}

fn overall_panels(prepared: &PreparedSeries, info: &PlotInfo) -> Vec<Panel> {
    let mut panels = vec![
        Panel::Trajectory {
            stride: 1,
            last_training: true,
        },
        Panel::WeightNorm,
        Panel::Distance,
        Panel::Coordinate(0),
        Panel::Coordinate(1),
    ];
    if shows_joint_angles(prepared, info) {
        panels.extend((0..prepared.n_out()).map(|index| Panel::Theta {
            index,
            exploratory: true,
        }));
    }
    if info.task_type == 3 {
        panels.push(Panel::Cost);
    }

    panels
}

fn distinct_panels(prepared: &PreparedSeries, info: &PlotInfo) -> Vec<Panel> {
    let mut panels = vec![
        Panel::Trajectory {
            stride: DISTINCT_STRIDE,
            last_training: false,
        },
        Panel::WeightNorm,
        Panel::Distance,
        Panel::Coordinate(0),
        Panel::Coordinate(1),
    ];
    if info.task_type == 3 {
        panels.push(Panel::Cost);
    }
    if shows_joint_angles(prepared, info) {
        panels.extend((0..prepared.n_out()).map(|index| Panel::Theta {
            index,
            exploratory: false,
        }));
    }

    panels
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    panels: &[Panel],
    p: &PreparedSeries,
    target: &Trajectory,
    info: &PlotInfo,
) -> Result<()> {
    root.fill(&WHITE).map_err(backend)?;
    let title = format!(
        "Results of RMHL simulation on task #{} with {} segments at seed {}",
        info.task_type, info.n_segs, info.seed
    );
    let root = root.titled(&title, ("sans-serif", 30).into_font()).map_err(backend)?;
    let areas = root.split_evenly((panels.len(), 1));
    let tiled = target.tiled(p.n_trials());

    for (area, panel) in areas.iter().zip(panels.iter()) {
        draw_panel(area, *panel, p, target, &tiled)?;
    }
    root.present().map_err(backend)?;

    Ok(())
}

fn draw_single<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    panel: Panel,
    p: &PreparedSeries,
    target: &Trajectory,
    tiled: &(Vec<f64>, Vec<f64>),
) -> Result<()> {
    root.fill(&WHITE).map_err(backend)?;
    draw_panel(&root, panel, p, target, tiled)?;
    root.present().map_err(backend)?;

    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: Panel,
    p: &PreparedSeries,
    target: &Trajectory,
    tiled: &(Vec<f64>, Vec<f64>),
) -> Result<()> {
    let boundary = p.boundary() as f64;
    match panel {
        Panel::Trajectory {
            stride,
            last_training,
        } => trajectory_panel(area, p, target, stride, last_training),
        Panel::WeightNorm => time_panel(
            area,
            "Norm of weight matrix",
            &[Line::over_time(&p.w_norm, GREEN.stroke_width(1), "||W||")],
            boundary,
            false,
        ),
        Panel::Distance => time_panel(
            area,
            "Distance from target",
            &[Line::over_time(&p.mse, GREEN.stroke_width(1), "E")],
            boundary,
            true,
        ),
        Panel::Coordinate(k) => {
            let (axis, target_k) = if k == 0 { ("x", &tiled.0) } else { ("y", &tiled.1) };
            time_panel(
                area,
                &format!("{} coordinate", axis),
                &[
                    Line::over_time(&p.hz_bar[k], PURPLE.stroke_width(1), "output"),
                    Line::over_time(target_k, RED.stroke_width(1), "target"),
                ],
                boundary,
                false,
            )
        }
        Panel::Theta { index, exploratory } => {
            let mut lines = vec![Line::over_time(&p.z_bar[index], PURPLE.stroke_width(1), "observed")];
            if exploratory {
                lines.push(Line::over_time(
                    &p.z_rmhl_bar[index],
                    GREEN.mix(0.5).stroke_width(1),
                    "exploratory",
                ));
            }
            time_panel(area, &format!("Theta{}", index), &lines, boundary, false)
        }
        Panel::Cost => time_panel(
            area,
            "Cost of moving the arm",
            &[Line::over_time(&p.cost_bar, GREEN.stroke_width(1), "cost")],
            boundary,
            true,
        ),
    }
}

/// Endpoint in the plane: the target, optionally the last training trial
/// greyed out, and the testing trials
fn trajectory_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    p: &PreparedSeries,
    target: &Trajectory,
    stride: usize,
    last_training: bool,
) -> Result<()> {
    let plane = |from: usize, to: usize, step: usize| -> Series {
        (from..to).step_by(step.max(1)).map(|i| (p.hz_bar[0][i], p.hz_bar[1][i])).collect()
    };
    let mut lines = vec![Line {
        points: target.x().iter().copied().zip(target.y().iter().copied()).collect(),
        style: RED.stroke_width(1),
        label: "target",
    }];
    if last_training {
        lines.push(Line {
            points: plane(p.boundary().saturating_sub(p.n_timesteps()), p.boundary(), 1),
            style: GREY.mix(0.8).stroke_width(1),
            label: "last training trial",
        });
    }
    lines.push(Line {
        points: plane(p.boundary(), p.len(), stride),
        style: GREEN.stroke_width(1),
        label: "testing",
    });

    let (x_lo, x_hi) = bounds(lines.iter().flat_map(|l| l.points.iter().map(|pt| pt.0)), false)
        .ok_or(PlotError::EmptySeries("trajectory"))?;
    let (y_lo, y_hi) = bounds(lines.iter().flat_map(|l| l.points.iter().map(|pt| pt.1)), false)
        .ok_or(PlotError::EmptySeries("trajectory"))?;

    let mut chart = ChartBuilder::on(area)
        .margin(5)
        .set_all_label_area_size(50)
        .caption("Output during testing phase", ("sans-serif", 20).into_font().with_color(&BLACK))
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(backend)?;
    chart
        .configure_mesh()
        .x_labels(10)
        .y_labels(5)
        .x_label_formatter(&|v| format!("{:.2}", v))
        .y_label_formatter(&|v| format!("{:.2}", v))
        .draw()
        .map_err(backend)?;

    draw_lines(&mut chart, &lines, None)
}

/// A panel of series over the flattened timesteps with the start of testing
/// marked
fn time_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    lines: &[Line],
    boundary: f64,
    log: bool,
) -> Result<()> {
    let x_hi = lines.iter().map(|l| l.points.len()).max().unwrap_or(0).max(2) as f64 - 1.0;
    let values = || lines.iter().flat_map(|l| l.points.iter().map(|pt| pt.1));
    let builder = move || {
        let mut b = ChartBuilder::on(area);
        b.margin(5)
            .set_all_label_area_size(50)
            .caption(caption, ("sans-serif", 20).into_font().with_color(&BLACK));
        b
    };

    // a log axis is only possible with some positive value to show
    if let (true, Some((lo, hi))) = (log, bounds(values(), true)) {
        let mut chart = builder()
            .build_cartesian_2d(0.0..x_hi, (lo..hi).log_scale())
            .map_err(backend)?;
        chart
            .configure_mesh()
            .x_labels(20)
            .y_labels(5)
            .x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.0e}", v))
            .draw()
            .map_err(backend)?;
        return draw_lines(&mut chart, lines, Some((boundary, lo, hi)));
    }

    let (lo, hi) = bounds(values(), false).unwrap_or((0.0, 1.0));
    let mut chart = builder()
        .build_cartesian_2d(0.0..x_hi, lo..hi)
        .map_err(backend)?;
    chart
        .configure_mesh()
        .x_labels(20)
        .y_labels(5)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.3}", v))
        .draw()
        .map_err(backend)?;

    draw_lines(&mut chart, lines, Some((boundary, lo, hi)))
}

fn draw_lines<'a, DB, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>,
    lines: &[Line],
    marker: Option<(f64, f64, f64)>,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    Y: Ranged<ValueType = f64>,
{
    for line in lines {
        let style = line.style;
        chart
            .draw_series(LineSeries::new(
                line.points.iter().copied().filter(|(x, y)| x.is_finite() && y.is_finite()),
                style,
            ))
            .map_err(backend)?
            .label(line.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    if let Some((at, lo, hi)) = marker {
        chart
            .draw_series(LineSeries::new(vec![(at, lo), (at, hi)], BLACK.mix(0.3).stroke_width(4)))
            .map_err(backend)?
            .label("testing phase")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.mix(0.3).stroke_width(4)));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(backend)?;

    Ok(())
}

/// Smallest and largest finite value, padded when they coincide.
/// `positive` restricts to values a log axis can show.
fn bounds(values: impl Iterator<Item = f64>, positive: bool) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite() && (!positive || *v > 0.0))
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if hi > lo {
        return Some((lo, hi));
    }
    if positive {
        Some((lo * 0.5, hi * 2.0))
    } else {
        let pad = lo.abs().max(1.0) * 0.1;
        Some((lo - pad, hi + pad))
    }
}
