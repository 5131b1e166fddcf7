#[macro_use]
extern crate log;

use std::{error::Error, time::Instant};

use dialoguer::{theme::ColorfulTheme, Select};
use motor_tasks::{Algorithm, Trajectory};
use rc_plot::{plot_distinct, plot_overall, prepare, PlotFormat, PlotInfo};
use rmhl::{Experiment, Model, ModelParams, ResultBundle, Toggle};
use time_series_generator::generate_sine_wave;

type DemoResult<T> = Result<T, Box<dyn Error>>;

const SEED: u64 = 0;
const CIRCLE_RADIUS: f64 = 0.5;
const CIRCLE_CENTER: (f64, f64) = (0.5, 0.5);

pub(crate) fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> DemoResult<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (params, exp) = match args.as_slice() {
        [model, experiment] => (ModelParams::load(model)?, Experiment::load(experiment)?),
        [] => select_experiment()?,
        _ => return Err("usage: reaching [<model.json> <experiment.json>]".into()),
    };

    if !exp.dataset_file.exists() {
        let n_timesteps = (exp.timespan / params.dt) as usize;
        let target = circle(n_timesteps)?;
        target.save(&exp.dataset_file)?;
        info!("generated a circular target of {} points at {}", n_timesteps, exp.dataset_file.display());
    }

    let t0 = Instant::now();
    let mut model = Model::from_config(params.clone(), exp.clone())?;
    info!(
        "built a reservoir of {} neurons with {} connections in {}ms",
        model.reservoir().size(),
        model.reservoir().nonzero_count(),
        t0.elapsed().as_millis()
    );

    model.run()?;
    let saved = model.save()?;
    info!("results are in {}", saved.display());

    let t0 = Instant::now();
    let bundle = ResultBundle::load(&saved)?;
    let prepared = prepare(&bundle, params.n_train_trials, params.dt, params.tau_e, params.tau_z)?;
    let format: PlotFormat = exp.plot_format.parse()?;
    let info = PlotInfo {
        task_type: exp.task_type,
        n_segs: exp.n_segs,
        seed: model.seed(),
    };
    let figure = plot_overall(&prepared, model.target(), &info, &model.results_dir(), format)?;
    let distinct = plot_distinct(&prepared, model.target(), &info, &model.results_dir(), format)?;
    info!("plotting done in {}ms", t0.elapsed().as_millis());

    if exp.display_plot == Toggle::Yes {
        info!("open {} to inspect the run", figure.display());
        for path in distinct.iter() {
            info!("single figure at {}", path.display());
        }
    }

    Ok(())
}

fn select_experiment() -> DemoResult<(ModelParams, Experiment)> {
    let tasks = vec!["Coordinates", "Joint angles", "Joint angles with cost"];
    let e = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select Task")
        .items(&tasks)
        .default(0)
        .interact()?;
    let task_type = e as u8 + 1;

    let params = ModelParams {
        reservoir_size: 500,
        lambda: 1.5,
        sparsity: 0.1,
        dt: 0.1,
        n_train_trials: 50,
        n_test_trials: 10,
        alpha: 0.05,
        tau: 10.0,
        tau_w: 100.0,
        tau_e: 20.0,
        tau_z: 5.0,
    };
    let exp = Experiment {
        rseed: SEED,
        dataset_file: "data/circle.json".into(),
        algorithm: Algorithm::Rmhl,
        results_folder: format!("results/task{}", task_type).into(),
        timespan: 100.0,
        task_type,
        n_segs: 3,
        arm_len: 0.5,
        arm_cost: 0.1,
        display_plot: Toggle::No,
        plot_format: "png".to_string(),
    };

    Ok((params, exp))
}

/// One turn around a circle. The sine wave gives the y coordinate, x follows
/// from it with the sign of its slope.
fn circle(n: usize) -> DemoResult<Trajectory> {
    let wave = generate_sine_wave(n);
    let amplitude = wave.iter().fold(0.0_f64, |a, v| a.max(v.abs()));
    if amplitude == 0.0 {
        return Err("generated sine wave is flat".into());
    }
    let sin: Vec<f64> = wave.iter().map(|v| v / amplitude).collect();

    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let next = sin[(i + 1) % n];
        let cos = (1.0 - sin[i] * sin[i]).max(0.0).sqrt();
        let cos = if next >= sin[i] { cos } else { -cos };
        x.push(CIRCLE_CENTER.0 + CIRCLE_RADIUS * cos);
        y.push(CIRCLE_CENTER.1 + CIRCLE_RADIUS * sin[i]);
    }

    Ok(Trajectory::new(x, y)?)
}
