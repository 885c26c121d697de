use clap::Parser;
use fire_spread_core::core_types::{AttrValue, Attributes};
use fire_spread_core::grid::build_arcs;
use fire_spread_core::vectors::FINAL_EXTENT_DAY;
use fire_spread_core::{
    build_hex_grid, build_rose_input, burn_probability, compute_angles, fireplain, fireshed,
    generate_daily_vectors, generate_fire_vectors, ignition_probability, pij_from_vectors,
    rose_sectors, select_sector, source_sink_ratio, AreaOfConcernOptions, BurnProbabilityOptions,
    CellSize, Columns, Crs, DailyVectorOptions, ErrorReport, Extent, Feature, FeatureCollection,
    FireVectorOptions, GroupBy, RoseWeight,
};
use geo::{coord, LineString, Point, Polygon, Rect};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;

/// Hexagon network post-processing demo on a synthetic fire landscape
#[derive(Parser, Debug)]
#[command(name = "fire-spread-demo")]
#[command(about = "Spread vectors, pij and burn probability for synthetic fires", long_about = None)]
struct Args {
    /// Hexagon area in square meters
    #[arg(short, long, default_value_t = 250_000.0)]
    cell_area: f64,

    /// Fires per iteration
    #[arg(short, long, default_value_t = 5)]
    fires: u32,

    /// Number of simulation iterations
    #[arg(short, long, default_value_t = 20)]
    iterations: u32,

    /// Days of spread per fire
    #[arg(short, long, default_value_t = 4)]
    days: u32,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Spread sector angle in degrees (0-360)
    #[arg(short, long, default_value_t = 90.0)]
    alpha: f64,

    /// Landscape size in meters (square map)
    #[arg(long, default_value_t = 20_000.0)]
    map_size: f64,

    /// Skipped-fire log of the final-perimeter vector run
    #[arg(long, default_value = "errorlog_finalfire.txt")]
    final_error_log: String,

    /// Skipped-fire log of the daily-progression vector run
    #[arg(long, default_value = "errorlog_dailyfire.txt")]
    daily_error_log: String,
}

/// Wind-driven elliptical perimeter, elongated along `heading` (radians from north)
fn ellipse(center: Point<f64>, head: f64, flank: f64, heading: f64) -> Polygon<f64> {
    let (sin_h, cos_h) = heading.sin_cos();
    let ring: Vec<_> = (0..64)
        .map(|k| {
            let t = 2.0 * PI * f64::from(k) / 64.0;
            // along = towards heading, across = to its right
            let along = head * t.cos();
            let across = flank * t.sin();
            coord! {
                x: center.x() + along * sin_h + across * cos_h,
                y: center.y() + along * cos_h - across * sin_h,
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

struct Landscape {
    final_perimeters: FeatureCollection,
    daily_perimeters: FeatureCollection,
    ignitions: FeatureCollection,
}

/// Fires grow for `days` days downwind of their ignition, each day a larger ellipse
fn synthetic_fires(args: &Args, crs: &Crs) -> fire_spread_core::Result<Landscape> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let columns = Columns::default();
    let margin = args.map_size * 0.2;
    let prevailing = rng.random_range(0.0..2.0 * PI);

    let mut final_perimeters = FeatureCollection::new(Some(crs.clone()));
    let mut daily_perimeters = FeatureCollection::new(Some(crs.clone()));
    let mut ignition_rows = Vec::new();

    for iteration in 1..=args.iterations {
        for local in 0..args.fires {
            let fire = i64::from((iteration - 1) * args.fires + local + 1);
            let ignition = Point::new(
                rng.random_range(margin..args.map_size - margin),
                rng.random_range(margin..args.map_size - margin),
            );
            let heading = prevailing + rng.random_range(-0.6..0.6);
            let daily_run = rng.random_range(300.0..900.0);

            let mut perimeter = None;
            for day in 1..=args.days {
                let head = daily_run * f64::from(day);
                let flank = head * 0.45;
                // ellipse centre drifts so its back edge stays near the ignition
                let offset = head * 0.8;
                let center = Point::new(
                    ignition.x() + offset * heading.sin(),
                    ignition.y() + offset * heading.cos(),
                );
                let shape = ellipse(center, head, flank, heading);
                daily_perimeters.push(
                    Feature::new(shape.clone())
                        .with(&columns.fire, fire)
                        .with(&columns.day, day),
                );
                perimeter = Some(shape);
            }
            if let Some(shape) = perimeter {
                final_perimeters.push(
                    Feature::new(shape)
                        .with(&columns.fire, fire)
                        .with(&columns.iteration, iteration),
                );
            }

            let mut row = Attributes::new();
            row.insert(columns.fire.clone(), AttrValue::Int(fire));
            row.insert(columns.iteration.clone(), AttrValue::from(iteration));
            row.insert(columns.x.clone(), AttrValue::Float(ignition.x()));
            row.insert(columns.y.clone(), AttrValue::Float(ignition.y()));
            ignition_rows.push(row);
        }
    }

    let ignitions = FeatureCollection::points_from_xy(ignition_rows, &columns, Some(crs.clone()))?;
    Ok(Landscape {
        final_perimeters,
        daily_perimeters,
        ignitions,
    })
}

fn main() -> fire_spread_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    println!("=== Fire Spread Network Demo ===\n");

    let crs = Crs::new("EPSG:3978");
    let extent = Extent::new(0.0, 0.0, args.map_size, args.map_size);
    let (grid, nodes) = build_hex_grid(extent, CellSize::Area(args.cell_area), Some(crs.clone()))?;
    let arcs = build_arcs(&grid);
    println!(
        "Hexagon network: {} hexagons (side {:.1} m), {} arcs",
        grid.len(),
        grid.side(),
        arcs.len()
    );

    let landscape = synthetic_fires(&args, &crs)?;
    println!(
        "Synthetic landscape: {} fires over {} iterations, {} daily perimeters\n",
        landscape.final_perimeters.len(),
        args.iterations,
        landscape.daily_perimeters.len()
    );

    // Final perimeters
    let options = FireVectorOptions {
        group_by: GroupBy::Iteration,
        ..FireVectorOptions::default()
    };
    let final_run = generate_fire_vectors(
        &landscape.final_perimeters,
        &landscape.ignitions,
        &grid,
        &options,
    )?;
    let pij = pij_from_vectors(&final_run.vectors, args.iterations)?;
    println!("--- Final perimeter vectors ---");
    println!(
        "{} vectors, {} hexagon pairs, {} fires skipped",
        final_run.vectors.len(),
        pij.len(),
        final_run.report.fire_errors.len()
    );
    for row in pij.iter().rev().take(5) {
        println!(
            "  {:>6} -> {:<6} firecount {:>3}  pij {}",
            row.origin, row.destination, row.firecount, row.pij_text
        );
    }

    let burn = burn_probability(
        &landscape.final_perimeters,
        &grid,
        args.iterations,
        &BurnProbabilityOptions::default(),
    )?;
    let ignition = ignition_probability(&landscape.ignitions, &grid, args.iterations)?;
    let max_burn = burn.rows.iter().map(|r| r.probability).fold(0.0, f64::max);
    let burned = burn.rows.iter().filter(|r| r.count > 0).count();
    let ignited = ignition.rows.iter().filter(|r| r.count > 0).count();
    println!("\n--- Likelihood ---");
    println!("Burned hexagons: {burned} (max burn probability {max_burn:.1}%)");
    println!("Hexagons with ignitions: {ignited}");
    print_warnings("burn probability", &burn.report);
    print_warnings("ignition probability", &ignition.report);

    let ssr = source_sink_ratio(&final_run.vectors, &grid);
    let sources = ssr.iter().filter(|r| r.ssr > 0.0).count();
    println!("Source-sink ratio defined for {} hexagons, {} net sources", ssr.len(), sources);

    let half = args.map_size / 2.0;
    let aoc = FeatureCollection::with_features(
        Some(crs.clone()),
        vec![Feature::new(
            Rect::new(
                coord! { x: half - 500.0, y: half - 500.0 },
                coord! { x: half + 500.0, y: half + 500.0 },
            )
            .to_polygon(),
        )],
    );
    let shed = fireshed(
        &final_run.vectors,
        &aoc,
        &landscape.final_perimeters,
        &grid,
        &AreaOfConcernOptions::default(),
    )?;
    let plain = fireplain(
        &final_run.vectors,
        &aoc,
        &landscape.final_perimeters,
        &grid,
        &AreaOfConcernOptions::default(),
    )?;
    println!("Fireshed of the central 1 km square: {} fires, {}", shed.fires.len(), shed.area);
    println!("Fireplain of the central 1 km square: {} fires, {}", plain.fires.len(), plain.area);
    print_warnings("fireshed", &shed.report);
    print_warnings("fireplain", &plain.report);

    // Daily progression
    let daily_run = generate_daily_vectors(
        &landscape.daily_perimeters,
        &landscape.ignitions,
        &grid,
        &DailyVectorOptions::default(),
    )?;
    let angles = compute_angles(&daily_run.vectors, &nodes);
    let sector = select_sector(&angles.rows, args.alpha)?;
    let reference = daily_run
        .vectors
        .iter()
        .filter(|v| v.day == Some(FINAL_EXTENT_DAY))
        .count();
    println!("\n--- Daily progression ---");
    println!(
        "{} vectors ({} ignition-to-final-extent), {} fires skipped",
        daily_run.vectors.len(),
        reference,
        daily_run.report.fire_errors.len()
    );
    println!(
        "{} angled rows, {} degenerate, {} within a {:.0} degree sector",
        angles.rows.len(),
        angles.degenerate,
        sector.len(),
        args.alpha
    );

    // Rose
    let rose = build_rose_input(&pij, &nodes);
    println!("\n--- Spread rose (pij weighted, direction fire comes from) ---");
    for bin in rose_sectors(&rose, 8, RoseWeight::Pij) {
        let bar = "#".repeat((bin.percent / 2.0).round() as usize);
        println!("  {:>5.1}  {:>5.1}% {}", *bin.center, bin.percent, bar);
    }

    println!();
    for (report, path) in [
        (&final_run.report, &args.final_error_log),
        (&daily_run.report, &args.daily_error_log),
    ] {
        report.write_log(path)?;
        println!("Wrote {} skipped-fire records to {}", report.fire_errors.len(), path);
    }
    Ok(())
}

fn print_warnings(stage: &str, report: &ErrorReport) {
    for warning in &report.warnings {
        println!("  [{stage}] warning: {warning}");
    }
}
