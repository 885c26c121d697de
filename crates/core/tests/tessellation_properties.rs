//! Property tests for the hexagon tessellation and its adjacency arcs
//!
//! Random extents and cell sizes come from a seeded generator so failures
//! reproduce.

use approx::assert_relative_eq;
use fire_spread_core::core_types::Extent;
use fire_spread_core::grid::{
    build_arcs, build_hex_grid, build_hex_grid_only, centroids_of, hex_side, CellSize, HexGrid,
};
use fire_spread_core::overlay::hexes_containing;
use geo::{Area, Contains, EuclideanDistance, EuclideanLength, Intersects, Line, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn random_extent(rng: &mut StdRng) -> Extent {
    let xmin = rng.random_range(-5_000.0..5_000.0);
    let ymin = rng.random_range(-5_000.0..5_000.0);
    let width = rng.random_range(1.0..800.0);
    let height = rng.random_range(1.0..800.0);
    Extent::new(xmin, ymin, xmin + width, ymin + height)
}

fn random_size(rng: &mut StdRng) -> CellSize {
    match rng.random_range(0..3) {
        0 => CellSize::Area(rng.random_range(500.0..40_000.0)),
        1 => CellSize::Side(rng.random_range(15.0..120.0)),
        _ => CellSize::Diameter(rng.random_range(30.0..240.0)),
    }
}

fn edge_length(grid: &HexGrid) -> f64 {
    let ring = grid.cells()[0].polygon.exterior();
    Line::new(ring.0[0], ring.0[1]).euclidean_length()
}

#[test]
fn test_grid_covers_extent() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..25 {
        let extent = random_extent(&mut rng);
        let size = random_size(&mut rng);
        let grid = build_hex_grid_only(extent, size, None).unwrap();

        // corners plus random interior points
        let mut samples = vec![
            Point::new(extent.xmin, extent.ymin),
            Point::new(extent.xmax, extent.ymin),
            Point::new(extent.xmin, extent.ymax),
            Point::new(extent.xmax, extent.ymax),
        ];
        for _ in 0..200 {
            samples.push(Point::new(
                rng.random_range(extent.xmin..=extent.xmax),
                rng.random_range(extent.ymin..=extent.ymax),
            ));
        }

        for p in samples {
            let covering = grid
                .cells()
                .iter()
                .filter(|c| c.polygon.intersects(&p))
                .count();
            assert!(covering >= 1, "{:?} not covered for {:?} / {:?}", p, extent, size);

            let strictly_inside = grid.cells().iter().filter(|c| c.polygon.contains(&p)).count();
            assert!(strictly_inside <= 1, "hexagons overlap at {:?}", p);
        }
    }
}

#[test]
fn test_cell_size_equivalence() {
    let area = 10_000.0;
    let side = hex_side(area);
    let extent = Extent::new(0.0, 0.0, 1_000.0, 700.0);

    let by_area = build_hex_grid_only(extent, CellSize::Area(area), None).unwrap();
    let by_side = build_hex_grid_only(extent, CellSize::Side(side), None).unwrap();
    let by_diameter = build_hex_grid_only(extent, CellSize::Diameter(2.0 * side), None).unwrap();

    for grid in [&by_area, &by_side, &by_diameter] {
        assert_eq!(grid.len(), by_area.len());
        assert_relative_eq!(grid.side(), side, max_relative = 1e-12);
        assert_relative_eq!(edge_length(grid), side, max_relative = 1e-9);
        assert_relative_eq!(grid.cells()[0].polygon.unsigned_area(), area, max_relative = 1e-9);
    }
}

#[test]
fn test_minimal_extent_scenario() {
    let extent = Extent::new(0.0, 0.0, 100.0, 100.0);
    let (grid, nodes) = build_hex_grid(extent, CellSize::Side(50.0), None).unwrap();
    assert_eq!(grid.len(), 14);
    assert_eq!(nodes.len(), grid.len());

    let holders = hexes_containing(extent.center(), &grid);
    assert_eq!(holders.len(), 1);
    let center_hex = grid.cell(holders[0]).unwrap();
    assert!(center_hex.polygon.contains(&Point::new(50.0, 50.0)));
}

#[test]
fn test_centroids_match_lattice() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..5 {
        let (grid, nodes) = build_hex_grid(random_extent(&mut rng), random_size(&mut rng), None).unwrap();
        let derived = centroids_of(&grid);
        for node in nodes.nodes() {
            let p = derived.point(node.id).unwrap();
            assert_relative_eq!(p.x(), node.point.x(), epsilon = 1e-6);
            assert_relative_eq!(p.y(), node.point.y(), epsilon = 1e-6);
        }
    }
}

#[test]
fn test_arcs_symmetric_and_loop_free() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..5 {
        let grid = build_hex_grid_only(random_extent(&mut rng), random_size(&mut rng), None).unwrap();
        let arcs = build_arcs(&grid);
        for arc in &arcs {
            assert_ne!(arc.node_1, arc.node_2);
            assert!(arcs.contains(arc.node_1, arc.node_2));
            assert!(arcs.contains(arc.node_2, arc.node_1));
            assert!(arcs.neighbors(arc.node_1).contains(&arc.node_2));
            assert!(arcs.neighbors(arc.node_2).contains(&arc.node_1));
        }
        for cell in grid.cells() {
            assert!(arcs.neighbors(cell.node_id).len() <= 6);
        }
    }
}

#[test]
fn test_arcs_match_pairwise_scan() {
    let grid = build_hex_grid_only(Extent::new(0.0, 0.0, 400.0, 300.0), CellSize::Side(35.0), None).unwrap();
    let arcs = build_arcs(&grid);

    let tolerance = 1e-6 * grid.side();
    let mut expected = Vec::new();
    for (i, a) in grid.cells().iter().enumerate() {
        for b in &grid.cells()[i + 1..] {
            if a.polygon.euclidean_distance(&b.polygon) <= tolerance {
                expected.push((a.node_id.min(b.node_id), a.node_id.max(b.node_id)));
            }
        }
    }
    expected.sort_unstable();
    let found: Vec<_> = arcs.iter().map(|a| (a.node_1, a.node_2)).collect();
    assert_eq!(found, expected);
}
