use gridroute_common::db::parser::ispd;
use gridroute_common::util::config::{Mode, RouteConfig};
use gridroute_router::GlobalRouter;
use std::path::PathBuf;

const COMPLEX: &str = "\
grid 8 8 2
vertical capacity 0 12
horizontal capacity 12 0
minimum width 1 1
minimum spacing 0 0
via spacing 0 0
0 0 10 10
num net 5
clk 0 3 1
5 5 1
75 5 1
75 75 1
data0 1 2 1
15 15 1
65 55 1
data1 2 2 1
15 25 1
65 25 1
data2 3 4 1
5 75 1
35 35 1
55 15 1
75 45 1
tiny 4 2 1
5 5 1
15 5 1
0
";

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("gridroute_{}_{}", std::process::id(), name))
}

#[test]
fn load_and_route_complex() {
    let mut router = GlobalRouter::new();
    router.load_from(COMPLEX.as_bytes()).unwrap();
    let result = router.route(None).unwrap();
    assert!(!result.is_empty());
    assert!(result.total_edges() > 0);

    let m = router.metrics();
    assert!(m.execution_time >= 0.0);
    assert!(m.total_overflow >= -1);
    assert!(m.wirelength > 0);
    assert!(m.iterations >= 0);
}

#[test]
fn init_then_route() {
    let design = ispd::parse_str(COMPLEX).unwrap();
    let mut router = GlobalRouter::new();
    router.init(design);
    router.route(None).unwrap();
    assert!(router.result().is_some());
}

#[test]
fn generate_map_has_scaled_header() {
    let mut router = GlobalRouter::new();
    router.load_from(COMPLEX.as_bytes()).unwrap();
    router.route(None).unwrap();

    let ppm = temp_path("complex.ppm");
    router.visualize(&ppm, 3).unwrap();

    let text = std::fs::read_to_string(&ppm).unwrap();
    let mut it = text.split_whitespace();
    assert_eq!(it.next(), Some("P3"));
    assert_eq!(it.next().unwrap().parse::<u32>().unwrap(), 8 * 3);
    assert_eq!(it.next().unwrap().parse::<u32>().unwrap(), 8 * 3);
    assert_eq!(it.next(), Some("255"));

    let _ = std::fs::remove_file(&ppm);
}

#[test]
fn detailed_output_lists_every_net() {
    let mut router = GlobalRouter::new();
    router.load_from(COMPLEX.as_bytes()).unwrap();

    let out = temp_path("complex_routes.txt");
    router.route(Some(&out)).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    for name in ["clk 0", "data0 1", "data1 2", "data2 3", "tiny 4"] {
        assert!(text.contains(name), "missing net block '{name}'");
    }
    assert_eq!(text.lines().filter(|l| *l == "!").count(), 5);
    // segment lines follow the (x,y,z)-(x,y,z) world-coordinate layout
    assert!(text.lines().any(|l| l.starts_with('(') && l.contains(")-(")));

    let _ = std::fs::remove_file(&out);
}

#[test]
fn zero_net_design_routes_empty() {
    let mut router = GlobalRouter::new();
    router
        .load_from(
            "grid 6 6 2\n\
             vertical capacity 0 8\n\
             horizontal capacity 8 0\n\
             minimum width 1 1\n\
             minimum spacing 0 0\n\
             via spacing 0 0\n\
             0 0 10 10\n\
             num net 0\n\
             0\n"
                .as_bytes(),
        )
        .unwrap();
    let result = router.route(None).unwrap();
    assert!(result.is_empty());

    let m = router.metrics();
    assert_eq!(m.total_overflow, 0);
    assert_eq!(m.wirelength, 0);
    assert_eq!(m.vias, 0);
    assert!(m.execution_time >= 0.0);
}

#[test]
fn hopeless_contention_exhausts_the_budget() {
    // two nets over a single-row, single-track corridor: the overflow is
    // structural, so the run must stop at the mode's budget and report it
    let input = "\
grid 3 1 1
vertical capacity 1
horizontal capacity 1
minimum width 1
minimum spacing 0
via spacing 0
0 0 10 10
num net 2
a 0 2 1
5 5 1
25 5 1
b 1 2 1
5 5 1
25 5 1
0
";
    let mut router = GlobalRouter::new();
    router.set_mode(Mode::Fast);
    router.load_from(input.as_bytes()).unwrap();
    router.route(None).unwrap();

    let m = router.metrics();
    assert!(m.total_overflow > 0);
    assert_eq!(m.iterations, 8); // Fast mode budget
}

#[test]
fn identical_runs_produce_identical_results() {
    let route_once = || {
        let mut router = GlobalRouter::with_config(RouteConfig::default());
        router.set_mode(Mode::Quality);
        router.load_from(COMPLEX.as_bytes()).unwrap();
        router.route(None).unwrap().clone()
    };
    let a = route_once();
    let b = route_once();
    assert_eq!(a.nets.len(), b.nets.len());
    for (na, nb) in a.nets.iter().zip(&b.nets) {
        assert_eq!(na.name, nb.name);
        assert_eq!(na.paths, nb.paths);
    }
}

#[test]
fn reroute_after_cleanup_requires_reload() {
    let mut router = GlobalRouter::new();
    router.load_from(COMPLEX.as_bytes()).unwrap();
    router.route(None).unwrap();
    router.cleanup();
    assert!(router.route(None).is_err());
    router.load_from(COMPLEX.as_bytes()).unwrap();
    router.route(None).unwrap();
    assert!(router.metrics().wirelength > 0);
}
