// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole runs over a small plot written to a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use canopy_cache::ply;
use canopy_cli::config::{FileConfig, Settings};
use canopy_cli::crop::CROP_DIR;
use canopy_cli::{Cli, run};

/// Three objects in survey coordinates: 0 and 1 are 2 cm apart and overlap in Z,
/// 2 is far away. The background cloud has two points over object 0.
fn plot() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let clouds: [(&str, &[[f64; 3]]); 4] = [
        ("p_segmented_0.ply", &[[1000.0, 2000.0, 0.0], [1001.0, 2001.0, 1.0]]),
        ("p_segmented_1.ply", &[[1001.02, 2000.0, 0.5], [1002.0, 2001.0, 1.5]]),
        ("p_segmented_2.ply", &[[1010.0, 2010.0, 0.0], [1011.0, 2011.0, 1.0]]),
        (
            "p_segmented_-1.ply",
            &[[1000.5, 2000.5, 5.0], [1000.0, 2000.0, -3.0], [1005.0, 2005.0, 0.0]],
        ),
    ];
    for (name, points) in clouds {
        ply::write_points(&d.join(name), points, "").unwrap();
    }
    dir
}

fn settings(cli: &Cli) -> Settings {
    Settings::resolve(cli, &FileConfig::default()).unwrap()
}

fn run_to_string(settings: &Settings) -> String {
    let mut out = Vec::new();
    run(settings, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn batch_cli(input: &Path, work: &Path) -> Cli {
    Cli {
        input: input.to_path_buf(),
        all: true,
        threads: Some(2),
        out: Some(work.join("out").join("pairs.csv")),
        out_txt: Some(work.join("out").join("pairs.txt")),
        cache: Some(work.join("cache.bin")),
        ..Cli::default()
    }
}

#[test]
fn batch_run_reports_the_near_pair() {
    let input = plot();
    let work = tempfile::tempdir().unwrap();
    let s = settings(&batch_cli(input.path(), work.path()));

    let stdout = run_to_string(&s);
    assert!(stdout.contains("near3D pairs: 1"), "{stdout}");
    assert!(stdout.contains("pairs.csv"), "{stdout}");

    let csv = fs::read_to_string(work.path().join("out").join("pairs.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2, "{csv}");
    assert!(lines[0].starts_with("a_id,b_id,a_file,b_file"));
    assert!(lines[1].starts_with("0,1,p_segmented_0.ply,p_segmented_1.ply,1,1,"), "{csv}");

    let txt = fs::read_to_string(work.path().join("out").join("pairs.txt")).unwrap();
    assert_eq!(txt, "p_segmented_0.ply (h=1)  <->  p_segmented_1.ply (h=1)\n");
}

#[test]
fn batch_run_honors_configured_tolerances() {
    let input = plot();
    let work = tempfile::tempdir().unwrap();

    // The pair's XY gap is 2 cm: a 1 cm limit rejects it.
    let tight = Cli {
        gap_xy: Some(0.01),
        ..batch_cli(input.path(), work.path())
    };
    let stdout = run_to_string(&settings(&tight));
    assert!(stdout.contains("near3D pairs: 0"), "{stdout}");
    assert!(stdout.contains("gap_xy=0.01"), "{stdout}");

    // Z overlap is 0.5 m: requiring 0.6 m rejects it too.
    let tall = Cli {
        min_overlap_z: Some(0.6),
        ..batch_cli(input.path(), work.path())
    };
    assert!(run_to_string(&settings(&tall)).contains("near3D pairs: 0"));
}

#[test]
fn second_batch_run_leaves_the_cache_alone() {
    let input = plot();
    let work = tempfile::tempdir().unwrap();
    let s = settings(&batch_cli(input.path(), work.path()));

    let first = run_to_string(&s);
    let cache = fs::read(work.path().join("cache.bin")).unwrap();
    let second = run_to_string(&s);
    assert_eq!(first, second);
    assert_eq!(fs::read(work.path().join("cache.bin")).unwrap(), cache);
}

#[test]
fn target_run_lists_neighbors_and_crops_background() {
    let input = plot();
    let cli = Cli {
        input: input.path().to_path_buf(),
        tree: Some("p_segmented_0.ply".into()),
        no_cache: true,
        ..Cli::default()
    };
    let stdout = run_to_string(&settings(&cli));
    assert!(stdout.contains("Target: p_segmented_0.ply  (id=0)"), "{stdout}");
    assert!(stdout.contains("search_buffer=1"), "{stdout}");
    assert!(stdout.contains(" - p_segmented_1.ply (id=1)"), "{stdout}");
    assert!(!stdout.contains("(id=2)"), "{stdout}");

    let crop: PathBuf = input.path().join(CROP_DIR).join("p_segmented_0_-1.ply");
    assert!(stdout.contains("Crop: "), "{stdout}");
    assert_eq!(
        ply::read_points(&crop).unwrap(),
        vec![[1000.5, 2000.5, 5.0], [1000.0, 2000.0, -3.0]]
    );
}

#[test]
fn target_lookup_falls_back_to_substring() {
    let input = plot();
    let cli = Cli {
        input: input.path().to_path_buf(),
        tree: Some("segmented_2".into()),
        no_cache: true,
        ..Cli::default()
    };
    let stdout = run_to_string(&settings(&cli));
    assert!(stdout.contains("Target: p_segmented_2.ply  (id=2)"), "{stdout}");
    assert!(stdout.contains("near3D: 0"), "{stdout}");
}

#[test]
fn fatal_errors_surface() {
    let input = plot();
    let missing_target = Cli {
        input: input.path().to_path_buf(),
        tree: Some("oak.ply".into()),
        no_cache: true,
        ..Cli::default()
    };
    let err = run(&settings(&missing_target), &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("oak.ply"), "{err:#}");

    let empty = tempfile::tempdir().unwrap();
    let no_input = Cli {
        input: empty.path().to_path_buf(),
        all: true,
        no_cache: true,
        out: Some(empty.path().join("pairs.csv")),
        ..Cli::default()
    };
    assert!(run(&settings(&no_input), &mut Vec::new()).is_err());

    fs::write(input.path().join("broken.ply"), "ply\nformat ascii 1.0\nend_header\n").unwrap();
    let broken = Cli {
        input: input.path().to_path_buf(),
        all: true,
        no_cache: true,
        out: Some(input.path().join("pairs.csv")),
        ..Cli::default()
    };
    let err = run(&settings(&broken), &mut Vec::new()).unwrap_err();
    assert!(format!("{err:#}").contains("broken.ply"), "{err:#}");
}
