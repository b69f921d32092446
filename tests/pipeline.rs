use std::fs;
use std::path::PathBuf;

use csp_titration::app::pipeline::run_analysis;
use csp_titration::data::{SyntheticSpec, generate_titration};
use csp_titration::domain::{AxisMapping, Concentrations, FitConfig, PeakRecord, RunWarning, Spectrum};
use csp_titration::io::{DirectorySource, MemorySource, read_concentrations_csv, write_conflicts, write_results};

fn peak(index: i64, x: f64, y: f64, label: Option<&str>) -> PeakRecord {
    PeakRecord {
        index,
        coord1: x,
        coord2: y,
        flag: "0".into(),
        label: label.map(str::to_string),
        raw_line: String::new(),
    }
}

/// R1 moves along the first axis so that its distances are exactly 0, 0.5, 0.9;
/// R2 is lost to a matcher conflict in the last spectrum.
fn three_point_titration() -> (Vec<Spectrum>, Concentrations) {
    let s2 = std::f64::consts::SQRT_2;
    let spectra = vec![
        Spectrum {
            name: "t0".into(),
            peaks: vec![peak(1, 8.0, 120.0, Some("R1")), peak(2, 7.0, 110.0, Some("R2"))],
        },
        Spectrum {
            name: "t1".into(),
            peaks: vec![peak(1, 7.0, 110.0, None), peak(2, 8.0 + 0.5 * s2, 120.0, None)],
        },
        Spectrum {
            name: "t2".into(),
            peaks: vec![peak(1, 8.0 + 0.9 * s2, 120.0, None)],
        },
    ];
    let conc = Concentrations {
        host: vec![5e-4; 3],
        guest: vec![0.0, 1e-3, 2e-3],
    };
    (spectra, conc)
}

#[test]
fn three_point_residue_is_fitted_and_short_one_is_skipped() {
    let (spectra, conc) = three_point_titration();
    let out = run_analysis(&MemorySource::new("mem", spectra), &conc, &FitConfig::default()).unwrap();

    let r1 = out.curves.iter().find(|c| c.residue == "R1").unwrap();
    let d: Vec<f64> = r1.points.iter().map(|p| p.distance.unwrap()).collect();
    assert!((d[1] - 0.5).abs() < 1e-12);
    assert!((d[2] - 0.9).abs() < 1e-12);

    assert_eq!(out.batch.fits.len(), 1);
    let fit = &out.batch.fits[0];
    assert_eq!(fit.residue, "R1");
    assert!(fit.ka > 0.0);
    assert!((0.0..=1.0).contains(&fit.r_squared));
    assert!(!fit.is_outlier);

    assert!(out.batch.fits.iter().all(|f| f.residue != "R2"));
    assert!(out.warnings.iter().any(|w| matches!(
        w,
        RunWarning::InsufficientData { residue, valid_points: 2, .. } if residue == "R2"
    )));

    // t2 has a single peak wanted by both references.
    let t2 = &out.assembled.matches[1];
    assert_eq!(t2.outcome.conflicts.len(), 1);
    assert_eq!(t2.outcome.conflicts[0].winner, "R1");
}

#[test]
fn mismatched_concentrations_truncate_with_warning() {
    let (spectra, mut conc) = three_point_titration();
    conc.guest.push(3e-3);
    let out = run_analysis(&MemorySource::new("mem", spectra), &conc, &FitConfig::default()).unwrap();

    assert!(out.curves.iter().all(|c| c.points.len() == 3));
    assert!(out.warnings.iter().any(|w| matches!(
        w,
        RunWarning::MismatchedSeriesLength { spectra: 3, host: 3, guest: 4, used: 3 }
    )));
}

#[test]
fn noise_free_synthetic_titration_recovers_ka() {
    let spec = SyntheticSpec {
        residues: 6,
        noise_sd: 0.0,
        missing_prob: 0.0,
        deviant_fraction: 0.0,
        seed: 11,
        ..SyntheticSpec::default()
    };
    let titration = generate_titration(&spec).unwrap();
    let out = run_analysis(
        &MemorySource::new("synthetic", titration.spectra.clone()),
        &titration.concentrations,
        &FitConfig::default(),
    )
    .unwrap();

    assert_eq!(out.batch.fits.len(), spec.residues);
    assert!(out.batch.skipped.is_empty());
    for fit in &out.batch.fits {
        let truth = titration.truth.iter().find(|r| r.label == fit.residue).unwrap();
        assert!(fit.r_squared > 0.9999, "{}: R2={}", fit.residue, fit.r_squared);
        assert!(
            (fit.ka / truth.ka - 1.0).abs() < 0.02,
            "{}: fitted {} vs true {}",
            fit.residue,
            fit.ka,
            truth.ka
        );
    }
}

#[test]
fn directory_run_reads_files_and_writes_exports() {
    let dir = std::env::temp_dir().join(format!("csp-e2e-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let (spectra, _) = three_point_titration();
    for (i, s) in spectra.iter().enumerate() {
        let mut text = String::from("Assignment list\n");
        for p in &s.peaks {
            text.push_str(&format!("{} {:.10} {:.10} 1.0e5 {}\n", p.index, p.coord1, p.coord2, p.flag));
            if let Some(label) = &p.label {
                text.push_str(&format!("# {label}\n"));
            }
        }
        // Spectra 10 and 2 would sort wrong lexicographically.
        let name = ["t1", "t2", "t10"][i];
        fs::write(dir.join(format!("{name}.list")), text).unwrap();
    }
    let conc_path: PathBuf = dir.join("conc.csv");
    fs::write(&conc_path, "host,guest\n5e-4,0\n5e-4,1e-3\n5e-4,2e-3\n").unwrap();

    let source = DirectorySource::new(&dir, "list", AxisMapping::Ab);
    let conc = read_concentrations_csv(&conc_path).unwrap();
    let out = run_analysis(&source, &conc, &FitConfig::default()).unwrap();

    assert_eq!(out.spectra(), ["t1".to_string(), "t2".to_string(), "t10".to_string()]);
    assert_eq!(out.batch.fits.len(), 1);
    assert_eq!(out.batch.fits[0].residue, "R1");

    let mut results = Vec::new();
    write_results(&mut results, &out.batch.fits).unwrap();
    let results = String::from_utf8(results).unwrap();
    assert_eq!(results.lines().count(), 2);
    assert!(results.lines().nth(1).unwrap().starts_with("R1,"));

    let mut conflicts = Vec::new();
    write_conflicts(&mut conflicts, &out.assembled.matches).unwrap();
    let conflicts = String::from_utf8(conflicts).unwrap();
    assert_eq!(conflicts.lines().count(), 3);
    assert!(conflicts.contains("t10,2,1,2,R1,"));

    let _ = fs::remove_dir_all(&dir);
}
