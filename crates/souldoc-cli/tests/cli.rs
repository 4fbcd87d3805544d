//! End-to-end tests of the `souldoc` binary

use std::path::Path;
use std::process::{Command, Output};

fn souldoc(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_souldoc"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run souldoc")
}

const FILTERS: &str = "/*
    Title: Filters.soul

    Simple filters.
*/

namespace soul::filters
{
    /** A one-pole low pass */
    processor LowPass (float cutoff = 1000.0f)
    {
        input stream float in;
        output stream float out;

        /// Moves the cutoff smoothly
        void rampTo (float target, int steps) {}
    }
}
";

#[test]
fn model_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("filters.soul"), FILTERS).unwrap();

    let output = souldoc(&["model", "."], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let file = &json["files"][0];
    assert_eq!(file["filename"], "filters.soul");
    assert_eq!(file["uid"], "lib_filters");
    assert_eq!(file["title"], "Filters.soul");
    assert_eq!(file["summary"], "Simple filters.");

    let module = file["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["kind"] == "processor")
        .unwrap();
    assert_eq!(module["uid"], "mod_soul_filters_LowPass");
    assert_eq!(module["fully_qualified_name"], "soul::filters::LowPass");
    assert_eq!(module["functions"][0]["uid"], "fn_soul_filters_LowPass_rampTo");
    assert_eq!(module["specialisation_params"][0]["default_value"], "1000.0f");
}

#[test]
fn toc_prints_tree() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("filters.soul"), FILTERS).unwrap();

    let output = souldoc(&["toc", "filters.soul"], dir.path());
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Filters.soul\n  soul::filters\n    LowPass\n"
    );
}

#[test]
fn compile_errors_fail_with_locations() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.soul"), "processor P {\n    int x\n}\n").unwrap();

    let output = souldoc(&["model", "broken.soul"], dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.soul:3:1: error:"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn config_changes_the_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gain.sl"), "processor Gain {}").unwrap();
    std::fs::write(dir.path().join("ignored.soul"), "processor Other {}").unwrap();
    std::fs::write(dir.path().join("souldoc.toml"), "source_extension = \".sl\"\n").unwrap();

    let output = souldoc(&["model", "--config", "souldoc.toml", "."], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["files"].as_array().unwrap().len(), 1);
    assert_eq!(json["files"][0]["uid"], "lib_gain");
}

#[test]
fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = souldoc(&["toc"], dir.path());
    assert!(!output.status.success());
}
