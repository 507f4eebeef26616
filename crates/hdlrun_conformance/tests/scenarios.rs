//! End-to-end run coordination scenarios.
//!
//! Every test drives a real `RunCoordinator` against recording fakes and
//! checks both the outcome and what did (or did not) happen on the way:
//! which files were staged, whether the design was converted, and whether
//! build and test ran.

use std::collections::BTreeMap;
use std::fs;

use hdlrun_common::HdlLanguage;
use hdlrun_conformance::{design_request, verilog_request, Event, Harness, ToolchainBehavior};
use hdlrun_diagnostics::{DiagnosticCode, DiagnosticSink};
use hdlrun_engine::{ParamValue, WaveformManager};
use hdlrun_lang::{ExtraFile, Platform, PlatformSpec};
use hdlrun_runner::{RunError, SimulationRequest};
use tempfile::TempDir;

fn has_code(diags: &[hdlrun_diagnostics::Diagnostic], code: DiagnosticCode) -> bool {
    diags.iter().any(|d| d.code == code)
}

fn platform_with(files: &[(&str, &str)]) -> Platform {
    Platform::Amaranth(PlatformSpec {
        name: "icebreaker".to_string(),
        extra_files: files
            .iter()
            .map(|(name, text)| (name.to_string(), ExtraFile::Text(text.to_string())))
            .collect(),
        properties: BTreeMap::new(),
    })
}

// ---------------------------------------------------------------------------
// Design conversion with a waveform destination
// ---------------------------------------------------------------------------

#[test]
fn design_with_vcd_on_icarus_copies_trace() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::with_behavior(
        cwd.path(),
        ToolchainBehavior {
            write_trace: true,
            ..ToolchainBehavior::default()
        },
    );
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            waveform_file: Some("out.vcd".into()),
            ..design_request()
        })
        .unwrap();

    assert!(result.success);
    assert_eq!(result.engine, "icarus");
    assert_eq!(result.language, Some(HdlLanguage::Verilog));
    assert_eq!(result.staged.keys().collect::<Vec<_>>(), ["amaranth_output.v"]);
    assert_eq!(result.waveform, Some(cwd.path().join("out.vcd")));
    assert!(cwd.path().join("out.vcd").is_file());
    assert!(has_code(&result.diagnostics, DiagnosticCode::WAVEFORM_DEGRADED));
    assert_eq!(
        harness.events(),
        [
            Event::Convert("verilog".to_string()),
            Event::Build(vec!["amaranth_output.v".to_string()]),
            Event::Test,
        ]
    );
}

#[test]
fn design_with_vcd_without_trace_warns_but_succeeds() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            waveform_file: Some("out.vcd".into()),
            ..design_request()
        })
        .unwrap();

    assert!(result.success);
    assert!(result.waveform.is_none());
    assert!(!cwd.path().join("out.vcd").exists());
    assert!(has_code(&result.diagnostics, DiagnosticCode::WAVEFORM_MISSING));
}

#[test]
fn verilator_fst_traces_in_build_and_test() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::with_behavior(
        cwd.path(),
        ToolchainBehavior {
            write_trace: true,
            ..ToolchainBehavior::default()
        },
    );
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "verilator".into(),
            waveform_file: Some("adder.fst".into()),
            ..design_request()
        })
        .unwrap();

    assert!(result.success);
    assert_eq!(result.waveform, Some(cwd.path().join("adder.fst")));
    assert!(!has_code(&result.diagnostics, DiagnosticCode::WAVEFORM_DEGRADED));

    let builds = harness.builds();
    assert!(builds[0].waves);
    assert!(builds[0]
        .waveform_path
        .as_ref()
        .is_some_and(|p| p.ends_with("dump.fst")));
    assert!(harness.tests()[0].waves);
}

#[test]
fn plusarg_engine_writes_destination_directly() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::with_behavior(
        cwd.path(),
        ToolchainBehavior {
            write_trace: true,
            ..ToolchainBehavior::default()
        },
    );
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "nvc".into(),
            toplevel: Some("Adder".into()),
            waveform_file: Some("adder.fst".into()),
            ..SimulationRequest::new("test_adder")
        }
        .with_sources(HdlLanguage::Vhdl, ["adder.vhd"]))
        .unwrap();

    let destination = cwd.path().join("adder.fst");
    assert!(result.success);
    assert_eq!(result.waveform.as_ref(), Some(&destination));
    assert_eq!(harness.tests()[0].waveform_path.as_ref(), Some(&destination));
    assert!(!has_code(&result.diagnostics, DiagnosticCode::WAVEFORM_MISSING));
    assert_eq!(harness.tests()[0].env["COCOTB_TOPLEVEL"], "adder");
}

// ---------------------------------------------------------------------------
// Failures detected before anything is staged
// ---------------------------------------------------------------------------

#[test]
fn fst_only_engine_rejects_vcd_before_staging() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "nvc".into(),
            language: Some("vhdl".into()),
            backend: Some("celosia".into()),
            waveform_file: Some("out.vcd".into()),
            working_directory: Some("build".into()),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::UnsupportedCapability(_)));
    assert!(err.to_string().contains("nvc doesn't support .vcd"));
    assert!(!cwd.path().join("build").exists());
    assert!(harness.untouched());
}

#[test]
fn unknown_engine_with_design_needs_language() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "foo".into(),
            working_directory: Some("build".into()),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::Configuration(ref m) if m.contains("'language' must be provided")));
    assert!(!cwd.path().join("build").exists());
    assert!(harness.untouched());
}

#[test]
fn incompatible_engine_and_language_rejected() {
    for (engine, language) in [("icarus", "vhdl"), ("ghdl", "verilog"), ("nvc", "verilog")] {
        let cwd = TempDir::new().unwrap();
        let harness = Harness::new(cwd.path());
        let err = harness
            .coordinator
            .run(&SimulationRequest {
                engine: engine.into(),
                language: Some(language.into()),
                backend: Some("celosia".into()),
                working_directory: Some("build".into()),
                ..design_request()
            })
            .unwrap_err();

        assert!(
            matches!(err, RunError::UnsupportedCapability(_)),
            "{engine}/{language}: {err}"
        );
        assert!(!cwd.path().join("build").exists());
        assert!(harness.untouched());
    }
}

#[test]
fn waveform_and_legacy_alias_rejected() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            waveform_file: Some("a.fst".into()),
            vcd_file: Some("a.vcd".into()),
            working_directory: Some("build".into()),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::Configuration(_)));
    assert!(!cwd.path().join("build").exists());
    assert!(harness.untouched());
}

#[test]
fn amaranth_cannot_emit_vhdl() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "ghdl".into(),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::UnsupportedCapability(ref m) if m.contains("amaranth to VHDL")));
    assert!(harness.untouched());
}

#[test]
fn unknown_backend_rejected() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            backend: Some("migen".into()),
            ..design_request()
        })
        .unwrap_err();
    assert!(matches!(err, RunError::UnknownBackend(ref b) if b == "migen"));
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

#[test]
fn prewritten_sources_skip_conversion() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness.coordinator.run(&verilog_request(&["a.v"])).unwrap();

    assert!(result.success);
    assert!(result.language.is_none());
    assert!(result.staged.is_empty());
    assert_eq!(harness.conversions(), 0);
    assert_eq!(harness.builds()[0].sources, [cwd.path().join("a.v")]);
    assert_eq!(harness.builds()[0].toplevel, "top");
    assert_eq!(harness.events().last(), Some(&Event::Test));
}

#[test]
fn extra_file_collision_stops_before_conversion() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            platform: Some(platform_with(&[("amaranth_output.v", "module x; endmodule")])),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::Configuration(ref m) if m.contains("name collision")));
    assert!(harness.untouched());
}

#[test]
fn extra_files_staged_before_generated_source() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            platform: Some(platform_with(&[("pll.v", "module pll; endmodule\n")])),
            ..design_request()
        })
        .unwrap();

    assert!(result.success);
    assert_eq!(result.staged.len(), 2);
    let sources = &harness.builds()[0].sources;
    assert!(sources[0].ends_with("pll.v"));
    assert!(sources[1].ends_with("amaranth_output.v"));
    assert_eq!(
        harness.events()[1],
        Event::Build(vec!["amaranth_output.v".to_string(), "pll.v".to_string()])
    );
}

#[test]
fn extra_file_without_engine_language_rejected() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            platform: Some(platform_with(&[("board.pcf", "set_io clk 35")])),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::Configuration(ref m) if m.contains("board.pcf")));
    assert!(harness.builds().is_empty());
}

#[test]
fn existing_file_in_working_directory_is_kept() {
    let cwd = TempDir::new().unwrap();
    fs::create_dir(cwd.path().join("build")).unwrap();
    fs::write(cwd.path().join("build/pins.v"), "USER OWNED").unwrap();
    let harness = Harness::new(cwd.path());
    let err = harness
        .coordinator
        .run(&SimulationRequest {
            working_directory: Some("build".into()),
            platform: Some(platform_with(&[("pins.v", "module pins; endmodule\n")])),
            ..design_request()
        })
        .unwrap_err();

    assert!(matches!(err, RunError::Configuration(ref m) if m.contains("pins.v")));
    assert_eq!(fs::read_to_string(cwd.path().join("build/pins.v")).unwrap(), "USER OWNED");
    assert!(harness.untouched());
}

#[test]
fn design_path_is_relative_to_project() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            working_directory: Some("build".into()),
            ..design_request()
        })
        .unwrap();

    assert!(result.success);
    let text = fs::read_to_string(cwd.path().join("build/amaranth_output.v")).unwrap();
    let expected = format!("// generated from {}\n", cwd.path().join("adder.py").display());
    assert!(text.starts_with(&expected), "{text}");
}

#[test]
fn conversion_is_deterministic() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let mut request = SimulationRequest {
        seed: Some(1),
        ..design_request()
    };

    request.working_directory = Some("first".into());
    let first = harness.coordinator.run(&request).unwrap();
    request.working_directory = Some("second".into());
    let second = harness.coordinator.run(&request).unwrap();

    assert_eq!(first.staged, second.staged);
    let a = fs::read(cwd.path().join("first/amaranth_output.v")).unwrap();
    let b = fs::read(cwd.path().join("second/amaranth_output.v")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn celosia_converts_to_vhdl_for_vhdl_engines() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "ghdl".into(),
            backend: Some("celosia".into()),
            ..design_request()
        })
        .unwrap();

    assert!(result.success);
    assert_eq!(result.language, Some(HdlLanguage::Vhdl));
    assert!(result.staged.contains_key("celosia_output.vhd"));
    assert_eq!(harness.events()[0], Event::Convert("vhdl".to_string()));
}

// ---------------------------------------------------------------------------
// Waveform reconciliation
// ---------------------------------------------------------------------------

#[test]
fn reconcile_same_path_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let trace = dir.path().join("dump.fst");
    fs::write(&trace, b"trace").unwrap();
    let sink = DiagnosticSink::new();

    for _ in 0..2 {
        let placed = WaveformManager::reconcile(&trace, &trace, &sink);
        assert_eq!(placed.as_ref(), Some(&trace));
    }
    assert_eq!(fs::read(&trace).unwrap(), b"trace");
    assert!(sink.diagnostics().is_empty());
}

// ---------------------------------------------------------------------------
// Execution outcomes
// ---------------------------------------------------------------------------

#[test]
fn build_failure_is_unsuccessful_result() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::with_behavior(
        cwd.path(),
        ToolchainBehavior {
            fail_build: Some("syntax error".to_string()),
            ..ToolchainBehavior::default()
        },
    );
    let result = harness.coordinator.run(&verilog_request(&["a.v"])).unwrap();

    assert!(!result.success);
    let message = result.message.clone().unwrap();
    assert!(message.starts_with("Test failed:"), "{message}");
    assert!(message.contains("syntax error"));
    assert!(has_code(&result.diagnostics, DiagnosticCode::BUILD_FAILED));
    assert!(harness.tests().is_empty());
    assert!(matches!(result.into_result(), Err(RunError::RunFailure { .. })));
}

#[test]
fn test_failure_is_unsuccessful_result() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::with_behavior(
        cwd.path(),
        ToolchainBehavior {
            fail_test: Some("2 tests failed".to_string()),
            ..ToolchainBehavior::default()
        },
    );
    let result = harness.coordinator.run(&verilog_request(&["a.v"])).unwrap();

    assert!(!result.success);
    assert!(has_code(&result.diagnostics, DiagnosticCode::TEST_FAILED));
    assert_eq!(harness.tests().len(), 1);
}

#[test]
fn unknown_engine_without_toolchain_fails_run() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            engine: "questa".into(),
            language: Some("verilog".into()),
            ..design_request()
        })
        .unwrap();

    assert!(!result.success);
    assert!(has_code(&result.diagnostics, DiagnosticCode::UNKNOWN_SIMULATOR));
    assert!(harness.builds().is_empty());
}

#[test]
fn test_environment_and_job_inputs() {
    let cwd = TempDir::new().unwrap();
    let harness = Harness::new(cwd.path());
    let request = SimulationRequest {
        parameters: BTreeMap::from([("WIDTH".to_string(), ParamValue::Int(8))]),
        extra_env: BTreeMap::from([("COCOTB_LOG_LEVEL".to_string(), "DEBUG".to_string())]),
        extra_args: vec!["-Wall".to_string()],
        ..verilog_request(&["a.v"])
    };
    let result = harness.coordinator.run(&request).unwrap();

    let build = &harness.builds()[0];
    assert_eq!(build.parameters["WIDTH"], ParamValue::Int(8));
    assert_eq!(build.build_args.first().map(String::as_str), Some("-Wall"));

    let env = &harness.tests()[0].env;
    assert_eq!(env["COCOTB_TOPLEVEL"], "top");
    assert_eq!(env["COCOTB_TEST_MODULES"], "test_top");
    assert_eq!(env["COCOTB_RANDOM_SEED"], result.seed.to_string());
    assert_eq!(env["COCOTB_LOG_LEVEL"], "DEBUG");
    assert_eq!(env["PYGPI_PYTHON_BIN"], "/usr/bin/python3");
    assert!(env["COCOTB_RESULTS_FILE"].ends_with("results.xml"));
    assert!(!env.contains_key("LIBPYTHON_LOC"));
}

#[test]
fn test_file_in_project_dir_is_importable() {
    let cwd = TempDir::new().unwrap();
    let file = cwd.path().join("test_adder.py");
    fs::write(&file, "").unwrap();
    let harness = Harness::new(cwd.path());
    let result = harness
        .coordinator
        .run(&SimulationRequest {
            test_module: file.display().to_string(),
            ..verilog_request(&["a.v"])
        })
        .unwrap();

    assert!(result.success);
    let env = &harness.tests()[0].env;
    assert_eq!(env["COCOTB_TEST_MODULES"], "test_adder");
    assert_eq!(env["PYTHONPATH"], cwd.path().display().to_string());
}

#[test]
fn packaged_test_file_exports_package_root() {
    let cwd = TempDir::new().unwrap();
    let pkg = cwd.path().join("tests");
    fs::create_dir(&pkg).unwrap();
    fs::write(pkg.join("__init__.py"), "").unwrap();
    fs::write(pkg.join("test_adder.py"), "").unwrap();
    let harness = Harness::new(cwd.path());
    harness
        .coordinator
        .run(&SimulationRequest {
            test_module: pkg.join("test_adder.py").display().to_string(),
            ..verilog_request(&["a.v"])
        })
        .unwrap();

    let env = &harness.tests()[0].env;
    assert_eq!(env["COCOTB_TEST_MODULES"], "tests.test_adder");
    assert_eq!(env["PYTHONPATH"], cwd.path().display().to_string());
}
