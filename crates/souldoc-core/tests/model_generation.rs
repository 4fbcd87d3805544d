//! Integration tests for documentation model generation

use std::collections::HashSet;

use souldoc_core::doc::{Expression, SectionKind};
use souldoc_core::{GenerateError, GeneratorOptions, InputFile, SourceCodeModel};

const GAIN: &str = r"/*
    Title: Gain.soul

    Level control processors.
*/

namespace audio::levels
{
    /** Smoothly changes a gain level */
    processor SmoothedGain
    {
        /// Audio in
        input stream float in;
        output stream float out;

        /** Moves the level to a new target.
            Takes the given number of steps.
        */
        void rampTo (float target, int steps) {}

        // Current gain in dB
        external float gain;

        float currentLevel = 1.0f, increment;

        void undocumented() {}
    }

    struct Settings
    {
        /// Level in dB
        float level;
        bool muted;
    }
}
";

const FILTERS: &str = r"namespace soul::filters
{
    processor LowPass
    {
        input stream float in;
        output stream float out;
    }
}
";

fn generate(inputs: &[(&str, &str)]) -> SourceCodeModel {
    let inputs: Vec<_> = inputs
        .iter()
        .map(|(name, content)| InputFile::new(*name, *content))
        .collect();
    SourceCodeModel::generate(&inputs, &GeneratorOptions::default()).unwrap()
}

#[test]
fn test_documented_function() {
    let model = generate(&[("Gain.soul", GAIN)]);
    let gain = model.find_module("audio::levels::SmoothedGain").unwrap();

    assert_eq!(gain.functions.len(), 1);
    let ramp = &gain.functions[0];
    assert_eq!(ramp.uid, "fn_audio_levels_SmoothedGain_rampTo");
    assert_eq!(ramp.name_with_generics, "rampTo");
    assert!(ramp.comment.is_doxygen_style);
    assert_eq!(ramp.comment.title(), "Moves the level to a new target.");
    assert_eq!(ramp.return_type.as_ref().unwrap().to_string(), "void");

    let params: Vec<_> = ramp
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.ty.to_string(), p.ty.sections[0].kind))
        .collect();
    assert_eq!(
        params,
        vec![
            ("target", "float32".to_string(), SectionKind::Primitive),
            ("steps", "int32".to_string(), SectionKind::Primitive),
        ]
    );
}

#[test]
fn test_external_variable() {
    let model = generate(&[("Gain.soul", GAIN)]);
    let gain = model.find_module("audio::levels::SmoothedGain").unwrap();

    let external = gain.variables.iter().find(|v| v.name == "gain").unwrap();
    assert!(external.is_external);
    assert!(external.initialiser.is_empty());
    assert_eq!(external.comment.text(), "Current gain in dB");
    assert!(!external.comment.is_doxygen_style);

    let level = gain.variables.iter().find(|v| v.name == "currentLevel").unwrap();
    assert_eq!(level.initialiser, "1.0f");
    let increment = gain.variables.iter().find(|v| v.name == "increment").unwrap();
    assert!(increment.initialiser.is_empty());
    assert_eq!(increment.ty.to_string(), "float32");
}

#[test]
fn test_file_metadata() {
    let model = generate(&[("Gain.soul", GAIN), ("Filters.soul", FILTERS)]);

    assert_eq!(model.files[0].uid, "lib_Gain");
    assert_eq!(model.files[0].title, "Gain.soul");
    assert_eq!(model.files[0].summary, "Level control processors.");

    // No titled comment: the filename stands in
    assert_eq!(model.files[1].title, "Filters.soul");
    assert!(model.files[1].summary.is_empty());
}

#[test]
fn test_endpoints_and_structs() {
    let model = generate(&[("Gain.soul", GAIN)]);
    let gain = model.find_module("audio::levels::SmoothedGain").unwrap();
    assert_eq!(gain.inputs[0].uid, "endpoint_audio_levels_SmoothedGain_in");
    assert_eq!(gain.inputs[0].comment.text(), "Audio in");
    assert_eq!(gain.outputs[0].name, "out");

    let levels = model.find_module("audio::levels").unwrap();
    let settings = &levels.structs[0];
    assert_eq!(settings.uid, "type_audio_levels_Settings");
    assert_eq!(settings.full_name, "audio::levels::Settings");
    assert_eq!(settings.members[0].comment.text(), "Level in dB");
    assert_eq!(settings.members[1].ty.to_string(), "bool");
}

#[test]
fn test_library_toc_path() {
    let model = generate(&[("Filters.soul", FILTERS)]);
    let node = model
        .toc
        .find(&["Filters.soul", "soul::filters", "LowPass"])
        .unwrap();
    let module = node.module.unwrap();
    assert_eq!(
        model.files[module.file].modules[module.module].uid,
        "mod_soul_filters_LowPass"
    );
    assert_eq!(model.toc.find(&["Filters.soul"]).unwrap().file, Some(0));
}

#[test]
fn test_uids_are_unique_and_deterministic() {
    let first = generate(&[("Gain.soul", GAIN), ("Filters.soul", FILTERS)]);
    let second = generate(&[("Gain.soul", GAIN), ("Filters.soul", FILTERS)]);

    let collect = |model: &SourceCodeModel| {
        let mut uids = Vec::new();
        for module in model.modules() {
            uids.push(module.uid.clone());
            uids.extend(module.functions.iter().map(|f| f.uid.clone()));
            uids.extend(module.variables.iter().map(|v| v.uid.clone()));
            uids.extend(module.structs.iter().map(|s| s.uid.clone()));
            uids.extend(module.inputs.iter().map(|e| e.uid.clone()));
            uids.extend(module.outputs.iter().map(|e| e.uid.clone()));
        }
        uids
    };

    let uids = collect(&first);
    assert_eq!(uids, collect(&second));
    let unique: HashSet<_> = uids.iter().collect();
    assert_eq!(unique.len(), uids.len());
}

#[test]
fn test_generation_depends_only_on_its_inputs() {
    let _ = generate(&[("Gain.soul", GAIN)]);
    let model = generate(&[("Filters.soul", FILTERS)]);
    assert_eq!(model.files.len(), 1);
    assert!(model.find_module("audio::levels::SmoothedGain").is_none());
}

#[test]
fn test_module_visibility() {
    let quiet = "namespace helpers { void add() {} }";
    let model = generate(&[("h.soul", quiet)]);
    assert!(model.files[0].modules.is_empty());

    let documented = "namespace helpers {\n    /// Adds\n    void add() {}\n}";
    let model = generate(&[("h.soul", documented)]);
    assert_eq!(model.files[0].modules.len(), 1);
    assert_eq!(model.files[0].modules[0].functions[0].bare_name, "add");
}

#[test]
fn test_reopened_namespace_is_documented_once() {
    let a = "namespace shared { struct A { int x; } }";
    let b = "namespace shared { struct B { int y; } }";
    let model = generate(&[("a.soul", a), ("b.soul", b)]);

    assert_eq!(model.files[0].modules.len(), 1);
    assert!(model.files[1].modules.is_empty());
    let names: Vec<_> = model.files[0].modules[0]
        .structs
        .iter()
        .map(|s| s.short_name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn test_specialised_clones_are_not_documented() {
    let source = "namespace n {
        processor Delay (int length) { input stream float in; output stream float out; }
        graph Chain {
            input stream float in;
            output stream float out;
            node d = Delay (10);
            connection { in -> d.in; d.out -> out; }
        }
    }";
    let model = generate(&[("chain.soul", source)]);
    let names: Vec<_> = model
        .modules()
        .map(|m| m.fully_qualified_name.as_str())
        .collect();
    assert_eq!(names, vec!["n::Delay"]);
    assert!(model.program().module_count() > 4);
}

#[test]
fn test_compile_errors_abort_generation() {
    let inputs = [
        InputFile::new("good.soul", FILTERS),
        InputFile::new("bad.soul", "processor P { int x }"),
    ];
    let error = SourceCodeModel::generate(&inputs, &GeneratorOptions::default()).unwrap_err();
    let diagnostics = error.diagnostics().unwrap();
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.messages()[0].filename, "bad.soul");
    assert!(matches!(error, GenerateError::Compile(_)));
}

#[test]
fn test_duplicate_processor_across_files() {
    let inputs = [
        InputFile::new("one.soul", "processor P {}"),
        InputFile::new("two.soul", "processor P {}"),
    ];
    let error = SourceCodeModel::generate(&inputs, &GeneratorOptions::default()).unwrap_err();
    let message = &error.diagnostics().unwrap().messages()[0];
    assert_eq!(message.filename, "two.soul");
    assert!(message.description.contains("duplicate definition 'P'"));
}

#[test]
fn test_initialiser_with_call_arguments() {
    let source = "processor Mixer {
        float level = max (2.0f, min (x, 1.0f)), spare;
        int[3] taps = (1, 2, 3);
    }";
    let model = generate(&[("mixer.soul", source)]);
    let mixer = model.find_module("Mixer").unwrap();
    let initialisers: Vec<_> = mixer
        .variables
        .iter()
        .map(|v| (v.name.as_str(), v.initialiser.as_str()))
        .collect();
    assert_eq!(
        initialisers,
        vec![
            ("level", "max (2.0f, min (x, 1.0f))"),
            ("spare", ""),
            ("taps", "(1, 2, 3)"),
        ]
    );
}

#[test]
fn test_file_summary_after_mixed_comments_on_one_line() {
    let untitled = "/* licence */ // note\nprocessor P {}";
    let model = generate(&[("p.soul", untitled)]);
    assert_eq!(model.files[0].title, "p.soul");
    assert!(model.files[0].summary.is_empty());

    let titled = "\n/* licence */ // note\n// Title: Mixers\n// Summing.\n\nprocessor Q {}";
    let model = generate(&[("q.soul", titled)]);
    assert_eq!(model.files[0].title, "Mixers");
    assert_eq!(model.files[0].summary, "note\nSumming.");
}

#[test]
fn test_module_named_like_file_title_shares_toc_node() {
    let source = "/*
    Title: Oscillators
*/
namespace Oscillators
{
    /// Makes a sine wave
    void sine() {}
}
";
    let model = generate(&[("osc.soul", source)]);
    assert_eq!(model.toc.children.len(), 1);
    let node = model.toc.find(&["Oscillators"]).unwrap();
    assert_eq!(node.file, Some(0));
    let module = node.module.unwrap();
    assert_eq!(model.files[module.file].modules[module.module].uid, "mod_Oscillators");
    assert!(node.children.is_empty());
}

#[test]
fn test_expression_concatenation_matches_text() {
    let a = Expression::keyword("const ") + Expression::structure("Settings");
    let b = Expression::text("[") + Expression::text("4") + Expression::text("]");
    assert_eq!((a.clone() + b.clone()).to_string(), a.to_string() + &b.to_string());
}

#[test]
fn test_model_serialises() {
    let model = generate(&[("Gain.soul", GAIN)]);
    let json = serde_json::to_value(&model).unwrap();
    let module = &json["files"][0]["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["kind"] == "processor")
        .unwrap()
        .clone();
    assert_eq!(module["variables"][0]["type"]["sections"][0]["kind"], "primitive");
    assert!(json["toc"]["children"].is_array());
}
