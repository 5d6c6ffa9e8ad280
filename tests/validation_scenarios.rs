mod common;

use car_inspector::domain::models::{CheckStatus, Severity, SteeringProvenance, Verdict};
use car_inspector::domain::rulebook::RulebookConfig;
use car_inspector::services::validator;
use car_inspector::services::textures::png_header;
use common::{CarFiles, Workspace};
use std::fs;

fn competition() -> RulebookConfig {
    RulebookConfig::competition()
}

#[test]
fn identical_copy_passes_competition_rulebook() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission("efvd_test", &car);
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &competition());

    assert_eq!(result.matched_reference.as_deref(), Some("efvd_test"));
    assert!(result.exact_physics_match);
    assert!(result.physics_mismatches.is_empty());
    assert!(result.rule_violations.is_empty(), "{:?}", result.rule_violations);
    assert_eq!(result.verdict(), Verdict::Pass);
    assert_eq!(result.info.steering.effective_angle(), Some(36.0));
    assert_eq!(result.anti_cheat("AC001").map(|c| c.status), Some(CheckStatus::Pass));
}

#[test]
fn file_missing_on_both_sides_still_matches_exactly() {
    let ws = Workspace::new();
    let car = CarFiles::standard().remove("data/engine.ini");
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission("efvd_test", &car);
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert!(result.exact_physics_match);
    assert!(result.physics_mismatches.is_empty());
}

#[test]
fn hidden_file_is_reported_by_hygiene_check() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().set(".hidden_override.ini", "[X]\nA=1\n"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    let ac021 = result.anti_cheat("AC021").expect("hidden file check present");
    assert_eq!(ac021.status, CheckStatus::Warn);
    let items = ac021.items.as_ref().expect("offending paths listed");
    assert!(items.iter().any(|p| p.contains(".hidden_override.ini")));
}

#[test]
fn light_car_violates_minimum_mass_once() {
    let ws = Workspace::new();
    let car = CarFiles::standard().edit("data/car.ini", "TOTALMASS=1350", "TOTALMASS=1200");
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission("efvd_test", &car);
    let index = ws.build_index();
    let rulebook = RulebookConfig {
        min_total_mass_kg: Some(1300.0),
        ..RulebookConfig::default()
    };

    let result = validator::validate(&submitted, &index, &rulebook);

    let mass: Vec<&String> = result
        .rule_violations
        .iter()
        .filter(|v| v.contains("TOTALMASS"))
        .collect();
    assert_eq!(mass.len(), 1, "{:?}", result.rule_violations);
    assert!(mass[0].contains("1200") && mass[0].contains("1300"));
    assert!(result.exact_physics_match);
    assert_eq!(result.verdict(), Verdict::Fail);
}

#[test]
fn tiny_mass_edit_breaks_exact_match_but_not_spec_tolerance() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().edit("data/car.ini", "TOTALMASS=1350", "TOTALMASS=1350.0001"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert!(!result.exact_physics_match);
    assert!(result.physics_mismatches.iter().any(|m| m.contains("TOTALMASS")));
    assert!(result.info.spec_compare["total_mass"].within_tolerance);
    assert_eq!(result.anti_cheat("AC001").map(|c| c.status), Some(CheckStatus::Fail));
    assert_eq!(result.verdict(), Verdict::Fail);
}

#[test]
fn graphics_offset_nudge_is_tolerated_by_fingerprint() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().edit(
            "data/car.ini",
            "GRAPHICS_OFFSET=0.0, -0.10, 0.05",
            "GRAPHICS_OFFSET=0.05, -0.12, 0.05",
        ),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert!(result.exact_physics_match, "{:?}", result.physics_mismatches);
}

#[test]
fn small_numeric_edit_is_classified_low() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().edit("data/engine.ini", "LIMITER=7800", "LIMITER=7900"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    let modification = result
        .info
        .data_files
        .modifications
        .iter()
        .find(|m| m.path == "data/engine.ini")
        .expect("engine.ini modification recorded");
    assert_eq!(modification.severity, Severity::Low);
    assert!(result
        .rule_violations
        .iter()
        .any(|v| v == "Data file changed (low) data/engine.ini"));
}

#[test]
fn fallback_reference_rescues_exact_match() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    // alpha carries one extra key, so it outranks beta on total compared.
    ws.add_reference(
        "alpha",
        &car.clone()
            .edit("data/brakes.ini", "FRONT_SHARE=0.68\n", "FRONT_SHARE=0.68\nBIAS_STEP=0.01\n"),
    );
    ws.add_reference("beta", &car);
    let submitted = ws.add_submission("efvd_test", &car);
    let index = ws.build_index();

    let plain = validator::validate(&submitted, &index, &RulebookConfig::default());
    assert_eq!(plain.matched_reference.as_deref(), Some("alpha"));
    assert!(!plain.exact_physics_match);

    let rulebook = RulebookConfig {
        fallback_reference_key: Some("beta".to_string()),
        ..RulebookConfig::default()
    };
    let rescued = validator::validate(&submitted, &index, &rulebook);
    assert_eq!(rescued.matched_reference.as_deref(), Some("beta"));
    assert!(rescued.exact_physics_match);
    assert!(rescued.info.fallback.used);
}

#[test]
fn unknown_fallback_key_is_a_violation() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().edit("data/car.ini", "TOTALMASS=1350", "TOTALMASS=1351"),
    );
    let index = ws.build_index();
    let rulebook = RulebookConfig {
        fallback_reference_key: Some("ghost".to_string()),
        ..RulebookConfig::default()
    };

    let result = validator::validate(&submitted, &index, &rulebook);

    assert!(result
        .rule_violations
        .iter()
        .any(|v| v == "Configured fallback reference 'ghost' not found in index"));
}

#[test]
fn steering_sidecar_takes_precedence_over_ini_ratio() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone()
            .set("analysis/cm_steer.json", r#"{"max_wheel_angle_deg": 35.5}"#),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &competition());

    let steering = &result.info.steering;
    let effective = steering.effective.expect("effective steering");
    assert!(effective.provenance.is_external());
    assert_eq!(steering.effective_angle(), Some(35.5));
    assert_eq!(steering.within_reference_tolerance, Some(true));
    assert_eq!(result.anti_cheat("AC028").map(|c| c.status), Some(CheckStatus::Pass));
}

#[test]
fn steering_over_cap_names_its_source() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission("efvd_test", &car);
    let index = ws.build_index();
    let rulebook = RulebookConfig {
        max_steer_angle_deg: Some(30.0),
        ..RulebookConfig::default()
    };

    let result = validator::validate(&submitted, &index, &rulebook);

    assert_eq!(
        result.info.steering.effective.map(|s| s.provenance),
        Some(SteeringProvenance::AckermannInner)
    );
    assert!(result
        .rule_violations
        .iter()
        .any(|v| v == "Measured max wheel angle 36.0° (max 30.0°) (derived from car.ini)"));
}

#[cfg(unix)]
#[test]
fn missing_sidecar_is_generated_by_configured_command() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission("efvd_test", &car);
    let index = ws.build_index();
    let rulebook = RulebookConfig {
        steer_measurement_cmd: Some(
            r#"printf '{"max_wheel_angle_deg": 35.8}' > "{out}""#.to_string(),
        ),
        ..RulebookConfig::default()
    };

    let result = validator::validate(&submitted, &index, &rulebook);

    assert!(result.info.steering.measurement_generated);
    assert!(submitted.join("analysis").join("cm_steer.json").is_file());
    assert_eq!(result.info.steering.effective_angle(), Some(35.8));
}

#[test]
fn kn5_stats_sidecar_caps_triangles() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().set(
            "analysis/kn5_stats.json",
            r#"{"files": [{"triangles": 400000, "objects": 120}, {"triangles": 150000, "objects": 40}]}"#,
        ),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &competition());

    assert!(result
        .rule_violations
        .iter()
        .any(|v| v == "Total triangles 550000 (max 500000) (analysis/kn5_stats.json)"));
    assert!(!result.rule_violations.iter().any(|v| v.starts_with("Total objects")));
}

#[test]
fn batch_validates_every_folder_in_name_order() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    ws.add_submission("efvd_b", &car);
    ws.add_submission("efvd_a", &car.clone().remove("data/setup.ini"));
    fs::write(ws.submissions().join("notes.txt"), "not a car").expect("write stray file");
    let index = ws.build_index();

    let results = validator::validate_batch(&ws.submissions(), &index, &RulebookConfig::default())
        .expect("batch runs");

    let cars: Vec<&str> = results.iter().map(|r| r.info.car.as_str()).collect();
    assert_eq!(cars, vec!["efvd_a", "efvd_b"]);
    assert!(!results[0].exact_physics_match);
    assert!(results[1].exact_physics_match);
}

fn has_violation(result: &car_inspector::domain::models::ValidationResult, text: &str) -> bool {
    result.rule_violations.iter().any(|v| v == text)
}

#[test]
fn setup_ranges_are_held_to_the_reference() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().set(
            "data/setup.ini",
            "[TOE_OUT_LF]\nMIN=-0.2\nMAX=0.1\nSTEP=0.01\n\n[TOE_OUT_RF]\nMIN=-0.1\nMAX=0.1\nSTEP=0.01\n\n\
             [EXTRA]\nMIN=0\nMAX=1\nSTEP=1\n",
        ),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert!(has_violation(&result, "Setup [TOE_OUT_LF] MIN -0.2 < reference -0.1"), "{:?}", result.rule_violations);
    assert!(has_violation(&result, "Unexpected setup section vs reference: [EXTRA]"));
    assert!(has_violation(&result, "Setup missing sections vs reference: FUEL"));
    assert!(!result.rule_violations.iter().any(|v| v.contains("[TOE_OUT_RF]")));
}

#[test]
fn second_skin_breaks_single_skin_rule() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().set("skins/blue/preview.png", png_header(16, 16)),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert_eq!(result.info.assets.skins_count, Some(2));
    assert!(has_violation(&result, "Skins count 2 (expected 1)"));
    let ac018 = result.anti_cheat("AC018").expect("skin count check present");
    assert_eq!(ac018.status, CheckStatus::Fail);
    assert_eq!(ac018.detail, "count=2");
}

#[test]
fn oversized_texture_is_a_violation_and_dds_is_left_unchecked() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone()
            .set("skins/red/livery.png", png_header(5000, 16))
            .set("skins/red/body.dds", "DDS payload"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert!(
        has_violation(&result, "Large texture dimensions 5000x16 in livery.png (>4096)"),
        "{:?}",
        result.rule_violations
    );
    assert!(!result.rule_violations.iter().any(|v| v.contains("preview.png")));
    assert_eq!(result.info.assets.textures_unchecked, vec!["skins/red/body.dds".to_string()]);
}

#[test]
fn tyre_widths_outside_competition_bounds() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone()
            .edit("data/tyres.ini", "WIDTH=0.265", "WIDTH=0.275")
            .edit("data/tyres.ini", "WIDTH=0.245", "WIDTH=0.215"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &competition());

    assert!(
        has_violation(&result, "Rear tyre WIDTH 275mm (max 265mm) (data/tyres.ini)"),
        "{:?}",
        result.rule_violations
    );
    assert!(has_violation(&result, "Front tyre WIDTH 215mm (expected 225-265mm) (data/tyres.ini)"));
    assert_eq!(result.anti_cheat("AC009").map(|c| c.status), Some(CheckStatus::Fail));
}

#[test]
fn rear_contact_reference_is_compared_against_the_rear_axle() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let untouched = ws.add_submission("efvd_clean", &car);
    let edited = ws.add_submission(
        "efvd_test",
        &car.clone().edit("data/tyres.ini", "DX_REF=1.25", "DX_REF=1.30"),
    );
    let index = ws.build_index();

    let clean = validator::validate(&untouched, &index, &RulebookConfig::default());
    assert!(!clean.rule_violations.iter().any(|v| v.contains("_REF")), "{:?}", clean.rule_violations);

    let result = validator::validate(&edited, &index, &RulebookConfig::default());
    assert!(
        has_violation(&result, "Rear tyre DX_REF 1.3000 differs from reference 1.2500 (data/tyres.ini)"),
        "{:?}",
        result.rule_violations
    );
    assert!(!result.rule_violations.iter().any(|v| v.starts_with("Front tyre DX_REF")));
}

#[test]
fn drift_bands_are_advisory() {
    let ws = Workspace::new();
    let in_band = CarFiles::standard().edit("data/drivetrain.ini", "GEAR_3=1.45", "GEAR_3=0.8");
    let long_final = CarFiles::standard().edit("data/drivetrain.ini", "FINAL=3.9", "FINAL=5.0");
    ws.add_reference("efvd_in_band", &in_band);
    ws.add_reference("efvd_long_final", &long_final);
    let in_band_dir = ws.add_submission("efvd_in_band", &in_band);
    let long_final_dir = ws.add_submission("efvd_long_final", &long_final);
    let index = ws.build_index();

    let result = validator::validate(&in_band_dir, &index, &RulebookConfig::default());
    assert_eq!(result.info.gearing.drift_third_warn, Some(false));
    assert_eq!(result.info.gearing.drift_final_warn, Some(false));

    let result = validator::validate(&long_final_dir, &index, &RulebookConfig::default());
    assert_eq!(result.info.gearing.drift_third_warn, Some(true));
    assert_eq!(result.info.gearing.drift_final_warn, Some(true));
    assert_eq!(result.verdict(), Verdict::Pass, "{:?}", result.rule_violations);
}

#[test]
fn changed_collider_always_fails() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().set("collider.kn5", "kn5-collider-mesh-widened"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert!(result.info.data_files.collider_hash_mismatch);
    assert!(has_violation(&result, "Collider KN5 differs from reference (collider.kn5)"));
    assert_eq!(result.anti_cheat("AC032").map(|c| c.status), Some(CheckStatus::Fail));
    assert_eq!(result.verdict(), Verdict::Fail);
}

#[test]
fn changed_extension_config_only_warns() {
    let ws = Workspace::new();
    let car = CarFiles::standard().set("extension/lights.ini", "[LIGHT_0]\nCOLOR=1,1,1\n");
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().edit("extension/lights.ini", "COLOR=1,1,1", "COLOR=2,2,2"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &RulebookConfig::default());

    assert_eq!(result.info.data_files.extension_hash_mismatches, vec!["extension/lights.ini".to_string()]);
    assert!(!result.rule_violations.iter().any(|v| v.contains("extension")), "{:?}", result.rule_violations);
    let ac030 = result.anti_cheat("AC030").expect("extension review present");
    assert_eq!(ac030.status, CheckStatus::Warn);
    assert!(ac030.detail.contains("changed=1"), "{}", ac030.detail);
    assert_eq!(ac030.items.as_deref(), Some(&["extension/lights.ini".to_string()][..]));
    assert_eq!(result.verdict(), Verdict::Pass);
}

#[test]
fn kelvin_sign_model_name_is_not_a_kn5() {
    let ws = Workspace::new();
    let car = CarFiles::standard();
    ws.add_reference("efvd_test", &car);
    let submitted = ws.add_submission(
        "efvd_test",
        &car.clone().set("efvd_body.\u{212A}N5", "not-a-model"),
    );
    let index = ws.build_index();

    let result = validator::validate(&submitted, &index, &competition());

    assert!(!result
        .info
        .assets
        .kn5_files
        .iter()
        .any(|n| n.contains('\u{212A}')));
    assert_eq!(result.anti_cheat("AC013").map(|c| c.status), Some(CheckStatus::Pass));
}
