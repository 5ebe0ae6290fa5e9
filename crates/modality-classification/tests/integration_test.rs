//! Cascade behaviour with scripted classifiers

use micrograph_common::{ChannelOrder, ClassificationLabel, RasterImage};
use micrograph_extract_core::testing::{FakeLoader, ScriptedClassifier};
use micrograph_extract_core::{ClassifierKind, ExtractConfig, ModelRegistry};
use micrograph_modality_classification::{argmax, ClassifierCascade};
use proptest::prelude::*;
use std::sync::Arc;

fn sub_image(order: ChannelOrder) -> RasterImage {
    let data = (0..48 * 32 * 3).map(|i| (i * 7 % 256) as u8).collect();
    RasterImage::from_raw(48, 32, 3, data, order).expect("sub-image")
}

fn registry(gate: Arc<ScriptedClassifier>, five_way: Arc<ScriptedClassifier>) -> ModelRegistry {
    let loader = FakeLoader::new()
        .with_classifier(ClassifierKind::BinaryGate, gate)
        .with_classifier(ClassifierKind::FiveWay, five_way);
    ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(loader))
}

#[test]
fn test_gate_none_short_circuits() {
    let gate = Arc::new(ScriptedClassifier::new(vec![2.5, -1.0]));
    let five_way = Arc::new(ScriptedClassifier::new(vec![0.0, 0.0, 9.0, 0.0, 0.0]));
    let registry = registry(gate.clone(), five_way.clone());

    let label = ClassifierCascade::new()
        .classify(&registry, &sub_image(ChannelOrder::Bgr))
        .expect("classify");

    assert_eq!(label, ClassificationLabel::None);
    assert_eq!(gate.calls(), 1);
    assert_eq!(five_way.calls(), 0);
    assert!(!registry.is_classifier_loaded(ClassifierKind::FiveWay));
}

#[test]
fn test_five_way_fallback_hr_tem() {
    let gate = Arc::new(ScriptedClassifier::new(vec![-0.3, 1.7]));
    let five_way = Arc::new(ScriptedClassifier::new(vec![0.1, 0.4, 3.2, 0.9, -2.0]));
    let registry = registry(gate.clone(), five_way.clone());

    let label = ClassifierCascade::new()
        .classify(&registry, &sub_image(ChannelOrder::Rgb))
        .expect("classify");

    assert_eq!(label, ClassificationLabel::HrTem);
    assert_eq!(label.to_string(), "HR-TEM");
    assert_eq!(five_way.calls(), 1);
}

#[test]
fn test_each_fine_grained_index() {
    let expected = [
        ClassificationLabel::Ctem,
        ClassificationLabel::Diffraction,
        ClassificationLabel::HrTem,
        ClassificationLabel::Sem,
        ClassificationLabel::Stem,
    ];
    let responses = (0..5)
        .map(|winner| (0..5).map(|i| if i == winner { 1.0 } else { 0.0 }).collect())
        .collect();
    let gate = Arc::new(ScriptedClassifier::new(vec![0.0, 1.0]));
    let five_way = Arc::new(ScriptedClassifier::sequence(5, responses));
    let registry = registry(gate, five_way);
    let cascade = ClassifierCascade::new();

    for label in expected {
        let got = cascade
            .classify(&registry, &sub_image(ChannelOrder::Rgb))
            .expect("classify");
        assert_eq!(got, label);
    }
}

#[test]
fn test_nan_gate_logit_never_wins() {
    let gate = Arc::new(ScriptedClassifier::new(vec![f32::NAN, 1.0]));
    let five_way = Arc::new(ScriptedClassifier::new(vec![0.0, 0.0, 0.0, 4.0, 0.0]));
    let registry = registry(gate, five_way.clone());

    let label = ClassifierCascade::new()
        .classify(&registry, &sub_image(ChannelOrder::Rgb))
        .expect("classify");

    assert_eq!(label, ClassificationLabel::Sem);
    assert_eq!(five_way.calls(), 1);
}

#[test]
fn test_gate_tie_is_none() {
    let gate = Arc::new(ScriptedClassifier::new(vec![0.5, 0.5]));
    let five_way = Arc::new(ScriptedClassifier::new(vec![1.0; 5]));
    let registry = registry(gate, five_way.clone());

    let label = ClassifierCascade::new()
        .classify(&registry, &sub_image(ChannelOrder::Rgb))
        .expect("classify");
    assert_eq!(label, ClassificationLabel::None);
    assert_eq!(five_way.calls(), 0);
}

#[test]
fn test_classifier_errors_propagate() {
    let gate = Arc::new(ScriptedClassifier::failing(2, "bad tensor"));
    let five_way = Arc::new(ScriptedClassifier::new(vec![0.0; 5]));
    let registry = registry(gate, five_way);

    let err = ClassifierCascade::new()
        .classify(&registry, &sub_image(ChannelOrder::Rgb))
        .unwrap_err();
    assert!(!err.is_fatal());

    let empty = ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(FakeLoader::new()));
    let err = ClassifierCascade::new()
        .classify(&empty, &sub_image(ChannelOrder::Rgb))
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_grayscale_sub_image_is_classified() {
    let gate = Arc::new(ScriptedClassifier::new(vec![0.0, 1.0]));
    let five_way = Arc::new(ScriptedClassifier::new(vec![0.0, 0.0, 0.0, 1.0, 0.0]));
    let registry = registry(gate, five_way);
    let gray = RasterImage::from_raw(16, 16, 1, vec![90; 256], ChannelOrder::Rgb).expect("gray");

    let label = ClassifierCascade::new()
        .classify(&registry, &gray)
        .expect("classify");
    assert_eq!(label, ClassificationLabel::Sem);
}

proptest! {
    /// Property: whenever the gate says None the five-way model is untouched
    #[test]
    fn proptest_short_circuit(none_logit in -10.0f32..10.0, margin in 0.0f32..10.0) {
        let gate = Arc::new(ScriptedClassifier::new(vec![none_logit, none_logit - margin]));
        let five_way = Arc::new(ScriptedClassifier::new(vec![0.0, 0.0, 1.0, 0.0, 0.0]));
        let registry = registry(gate, five_way.clone());

        let label = ClassifierCascade::new()
            .classify(&registry, &sub_image(ChannelOrder::Rgb))
            .expect("classify");
        prop_assert_eq!(label, ClassificationLabel::None);
        prop_assert_eq!(five_way.calls(), 0);
    }

    /// Property: argmax points at a maximal element
    #[test]
    fn proptest_argmax_is_maximal(values in prop::collection::vec(-100.0f32..100.0, 1..10)) {
        let index = argmax(&values).expect("non-empty");
        prop_assert!(values.iter().all(|v| *v <= values[index]));
        prop_assert!(values[..index].iter().all(|v| *v < values[index]));
    }
}
