//! Stage chaining with scripted detectors
//!
//! Real-weight runs need the ONNX exports and are ignored by default:
//! MICROGRAPH_MODEL_DIR=/path/to/vision_model cargo test -- --ignored

use micrograph_common::{BoundingBox, ChannelOrder, Detection, PixelBox, RasterImage};
use micrograph_extract_core::testing::{FakeLoader, ScriptedDetector};
use micrograph_extract_core::{DetectorKind, ExtractConfig, ModelRegistry, DETECTOR_CHANNEL_ORDER};
use micrograph_figure_detection::{ComponentSplitter, PanelDetector, SubRegionExtractor};
use std::sync::Arc;

fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: u32) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2), score, class_id)
}

fn page() -> RasterImage {
    let (width, height) = (400, 300);
    let data = (0..width * height * 3).map(|i| (i % 256) as u8).collect();
    RasterImage::from_raw(width, height, 3, data, ChannelOrder::Rgb).expect("page")
}

#[test]
fn test_page_to_sub_images() {
    let panel = Arc::new(ScriptedDetector::new(vec![det(
        100.0, 50.0, 300.0, 250.0, 0.97, 0,
    )]));
    let component = Arc::new(ScriptedDetector::new(vec![
        det(0.0, 0.0, 200.0, 150.0, 0.9, 0),
        det(0.0, 150.0, 200.0, 200.0, 0.8, 1),
    ]));
    let sub_region = Arc::new(ScriptedDetector::new(vec![
        det(0.0, 0.0, 100.0, 150.0, 0.88, 0),
        det(100.0, 0.0, 200.0, 150.0, 0.72, 0),
        det(50.0, 50.0, 60.0, 60.0, 0.69, 0),
    ]));

    let loader = FakeLoader::new()
        .with_detector(DetectorKind::Panel, panel.clone())
        .with_detector(DetectorKind::Component, component.clone())
        .with_detector(DetectorKind::SubRegion, sub_region.clone());
    let registry = ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(loader));

    let panels = PanelDetector::default()
        .detect_panels(&registry, &page())
        .expect("panels");
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0].region, PixelBox::new(100, 50, 300, 250));

    let components = ComponentSplitter::new()
        .split_components(&registry, &panels[0].image)
        .expect("components");
    let micrograph = components.micrograph.expect("micrograph");
    assert_eq!(micrograph.region, PixelBox::new(0, 0, 200, 150));
    assert_eq!(
        components.caption.expect("caption").region,
        PixelBox::new(0, 150, 200, 200)
    );

    let sub_images = SubRegionExtractor::default()
        .extract_sub_images(&registry, &micrograph.image)
        .expect("sub-images");
    assert_eq!(sub_images.len(), 2);

    // Panel pixels are the page pixels, swapped into detector ordering
    let source = page().to_channel_order(DETECTOR_CHANNEL_ORDER);
    assert_eq!(
        panels[0].image.pixels()[[0, 0, 0]],
        source.pixels()[[50, 100, 0]]
    );

    for detector in [&panel, &component, &sub_region] {
        assert_eq!(detector.calls(), 1);
        assert!(detector.seen().iter().all(|s| s.order == DETECTOR_CHANNEL_ORDER));
    }
    assert_eq!(component.seen()[0].width, 200);
    assert_eq!(sub_region.seen()[0].height, 150);
}

#[test]
fn test_stages_are_deterministic() {
    let loader = FakeLoader::new().with_detector(
        DetectorKind::Panel,
        Arc::new(ScriptedDetector::new(vec![
            det(10.0, 10.0, 120.0, 90.0, 0.95, 0),
            det(200.0, 20.0, 390.0, 280.0, 0.93, 0),
        ])),
    );
    let registry = ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(loader));
    let stage = PanelDetector::default();

    let first = stage.detect_panels(&registry, &page()).expect("first");
    let second = stage.detect_panels(&registry, &page()).expect("second");
    assert_eq!(first, second);
}

#[test]
#[ignore = "requires ONNX weights in MICROGRAPH_MODEL_DIR"]
fn test_real_models_blank_page() {
    let config = ExtractConfig::default()
        .with_env_overrides()
        .expect("config");
    let registry = ModelRegistry::new(config);
    let blank = RasterImage::from_raw(612, 792, 3, vec![255; 612 * 792 * 3], ChannelOrder::Rgb)
        .expect("blank page");

    let panels = PanelDetector::default()
        .detect_panels(&registry, &blank)
        .expect("panel detector runs");
    assert!(panels.is_empty());
}
