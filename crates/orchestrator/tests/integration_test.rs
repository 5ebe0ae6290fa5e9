//! End-to-end page processing with scripted models

use micrograph_common::{BoundingBox, ChannelOrder, ClassificationLabel, Detection, RasterImage};
use micrograph_extract_core::testing::{FakeLoader, ScriptedClassifier, ScriptedDetector};
use micrograph_extract_core::{ClassifierKind, DetectorKind, ExtractConfig, ModelRegistry};
use micrograph_orchestrator::{ExtractionPipeline, MetadataRecord};
use std::sync::Arc;

fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: u32) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2), score, class_id)
}

fn page(fill: u8) -> RasterImage {
    RasterImage::from_raw(300, 200, 3, vec![fill; 300 * 200 * 3], ChannelOrder::Rgb)
        .expect("page")
}

struct Models {
    panel: Arc<ScriptedDetector>,
    component: Arc<ScriptedDetector>,
    sub_region: Arc<ScriptedDetector>,
    gate: Arc<ScriptedClassifier>,
    five_way: Arc<ScriptedClassifier>,
}

impl Models {
    /// Two panels per page; the first has a caption, each has two sub-images
    fn standard() -> Self {
        Self {
            panel: Arc::new(ScriptedDetector::new(vec![
                det(0.0, 0.0, 150.0, 200.0, 0.96, 0),
                det(150.0, 0.0, 300.0, 200.0, 0.93, 0),
                det(10.0, 10.0, 20.0, 20.0, 0.50, 0),
            ])),
            component: Arc::new(ScriptedDetector::sequence(vec![
                vec![
                    det(0.0, 0.0, 150.0, 160.0, 0.9, 0),
                    det(0.0, 160.0, 150.0, 200.0, 0.9, 1),
                ],
                vec![det(0.0, 0.0, 150.0, 200.0, 0.9, 0)],
            ])),
            sub_region: Arc::new(ScriptedDetector::new(vec![
                det(0.0, 0.0, 75.0, 100.0, 0.8, 0),
                det(75.0, 0.0, 150.0, 100.0, 0.75, 0),
            ])),
            gate: Arc::new(ScriptedClassifier::sequence(
                2,
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
            )),
            five_way: Arc::new(ScriptedClassifier::sequence(
                5,
                vec![
                    vec![0.0, 0.0, 0.0, 2.0, 0.0],
                    vec![0.0, 0.0, 0.0, 0.0, 2.0],
                    vec![3.0, 0.0, 0.0, 0.0, 0.0],
                ],
            )),
        }
    }

    fn pipeline(&self) -> ExtractionPipeline {
        let loader = FakeLoader::new()
            .with_detector(DetectorKind::Panel, self.panel.clone())
            .with_detector(DetectorKind::Component, self.component.clone())
            .with_detector(DetectorKind::SubRegion, self.sub_region.clone())
            .with_classifier(ClassifierKind::BinaryGate, self.gate.clone())
            .with_classifier(ClassifierKind::FiveWay, self.five_way.clone());
        let registry = ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(loader));
        ExtractionPipeline::new(Arc::new(registry))
    }
}

#[test]
fn test_process_page_records() {
    let models = Models::standard();
    let extraction = models
        .pipeline()
        .process_page("small_2022_0003", 1, &page(200))
        .expect("page");

    assert_eq!(extraction.panels.len(), 2);
    assert!(extraction.panels[0].caption.is_some());
    assert!(extraction.panels[1].caption.is_none());

    let labels: Vec<_> = extraction.records().iter().map(|r| r.label).collect();
    assert_eq!(
        labels,
        vec![
            ClassificationLabel::Sem,
            ClassificationLabel::None,
            ClassificationLabel::Stem,
            ClassificationLabel::Ctem,
        ]
    );

    let records = extraction.records();
    assert_eq!(
        records[0],
        MetadataRecord {
            source_id: "small_2022_0003".to_string(),
            page_index: 1,
            panel_index: 0,
            sub_image_index: 0,
            label: ClassificationLabel::Sem,
            caption_ref: Some("small_2022_0003_p1_f0_caption".to_string()),
        }
    );
    assert_eq!(records[3].panel_index, 1);
    assert_eq!(records[3].sub_image_index, 1);
    assert_eq!(records[3].caption_ref, None);

    // One gate call per sub-image, five-way skipped for the None
    assert_eq!(models.gate.calls(), 4);
    assert_eq!(models.five_way.calls(), 3);
}

#[test]
fn test_no_panels_skips_downstream() {
    let models = Models {
        panel: Arc::new(ScriptedDetector::new(Vec::new())),
        ..Models::standard()
    };
    let extraction = models
        .pipeline()
        .process_page("empty_2020_0001", 0, &page(255))
        .expect("page");

    assert!(extraction.panels.is_empty());
    assert!(extraction.records().is_empty());
    assert_eq!(models.component.calls(), 0);
    assert_eq!(models.sub_region.calls(), 0);
    assert_eq!(models.gate.calls(), 0);
}

#[test]
fn test_panel_without_micrograph_skips_extraction() {
    let models = Models {
        component: Arc::new(ScriptedDetector::new(vec![det(
            0.0, 150.0, 150.0, 200.0, 0.9, 1,
        )])),
        ..Models::standard()
    };
    let extraction = models
        .pipeline()
        .process_page("caption_2020_0002", 0, &page(10))
        .expect("page");

    assert_eq!(extraction.panels.len(), 2);
    assert!(extraction.panels.iter().all(|p| p.micrograph.is_none()));
    assert_eq!(models.sub_region.calls(), 0);
    assert!(extraction.records().is_empty());
}

#[test]
fn test_failed_page_is_isolated() {
    let models = Models {
        panel: Arc::new(ScriptedDetector::sequence(vec![
            vec![det(0.0, 0.0, 150.0, 200.0, 0.99, 0)],
            vec![det(0.0, 0.0, 150.0, 200.0, 0.99, 0)],
        ])),
        component: Arc::new(ScriptedDetector::new(vec![det(
            0.0, 0.0, 150.0, 200.0, 0.9, 0,
        )])),
        sub_region: Arc::new(ScriptedDetector::sequence(vec![
            vec![det(0.0, 0.0, 50.0, 50.0, 0.9, 0)],
            vec![det(0.0, 0.0, 50.0, 50.0, 0.9, 0)],
        ])),
        gate: Arc::new(ScriptedClassifier::sequence(
            2,
            vec![vec![0.0, 1.0], vec![0.0, 1.0, 0.0]],
        )),
        five_way: Arc::new(ScriptedClassifier::new(vec![0.0, 0.0, 1.0, 0.0, 0.0])),
    };
    let pages = vec![page(1), page(2)];

    let report = models
        .pipeline()
        .process_document("mixed_2021_0005", &pages)
        .expect("non-fatal failures do not abort");

    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.pages[0].page_index, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].page_index, 1);
    assert_eq!(report.records().len(), 1);
    assert_eq!(report.records()[0].label, ClassificationLabel::HrTem);
}

#[test]
fn test_missing_model_aborts_document() {
    let loader = FakeLoader::new().with_detector(
        DetectorKind::Panel,
        Arc::new(ScriptedDetector::new(vec![det(0.0, 0.0, 100.0, 100.0, 0.99, 0)])),
    );
    let registry = ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(loader));
    let pipeline = ExtractionPipeline::new(Arc::new(registry));

    let err = pipeline
        .process_document("broken_2020_0009", &[page(0), page(0)])
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("broken_2020_0009 page 0"));
}

#[test]
fn test_missing_weights_loaded_once_across_pages() {
    let loader = Arc::new(FakeLoader::new());
    let registry = ModelRegistry::with_loader(ExtractConfig::default(), loader.clone());
    let pipeline = ExtractionPipeline::new(Arc::new(registry));
    let pages: Vec<_> = (0..6).map(|_| page(0)).collect();

    let err = pipeline
        .process_document_parallel("broken_2020_0010", &pages)
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(pipeline.process_document("broken_2020_0010", &pages).is_err());
    assert_eq!(loader.load_count(), 1);
}

#[test]
fn test_parallel_matches_sequential() {
    let pages: Vec<_> = (0..6).map(|i| page(i * 40)).collect();

    let sequential_models = Models {
        component: Arc::new(ScriptedDetector::new(vec![
            det(0.0, 0.0, 150.0, 160.0, 0.9, 0),
            det(0.0, 160.0, 150.0, 200.0, 0.9, 1),
        ])),
        gate: Arc::new(ScriptedClassifier::new(vec![0.0, 1.0])),
        five_way: Arc::new(ScriptedClassifier::new(vec![0.0, 1.0, 0.0, 0.0, 0.0])),
        ..Models::standard()
    };
    let sequential = sequential_models
        .pipeline()
        .process_document("par_2023_0010", &pages)
        .expect("sequential");

    let parallel_models = Models {
        component: Arc::new(ScriptedDetector::new(vec![
            det(0.0, 0.0, 150.0, 160.0, 0.9, 0),
            det(0.0, 160.0, 150.0, 200.0, 0.9, 1),
        ])),
        gate: Arc::new(ScriptedClassifier::new(vec![0.0, 1.0])),
        five_way: Arc::new(ScriptedClassifier::new(vec![0.0, 1.0, 0.0, 0.0, 0.0])),
        ..Models::standard()
    };
    let parallel = parallel_models
        .pipeline()
        .process_document_parallel("par_2023_0010", &pages)
        .expect("parallel");

    assert_eq!(sequential, parallel);
    let indices: Vec<_> = parallel.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(parallel.records().len(), 6 * 2 * 2);
    assert!(parallel
        .records()
        .iter()
        .all(|r| r.label == ClassificationLabel::Diffraction));
}
