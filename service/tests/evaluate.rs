use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use facematch_codec::{BoundingRegion, CodecError, FaceEncoder, FaceImage, RawDetection};
use facematch_service::{MatchDecision, MatchService, MultiFacePolicy, ServiceConfig, ServiceError};
use facematch_store::{MemoryStore, RedbStore, SignatureStore};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Treats every non-black pixel in the first row as a face whose
/// signature is the pixel's RGB value scaled to [0, 1].
struct PixelEncoder;

impl FaceEncoder for PixelEncoder {
    fn encode(&self, image: &FaceImage) -> Result<Vec<RawDetection>, CodecError> {
        let rgb = image.rgb();
        Ok((0..rgb.width())
            .filter_map(|x| {
                let Rgb([r, g, b]) = *rgb.get_pixel(x, 0);
                if r == 0 && g == 0 && b == 0 {
                    return None;
                }
                Some(RawDetection {
                    embedding: vec![r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0],
                    region: BoundingRegion::new(x as f32, 0.0, 1.0, 1.0),
                })
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        3
    }
}

/// Encodes a PNG whose first row holds one pixel per face.
fn photo(faces: &[[u8; 3]]) -> Vec<u8> {
    let width = faces.len().max(1) as u32 + 1;
    let mut img = RgbImage::new(width, 2);
    for (x, px) in faces.iter().enumerate() {
        img.put_pixel(x as u32, 0, Rgb(*px));
    }
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn config() -> ServiceConfig {
    ServiceConfig {
        dimension: 3,
        threshold: 0.2,
        ..Default::default()
    }
}

fn memory_service() -> MatchService {
    MatchService::new(&config(), Arc::new(PixelEncoder), Arc::new(MemoryStore::new(3))).unwrap()
}

#[test]
fn empty_store_one_face_is_no_match() {
    let svc = memory_service();
    let d = svc.evaluate(&photo(&[[200, 10, 10]])).unwrap();
    assert_eq!(d, MatchDecision::NoMatch);
}

#[test]
fn enrolled_identity_within_threshold_matches() {
    let svc = memory_service();
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();
    svc.enroll_image("bob", &photo(&[[0, 0, 255]])).unwrap();

    match svc.evaluate(&photo(&[[250, 5, 0]])).unwrap() {
        MatchDecision::Matched { identity, distance } => {
            assert_eq!(identity, "alice");
            assert!(distance <= svc.threshold(), "distance {distance}");
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn no_face_leaves_store_untouched() {
    let svc = memory_service();
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();
    let before = svc.store().all().unwrap();

    let d = svc.evaluate(&photo(&[])).unwrap();
    assert_eq!(d, MatchDecision::NoFaceDetected);

    let after = svc.store().all().unwrap();
    assert_eq!(after.len(), before.len());
    assert_eq!(
        after.get("alice").unwrap().signatures().len(),
        before.get("alice").unwrap().signatures().len()
    );
}

#[test]
fn three_faces_are_reported() {
    let svc = memory_service();
    let d = svc
        .evaluate(&photo(&[[255, 0, 0], [0, 255, 0], [0, 0, 255]]))
        .unwrap();
    assert_eq!(d, MatchDecision::MultipleFacesDetected { count: 3 });
}

#[test]
fn equal_sized_faces_are_not_picked_under_largest_face() {
    let cfg = ServiceConfig {
        multi_face: MultiFacePolicy::LargestFace,
        ..config()
    };
    let svc = MatchService::new(&cfg, Arc::new(PixelEncoder), Arc::new(MemoryStore::new(3))).unwrap();
    let d = svc.evaluate(&photo(&[[255, 0, 0], [0, 255, 0]])).unwrap();
    assert_eq!(d, MatchDecision::MultipleFacesDetected { count: 2 });
}

#[test]
fn identical_enrollments_are_ambiguous() {
    let svc = memory_service();
    svc.enroll_image("alice", &photo(&[[100, 100, 100]])).unwrap();
    svc.enroll_image("carol", &photo(&[[100, 100, 100]])).unwrap();

    match svc.evaluate(&photo(&[[100, 100, 110]])).unwrap() {
        MatchDecision::AmbiguousMatch { candidates, .. } => {
            assert_eq!(candidates, vec!["alice".to_string(), "carol".to_string()]);
        }
        other => panic!("expected ambiguous match, got {other:?}"),
    }
}

#[test]
fn second_enrollment_photo_improves_recall() {
    let svc = memory_service();
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();
    assert_eq!(
        svc.evaluate(&photo(&[[120, 120, 0]])).unwrap(),
        MatchDecision::NoMatch
    );

    svc.enroll_image("alice", &photo(&[[130, 110, 0]])).unwrap();
    assert_eq!(svc.store().len().unwrap(), 1);
    assert_eq!(
        svc.evaluate(&photo(&[[120, 120, 0]])).unwrap().identity(),
        Some("alice")
    );
}

#[test]
fn threshold_override() {
    let svc = memory_service();
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();

    let img = photo(&[[0, 255, 0]]);
    assert_eq!(svc.evaluate(&img).unwrap(), MatchDecision::NoMatch);
    assert_eq!(
        svc.evaluate_with(&img, Some(2.0)).unwrap().identity(),
        Some("alice")
    );
    assert!(matches!(
        svc.evaluate_with(&img, Some(-1.0)),
        Err(ServiceError::Match(_))
    ));
}

#[test]
fn undecodable_bytes_are_a_fault() {
    let svc = memory_service();
    assert!(matches!(
        svc.evaluate(b"\x89PNG but not really"),
        Err(ServiceError::Codec(CodecError::Decode(_)))
    ));
}

#[test]
fn concurrent_evaluate_and_enroll() {
    let svc = Arc::new(memory_service());
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();

    let enrollers: Vec<_> = (0..8u8)
        .map(|i| {
            let svc = svc.clone();
            thread::spawn(move || {
                svc.enroll_image(&format!("user-{i}"), &photo(&[[0, 30 * i + 10, 200]]))
                    .unwrap();
            })
        })
        .collect();
    let matchers: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            thread::spawn(move || {
                let d = svc.evaluate(&photo(&[[255, 0, 0]])).unwrap();
                assert_eq!(d.identity(), Some("alice"));
            })
        })
        .collect();

    for h in enrollers.into_iter().chain(matchers) {
        h.join().unwrap();
    }
    assert_eq!(svc.store().len().unwrap(), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn evaluate_async_runs_off_the_runtime() {
    let svc = Arc::new(memory_service());
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(svc.evaluate_async(photo(&[[250, 0, 0]]), None))
        })
        .collect();
    for t in tasks {
        let d = t.await.unwrap().unwrap();
        assert_eq!(d.identity(), Some("alice"));
    }
}

#[tokio::test]
async fn cancelled_evaluate_leaves_store_intact() {
    let svc = Arc::new(memory_service());
    svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();

    let fut = svc.clone().evaluate_async(photo(&[[255, 0, 0]]), None);
    drop(fut);

    let d = svc.clone().evaluate_async(photo(&[[255, 0, 0]]), None).await.unwrap();
    assert_eq!(d.identity(), Some("alice"));
    assert_eq!(svc.store().len().unwrap(), 1);
}

#[test]
fn redb_backed_service_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faces.redb");
    let cfg = config();

    {
        let store = Arc::new(RedbStore::open(&path, cfg.store_config()).unwrap());
        let svc = MatchService::new(&cfg, Arc::new(PixelEncoder), store).unwrap();
        svc.enroll_image("alice", &photo(&[[255, 0, 0]])).unwrap();
        svc.enroll_image("bob", &photo(&[[0, 0, 255]])).unwrap();
        svc.store().remove("bob").unwrap();
    }

    let store = Arc::new(RedbStore::open(&path, cfg.store_config()).unwrap());
    let svc = MatchService::new(&cfg, Arc::new(PixelEncoder), store).unwrap();
    assert_eq!(
        svc.evaluate(&photo(&[[250, 0, 5]])).unwrap().identity(),
        Some("alice")
    );
    assert_eq!(
        svc.evaluate(&photo(&[[0, 0, 255]])).unwrap(),
        MatchDecision::NoMatch
    );
}
