use std::sync::Arc;

use image::{Rgba, RgbaImage};
use mask::{
    BoundingBox, Compositor, MaskTracer, RawMask,
    compositor::{BACKGROUND, SUBJECT},
};
use segment::{
    EditorSession, Embedding, InferenceResponse, Prompt, PromptOutcome, ResponseOutcome, ScaleParameters,
    SessionConfig, SessionError, SessionState,
    embedding::{EMBEDDING_BYTES, EMBEDDING_LEN, encode_base64},
};

fn photo(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 251) as u8, (y % 241) as u8, 77, 255]))
}

fn ready(width: u32, height: u32) -> EditorSession {
    let mut session = EditorSession::new(&SessionConfig::default());
    session.begin_image_load();
    let request = session.image_decoded(photo(width, height)).unwrap();
    let payload = encode_base64(&vec![0.5; EMBEDDING_LEN]);
    session.embedding_received(request.epoch, &payload).unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    session
}

fn click(session: &mut EditorSession, x: f64, y: f64) -> Prompt {
    match session.add_click(x, y).unwrap() {
        PromptOutcome::Issued(prompt) => prompt,
        other => panic!("expected a prompt, got {other:?}"),
    }
}

fn answer(session: &mut EditorSession, prompt: &Prompt, mask: RawMask) -> ResponseOutcome {
    session
        .apply_response(InferenceResponse { prompt: prompt.id, mask })
        .unwrap()
}

fn rect_mask(scale: &ScaleParameters, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> RawMask {
    let (w, h) = scale.upload_dimensions();
    RawMask::from_fn(w, h, |cx, cy| if x.contains(&cx) && y.contains(&cy) { 2.0 } else { -2.0 })
}

#[test]
fn scale_of_a_2000_by_1000_bitmap() {
    let scale = ScaleParameters::resolve(2000, 1000);
    assert!((scale.upload_scale - 0.512).abs() < 1e-12);
    assert!((scale.model_scale - 0.5).abs() < 1e-12);
    assert!((scale.onnx_scale - 0.5 / 0.512).abs() < 1e-12);
    assert!((scale.onnx_scale - 0.9766).abs() < 1e-4);
    assert_eq!(scale.upload_dimensions(), (1024, 512));
}

#[test]
fn scale_invariants_hold_across_sizes() {
    for (w, h) in [(1, 1), (3, 4000), (640, 480), (1024, 1024), (5000, 20), (1333, 2666)] {
        let scale = ScaleParameters::resolve(w, h);
        assert!((scale.onnx_scale - scale.model_scale / scale.upload_scale).abs() < 1e-9);
        assert!(scale.model_scale * f64::from(w.min(h)) <= 1333.0);
    }
}

#[test]
fn three_clicks_then_two_undos() {
    let mut session = ready(800, 600);
    let first = click(&mut session, 100.0, 100.0);
    let scale = *session.scale().unwrap();
    let first_mask = rect_mask(&scale, 0..50, 0..50);
    answer(&mut session, &first, first_mask.clone());

    // Second prompt never answered before the undos
    let _second = click(&mut session, 200.0, 200.0);
    let third = click(&mut session, 300.0, 300.0);
    assert_eq!(third.clicks.len(), 3);

    assert!(matches!(session.undo(), PromptOutcome::Issued(_)));
    assert!(matches!(session.undo(), PromptOutcome::Issued(_)));
    assert_eq!(session.history().len(), 1);
    // Only the first click's response had been applied
    assert_eq!(session.history().prior_masks().len(), 1);
    assert_eq!(session.history().prior_masks().latest(), Some(&Arc::new(first_mask)));
}

#[test]
fn three_unanswered_clicks_then_two_undos() {
    let mut session = ready(800, 600);
    click(&mut session, 100.0, 100.0);
    click(&mut session, 200.0, 200.0);
    click(&mut session, 300.0, 300.0);

    session.undo();
    session.undo();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().prior_masks().len(), 0);
}

#[test]
fn add_then_undo_before_response_keeps_cache() {
    let mut session = ready(800, 600);
    let scale = *session.scale().unwrap();
    let first = click(&mut session, 100.0, 100.0);
    answer(&mut session, &first, rect_mask(&scale, 0..50, 0..50));
    let masks_before = session.history().prior_masks().len();
    let clicks_before = session.history().clicks().to_vec();

    click(&mut session, 200.0, 200.0);
    session.undo();

    assert_eq!(session.history().clicks(), clicks_before.as_slice());
    assert_eq!(session.history().prior_masks().len(), masks_before);
}

#[test]
fn undo_pops_only_applied_masks() {
    let mut session = ready(800, 600);
    let scale = *session.scale().unwrap();
    for i in 0..3 {
        let prompt = click(&mut session, 10.0 * f64::from(i), 10.0);
        answer(&mut session, &prompt, rect_mask(&scale, 0..(10 + i), 0..10));
    }
    assert_eq!(session.history().prior_masks().len(), 3);

    session.undo();
    session.undo();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().prior_masks().len(), 1);
}

#[test]
fn single_square_cutout() {
    // Long edge of 1024 keeps mask cells and display pixels the same size
    let mut session = ready(1024, 512);
    let prompt = click(&mut session, 120.0, 230.0);
    let scale = *session.scale().unwrap();

    let outcome = answer(&mut session, &prompt, rect_mask(&scale, 100..150, 200..260));
    assert_eq!(outcome, ResponseOutcome::Applied { selected: true });

    let outline = session.outline().unwrap();
    assert_eq!(outline.shapes.len(), 1);
    assert!(!outline.shapes[0].has_holes());
    assert!((outline.shapes[0].area() - 50.0 * 60.0).abs() < 1e-9);

    let rendered = session.rendered().unwrap();
    assert_eq!(rendered.bounds, BoundingBox { x: 100, y: 200, width: 50, height: 60 });
    for (x, y, pixel) in rendered.image.enumerate_pixels() {
        let expected = if rendered.bounds.contains(x, y) { SUBJECT } else { BACKGROUND };
        assert_eq!(*pixel, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn cutout_recolors_transparent_pixels_inside_the_box() {
    let mut bitmap = RgbaImage::from_pixel(40, 40, Rgba([9, 9, 9, 255]));
    bitmap.put_pixel(15, 15, Rgba([9, 9, 9, 0]));

    let mask = RawMask::from_fn(40, 40, |x, y| if (10..20).contains(&x) && (10..20).contains(&y) { 1.0 } else { -1.0 });
    let outline = MaskTracer::default().trace(&mask, 1.0).unwrap();
    let rendered = Compositor.render(&bitmap, &outline).unwrap().unwrap();

    assert_eq!(rendered.bounds, BoundingBox { x: 10, y: 10, width: 10, height: 10 });
    assert_eq!(*rendered.image.get_pixel(15, 15), BACKGROUND);
    assert_eq!(*rendered.image.get_pixel(14, 15), SUBJECT);
}

#[test]
fn degenerate_mask_gives_no_cutout() {
    let mut session = ready(300, 200);
    let prompt = click(&mut session, 1.0, 1.0);
    let (w, h) = session.scale().unwrap().upload_dimensions();

    let outcome = answer(&mut session, &prompt, RawMask::from_fn(w, h, |_, _| 0.0));
    assert_eq!(outcome, ResponseOutcome::Applied { selected: false });
    assert!(session.outline().unwrap().is_empty());
    assert!(session.rendered().is_none());
}

#[test]
fn superseded_responses_apply_in_arrival_order() {
    let mut session = ready(1024, 1024);
    let scale = *session.scale().unwrap();
    let first = click(&mut session, 10.0, 10.0);
    let second = click(&mut session, 500.0, 500.0);

    answer(&mut session, &second, rect_mask(&scale, 400..600, 400..600));
    answer(&mut session, &first, rect_mask(&scale, 0..20, 0..20));

    assert_eq!(session.rendered().unwrap().bounds, BoundingBox { x: 0, y: 0, width: 20, height: 20 });
    assert_eq!(session.history().prior_masks().len(), 2);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn responses_after_clear_are_dropped() {
    let mut session = ready(640, 480);
    let scale = *session.scale().unwrap();
    let prompt = click(&mut session, 10.0, 10.0);
    session.clear();

    assert_eq!(answer(&mut session, &prompt, rect_mask(&scale, 0..5, 0..5)), ResponseOutcome::Stale);
    assert!(session.rendered().is_none());
    assert!(session.history().prior_masks().is_empty());
}

#[test]
fn malformed_embedding_stays_pending() {
    let mut session = EditorSession::default();
    session.begin_image_load();
    let request = session.image_decoded(photo(64, 64)).unwrap();

    let short = encode_base64(&vec![0.0; EMBEDDING_LEN - 1]);
    let err = session.embedding_received(request.epoch, &short).unwrap_err();
    assert!(matches!(
        err,
        SessionError::MalformedEmbedding { expected: EMBEDDING_BYTES, .. }
    ));
    assert_eq!(session.state(), SessionState::EmbeddingPending);
    assert!(session.is_loading());

    // A later well-formed payload still goes through
    let good = Embedding::from_le_bytes(request.epoch, &vec![0u8; EMBEDDING_BYTES]).unwrap();
    session.set_embedding(good).unwrap();
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn prompts_share_one_embedding() {
    let mut session = ready(200, 100);
    let a = click(&mut session, 1.0, 1.0);
    let b = click(&mut session, 2.0, 2.0);
    assert!(Arc::ptr_eq(&a.embedding, &b.embedding));
    assert_eq!(a.scale, b.scale);
}
