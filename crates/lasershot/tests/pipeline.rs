use approx::assert_abs_diff_eq;
use chrono::{Duration, TimeZone, Utc};
use lasershot::calib::compute_homography;
use lasershot::{
    CalibrationStore, CornerSlot, LaserShotConfig, LaserShotSession, MarkerPoint, MemoryStore,
    Mode, Resolution, RgbaImage, ShotParams, TargetRect,
};
use nalgebra::Point2;

fn scenario_points() -> Vec<MarkerPoint> {
    vec![
        MarkerPoint::new(100.0, 100.0, 0),
        MarkerPoint::new(102.0, 101.0, 50),
        MarkerPoint::new(400.0, 400.0, 60),
        MarkerPoint::new(101.0, 100.0, 4000),
    ]
}

fn scenario_config() -> LaserShotConfig {
    LaserShotConfig {
        shots: ShotParams {
            spatial_threshold: 10.0,
            temporal_threshold_ms: 300,
        },
        ..LaserShotConfig::default()
    }
}

#[test]
fn late_point_near_first_shot_starts_a_new_shot() {
    let mut session = LaserShotSession::from_config(&scenario_config());
    for p in scenario_points() {
        session.record_point(p);
    }

    let shots = session.shots().shots();
    assert_eq!(shots.len(), 3);
    assert_eq!(shots[0].points(), &scenario_points()[..2]);
    assert_eq!(shots[1].points(), &scenario_points()[2..3]);
    assert_eq!(shots[2].points(), &scenario_points()[3..]);
    assert_abs_diff_eq!(shots[0].center().x, 101.0, epsilon = 1e-12);
    assert_abs_diff_eq!(shots[0].center().y, 100.5, epsilon = 1e-12);
}

#[test]
fn replaying_a_sequence_gives_the_same_partition() {
    let points: Vec<MarkerPoint> = (0..200)
        .map(|i| {
            let x = ((i * 37) % 53) as f64 * 3.0;
            let y = ((i * 11) % 17) as f64 * 5.0;
            MarkerPoint::new(x, y, i as i64 * 40)
        })
        .collect();

    let run = || {
        let mut s = LaserShotSession::from_config(&LaserShotConfig::default());
        for &p in &points {
            s.record_point(p);
        }
        s.take_shots()
    };
    let a = run();
    let b = run();
    assert_eq!(a, b);
    assert_eq!(a.total_points(), points.len());
}

#[test]
fn full_frame_corners_give_identity() {
    let target = TargetRect::new(640.0, 360.0);
    let h = compute_homography(&target.corners(), target).expect("homography");
    let id = lasershot::Homography::identity();
    assert!(h.max_abs_diff(&id) < 1e-9);
}

#[test]
fn calibrated_session_reports_target_coordinates() {
    // camera sees the target shifted by (+20, +10) and halved
    let target = TargetRect::new(640.0, 360.0);
    let corners = [
        Point2::new(20.0, 10.0),
        Point2::new(340.0, 10.0),
        Point2::new(340.0, 190.0),
        Point2::new(20.0, 190.0),
    ];
    let h = compute_homography(&corners, target).expect("homography");
    let mapped = h.apply(Point2::new(180.0, 100.0));
    assert_abs_diff_eq!(mapped.x, 320.0, epsilon = 1e-6);
    assert_abs_diff_eq!(mapped.y, 180.0, epsilon = 1e-6);
}

fn frame_with_spot(res: Resolution, x0: usize, y0: usize) -> RgbaImage {
    let mut img = RgbaImage::new(res.width as usize, res.height as usize);
    for y in y0..y0 + 3 {
        for x in x0..x0 + 3 {
            img.put_pixel(x, y, [250, 10, 10, 255]);
        }
    }
    img
}

#[test]
fn stored_calibration_survives_restart_until_it_expires() {
    let res = Resolution::new(80, 45);
    let cfg = LaserShotConfig {
        camera_id: "usb-0".to_string(),
        processing: res,
        target: TargetRect::new(80.0, 45.0),
        ..LaserShotConfig::default()
    };
    let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().expect("date");
    let mut store = CalibrationStore::new(MemoryStore::new());

    let mut first = LaserShotSession::from_config(&cfg);
    let spots = [(9, 4), (69, 4), (69, 39), (9, 39)];
    for (slot, (x, y)) in CornerSlot::ALL.into_iter().zip(spots) {
        first.begin_corner(slot);
        assert_eq!(first.mode(), Mode::Calibrate);
        let frame = frame_with_spot(res, x, y);
        first.process_cycle(Some(&frame.view()), 0);
    }
    first.finish_calibration(&mut store, t0).expect("calibrate");

    let mut again = LaserShotSession::from_config(&cfg);
    assert!(again.restore_calibration(&store, t0 + Duration::days(29)));
    let spot = frame_with_spot(res, 9, 4);
    let report = again.process_cycle(Some(&spot.view()), 10);
    assert_eq!(report.points.len(), 1);
    assert_abs_diff_eq!(report.points[0].x, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(report.points[0].y, 0.0, epsilon = 1e-6);

    let mut stale = LaserShotSession::from_config(&cfg);
    assert!(!stale.restore_calibration(&store, t0 + Duration::days(31)));
    let report = stale.process_cycle(Some(&spot.view()), 10);
    assert_abs_diff_eq!(report.points[0].x, 10.5, epsilon = 1e-9);
}

#[test]
fn not_ready_frames_never_touch_shots() {
    let mut session = LaserShotSession::from_config(&LaserShotConfig::default());
    for t in 0..10 {
        let report = session.process_cycle(None, t * 50);
        assert!(report.skipped);
        assert!(report.points.is_empty());
    }
    assert!(session.shots().is_empty());
    assert_eq!(session.extractor().live_scratch(), 0);
}
