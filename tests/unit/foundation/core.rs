use super::*;

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    assert_eq!(
        Canvas::new(640, 480).unwrap(),
        Canvas {
            width: 640,
            height: 480
        }
    );
}

#[test]
fn canvas_rgba8_len() {
    assert_eq!(Canvas::new(3, 2).unwrap().rgba8_len().unwrap(), 24);
}

#[test]
fn frames_for_duration_floors() {
    assert_eq!(frames_for_duration(5.0, 30), 150);
    assert_eq!(frames_for_duration(1.0, 2), 2);
    assert_eq!(frames_for_duration(0.5, 3), 1);
    assert_eq!(frames_for_duration(0.01, 30), 0);
    assert_eq!(frames_for_duration(1.1, 30), 33);
}
