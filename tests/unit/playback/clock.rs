use super::*;

#[test]
fn paused_clock_does_not_advance() {
    let mut c = ManualClock::new(10.0);
    assert_eq!(c.advance(1.0), 0.0);
    assert!(!c.is_playing());
}

#[test]
fn reaching_the_end_pauses_and_signals_once() {
    let mut c = ManualClock::new(1.0);
    c.play();
    assert_eq!(c.advance(0.6), 0.6);
    assert!(!c.take_ended());
    assert_eq!(c.advance(0.6), 1.0);
    assert!(!c.is_playing());
    assert!(c.take_ended());
    assert!(!c.take_ended());
}

#[test]
fn seek_clamps_and_clears_ended() {
    let mut c = ManualClock::new(5.0);
    c.play();
    c.advance(10.0);
    c.seek(-3.0);
    assert_eq!(c.current_time(), 0.0);
    assert!(!c.take_ended());
    c.seek(7.0);
    assert_eq!(c.current_time(), 5.0);
    c.seek(f64::NAN);
    assert_eq!(c.current_time(), 0.0);
}

#[test]
fn zero_length_media_ends_on_first_tick() {
    let mut c = ManualClock::new(0.0);
    c.play();
    c.advance(0.0);
    assert!(c.take_ended());
}

#[test]
fn time_never_decreases_while_playing() {
    let mut c = ManualClock::new(3.0);
    c.play();
    let mut prev = 0.0;
    for _ in 0..200 {
        let t = c.advance(1.0 / 60.0);
        assert!(t >= prev);
        prev = t;
    }
}
