use super::*;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "MINDLINE_CHAT_PAGE_SIZE",
    "MINDLINE_SNAPSHOT_DEBOUNCE_MS",
    "MINDLINE_RECONNECT_BACKOFF_MS",
    "MINDLINE_MAX_BACKOFF_MS",
    "MINDLINE_SWIPE_THRESHOLD_PX",
    "MINDLINE_MAX_SWIPE_PX",
    "MINDLINE_LONG_PRESS_MS",
    "MINDLINE_DOUBLE_TAP_MS",
    "MINDLINE_LIKE_EMOJI",
    "MINDLINE_PREVIEW_BASE_URL",
    "MINDLINE_PREVIEW_TIMEOUT_SECS",
];

/// # Safety
/// Callers hold `ENV_LOCK`; no other test in this crate touches `MINDLINE_*`.
unsafe fn clear_mindline_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
fn from_env_uses_defaults_when_unset() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_mindline_env() };

    let cfg = MindlineConfig::from_env().unwrap();
    assert_eq!(cfg, MindlineConfig::default());
    assert_eq!(cfg.feed.page_size, 50);
    assert_eq!(cfg.gesture.long_press_ms, 500);
    assert_eq!(cfg.like_emoji, "❤️");
    assert!(cfg.preview.is_none());
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_mindline_env();
        std::env::set_var("MINDLINE_CHAT_PAGE_SIZE", "20");
        std::env::set_var("MINDLINE_DOUBLE_TAP_MS", "250");
        std::env::set_var("MINDLINE_SWIPE_THRESHOLD_PX", "60.5");
        std::env::set_var("MINDLINE_LIKE_EMOJI", "😍");
        std::env::set_var("MINDLINE_PREVIEW_BASE_URL", "http://preview.test/");
        std::env::set_var("MINDLINE_PREVIEW_TIMEOUT_SECS", "3");
    }

    let cfg = MindlineConfig::from_env().unwrap();
    assert_eq!(cfg.feed.page_size, 20);
    assert_eq!(cfg.gesture.double_tap_ms, 250);
    assert!((cfg.gesture.swipe_threshold_px - 60.5).abs() < f64::EPSILON);
    assert_eq!(cfg.like_emoji, "😍");
    assert_eq!(
        cfg.preview,
        Some(PreviewConfig { base_url: "http://preview.test".into(), timeout_secs: 3 })
    );

    unsafe { clear_mindline_env() };
}

#[test]
fn from_env_ignores_unparseable_numbers() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_mindline_env();
        std::env::set_var("MINDLINE_LONG_PRESS_MS", "soon");
    }

    let cfg = MindlineConfig::from_env().unwrap();
    assert_eq!(cfg.gesture.long_press_ms, DEFAULT_LONG_PRESS_MS);

    unsafe { clear_mindline_env() };
}

#[test]
fn from_env_rejects_zero_page_size() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_mindline_env();
        std::env::set_var("MINDLINE_CHAT_PAGE_SIZE", "0");
    }

    let err = MindlineConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("MINDLINE_CHAT_PAGE_SIZE"));

    unsafe { clear_mindline_env() };
}

#[test]
fn from_env_rejects_threshold_beyond_clamp() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_mindline_env();
        std::env::set_var("MINDLINE_SWIPE_THRESHOLD_PX", "200");
    }

    assert!(MindlineConfig::from_env().is_err());

    unsafe { clear_mindline_env() };
}

#[test]
fn blank_preview_url_disables_previews() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_mindline_env();
        std::env::set_var("MINDLINE_PREVIEW_BASE_URL", "   ");
    }

    assert!(MindlineConfig::from_env().unwrap().preview.is_none());

    unsafe { clear_mindline_env() };
}

#[test]
fn feed_debounce_is_millis() {
    let feed = FeedConfig { snapshot_debounce_ms: 45, ..FeedConfig::default() };
    assert_eq!(feed.debounce(), Duration::from_millis(45));
}
