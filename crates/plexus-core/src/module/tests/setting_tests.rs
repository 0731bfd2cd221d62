use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::module::setting::{AnySetting, Setting, SettingError, SettingsRegistry};

#[test]
fn test_consumers_run_in_registration_order() {
    let setting = Setting::new("Speed", 1);
    setting.add_consumer(|_, requested| requested * 10);
    setting.add_consumer(|_, requested| requested + 1);

    setting.set(2);
    assert_eq!(setting.value(), 21);
}

#[test]
fn test_consumer_receives_previous_value() {
    let setting = Setting::new("Range", 4.0_f64);
    // Never allow more than doubling in one step
    setting.add_consumer(|prev, requested| requested.min(prev * 2.0));

    setting.set(100.0);
    assert_eq!(setting.value(), 8.0);
}

#[test]
fn test_listeners_see_committed_value() {
    let setting = Setting::new("Mode", String::from("fast"));
    setting.add_consumer(|_, requested| requested.to_uppercase());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    setting.add_listener(move |prev: &String, committed: &String| {
        seen_clone.lock().unwrap().push((prev.clone(), committed.clone()));
    });

    setting.set("slow".to_string());
    assert_eq!(*seen.lock().unwrap(), vec![("fast".to_string(), "SLOW".to_string())]);
}

#[test]
fn test_writing_current_value_is_noop() {
    let setting = Setting::new("Flag", false);
    let consumer_calls = Arc::new(AtomicUsize::new(0));
    let listener_calls = Arc::new(AtomicUsize::new(0));
    let (c, l) = (consumer_calls.clone(), listener_calls.clone());
    setting.add_consumer(move |_, requested| {
        c.fetch_add(1, Ordering::SeqCst);
        requested
    });
    setting.add_listener(move |_, _| {
        l.fetch_add(1, Ordering::SeqCst);
    });

    setting.set(false);
    assert_eq!(consumer_calls.load(Ordering::SeqCst), 0);
    assert_eq!(listener_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_vetoed_write_does_not_notify_listeners() {
    let setting = Setting::new("Locked", true);
    setting.add_consumer(|_, _| true);
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    setting.add_listener(move |_, _| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    setting.set(false);
    assert!(setting.value());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_may_write_back() {
    let setting = Arc::new(Setting::new("Trigger", false));
    let weak = Arc::downgrade(&setting);
    setting.add_listener(move |_, committed| {
        if *committed {
            if let Some(s) = weak.upgrade() {
                s.set(false);
            }
        }
    });

    setting.set(true);
    assert!(!setting.value());
}

#[test]
fn test_reset_and_json_snapshot() {
    let setting = Setting::new("Delay", 5_u32);
    setting.set(9);
    assert!(!setting.is_default());
    assert_eq!(setting.to_json().unwrap(), serde_json::json!(9));

    AnySetting::reset(&setting);
    assert!(setting.is_default());

    setting.load_json(&serde_json::json!(12)).unwrap();
    assert_eq!(setting.value(), 12);

    let err = setting.load_json(&serde_json::json!("twelve")).unwrap_err();
    assert!(matches!(err, SettingError::TypeMismatch { .. }));
    assert_eq!(setting.value(), 12);
}

#[test]
fn test_registry_groups() {
    let registry = SettingsRegistry::new();
    registry.add_setting("Speed", Arc::new(Setting::new("Boost", 1.5_f32))).unwrap();
    registry.add_setting("Speed", Arc::new(Setting::new("Jump", true))).unwrap();
    registry.get_or_create_group("Empty");

    let names: Vec<String> = registry
        .list_settings("Speed")
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["Boost", "Jump"]);
    assert_eq!(registry.group_names(), vec!["Speed", "Empty"]);
    assert!(registry.list_settings("Unknown").is_empty());

    let duplicate = registry.add_setting("Speed", Arc::new(Setting::new("Jump", false)));
    assert!(matches!(duplicate, Err(SettingError::DuplicateSetting { .. })));

    assert!(registry.remove_group("Speed"));
    assert!(!registry.remove_group("Speed"));
    assert!(registry.list_settings("Speed").is_empty());
}

#[test]
fn test_downcast_through_any_setting() {
    let registry = SettingsRegistry::new();
    registry.add_setting("Fly", Arc::new(Setting::new("Height", 3_i64))).unwrap();

    let erased = registry.list_settings("Fly").remove(0);
    let typed = erased.as_any().downcast_ref::<Setting<i64>>().unwrap();
    typed.set(7);
    assert_eq!(erased.to_json().unwrap(), serde_json::json!(7));
}
