mod common;

use chrono::{Duration as ChronoDuration, Utc};
use scopesync_core::settings::SettingsOverlay;
use scopesync_events::bus::SETTINGS_LOADED;

use common::*;

fn seed_owner_branding(h: &Harness) {
    h.store.put_record(
        TENANT_A,
        Some(OWNER),
        SettingsOverlay::colors_only(colors(&[("primary", "#ff0000")])),
        Utc::now() - ChronoDuration::hours(1),
    );
    // Newer, but a plain member's colors are never adopted.
    h.store.put_record(
        TENANT_A,
        Some(OTHER_MEMBER),
        SettingsOverlay::colors_only(colors(&[("primary", "#00ff00")])),
        Utc::now(),
    );
}

#[tokio::test]
async fn member_sees_elevated_principals_branding() {
    let h = Harness::new();
    seed_owner_branding(&h);
    let mut rx = h.engine.subscribe();

    h.enter(TENANT_A, MEMBER).await;

    assert_eq!(h.sink.token("primary").as_deref(), Some("0 100% 50%"));
    assert_eq!(
        h.engine.effective().await.custom_colors,
        colors(&[("primary", "#ff0000")])
    );
    let loaded = drain(&mut rx)
        .into_iter()
        .find(|e| e.event_type == SETTINGS_LOADED)
        .unwrap();
    assert_eq!(loaded.payload["fallbackFrom"], OWNER);
}

#[tokio::test(start_paused = true)]
async fn member_cannot_override_adopted_branding() {
    let h = Harness::new();
    seed_owner_branding(&h);
    h.enter(TENANT_A, MEMBER).await;

    h.engine
        .mutate(SettingsOverlay::colors_only(colors(&[("primary", "#0000ff")])))
        .await
        .unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;

    assert_eq!(h.sink.token("primary").as_deref(), Some("0 100% 50%"));
    assert!(h.tenant_writes().is_empty());
    assert!(h.store.record(TENANT_A, None).is_none());
}

#[tokio::test]
async fn tenant_record_with_colors_skips_fallback() {
    let h = Harness::new();
    seed_owner_branding(&h);
    h.seed_tenant(TENANT_A, SettingsOverlay::colors_only(colors(&[("primary", "#1e90ff")])));

    h.enter(TENANT_A, MEMBER).await;

    assert_eq!(h.sink.token("primary").as_deref(), Some("210 100% 56%"));
    // Tenant record, principal record and role lookup only.
    assert_eq!(h.store.read_count(), 3);
}

#[tokio::test]
async fn tenant_record_without_colors_still_falls_back() {
    let h = Harness::new();
    seed_owner_branding(&h);
    h.seed_tenant(
        TENANT_A,
        SettingsOverlay {
            items_per_page: Some(100),
            ..Default::default()
        },
    );

    h.enter(TENANT_A, MEMBER).await;

    let effective = h.engine.effective().await;
    assert_eq!(effective.items_per_page, 100);
    assert_eq!(effective.custom_colors, colors(&[("primary", "#ff0000")]));
}

#[tokio::test(start_paused = true)]
async fn elevated_save_promotes_adopted_branding_to_tenant_record() {
    let h = Harness::new();
    seed_owner_branding(&h);
    h.enter(TENANT_A, OWNER).await;

    h.engine
        .mutate(SettingsOverlay {
            compact_mode: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;

    let tenant = h.store.record(TENANT_A, None).unwrap();
    assert_eq!(tenant.custom_colors, Some(colors(&[("primary", "#ff0000")])));
}
