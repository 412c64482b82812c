use gallery_core::{resolve_route, AppState, Capabilities, Catalog, Category, DemoEntry, DemoId, Route};

#[test]
fn routes_resolve_from_paths_urls_and_segments() {
    assert_eq!(resolve_route("/"), Route::Home);
    assert_eq!(resolve_route(""), Route::Home);
    assert_eq!(resolve_route("/zero-shot"), Route::Demo(DemoId::ZeroShot));
    assert_eq!(resolve_route("zero-shot/"), Route::Demo(DemoId::ZeroShot));
    assert_eq!(
        resolve_route("https://gallery.example.com/cross-encoder"),
        Route::Demo(DemoId::CrossEncoder)
    );
    assert_eq!(resolve_route("/speecht5"), Route::Demo(DemoId::SpeechT5));
    assert_eq!(resolve_route("/llama"), Route::Demo(DemoId::Llama));
    assert_eq!(resolve_route("florence"), Route::Demo(DemoId::Florence));
    assert_eq!(
        resolve_route("/whisper"),
        Route::NotFound("whisper".to_string())
    );
}

#[test]
fn routes_match_a_single_segment_only() {
    assert_eq!(
        resolve_route("/zero-shot/extra"),
        Route::NotFound("/zero-shot/extra".to_string())
    );
    assert_eq!(
        resolve_route("https://gallery.example.com/tts/more"),
        Route::NotFound("/tts/more".to_string())
    );
    assert_eq!(
        resolve_route("mailto:x"),
        Route::NotFound("mailto:x".to_string())
    );
}

#[test]
fn grouping_preserves_catalog_order() {
    let catalog = Catalog::builtin();
    let groups = catalog.grouped();

    let summary: Vec<(&str, Vec<DemoId>)> = groups
        .iter()
        .map(|(category, entries)| {
            (
                category.friendly_name(),
                entries.iter().map(|entry| entry.id).collect(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Text Generation", vec![DemoId::Llama, DemoId::Phi]),
            ("Multimodal", vec![DemoId::Janus]),
            ("Computer Vision", vec![DemoId::Florence]),
            (
                "Text Classification",
                vec![DemoId::CrossEncoder, DemoId::ZeroShot]
            ),
            (
                "Audio Processing",
                vec![DemoId::SpeechT5, DemoId::AcceleratedTts]
            ),
        ]
    );
}

#[test]
fn every_demo_is_listed_and_generation_demos_are_gated() {
    let catalog = Catalog::builtin();
    assert_eq!(catalog.entries().len(), DemoId::ALL.len());

    let gated: Vec<DemoId> = catalog
        .entries()
        .iter()
        .filter(|entry| !entry.is_enabled(Capabilities::default()))
        .map(|entry| entry.id)
        .collect();
    assert_eq!(
        gated,
        vec![
            DemoId::Llama,
            DemoId::Phi,
            DemoId::Janus,
            DemoId::Florence,
            DemoId::AcceleratedTts
        ]
    );
}

#[test]
fn listed_only_demos_have_no_controller_state() {
    for demo in [DemoId::Llama, DemoId::Phi, DemoId::Janus, DemoId::Florence] {
        assert!(AppState::new(demo).is_none(), "{demo}");
    }
    assert!(AppState::new(DemoId::AcceleratedTts).is_some());
}

#[test]
fn accelerator_requirement_gates_demos() {
    let entry = DemoEntry::new(
        DemoId::AcceleratedTts,
        "GPU",
        "needs a GPU",
        Category::Audio,
        true,
    );
    let catalog = Catalog::new(vec![entry]);
    let entry = catalog.get(DemoId::AcceleratedTts).unwrap();

    assert!(!entry.is_enabled(Capabilities::default()));
    assert!(entry.is_enabled(Capabilities { accelerator: true }));
    assert!(catalog.get(DemoId::ZeroShot).is_none());
}

#[test]
fn slugs_round_trip() {
    for demo in DemoId::ALL {
        assert_eq!(DemoId::from_slug(demo.slug()), Some(demo));
    }
}
