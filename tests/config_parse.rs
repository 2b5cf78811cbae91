use pdf_squeeze::{config::Config, tier::Tier};

#[test]
fn parse_example_config() {
    let raw = include_str!("../pdf-squeeze.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.global.max_parallel_jobs >= 1);
    assert!(!cfg.paths.out_dir.is_empty());
    assert_eq!(cfg.tiers.default_tier, Tier::Medium);
    assert_eq!(cfg.escalation.force_resolution_dpi, 50);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[tiers]\ndefault_tier = \"high\"\nlow_pdf_settings = \"/prepress\"\nmedium_pdf_settings = \"/ebook\"\nhigh_pdf_settings = \"/screen\"\n")
        .expect("parse TOML");
    assert_eq!(cfg.tiers.default_tier, Tier::High);
    assert_eq!(cfg.tiers.low_pdf_settings, "/prepress");
    assert!(cfg.escalation.enabled);
    assert!(cfg.increase.verify_structure);
}
